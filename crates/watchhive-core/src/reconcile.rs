//! Bulk watch operations with release gating.
//!
//! Every entry point gathers data, partitions it by release status, writes
//! only released units to the store and reports what it skipped. Unreleased
//! content is an expected outcome, returned as data rather than an error.
//! Callers serialize operations per series; the store is not guarded here.

use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{self, Progress};
use crate::error::{MetadataUnavailable, WatchHiveError};
use crate::events::{Observer, ProgressEvent};
use crate::gateway::MetadataGateway;
use crate::models::{Episode, EpisodesBySeason, Season, Series, SeriesId, SeriesProgressRecord};
use crate::release::{is_released, partition_released, ReleaseGate};
use crate::store::{ProgressStore, SeasonCoverage};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeOutcome {
    pub applied: bool,
    /// Watched state after the call.
    pub watched: bool,
    pub skipped: Option<Episode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonOutcome {
    pub applied: bool,
    /// Season completion flag after the call.
    pub completed: bool,
    pub skipped_episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriesOutcome {
    pub applied: bool,
    /// Series completion flag after the call.
    pub completed: bool,
    pub skipped_seasons: Vec<Season>,
    pub skipped_episodes: Vec<Episode>,
    /// Some season fell back to its nominal episode count.
    pub degraded: bool,
}

/// Episode lists gathered for one operation.
#[derive(Debug, Clone, Default)]
pub struct SeasonFetch {
    pub episodes: EpisodesBySeason,
    pub unavailable: BTreeSet<u32>,
}

impl SeasonFetch {
    pub fn is_degraded(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

/// Owns a progress store and a metadata gateway and applies watch operations.
pub struct Reconciler<S, G> {
    store: S,
    gateway: G,
    gate: ReleaseGate,
    fetch_timeout: Duration,
    observers: Vec<Observer>,
}

impl<S: ProgressStore, G: MetadataGateway> Reconciler<S, G> {
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            gate: ReleaseGate::system(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            observers: Vec::new(),
        }
    }

    pub fn with_release_gate(mut self, gate: ReleaseGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn release_gate(&self) -> ReleaseGate {
        self.gate
    }

    /// Register a callback invoked after every store change or skip.
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn emit(&self, event: ProgressEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }

    /// Announce the flags a `clear_coverage` call dropped, given the record
    /// as it was before the write.
    fn emit_cleared(&self, before: &SeriesProgressRecord, season_number: u32) {
        let series_id = before.series_id;
        if before.completed {
            self.emit(ProgressEvent::SeriesCompletion {
                series_id,
                completed: false,
            });
        }
        if before.season(season_number).is_some_and(|s| s.completed) {
            self.emit(ProgressEvent::SeasonCompletion {
                series_id,
                season_number,
                completed: false,
            });
        }
    }

    // ── Reads ───────────────────────────────────────────────────

    pub fn record(&self, series_id: SeriesId) -> Result<SeriesProgressRecord, WatchHiveError> {
        self.store.get(series_id)
    }

    pub fn season_progress(
        &self,
        season: &Season,
        episodes: Option<&[Episode]>,
    ) -> Result<Progress, WatchHiveError> {
        let record = self.store.get(season.series_id)?;
        Ok(aggregate::season_progress(
            season,
            &record,
            episodes,
            self.gate.today(),
        ))
    }

    pub fn series_progress(
        &self,
        series_id: SeriesId,
        seasons: &[Season],
        episodes: &EpisodesBySeason,
    ) -> Result<Progress, WatchHiveError> {
        let record = self.store.get(series_id)?;
        Ok(aggregate::series_progress(
            &record,
            seasons,
            episodes,
            self.gate.today(),
        ))
    }

    // ── Metadata ────────────────────────────────────────────────

    pub async fn fetch_series(&self, series_id: SeriesId) -> Result<Series, MetadataUnavailable> {
        match tokio::time::timeout(self.fetch_timeout, self.gateway.series(series_id)).await {
            Ok(result) => result,
            Err(_) => Err(MetadataUnavailable::series(series_id, "request timed out")),
        }
    }

    /// Fetch each distinct season concurrently. Failures and timeouts land in
    /// [`SeasonFetch::unavailable`] instead of failing the whole batch.
    pub async fn fetch_seasons(
        &self,
        series_id: SeriesId,
        season_numbers: impl IntoIterator<Item = u32>,
    ) -> SeasonFetch {
        let wanted: BTreeSet<u32> = season_numbers.into_iter().collect();
        let requests = wanted.iter().map(move |&season_number| async move {
            let result = tokio::time::timeout(
                self.fetch_timeout,
                self.gateway.season_episodes(series_id, season_number),
            )
            .await
            .unwrap_or_else(|_| {
                Err(MetadataUnavailable::season(
                    series_id,
                    season_number,
                    "request timed out",
                ))
            });
            (season_number, result)
        });

        let mut fetch = SeasonFetch::default();
        for (season_number, result) in join_all(requests).await {
            match result {
                Ok(episodes) => {
                    fetch.episodes.insert(season_number, episodes);
                }
                Err(e) => {
                    warn!(series_id, season = season_number, error = %e, "Season metadata unavailable");
                    fetch.unavailable.insert(season_number);
                    self.emit(ProgressEvent::MetadataDegraded {
                        series_id,
                        season_number,
                    });
                }
            }
        }
        fetch
    }

    // ── Episode ─────────────────────────────────────────────────

    /// Flip the watched state of one episode.
    pub fn toggle_episode(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
        season_episodes: &[Episode],
    ) -> Result<EpisodeOutcome, WatchHiveError> {
        let watched = self
            .store
            .get(series_id)?
            .is_episode_watched(season_number, episode_number);
        self.mark_episode(
            series_id,
            season_number,
            episode_number,
            season_episodes,
            !watched,
        )
    }

    /// Set the watched state of one episode.
    ///
    /// Watching requires the episode in `season_episodes` and released;
    /// an unreleased episode comes back as `skipped`. Unwatching needs no
    /// metadata and drops any completion flag covering the episode.
    pub fn mark_episode(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
        season_episodes: &[Episode],
        watched: bool,
    ) -> Result<EpisodeOutcome, WatchHiveError> {
        let record = self.store.get(series_id)?;
        let currently = record.is_episode_watched(season_number, episode_number);

        if watched == currently {
            debug!(series_id, season = season_number, episode = episode_number, watched, "Episode already in requested state");
            return Ok(EpisodeOutcome {
                applied: true,
                watched,
                skipped: None,
            });
        }

        if !watched {
            self.store
                .clear_coverage(series_id, season_number, Some(episode_number))?;
            self.emit_cleared(&record, season_number);
            info!(series_id, season = season_number, episode = episode_number, "Episode unwatched");
            self.emit(ProgressEvent::EpisodeMarked {
                series_id,
                season_number,
                episode_number,
                watched: false,
            });
            return Ok(EpisodeOutcome {
                applied: true,
                watched: false,
                skipped: None,
            });
        }

        let episode = season_episodes
            .iter()
            .find(|ep| ep.episode_number == episode_number)
            .ok_or(WatchHiveError::EpisodeNotFound {
                series_id,
                season_number,
                episode_number,
            })?;

        if !is_released(episode.air_date.as_deref(), self.gate.today()) {
            warn!(
                series_id,
                season = season_number,
                episode = episode_number,
                air_date = episode.air_date.as_deref().unwrap_or(""),
                "Episode not released yet, skipping"
            );
            self.emit(ProgressEvent::Skipped {
                series_id,
                seasons: 0,
                episodes: 1,
            });
            return Ok(EpisodeOutcome {
                applied: false,
                watched: false,
                skipped: Some(episode.clone()),
            });
        }

        self.store
            .set_episode_watched(series_id, season_number, episode_number, true)?;
        info!(series_id, season = season_number, episode = episode_number, "Episode watched");
        self.emit(ProgressEvent::EpisodeMarked {
            series_id,
            season_number,
            episode_number,
            watched: true,
        });
        Ok(EpisodeOutcome {
            applied: true,
            watched: true,
            skipped: None,
        })
    }

    // ── Season ──────────────────────────────────────────────────

    /// Flip season completion.
    ///
    /// Un-completing keeps the explicit episode records. Completing records
    /// the released episodes and is rejected outright when nothing in a
    /// non-empty season has aired yet.
    pub fn toggle_season(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        season_episodes: &[Episode],
    ) -> Result<SeasonOutcome, WatchHiveError> {
        let record = self.store.get(series_id)?;

        if record.covers_season(season_number) {
            self.store.clear_coverage(series_id, season_number, None)?;
            info!(series_id, season = season_number, "Season marked incomplete");
            if record.completed {
                self.emit(ProgressEvent::SeriesCompletion {
                    series_id,
                    completed: false,
                });
            }
            self.emit(ProgressEvent::SeasonCompletion {
                series_id,
                season_number,
                completed: false,
            });
            return Ok(SeasonOutcome {
                applied: true,
                completed: false,
                skipped_episodes: Vec::new(),
            });
        }

        let (released, unreleased) = partition_released(season_episodes, self.gate.today());
        debug!(
            series_id,
            season = season_number,
            released = released.len(),
            unreleased = unreleased.len(),
            "Partitioned season"
        );
        let skipped_episodes: Vec<Episode> = unreleased.into_iter().cloned().collect();

        if released.is_empty() && !skipped_episodes.is_empty() {
            warn!(series_id, season = season_number, "No released episodes, season not completed");
            self.emit(ProgressEvent::Skipped {
                series_id,
                seasons: 1,
                episodes: skipped_episodes.len(),
            });
            return Ok(SeasonOutcome {
                applied: false,
                completed: false,
                skipped_episodes,
            });
        }

        let cover: BTreeSet<u32> = released.iter().map(|ep| ep.episode_number).collect();
        self.store
            .set_season_completed(series_id, season_number, true, &cover)?;
        info!(
            series_id,
            season = season_number,
            covered = cover.len(),
            skipped = skipped_episodes.len(),
            "Season completed"
        );
        self.emit(ProgressEvent::SeasonCompletion {
            series_id,
            season_number,
            completed: true,
        });
        if !skipped_episodes.is_empty() {
            self.emit(ProgressEvent::Skipped {
                series_id,
                seasons: 0,
                episodes: skipped_episodes.len(),
            });
        }
        Ok(SeasonOutcome {
            applied: true,
            completed: true,
            skipped_episodes,
        })
    }

    // ── Series ──────────────────────────────────────────────────

    /// Flip series completion.
    ///
    /// Completing covers the released episodes of every season, specials
    /// included. Seasons missing from `known` are fetched first; any that
    /// cannot be fetched fall back to their nominal episode count and mark
    /// the outcome degraded. Un-completing clears only the series flag.
    pub async fn toggle_series(
        &mut self,
        series_id: SeriesId,
        seasons: &[Season],
        known: &EpisodesBySeason,
    ) -> Result<SeriesOutcome, WatchHiveError> {
        let record = self.store.get(series_id)?;

        if record.completed {
            self.store
                .set_series_completed(series_id, false, &SeasonCoverage::new())?;
            info!(series_id, "Series marked incomplete");
            self.emit(ProgressEvent::SeriesCompletion {
                series_id,
                completed: false,
            });
            return Ok(SeriesOutcome {
                applied: true,
                completed: false,
                ..Default::default()
            });
        }

        let missing = seasons
            .iter()
            .map(|s| s.season_number)
            .filter(|n| !known.contains_key(n));
        let fetched = self.fetch_seasons(series_id, missing).await;

        let today = self.gate.today();
        let mut outcome = SeriesOutcome {
            applied: true,
            completed: true,
            degraded: fetched.is_degraded(),
            ..Default::default()
        };
        let mut coverage = SeasonCoverage::new();

        for season in seasons {
            let n = season.season_number;
            let detail = known.get(&n).or_else(|| fetched.episodes.get(&n));

            let (released, nothing_released) = match detail {
                Some(episodes) => {
                    let (released, unreleased) = partition_released(episodes, today);
                    let nothing_released = released.is_empty() && !unreleased.is_empty();
                    outcome
                        .skipped_episodes
                        .extend(unreleased.into_iter().cloned());
                    let released: BTreeSet<u32> =
                        released.iter().map(|ep| ep.episode_number).collect();
                    (released, nothing_released)
                }
                None if is_released(season.air_date.as_deref(), today) => {
                    ((1..=season.episode_count).collect(), false)
                }
                None => (BTreeSet::new(), true),
            };

            if nothing_released {
                debug!(series_id, season = n, "Season not released yet, skipping");
                outcome.skipped_seasons.push(season.clone());
                continue;
            }
            coverage.insert(n, released);
        }

        self.store
            .set_series_completed(series_id, true, &coverage)?;
        info!(
            series_id,
            seasons = coverage.len(),
            skipped_seasons = outcome.skipped_seasons.len(),
            skipped_episodes = outcome.skipped_episodes.len(),
            degraded = outcome.degraded,
            "Series completed"
        );
        self.emit(ProgressEvent::SeriesCompletion {
            series_id,
            completed: true,
        });
        if !outcome.skipped_seasons.is_empty() || !outcome.skipped_episodes.is_empty() {
            self.emit(ProgressEvent::Skipped {
                series_id,
                seasons: outcome.skipped_seasons.len(),
                episodes: outcome.skipped_episodes.len(),
            });
        }
        Ok(outcome)
    }
}
