//! Watched/total counts at season and series granularity.
//!
//! Pure functions of `(record, season summaries, known episodes, today)`.
//! Specials (season `0`) never contribute to series-level figures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Episode, EpisodesBySeason, Season, SeriesProgressRecord};
use crate::release::is_released;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub watched: u32,
    pub total: u32,
    pub percentage: u32,
    /// At least one season was counted from its nominal episode count.
    pub degraded: bool,
}

impl Progress {
    fn new(watched: u32, total: u32, degraded: bool) -> Self {
        Self {
            watched,
            total,
            percentage: percentage(watched, total),
            degraded,
        }
    }
}

/// `round(100 * watched / total)`, or `0` when there is nothing to count.
pub fn percentage(watched: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * f64::from(watched) / f64::from(total)).round() as u32
}

/// Progress for one season.
///
/// With `episodes` the total is the detailed list length (released or not).
/// Without it the nominal `episode_count` is used and, for a covered season
/// that has itself aired, every nominal episode is assumed released. A
/// covered season that has not aired counts only its explicit records.
pub fn season_progress(
    season: &Season,
    record: &SeriesProgressRecord,
    episodes: Option<&[Episode]>,
    today: NaiveDate,
) -> Progress {
    let covered = record.covers_season(season.season_number);
    let recorded = record
        .season(season.season_number)
        .map(|s| s.watched_episode_numbers.len() as u32)
        .unwrap_or(0);

    match episodes {
        Some(episodes) => {
            let total = episodes.len() as u32;
            let watched = if covered {
                episodes
                    .iter()
                    .filter(|ep| is_released(ep.air_date.as_deref(), today))
                    .count() as u32
            } else {
                recorded
            };
            Progress::new(watched, total, false)
        }
        None => {
            let total = season.episode_count;
            let watched = if covered && is_released(season.air_date.as_deref(), today) {
                total
            } else {
                recorded
            };
            Progress::new(watched, total, true)
        }
    }
}

/// Progress summed over every non-special season in `seasons`.
pub fn series_progress(
    record: &SeriesProgressRecord,
    seasons: &[Season],
    episodes: &EpisodesBySeason,
    today: NaiveDate,
) -> Progress {
    let (watched, total, degraded) = seasons
        .iter()
        .filter(|season| !season.is_specials())
        .map(|season| {
            let detail = episodes.get(&season.season_number).map(Vec::as_slice);
            season_progress(season, record, detail, today)
        })
        .fold((0, 0, false), |(w, t, d), p| {
            (w + p.watched, t + p.total, d || p.degraded)
        });
    Progress::new(watched, total, degraded)
}
