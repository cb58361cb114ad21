use std::fmt;

use crate::models::SeriesId;

/// A change (or deliberate non-change) made by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    EpisodeMarked {
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
        watched: bool,
    },
    SeasonCompletion {
        series_id: SeriesId,
        season_number: u32,
        completed: bool,
    },
    SeriesCompletion {
        series_id: SeriesId,
        completed: bool,
    },
    Skipped {
        series_id: SeriesId,
        seasons: usize,
        episodes: usize,
    },
    MetadataDegraded {
        series_id: SeriesId,
        season_number: u32,
    },
}

impl ProgressEvent {
    pub fn series_id(&self) -> SeriesId {
        match self {
            Self::EpisodeMarked { series_id, .. }
            | Self::SeasonCompletion { series_id, .. }
            | Self::SeriesCompletion { series_id, .. }
            | Self::Skipped { series_id, .. }
            | Self::MetadataDegraded { series_id, .. } => *series_id,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EpisodeMarked {
                series_id,
                season_number,
                episode_number,
                watched,
            } => {
                let state = if *watched { "watched" } else { "unwatched" };
                write!(f, "series {series_id} S{season_number:02}E{episode_number:02} {state}")
            }
            Self::SeasonCompletion {
                series_id,
                season_number,
                completed,
            } => {
                let state = if *completed { "completed" } else { "incomplete" };
                write!(f, "series {series_id} season {season_number} {state}")
            }
            Self::SeriesCompletion {
                series_id,
                completed,
            } => {
                let state = if *completed { "completed" } else { "incomplete" };
                write!(f, "series {series_id} {state}")
            }
            Self::Skipped {
                series_id,
                seasons,
                episodes,
            } => write!(
                f,
                "series {series_id} skipped {seasons} season(s), {episodes} episode(s) not yet released"
            ),
            Self::MetadataDegraded {
                series_id,
                season_number,
            } => write!(f, "series {series_id} season {season_number} counted from nominal totals"),
        }
    }
}

/// Callback registered with [`Reconciler::subscribe`](crate::reconcile::Reconciler::subscribe).
pub type Observer = Box<dyn Fn(&ProgressEvent) + Send + Sync>;
