use thiserror::Error;

use crate::models::SeriesId;

#[derive(Debug, Error)]
pub enum WatchHiveError {
    #[error("episode S{season_number:02}E{episode_number:02} of series {series_id} is not in the supplied season data")]
    EpisodeNotFound {
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
    },

    #[error(transparent)]
    Unavailable(#[from] MetadataUnavailable),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The metadata source could not supply data (network, status, payload or timeout).
#[derive(Debug, Clone, Error)]
#[error("metadata unavailable for series {series_id}{}: {reason}", season_suffix(.season_number))]
pub struct MetadataUnavailable {
    pub series_id: SeriesId,
    pub season_number: Option<u32>,
    pub reason: String,
}

impl MetadataUnavailable {
    pub fn season(series_id: SeriesId, season_number: u32, reason: impl Into<String>) -> Self {
        Self {
            series_id,
            season_number: Some(season_number),
            reason: reason.into(),
        }
    }

    pub fn series(series_id: SeriesId, reason: impl Into<String>) -> Self {
        Self {
            series_id,
            season_number: None,
            reason: reason.into(),
        }
    }
}

fn season_suffix(season_number: &Option<u32>) -> String {
    season_number.map(|n| format!(" season {n}")).unwrap_or_default()
}

pub type Result<T, E = WatchHiveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_names_season_when_known() {
        let season = MetadataUnavailable::season(1399, 2, "HTTP 503");
        assert_eq!(
            season.to_string(),
            "metadata unavailable for series 1399 season 2: HTTP 503"
        );
        let series = MetadataUnavailable::series(1399, "timed out");
        assert_eq!(
            series.to_string(),
            "metadata unavailable for series 1399: timed out"
        );
        let wrapped: WatchHiveError = season.into();
        assert_eq!(
            wrapped.to_string(),
            "metadata unavailable for series 1399 season 2: HTTP 503"
        );
    }
}
