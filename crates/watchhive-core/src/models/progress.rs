use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::SeriesId;

/// Per-season watch state inside a [`SeriesProgressRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub watched_episode_numbers: BTreeSet<u32>,
    pub completed: bool,
}

/// Persisted watch progress for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesProgressRecord {
    pub series_id: SeriesId,
    pub seasons: BTreeMap<u32, SeasonRecord>,
    pub completed: bool,
    pub last_watched_at: Option<DateTime<Utc>>,
}

/// Coarse per-series state. Every transition is reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesState {
    NotStarted,
    InProgress,
    Completed,
}

impl SeriesState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for SeriesState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SeriesProgressRecord {
    /// The zero-value record returned for series that were never touched.
    pub fn empty(series_id: SeriesId) -> Self {
        Self {
            series_id,
            seasons: BTreeMap::new(),
            completed: false,
            last_watched_at: None,
        }
    }

    pub fn season(&self, season_number: u32) -> Option<&SeasonRecord> {
        self.seasons.get(&season_number)
    }

    /// Whether a completion flag (season or series) covers this season.
    pub fn covers_season(&self, season_number: u32) -> bool {
        self.completed || self.season(season_number).is_some_and(|s| s.completed)
    }

    /// Watched either explicitly or through completion coverage.
    pub fn is_episode_watched(&self, season_number: u32, episode_number: u32) -> bool {
        self.covers_season(season_number)
            || self
                .season(season_number)
                .is_some_and(|s| s.watched_episode_numbers.contains(&episode_number))
    }

    pub fn state(&self) -> SeriesState {
        if self.completed {
            SeriesState::Completed
        } else if self
            .seasons
            .values()
            .any(|s| s.completed || !s.watched_episode_numbers.is_empty())
        {
            SeriesState::InProgress
        } else {
            SeriesState::NotStarted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_is_not_started() {
        let record = SeriesProgressRecord::empty(1399);
        assert_eq!(record.state(), SeriesState::NotStarted);
        assert!(!record.is_episode_watched(1, 1));
        assert!(record.last_watched_at.is_none());
    }

    #[test]
    fn test_season_flag_covers_unrecorded_episodes() {
        let mut record = SeriesProgressRecord::empty(1399);
        record.seasons.insert(
            2,
            SeasonRecord {
                watched_episode_numbers: BTreeSet::new(),
                completed: true,
            },
        );
        assert!(record.is_episode_watched(2, 7));
        assert!(!record.is_episode_watched(1, 7));
        assert_eq!(record.state(), SeriesState::InProgress);
    }

    #[test]
    fn test_series_flag_covers_every_season() {
        let mut record = SeriesProgressRecord::empty(1399);
        record.completed = true;
        assert!(record.covers_season(0));
        assert!(record.is_episode_watched(5, 3));
        assert_eq!(record.state(), SeriesState::Completed);
    }
}
