//! Watch-progress persistence contract and its in-memory implementation.
//!
//! Stores are plain mutators: they never check release dates or metadata.
//! That validation happens in the reconciler before any write.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;

use crate::error::WatchHiveError;
use crate::models::{SeriesId, SeriesProgressRecord};

/// Episode numbers to record per season when completing a series.
pub type SeasonCoverage = BTreeMap<u32, BTreeSet<u32>>;

/// Key-value store of [`SeriesProgressRecord`]s for a single user.
pub trait ProgressStore {
    /// Snapshot of a series' progress. Untouched series yield
    /// [`SeriesProgressRecord::empty`], never an absent value.
    fn get(&self, series_id: SeriesId) -> Result<SeriesProgressRecord, WatchHiveError>;

    /// Idempotent add/remove of one episode number.
    fn set_episode_watched(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
        watched: bool,
    ) -> Result<(), WatchHiveError>;

    /// Set the season flag. When completing, `cover` is unioned into the
    /// watched set so explicit records survive a later un-complete.
    fn set_season_completed(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        completed: bool,
        cover: &BTreeSet<u32>,
    ) -> Result<(), WatchHiveError>;

    /// Set the series flag. When completing, every season in `coverage` is
    /// completed with its episode set.
    fn set_series_completed(
        &mut self,
        series_id: SeriesId,
        completed: bool,
        coverage: &SeasonCoverage,
    ) -> Result<(), WatchHiveError>;

    /// Drop every completion flag covering `season_number` (the season flag
    /// and the series flag) and, if given, unrecord one episode, as a single
    /// write. Nothing changes when it fails.
    fn clear_coverage(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: Option<u32>,
    ) -> Result<(), WatchHiveError>;
}

/// In-memory store, used by tests and as the reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<SeriesId, SeriesProgressRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_mut(&mut self, series_id: SeriesId) -> &mut SeriesProgressRecord {
        let record = self
            .records
            .entry(series_id)
            .or_insert_with(|| SeriesProgressRecord::empty(series_id));
        record.last_watched_at = Some(Utc::now());
        record
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, series_id: SeriesId) -> Result<SeriesProgressRecord, WatchHiveError> {
        Ok(self
            .records
            .get(&series_id)
            .cloned()
            .unwrap_or_else(|| SeriesProgressRecord::empty(series_id)))
    }

    fn set_episode_watched(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
        watched: bool,
    ) -> Result<(), WatchHiveError> {
        let season = self
            .record_mut(series_id)
            .seasons
            .entry(season_number)
            .or_default();
        if watched {
            season.watched_episode_numbers.insert(episode_number);
        } else {
            season.watched_episode_numbers.remove(&episode_number);
        }
        Ok(())
    }

    fn set_season_completed(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        completed: bool,
        cover: &BTreeSet<u32>,
    ) -> Result<(), WatchHiveError> {
        let season = self
            .record_mut(series_id)
            .seasons
            .entry(season_number)
            .or_default();
        season.completed = completed;
        if completed {
            season.watched_episode_numbers.extend(cover.iter().copied());
        }
        Ok(())
    }

    fn set_series_completed(
        &mut self,
        series_id: SeriesId,
        completed: bool,
        coverage: &SeasonCoverage,
    ) -> Result<(), WatchHiveError> {
        self.record_mut(series_id).completed = completed;
        if completed {
            for (&season_number, episodes) in coverage {
                self.set_season_completed(series_id, season_number, true, episodes)?;
            }
        }
        Ok(())
    }

    fn clear_coverage(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: Option<u32>,
    ) -> Result<(), WatchHiveError> {
        let record = self.record_mut(series_id);
        record.completed = false;
        let season = record.seasons.entry(season_number).or_default();
        season.completed = false;
        if let Some(episode_number) = episode_number {
            season.watched_episode_numbers.remove(&episode_number);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(numbers: &[u32]) -> BTreeSet<u32> {
        numbers.iter().copied().collect()
    }

    #[test]
    fn test_get_untouched_series_returns_zero_value() {
        let store = MemoryStore::new();
        let record = store.get(42).unwrap();
        assert_eq!(record, SeriesProgressRecord::empty(42));
    }

    #[test]
    fn test_episode_add_remove_is_idempotent() {
        let mut store = MemoryStore::new();
        store.set_episode_watched(42, 1, 3, true).unwrap();
        store.set_episode_watched(42, 1, 3, true).unwrap();
        let record = store.get(42).unwrap();
        assert_eq!(record.seasons[&1].watched_episode_numbers, set(&[3]));
        assert!(record.last_watched_at.is_some());

        store.set_episode_watched(42, 1, 3, false).unwrap();
        store.set_episode_watched(42, 1, 3, false).unwrap();
        assert!(store.get(42).unwrap().seasons[&1]
            .watched_episode_numbers
            .is_empty());
    }

    #[test]
    fn test_season_completion_unions_cover() {
        let mut store = MemoryStore::new();
        store.set_episode_watched(42, 2, 9, true).unwrap();
        store
            .set_season_completed(42, 2, true, &set(&[1, 2, 3]))
            .unwrap();
        let season = &store.get(42).unwrap().seasons[&2];
        assert!(season.completed);
        assert_eq!(season.watched_episode_numbers, set(&[1, 2, 3, 9]));

        store.set_season_completed(42, 2, false, &set(&[])).unwrap();
        let season = &store.get(42).unwrap().seasons[&2];
        assert!(!season.completed);
        assert_eq!(season.watched_episode_numbers.len(), 4);
    }

    #[test]
    fn test_series_completion_completes_covered_seasons() {
        let mut store = MemoryStore::new();
        let mut coverage = SeasonCoverage::new();
        coverage.insert(0, set(&[1]));
        coverage.insert(1, set(&[1, 2]));
        store.set_series_completed(42, true, &coverage).unwrap();

        let record = store.get(42).unwrap();
        assert!(record.completed);
        assert!(record.seasons[&0].completed);
        assert_eq!(record.seasons[&1].watched_episode_numbers, set(&[1, 2]));

        store.set_series_completed(42, false, &SeasonCoverage::new()).unwrap();
        let record = store.get(42).unwrap();
        assert!(!record.completed);
        assert!(record.seasons[&1].completed);
    }

    #[test]
    fn test_clear_coverage_drops_both_flags_and_one_episode() {
        let mut store = MemoryStore::new();
        let mut coverage = SeasonCoverage::new();
        coverage.insert(1, set(&[1, 2, 3]));
        coverage.insert(2, set(&[1]));
        store.set_series_completed(42, true, &coverage).unwrap();

        store.clear_coverage(42, 1, Some(2)).unwrap();
        let record = store.get(42).unwrap();
        assert!(!record.completed);
        assert!(!record.seasons[&1].completed);
        assert_eq!(record.seasons[&1].watched_episode_numbers, set(&[1, 3]));
        assert!(record.seasons[&2].completed);

        store.clear_coverage(42, 2, None).unwrap();
        let season = &store.get(42).unwrap().seasons[&2];
        assert!(!season.completed);
        assert_eq!(season.watched_episode_numbers, set(&[1]));
    }
}
