use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::WatchHiveError;
use crate::models::{SeasonRecord, SeriesId, SeriesProgressRecord};
use crate::store::{ProgressStore, SeasonCoverage};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

/// SQLite-backed [`ProgressStore`]. One database file holds one user's progress.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, WatchHiveError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, WatchHiveError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Series ids with any recorded progress, most recently touched first.
    pub fn tracked_series(&self) -> Result<Vec<SeriesId>, WatchHiveError> {
        let mut stmt = self.conn.prepare(
            "SELECT series_id FROM series_progress
             ORDER BY last_watched_at DESC, series_id",
        )?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| id as SeriesId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl ProgressStore for SqliteStore {
    fn get(&self, series_id: SeriesId) -> Result<SeriesProgressRecord, WatchHiveError> {
        let header: Option<(bool, Option<String>)> = self
            .conn
            .query_row(
                "SELECT completed, last_watched_at FROM series_progress WHERE series_id = ?1",
                params![series_id as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((completed, last_watched_at)) = header else {
            return Ok(SeriesProgressRecord::empty(series_id));
        };

        let mut record = SeriesProgressRecord {
            series_id,
            seasons: Default::default(),
            completed,
            last_watched_at: last_watched_at.as_deref().map(parse_datetime),
        };

        let mut stmt = self.conn.prepare(
            "SELECT season_number, completed FROM season_progress WHERE series_id = ?1",
        )?;
        let seasons = stmt.query_map(params![series_id as i64], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, bool>(1)?))
        })?;
        for season in seasons {
            let (season_number, completed) = season?;
            record.seasons.insert(
                season_number,
                SeasonRecord {
                    watched_episode_numbers: BTreeSet::new(),
                    completed,
                },
            );
        }

        let mut stmt = self.conn.prepare(
            "SELECT season_number, episode_number FROM watched_episode WHERE series_id = ?1",
        )?;
        let episodes = stmt.query_map(params![series_id as i64], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
        })?;
        for episode in episodes {
            let (season_number, episode_number) = episode?;
            record
                .seasons
                .entry(season_number)
                .or_default()
                .watched_episode_numbers
                .insert(episode_number);
        }

        Ok(record)
    }

    fn set_episode_watched(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: u32,
        watched: bool,
    ) -> Result<(), WatchHiveError> {
        let tx = self.conn.transaction()?;
        touch_season(&tx, series_id, season_number)?;
        if watched {
            tx.execute(
                "INSERT OR IGNORE INTO watched_episode (series_id, season_number, episode_number)
                 VALUES (?1, ?2, ?3)",
                params![series_id as i64, season_number, episode_number],
            )?;
        } else {
            tx.execute(
                "DELETE FROM watched_episode
                 WHERE series_id = ?1 AND season_number = ?2 AND episode_number = ?3",
                params![series_id as i64, season_number, episode_number],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn set_season_completed(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        completed: bool,
        cover: &BTreeSet<u32>,
    ) -> Result<(), WatchHiveError> {
        let tx = self.conn.transaction()?;
        complete_season(&tx, series_id, season_number, completed, cover)?;
        tx.commit()?;
        Ok(())
    }

    fn set_series_completed(
        &mut self,
        series_id: SeriesId,
        completed: bool,
        coverage: &SeasonCoverage,
    ) -> Result<(), WatchHiveError> {
        let tx = self.conn.transaction()?;
        touch_series(&tx, series_id)?;
        tx.execute(
            "UPDATE series_progress SET completed = ?1 WHERE series_id = ?2",
            params![completed, series_id as i64],
        )?;
        if completed {
            for (&season_number, episodes) in coverage {
                complete_season(&tx, series_id, season_number, true, episodes)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn clear_coverage(
        &mut self,
        series_id: SeriesId,
        season_number: u32,
        episode_number: Option<u32>,
    ) -> Result<(), WatchHiveError> {
        let tx = self.conn.transaction()?;
        touch_season(&tx, series_id, season_number)?;
        tx.execute(
            "UPDATE series_progress SET completed = 0 WHERE series_id = ?1",
            params![series_id as i64],
        )?;
        tx.execute(
            "UPDATE season_progress SET completed = 0
             WHERE series_id = ?1 AND season_number = ?2",
            params![series_id as i64, season_number],
        )?;
        if let Some(episode_number) = episode_number {
            tx.execute(
                "DELETE FROM watched_episode
                 WHERE series_id = ?1 AND season_number = ?2 AND episode_number = ?3",
                params![series_id as i64, season_number, episode_number],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn run_migrations(conn: &Connection) -> Result<(), WatchHiveError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── Write helpers (run inside the caller's transaction) ─────────

/// Ensure the series row exists and bump `last_watched_at`.
fn touch_series(tx: &Transaction<'_>, series_id: SeriesId) -> Result<(), WatchHiveError> {
    tx.execute(
        "INSERT INTO series_progress (series_id, last_watched_at) VALUES (?1, ?2)
         ON CONFLICT(series_id) DO UPDATE SET last_watched_at = excluded.last_watched_at",
        params![series_id as i64, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn touch_season(
    tx: &Transaction<'_>,
    series_id: SeriesId,
    season_number: u32,
) -> Result<(), WatchHiveError> {
    touch_series(tx, series_id)?;
    tx.execute(
        "INSERT OR IGNORE INTO season_progress (series_id, season_number) VALUES (?1, ?2)",
        params![series_id as i64, season_number],
    )?;
    Ok(())
}

fn complete_season(
    tx: &Transaction<'_>,
    series_id: SeriesId,
    season_number: u32,
    completed: bool,
    cover: &BTreeSet<u32>,
) -> Result<(), WatchHiveError> {
    touch_season(tx, series_id, season_number)?;
    tx.execute(
        "UPDATE season_progress SET completed = ?1
         WHERE series_id = ?2 AND season_number = ?3",
        params![completed, series_id as i64, season_number],
    )?;
    if completed {
        let mut stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO watched_episode (series_id, season_number, episode_number)
             VALUES (?1, ?2, ?3)",
        )?;
        for &episode_number in cover {
            stmt.execute(params![series_id as i64, season_number, episode_number])?;
        }
    }
    Ok(())
}

/// Parse a datetime string from SQLite (either RFC 3339 or SQLite's `datetime('now')` format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    DateTime::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(numbers: &[u32]) -> BTreeSet<u32> {
        numbers.iter().copied().collect()
    }

    #[test]
    fn test_untouched_series_is_zero_value() {
        let db = SqliteStore::open_memory().unwrap();
        assert_eq!(db.get(1399).unwrap(), SeriesProgressRecord::empty(1399));
        assert!(db.tracked_series().unwrap().is_empty());
    }

    #[test]
    fn test_episode_watch_roundtrip() {
        let mut db = SqliteStore::open_memory().unwrap();
        db.set_episode_watched(1399, 1, 1, true).unwrap();
        db.set_episode_watched(1399, 1, 2, true).unwrap();
        db.set_episode_watched(1399, 1, 2, true).unwrap();

        let record = db.get(1399).unwrap();
        assert_eq!(record.seasons[&1].watched_episode_numbers, set(&[1, 2]));
        assert!(!record.seasons[&1].completed);
        assert!(record.last_watched_at.is_some());

        db.set_episode_watched(1399, 1, 1, false).unwrap();
        let record = db.get(1399).unwrap();
        assert_eq!(record.seasons[&1].watched_episode_numbers, set(&[2]));
    }

    #[test]
    fn test_season_completion_keeps_records_after_uncomplete() {
        let mut db = SqliteStore::open_memory().unwrap();
        db.set_season_completed(1399, 3, true, &set(&[1, 2, 3])).unwrap();
        assert!(db.get(1399).unwrap().seasons[&3].completed);

        db.set_season_completed(1399, 3, false, &BTreeSet::new()).unwrap();
        let season = &db.get(1399).unwrap().seasons[&3];
        assert!(!season.completed);
        assert_eq!(season.watched_episode_numbers, set(&[1, 2, 3]));
    }

    #[test]
    fn test_series_completion_matches_memory_store() {
        let mut db = SqliteStore::open_memory().unwrap();
        let mut memory = crate::store::MemoryStore::new();
        let mut coverage = SeasonCoverage::new();
        coverage.insert(0, set(&[1]));
        coverage.insert(1, set(&[1, 2, 3]));
        coverage.insert(2, set(&[]));

        db.set_episode_watched(1399, 1, 5, true).unwrap();
        memory.set_episode_watched(1399, 1, 5, true).unwrap();
        db.set_series_completed(1399, true, &coverage).unwrap();
        memory.set_series_completed(1399, true, &coverage).unwrap();

        let from_db = db.get(1399).unwrap();
        let from_memory = memory.get(1399).unwrap();
        assert_eq!(from_db.completed, from_memory.completed);
        assert_eq!(from_db.seasons, from_memory.seasons);
    }

    #[test]
    fn test_clear_coverage_matches_memory_store() {
        let mut db = SqliteStore::open_memory().unwrap();
        let mut memory = crate::store::MemoryStore::new();
        let mut coverage = SeasonCoverage::new();
        coverage.insert(1, set(&[1, 2, 3]));
        coverage.insert(2, set(&[1, 2]));
        let stores: [&mut dyn ProgressStore; 2] = [&mut db, &mut memory];
        for store in stores {
            store.set_series_completed(1399, true, &coverage).unwrap();
            store.clear_coverage(1399, 1, Some(3)).unwrap();
            store.clear_coverage(1399, 4, None).unwrap();
        }

        let from_db = db.get(1399).unwrap();
        assert!(!from_db.completed);
        assert!(!from_db.seasons[&1].completed);
        assert!(from_db.seasons[&2].completed);
        assert_eq!(from_db.seasons[&1].watched_episode_numbers, set(&[1, 2]));
        assert_eq!(from_db.seasons, memory.get(1399).unwrap().seasons);
    }

    #[test]
    fn test_progress_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchhive.db");
        {
            let mut db = SqliteStore::open(&path).unwrap();
            db.set_episode_watched(60059, 2, 4, true).unwrap();
            db.set_series_completed(1396, true, &SeasonCoverage::new())
                .unwrap();
        }
        let db = SqliteStore::open(&path).unwrap();
        assert!(db.get(60059).unwrap().is_episode_watched(2, 4));
        assert!(db.get(1396).unwrap().completed);
        assert_eq!(db.tracked_series().unwrap().len(), 2);
    }
}
