use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata-provider series identifier (TMDB tv id).
pub type SeriesId = u64;

/// Episode lists keyed by season number.
pub type EpisodesBySeason = BTreeMap<u32, Vec<Episode>>;

/// Anything with a nominal air or release date.
pub trait Releasable {
    /// Raw date as supplied upstream (`YYYY-MM-DD` or RFC 3339), if any.
    fn release_date(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub release_date: Option<String>,
}

/// A series with its season summaries (no per-episode detail).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    pub name: String,
    pub first_air_date: Option<String>,
    pub seasons: Vec<Season>,
}

/// Season summary. Season `0` holds specials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub series_id: SeriesId,
    pub season_number: u32,
    pub name: String,
    pub air_date: Option<String>,
    /// Nominal count; may exceed the episodes the provider actually returns.
    pub episode_count: u32,
}

impl Season {
    pub fn is_specials(&self) -> bool {
        self.season_number == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub series_id: SeriesId,
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub air_date: Option<String>,
}

impl Releasable for Movie {
    fn release_date(&self) -> Option<&str> {
        self.release_date.as_deref()
    }
}

impl Releasable for Series {
    fn release_date(&self) -> Option<&str> {
        self.first_air_date.as_deref()
    }
}

impl Releasable for Season {
    fn release_date(&self) -> Option<&str> {
        self.air_date.as_deref()
    }
}

impl Releasable for Episode {
    fn release_date(&self) -> Option<&str> {
        self.air_date.as_deref()
    }
}
