use serde::Deserialize;

use watchhive_core::models::{Episode, Season, Series, SeriesId};

// ── TMDB v3 response types ───────────────────────────────────────

/// `GET /tv/{id}`
#[derive(Debug, Deserialize)]
pub struct TmdbTvShow {
    pub id: u64,
    pub name: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbSeasonSummary {
    pub season_number: u32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub episode_count: Option<u32>,
}

/// `GET /tv/{id}/season/{n}`
#[derive(Debug, Deserialize)]
pub struct TmdbSeason {
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbEpisode {
    pub episode_number: u32,
    pub name: Option<String>,
    pub air_date: Option<String>,
}

// ── Conversions ──────────────────────────────────────────────────

/// TMDB sends `""` for unknown dates.
fn non_empty(date: Option<String>) -> Option<String> {
    date.filter(|d| !d.trim().is_empty())
}

impl TmdbTvShow {
    pub fn into_series(self) -> Series {
        let id = self.id;
        Series {
            id,
            name: self.name.unwrap_or_else(|| format!("Series {id}")),
            first_air_date: non_empty(self.first_air_date),
            seasons: self
                .seasons
                .into_iter()
                .map(|s| s.into_season(id))
                .collect(),
        }
    }
}

impl TmdbSeasonSummary {
    pub fn into_season(self, series_id: SeriesId) -> Season {
        Season {
            series_id,
            season_number: self.season_number,
            name: self
                .name
                .unwrap_or_else(|| format!("Season {}", self.season_number)),
            air_date: non_empty(self.air_date),
            episode_count: self.episode_count.unwrap_or(0),
        }
    }
}

impl TmdbSeason {
    pub fn into_episodes(self, series_id: SeriesId) -> Vec<Episode> {
        let season_number = self.season_number;
        self.episodes
            .into_iter()
            .map(|ep| Episode {
                series_id,
                season_number,
                episode_number: ep.episode_number,
                name: ep
                    .name
                    .unwrap_or_else(|| format!("Episode {}", ep.episode_number)),
                air_date: non_empty(ep.air_date),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tv_show_maps_seasons_and_blank_dates() {
        let show: TmdbTvShow = serde_json::from_str(
            r#"{
                "id": 1399,
                "name": "Game of Thrones",
                "first_air_date": "2011-04-17",
                "seasons": [
                    {"season_number": 0, "name": "Specials", "air_date": "", "episode_count": 14},
                    {"season_number": 1, "name": "Season 1", "air_date": "2011-04-17", "episode_count": 10}
                ]
            }"#,
        )
        .unwrap();
        let series = show.into_series();
        assert_eq!(series.seasons.len(), 2);
        assert!(series.seasons[0].is_specials());
        assert_eq!(series.seasons[0].air_date, None);
        assert_eq!(series.seasons[1].episode_count, 10);
        assert_eq!(series.seasons[1].series_id, 1399);
    }

    #[test]
    fn test_season_without_names_gets_placeholders() {
        let season: TmdbSeason = serde_json::from_str(
            r#"{"season_number": 2, "episodes": [{"episode_number": 1, "name": null, "air_date": null}]}"#,
        )
        .unwrap();
        let episodes = season.into_episodes(7);
        assert_eq!(episodes[0].name, "Episode 1");
        assert_eq!(episodes[0].season_number, 2);
        assert_eq!(episodes[0].series_id, 7);
        assert!(episodes[0].air_date.is_none());
    }
}
