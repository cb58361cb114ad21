use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use watchhive_core::models::SeriesId;
use watchhive_core::release::parse_release_date;

#[derive(Parser)]
#[command(name = "watchhive")]
#[command(author, version, about = "Track series watch progress against TMDB release dates")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the progress database (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TMDB v3 API key (overrides config)
    #[arg(long, global = true, env = "WATCHHIVE_TMDB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Evaluate release dates as of this day (YYYY-MM-DD) instead of today
    #[arg(long, global = true, value_parser = parse_day)]
    pub today: Option<NaiveDate>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show per-season and overall progress for a series
    Progress {
        /// TMDB series id
        series_id: SeriesId,
    },

    /// Toggle (or set) the watched state of one episode
    Episode {
        series_id: SeriesId,
        season: u32,
        episode: u32,

        /// Mark watched instead of toggling
        #[arg(long, conflicts_with = "unwatched")]
        watched: bool,

        /// Mark unwatched instead of toggling
        #[arg(long)]
        unwatched: bool,
    },

    /// Toggle completion of a season
    Season { series_id: SeriesId, season: u32 },

    /// Toggle completion of a whole series
    Series { series_id: SeriesId },

    /// Print the stored progress record (no network access)
    Record { series_id: SeriesId },

    /// List series with stored progress (no network access)
    Tracked,
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_release_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_episode_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "watchhive", "episode", "1399", "1", "2", "--watched", "--unwatched",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_today_override_parses() {
        let cli = Cli::try_parse_from(["watchhive", "--today", "2024-03-10", "tracked"]).unwrap();
        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2024, 3, 10));
        assert!(Cli::try_parse_from(["watchhive", "--today", "soon", "tracked"]).is_err());
    }
}
