mod cli;
mod logging;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use watchhive_api::tmdb::{TmdbClient, TmdbOptions};
use watchhive_core::config::AppConfig;
use watchhive_core::events::ProgressEvent;
use watchhive_core::models::{Episode, EpisodesBySeason, SeriesId};
use watchhive_core::reconcile::Reconciler;
use watchhive_core::release::ReleaseGate;
use watchhive_core::storage::SqliteStore;
use watchhive_core::store::ProgressStore;

use cli::{Cli, Commands};

type App = Reconciler<SqliteStore, TmdbClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(db) = &cli.db {
        config.storage.database = Some(db.clone());
    }

    let _log_guard = logging::init(&config.general, cli.verbose)?;

    let db_path = config.ensure_db_path()?;
    debug!(path = %db_path.display(), "Opening progress database");
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    match cli.command {
        Commands::Record { series_id } => {
            let record = store.get(series_id)?;
            if cli.json {
                output::json(&record)?;
            } else {
                output::record(&record);
            }
            return Ok(());
        }
        Commands::Tracked => {
            let tracked = store.tracked_series()?;
            if cli.json {
                output::json(&tracked)?;
            } else {
                for series_id in tracked {
                    println!("{series_id}");
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| config.metadata.api_key.clone())
        .context("no TMDB API key: pass --api-key, set WATCHHIVE_TMDB_API_KEY or metadata.api_key")?;
    let tmdb = TmdbClient::new(TmdbOptions::from_config(api_key, &config.metadata))?;

    let gate = cli.today.map(ReleaseGate::as_of).unwrap_or_default();
    let mut app = Reconciler::new(store, tmdb)
        .with_release_gate(gate)
        .with_fetch_timeout(config.metadata.timeout());
    app.subscribe(Box::new(|event: &ProgressEvent| {
        info!(series_id = event.series_id(), "{event}");
    }));

    run(&mut app, cli.command, cli.json).await
}

async fn run(app: &mut App, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Progress { series_id } => show_progress(app, series_id, json).await,
        Commands::Episode {
            series_id,
            season,
            episode,
            watched,
            unwatched,
        } => {
            let episodes = season_episodes(app, series_id, season).await;
            let outcome = if watched || unwatched {
                app.mark_episode(series_id, season, episode, &episodes, watched)?
            } else {
                app.toggle_episode(series_id, season, episode, &episodes)?
            };
            if json {
                output::json(&outcome)
            } else {
                output::episode(&outcome);
                Ok(())
            }
        }
        Commands::Season { series_id, season } => {
            // Un-completing needs no episode data.
            let episodes = if app.record(series_id)?.covers_season(season) {
                Vec::new()
            } else {
                let fetch = app.fetch_seasons(series_id, [season]).await;
                match fetch.episodes.into_iter().next() {
                    Some((_, episodes)) => episodes,
                    None => bail!("season {season} of series {series_id} is unavailable, try again later"),
                }
            };
            let outcome = app.toggle_season(series_id, season, &episodes)?;
            if json {
                output::json(&outcome)
            } else {
                output::season(&outcome);
                Ok(())
            }
        }
        Commands::Series { series_id } => {
            let seasons = if app.record(series_id)?.completed {
                Vec::new()
            } else {
                app.fetch_series(series_id).await?.seasons
            };
            let outcome = app
                .toggle_series(series_id, &seasons, &EpisodesBySeason::new())
                .await?;
            if json {
                output::json(&outcome)
            } else {
                output::series(&outcome);
                Ok(())
            }
        }
        Commands::Record { .. } | Commands::Tracked => Ok(()),
    }
}

/// Episodes of one season, or an empty list when the provider is unreachable.
async fn season_episodes(app: &App, series_id: SeriesId, season: u32) -> Vec<Episode> {
    let fetch = app.fetch_seasons(series_id, [season]).await;
    if fetch.is_degraded() {
        warn!(series_id, season, "Episode list unavailable, only unwatching is possible");
    }
    fetch.episodes.into_values().next().unwrap_or_default()
}

async fn show_progress(app: &App, series_id: SeriesId, json: bool) -> Result<()> {
    let series = app.fetch_series(series_id).await?;
    let fetch = app
        .fetch_seasons(series_id, series.seasons.iter().map(|s| s.season_number))
        .await;
    info!(
        series_id,
        seasons = series.seasons.len(),
        unavailable = fetch.unavailable.len(),
        "Loaded series metadata"
    );

    let record = app.record(series_id)?;
    let mut per_season = Vec::with_capacity(series.seasons.len());
    for season in &series.seasons {
        let detail = fetch.episodes.get(&season.season_number).map(Vec::as_slice);
        per_season.push((season, app.season_progress(season, detail)?));
    }
    let overall = app.series_progress(series_id, &series.seasons, &fetch.episodes)?;

    if json {
        let seasons: Vec<serde_json::Value> = per_season
            .iter()
            .map(|(season, p)| {
                serde_json::json!({
                    "season_number": season.season_number,
                    "name": season.name,
                    "progress": p,
                })
            })
            .collect();
        output::json(&serde_json::json!({
            "series": series,
            "state": record.state(),
            "seasons": seasons,
            "overall": overall,
        }))
    } else {
        output::progress(&series, &record, &per_season, &overall);
        Ok(())
    }
}
