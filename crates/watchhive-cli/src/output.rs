use serde::Serialize;

use watchhive_core::aggregate::Progress;
use watchhive_core::models::{Episode, Season, Series, SeriesProgressRecord};
use watchhive_core::reconcile::{EpisodeOutcome, SeasonOutcome, SeriesOutcome};

pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn bar(p: &Progress) -> String {
    let marker = if p.degraded { " ~" } else { "" };
    format!("{:>3}/{:<3} {:>3}%{marker}", p.watched, p.total, p.percentage)
}

fn season_label(season: &Season) -> String {
    if season.is_specials() {
        "Specials".to_string()
    } else {
        format!("Season {}", season.season_number)
    }
}

fn episode_label(ep: &Episode) -> String {
    let date = ep.air_date.as_deref().unwrap_or("TBA");
    format!(
        "S{:02}E{:02} {} (airs {date})",
        ep.season_number, ep.episode_number, ep.name
    )
}

pub fn progress(
    series: &Series,
    record: &SeriesProgressRecord,
    seasons: &[(&Season, Progress)],
    overall: &Progress,
) {
    println!("{} ({}) [{}]", series.name, series.id, record.state());
    for (season, p) in seasons {
        let flag = if record.covers_season(season.season_number) {
            " completed"
        } else {
            ""
        };
        println!("  {:<10} {}{flag}", season_label(season), bar(p));
    }
    println!("  {:<10} {}", "Overall", bar(overall));
    if overall.degraded {
        println!("  ~ counted from nominal episode totals (metadata unavailable)");
    }
}

pub fn episode(outcome: &EpisodeOutcome) {
    match (&outcome.skipped, outcome.watched) {
        (Some(ep), _) => println!("Skipped, not released yet: {}", episode_label(ep)),
        (None, true) => println!("Marked watched"),
        (None, false) => println!("Marked unwatched"),
    }
}

pub fn season(outcome: &SeasonOutcome) {
    match (outcome.applied, outcome.completed) {
        (true, true) => println!("Season completed"),
        (true, false) => println!("Season marked incomplete"),
        (false, _) => println!("Season not completed: nothing has aired yet"),
    }
    for ep in &outcome.skipped_episodes {
        println!("  skipped {}", episode_label(ep));
    }
}

pub fn series(outcome: &SeriesOutcome) {
    if outcome.completed {
        println!("Series completed");
    } else {
        println!("Series marked incomplete");
    }
    for season in &outcome.skipped_seasons {
        println!("  skipped {} (not released)", season_label(season));
    }
    for ep in &outcome.skipped_episodes {
        println!("  skipped {}", episode_label(ep));
    }
    if outcome.degraded {
        println!("  some seasons were covered from nominal episode counts (metadata unavailable)");
    }
}

pub fn record(record: &SeriesProgressRecord) {
    println!("Series {} [{}]", record.series_id, record.state());
    if let Some(at) = record.last_watched_at {
        println!("  last change {}", at.to_rfc3339());
    }
    for (number, season) in &record.seasons {
        let episodes: Vec<String> = season
            .watched_episode_numbers
            .iter()
            .map(u32::to_string)
            .collect();
        println!(
            "  season {number}{}: {}",
            if season.completed { " (completed)" } else { "" },
            if episodes.is_empty() {
                "-".to_string()
            } else {
                episodes.join(", ")
            }
        );
    }
}
