//! Release gating: is a unit out yet, as of a given day?
//!
//! Comparison is at day granularity. A missing or unparseable date counts as
//! released so gaps in upstream data never block the user.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Episode, Releasable};

/// Returns `false` only for a date that parses and falls after `today`.
pub fn is_released(date: Option<&str>, today: NaiveDate) -> bool {
    match date.and_then(parse_release_date) {
        Some(day) => day <= today,
        None => true,
    }
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp, truncated to its UTC day.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Day-pinned release predicate.
///
/// [`ReleaseGate::system`] reads the clock on every call to [`today`](Self::today);
/// [`ReleaseGate::as_of`] fixes the day, which is what tests use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseGate {
    pinned: Option<NaiveDate>,
}

impl ReleaseGate {
    pub fn system() -> Self {
        Self { pinned: None }
    }

    pub fn as_of(today: NaiveDate) -> Self {
        Self {
            pinned: Some(today),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.pinned.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn is_released<R: Releasable + ?Sized>(&self, unit: &R) -> bool {
        is_released(unit.release_date(), self.today())
    }
}

/// Split episodes into `(released, unreleased)`, preserving order.
pub fn partition_released(episodes: &[Episode], today: NaiveDate) -> (Vec<&Episode>, Vec<&Episode>) {
    episodes
        .iter()
        .partition(|ep| is_released(ep.air_date.as_deref(), today))
}
