//! Read-only metadata source consumed by the reconciler.

use std::future::Future;

use crate::error::MetadataUnavailable;
use crate::models::{Episode, Series, SeriesId};

/// Where series and season detail comes from (TMDB in production).
///
/// Implementations should bound their own request time; the reconciler also
/// wraps each call in a timeout and treats expiry as [`MetadataUnavailable`].
pub trait MetadataGateway: Send + Sync {
    /// Series summary including its season list.
    fn series(
        &self,
        series_id: SeriesId,
    ) -> impl Future<Output = Result<Series, MetadataUnavailable>> + Send;

    /// Every episode the provider knows for one season.
    fn season_episodes(
        &self,
        series_id: SeriesId,
        season_number: u32,
    ) -> impl Future<Output = Result<Vec<Episode>, MetadataUnavailable>> + Send;
}
