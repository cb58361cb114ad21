//! Series watch-progress tracking: release gating, progress storage,
//! aggregation and release-aware bulk completion.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod reconcile;
pub mod release;
pub mod storage;
pub mod store;

pub use error::{MetadataUnavailable, WatchHiveError};
