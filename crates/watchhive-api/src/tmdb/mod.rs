pub mod client;
pub mod error;
pub mod types;

pub use client::{TmdbClient, TmdbOptions};
pub use error::TmdbError;
