//! Metadata provider clients implementing
//! [`MetadataGateway`](watchhive_core::gateway::MetadataGateway).

pub mod tmdb;
