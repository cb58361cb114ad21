use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use watchhive_core::config::MetadataConfig;
use watchhive_core::gateway::MetadataGateway;
use watchhive_core::models::{Episode, Series, SeriesId};
use watchhive_core::MetadataUnavailable;

use super::error::TmdbError;
use super::types::{TmdbSeason, TmdbTvShow};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Connection settings for [`TmdbClient`].
#[derive(Debug, Clone)]
pub struct TmdbOptions {
    pub api_key: String,
    pub language: String,
    pub base_url: String,
    pub timeout: Duration,
    pub requests_per_second: u32,
}

impl TmdbOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: "en-US".into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(10),
            requests_per_second: 30,
        }
    }

    pub fn from_config(api_key: impl Into<String>, config: &MetadataConfig) -> Self {
        Self {
            api_key: api_key.into(),
            language: config.language.clone(),
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
            requests_per_second: config.requests_per_second,
        }
    }
}

/// TMDB v3 REST client, rate limited on the client side.
pub struct TmdbClient {
    http: Client,
    api_key: String,
    language: String,
    base_url: String,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl TmdbClient {
    pub fn new(options: TmdbOptions) -> Result<Self, TmdbError> {
        let http = Client::builder().timeout(options.timeout).build()?;
        let per_second = NonZeroU32::new(options.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            http,
            api_key: options.api_key,
            language: options.language,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TmdbError> {
        self.limiter.until_ready().await;

        let url = format!("{}{path}", self.base_url);
        debug!(%url, "TMDB request");
        let resp = self
            .http
            .get(&url)
            .query(&[("api_key", &self.api_key), ("language", &self.language)])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(TmdbError::Api { status, message });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| TmdbError::Parse(e.to_string()))
    }

    /// `GET /tv/{id}`: series details with season summaries.
    pub async fn get_tv(&self, series_id: SeriesId) -> Result<TmdbTvShow, TmdbError> {
        self.get(&format!("/tv/{series_id}")).await
    }

    /// `GET /tv/{id}/season/{n}`: a season with its episode list.
    pub async fn get_season(
        &self,
        series_id: SeriesId,
        season_number: u32,
    ) -> Result<TmdbSeason, TmdbError> {
        self.get(&format!("/tv/{series_id}/season/{season_number}"))
            .await
    }
}

impl MetadataGateway for TmdbClient {
    async fn series(&self, series_id: SeriesId) -> Result<Series, MetadataUnavailable> {
        self.get_tv(series_id)
            .await
            .map(TmdbTvShow::into_series)
            .map_err(|e| MetadataUnavailable::series(series_id, e.to_string()))
    }

    async fn season_episodes(
        &self,
        series_id: SeriesId,
        season_number: u32,
    ) -> Result<Vec<Episode>, MetadataUnavailable> {
        self.get_season(series_id, season_number)
            .await
            .map(|season| season.into_episodes(series_id))
            .map_err(|e| MetadataUnavailable::season(series_id, season_number, e.to_string()))
    }
}
