use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use super::map::{format_search_results, movie_from_detail, movie_from_tv, MovieDetail, SearchPage, TvDetail};
use super::{ExternalMovie, SearchResults, TmdbApi};
use crate::config::Config;
use crate::models::ContentType;

/// Locale sent with every request.
pub const TMDB_LANGUAGE: &str = "ru-RU";

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    image_base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: &str, base_url: &str, image_base_url: &str) -> Result<Self> {
        let user_agent = format!("filmshelf/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            image_base_url: image_base_url.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.tmdb_api_key,
            &config.tmdb_base_url,
            &config.tmdb_image_base_url,
        )
    }

    async fn search(&self, kind: &str, query: &str) -> Result<SearchPage> {
        let path = format!("/search/{kind}");
        let url = format!(
            "{}{path}?api_key={}&query={}&page=1&language={TMDB_LANGUAGE}",
            self.base_url,
            self.api_key,
            urlencoding::encode(query)
        );
        let page: SearchPage = self.get_json(&path, &url).await?;
        info!(
            "TMDB {} search '{}' returned {} results",
            kind,
            query,
            page.total_results.unwrap_or(0)
        );
        Ok(page)
    }

    async fn detail<T: for<'de> Deserialize<'de>>(&self, kind: &str, id: i64) -> Result<T> {
        let path = format!("/{kind}/{id}");
        let url = format!(
            "{}{path}?api_key={}&language={TMDB_LANGUAGE}",
            self.base_url, self.api_key
        );
        self.get_json(&path, &url).await
    }

    // `path` is used in errors instead of the URL so the API key stays out
    // of logs.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("TMDB request {} failed: {}", path, e);
                anyhow!("TMDB request {} failed: {}", path, e)
            })?;
        let status = res.status();
        let text = res.text().await.context("reading TMDB body failed")?;
        if !status.is_success() {
            error!("TMDB {} -> {}", path, status);
            return Err(anyhow!("TMDB {} -> {}: {}", path, status, text));
        }
        let parsed: T = serde_json::from_str(&text)
            .with_context(|| format!("TMDB {} JSON parse failed", path))?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movies(&self, query: &str) -> Result<SearchResults> {
        let page = self.search("movie", query).await?;
        Ok(format_search_results(
            page,
            ContentType::Movie,
            &self.image_base_url,
        ))
    }

    async fn search_tv(&self, query: &str) -> Result<SearchResults> {
        let page = self.search("tv", query).await?;
        Ok(format_search_results(
            page,
            ContentType::Series,
            &self.image_base_url,
        ))
    }

    async fn fetch_movie(&self, id: i64) -> Result<ExternalMovie> {
        info!("Fetching TMDB movie {}", id);
        let detail: MovieDetail = self.detail("movie", id).await?;
        Ok(movie_from_detail(detail, &self.image_base_url))
    }

    async fn fetch_tv(&self, id: i64) -> Result<ExternalMovie> {
        info!("Fetching TMDB TV show {}", id);
        let detail: TvDetail = self.detail("tv", id).await?;
        Ok(movie_from_tv(detail, &self.image_base_url))
    }
}
