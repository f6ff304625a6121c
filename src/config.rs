use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use tracing::info;

const REQUIRED: [&str; 4] = [
    "MONGODB_URL",
    "TMDB_API_KEY",
    "TMDB_BASE_URL",
    "TMDB_IMAGE_BASE_URL",
];
const DEFAULT_DATABASE: &str = "filmix";
const DEFAULT_COLLECTION: &str = "movie";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Clone)]
pub struct Config {
    pub mongodb_url: String,
    pub mongodb_database: String,
    pub mongodb_collection: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub bind_addr: SocketAddr,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mongodb_database", &self.mongodb_database)
            .field("mongodb_collection", &self.mongodb_collection)
            .field("tmdb_base_url", &self.tmdb_base_url)
            .field("tmdb_image_base_url", &self.tmdb_image_base_url)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for key in REQUIRED {
            if get(key).is_none() {
                anyhow::bail!("Missing required environment variable: {}", key);
            }
        }

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let config = Self {
            mongodb_url: get("MONGODB_URL").unwrap_or_default(),
            mongodb_database: get("MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            mongodb_collection: get("MONGODB_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            tmdb_api_key: get("TMDB_API_KEY").unwrap_or_default(),
            tmdb_base_url: get("TMDB_BASE_URL").unwrap_or_default(),
            tmdb_image_base_url: get("TMDB_IMAGE_BASE_URL").unwrap_or_default(),
            bind_addr,
        };
        info!("All required environment variables are set");
        Ok(config)
    }
}
