use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{ContentType, NewMovie, ValidationError};

mod client;
mod map;

pub use client::TmdbClient;

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_movies(&self, query: &str) -> Result<SearchResults>;
    async fn search_tv(&self, query: &str) -> Result<SearchResults>;
    async fn fetch_movie(&self, id: i64) -> Result<ExternalMovie>;
    async fn fetch_tv(&self, id: i64) -> Result<ExternalMovie>;
}

/// Catalog data adapted from a TMDB detail record, before it is checked
/// against the create rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub year: Option<i32>,
    pub director: String,
    pub genres: Vec<String>,
    pub rating: f64,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub content_type: ContentType,
}

impl TryFrom<ExternalMovie> for NewMovie {
    type Error = ValidationError;

    fn try_from(external: ExternalMovie) -> Result<Self, Self::Error> {
        let year = external.year.ok_or(ValidationError::MissingField("year"))?;
        Ok(NewMovie {
            title: external.title,
            original_title: external.original_title,
            original_language: external.original_language,
            series_name: None,
            year,
            director: external.director,
            genres: external.genres,
            rating: Some(external.rating),
            my_rating: None,
            watch_date: None,
            description: external.description,
            poster_url: external.poster_url,
            content_type: external.content_type,
        })
    }
}

/// Lightweight search hit for pickers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPreview {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub release_date: String,
    pub poster_path: Option<String>,
    pub overview: String,
    pub vote_average: f64,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchPreview>,
    pub total_results: u64,
    pub page: u32,
    pub total_pages: u32,
}
