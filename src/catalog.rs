//! Operations exposed to the HTTP layer.
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{ContentType, Movie, MovieUpdate, NewMovie, ValidationError};
use crate::repository::{MovieRepository, WriteOutcome};
use crate::store::StoreError;
use crate::tmdb::{SearchResults, TmdbApi};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("entry {0} not found")]
    NotFound(String),
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
    #[error("metadata provider error: {0:#}")]
    Upstream(anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Catalog {
    repository: MovieRepository,
    tmdb: Arc<dyn TmdbApi>,
}

impl Catalog {
    pub fn new(repository: MovieRepository, tmdb: Arc<dyn TmdbApi>) -> Self {
        Self { repository, tmdb }
    }

    pub async fn health(&self) -> Result<(), CatalogError> {
        Ok(self.repository.ping().await?)
    }

    pub async fn list_movies(&self) -> Result<Vec<Movie>, CatalogError> {
        self.list(ContentType::Movie).await
    }

    pub async fn list_series(&self) -> Result<Vec<Movie>, CatalogError> {
        self.list(ContentType::Series).await
    }

    async fn list(&self, content_type: ContentType) -> Result<Vec<Movie>, CatalogError> {
        let entries = self.repository.list(Some(content_type)).await?;
        info!("Fetched {} {} entries", entries.len(), content_type);
        Ok(entries)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Movie, CatalogError> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn ensure_exists(&self, id: &str) -> Result<(), CatalogError> {
        if self.repository.exists(id).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub async fn create(&self, data: NewMovie) -> Result<Movie, CatalogError> {
        Ok(self.repository.create(data).await?)
    }

    pub async fn update(&self, id: &str, changes: MovieUpdate) -> Result<Movie, CatalogError> {
        let outcome = self.repository.update(id, changes).await?;
        settle(id, outcome)
    }

    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        // Existence only, no decode: an entry that no longer fits the schema
        // must stay deletable.
        self.ensure_exists(id).await?;
        if self.repository.delete(id).await? {
            info!("Deleted entry {}", id);
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub async fn update_rating(&self, id: &str, rating: i64) -> Result<Movie, CatalogError> {
        self.ensure_exists(id).await?;
        let outcome = self.repository.update_rating(id, rating).await?;
        settle(id, outcome)
    }

    pub async fn list_by_series(
        &self,
        series_name: &str,
        content_type: Option<ContentType>,
    ) -> Result<Vec<Movie>, CatalogError> {
        Ok(self
            .repository
            .list_by_series(series_name, content_type)
            .await?)
    }

    pub async fn search_external(
        &self,
        content_type: ContentType,
        query: &str,
    ) -> Result<SearchResults, CatalogError> {
        let found = match content_type {
            ContentType::Movie => self.tmdb.search_movies(query).await,
            ContentType::Series => self.tmdb.search_tv(query).await,
        };
        found.map_err(upstream)
    }

    /// Fetches a TMDB record and stores it. Importing the same record twice
    /// creates two entries.
    pub async fn add_from_external(
        &self,
        content_type: ContentType,
        tmdb_id: i64,
    ) -> Result<Movie, CatalogError> {
        let external = match content_type {
            ContentType::Movie => self.tmdb.fetch_movie(tmdb_id).await,
            ContentType::Series => self.tmdb.fetch_tv(tmdb_id).await,
        }
        .map_err(upstream)?;

        let data = NewMovie::try_from(external).map_err(|e| {
            warn!("TMDB {} {} cannot be imported: {}", content_type, tmdb_id, e);
            e
        })?;
        let movie = self.repository.create(data).await?;
        info!(
            "Imported TMDB {} {} as '{}' ({})",
            content_type, tmdb_id, movie.details.title, movie.id
        );
        Ok(movie)
    }
}

fn not_found(id: &str) -> CatalogError {
    warn!("Entry {} not found", id);
    CatalogError::NotFound(id.to_string())
}

fn upstream(err: anyhow::Error) -> CatalogError {
    error!("TMDB call failed: {:#}", err);
    CatalogError::Upstream(err)
}

fn settle(id: &str, outcome: WriteOutcome) -> Result<Movie, CatalogError> {
    match outcome {
        WriteOutcome::Updated(movie) => {
            info!("Updated entry {}", id);
            Ok(movie)
        }
        WriteOutcome::Unchanged(movie) => Ok(movie),
        WriteOutcome::NotFound => Err(not_found(id)),
        WriteOutcome::Invalid(e) => Err(CatalogError::InvalidInput(e)),
    }
}
