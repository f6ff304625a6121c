//! Document storage behind the catalog repository.
//!
//! Backends only move BSON documents around; typed encoding and decoding of
//! entries lives in [`crate::repository`].
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Document};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::ContentType;

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// `MONGODB_URL` value selecting the in-process backend.
pub const MEMORY_URL: &str = "memory://";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(#[from] mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
    #[error("stored document {id} does not match the catalog schema: {reason}")]
    Schema { id: String, reason: String },
    #[error("store returned a non-ObjectId key")]
    UnexpectedKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    pub content_type: Option<ContentType>,
    pub series_name: Option<String>,
}

impl MovieFilter {
    pub fn by_type(content_type: Option<ContentType>) -> Self {
        Self {
            content_type,
            series_name: None,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(content_type) = self.content_type {
            filter.insert("content_type", content_type.as_str());
        }
        if let Some(series_name) = &self.series_name {
            filter.insert("series_name", series_name.as_str());
        }
        filter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Highest `my_rating` first, unrated entries last, ties in insertion order.
    RatingDesc,
    /// Oldest `year` first, ties in insertion order.
    YearAsc,
}

impl SortOrder {
    pub fn to_document(self) -> Document {
        match self {
            SortOrder::RatingDesc => doc! { "my_rating": -1, "_id": 1 },
            SortOrder::YearAsc => doc! { "year": 1, "_id": 1 },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    pub matched: u64,
    pub modified: u64,
}

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Inserts a document without `_id` and returns the key the store assigned.
    async fn insert(&self, document: Document) -> Result<ObjectId, StoreError>;
    async fn find(&self, filter: &MovieFilter, sort: SortOrder)
        -> Result<Vec<Document>, StoreError>;
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, StoreError>;
    /// Field-level `$set` on a single document.
    async fn set_fields(&self, id: &ObjectId, fields: Document)
        -> Result<UpdateCounts, StoreError>;
    async fn delete(&self, id: &ObjectId) -> Result<u64, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
    async fn shutdown(&self);
}

/// Opens the backend named by `config.mongodb_url` and verifies it answers.
pub async fn connect(config: &Config) -> Result<Arc<dyn MovieStore>, StoreError> {
    if config.mongodb_url == MEMORY_URL {
        info!("Using in-memory document store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = MongoStore::connect(
        &config.mongodb_url,
        &config.mongodb_database,
        &config.mongodb_collection,
    )
    .await?;
    Ok(Arc::new(store))
}
