use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use std::cmp::Ordering;
use tokio::sync::Mutex;

use super::{MovieFilter, MovieStore, SortOrder, StoreError, UpdateCounts};

/// In-process store mirroring the filter, sort and `$set` semantics the
/// catalog relies on from MongoDB.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<(ObjectId, Document)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored document, for inspecting what a write actually persisted.
    pub async fn raw(&self, id: &ObjectId) -> Option<Document> {
        let guard = self.documents.lock().await;
        guard
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, doc)| doc.clone())
    }

    /// Stores a document verbatim, bypassing repository encoding.
    pub async fn insert_raw(&self, document: Document) -> ObjectId {
        let id = ObjectId::new();
        let mut stored = Document::new();
        stored.insert("_id", id);
        for (key, value) in document {
            stored.insert(key, value);
        }
        self.documents.lock().await.push((id, stored));
        id
    }
}

fn matches(doc: &Document, filter: &MovieFilter) -> bool {
    let type_ok = filter
        .content_type
        .map_or(true, |ct| doc.get_str("content_type").ok() == Some(ct.as_str()));
    let series_ok = filter
        .series_name
        .as_deref()
        .map_or(true, |name| doc.get_str("series_name").ok() == Some(name));
    type_ok && series_ok
}

fn int_field(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key) {
        Some(Bson::Int32(v)) => Some(i64::from(*v)),
        Some(Bson::Int64(v)) => Some(*v),
        _ => None,
    }
}

// `Option` orders `None` first, which matches MongoDB placing null/missing
// below every number.
fn compare(a: &Document, b: &Document, sort: SortOrder) -> Ordering {
    match sort {
        SortOrder::RatingDesc => int_field(b, "my_rating").cmp(&int_field(a, "my_rating")),
        SortOrder::YearAsc => int_field(a, "year").cmp(&int_field(b, "year")),
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn insert(&self, document: Document) -> Result<ObjectId, StoreError> {
        Ok(self.insert_raw(document).await)
    }

    async fn find(
        &self,
        filter: &MovieFilter,
        sort: SortOrder,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.documents.lock().await;
        let mut found: Vec<Document> = guard
            .iter()
            .filter(|(_, doc)| matches(doc, filter))
            .map(|(_, doc)| doc.clone())
            .collect();
        // Stable sort keeps insertion order, i.e. ascending `_id`, for ties.
        found.sort_by(|a, b| compare(a, b, sort));
        Ok(found)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        Ok(self.raw(id).await)
    }

    async fn set_fields(
        &self,
        id: &ObjectId,
        fields: Document,
    ) -> Result<UpdateCounts, StoreError> {
        let mut guard = self.documents.lock().await;
        let Some((_, doc)) = guard.iter_mut().find(|(key, _)| key == id) else {
            return Ok(UpdateCounts::default());
        };
        let mut modified = false;
        for (key, value) in fields {
            if doc.get(&key) != Some(&value) {
                doc.insert(key, value);
                modified = true;
            }
        }
        Ok(UpdateCounts {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn delete(&self, id: &ObjectId) -> Result<u64, StoreError> {
        let mut guard = self.documents.lock().await;
        let before = guard.len();
        guard.retain(|(key, _)| key != id);
        Ok((before - guard.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn shutdown(&self) {}
}
