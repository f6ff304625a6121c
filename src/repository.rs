//! Typed catalog operations over a [`MovieStore`].
//!
//! Every document read back from the store goes through [`decode`]; a
//! document that does not fit the schema is an error, never a partially
//! filled entry.
use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{Clearable, ContentType, Movie, MovieUpdate, MyRating, NewMovie, ValidationError};
use crate::store::{MovieFilter, MovieStore, SortOrder, StoreError};

/// Result of a targeted write against one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// At least one stored field changed.
    Updated(Movie),
    /// The entry exists but the write changed nothing.
    Unchanged(Movie),
    NotFound,
    /// Rejected before reaching the store.
    Invalid(ValidationError),
}

/// Stored shape of an entry, minus `_id`.
#[derive(Debug, Serialize, Deserialize)]
struct MovieDocument {
    title: String,
    original_title: Option<String>,
    original_language: Option<String>,
    series_name: Option<String>,
    year: i32,
    director: String,
    genres: Vec<String>,
    rating: Option<f64>,
    my_rating: Option<i32>,
    watch_date: Option<bson::DateTime>,
    description: Option<String>,
    poster_url: Option<String>,
    content_type: ContentType,
}

fn to_bson_date(date: &DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(date.timestamp_millis())
}

impl From<&NewMovie> for MovieDocument {
    fn from(movie: &NewMovie) -> Self {
        Self {
            title: movie.title.clone(),
            original_title: movie.original_title.clone(),
            original_language: movie.original_language.clone(),
            series_name: movie.series_name.clone(),
            year: movie.year,
            director: movie.director.clone(),
            genres: movie.genres.clone(),
            rating: movie.rating,
            my_rating: movie.my_rating.map(MyRating::get),
            watch_date: movie.watch_date.as_ref().map(to_bson_date),
            description: movie.description.clone(),
            poster_url: movie.poster_url.clone(),
            content_type: movie.content_type,
        }
    }
}

fn schema_error(id: impl ToString, reason: impl ToString) -> StoreError {
    StoreError::Schema {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn encode(movie: &NewMovie) -> Result<Document, StoreError> {
    Ok(bson::to_document(&MovieDocument::from(movie))?)
}

fn decode(document: Document) -> Result<Movie, StoreError> {
    let id = document
        .get_object_id("_id")
        .map_err(|e| schema_error("<unknown>", e))?;
    let stored: MovieDocument =
        bson::from_document(document).map_err(|e| schema_error(id, e))?;

    let my_rating = stored
        .my_rating
        .map(|r| MyRating::new(i64::from(r)))
        .transpose()
        .map_err(|e| schema_error(id, e))?;
    let watch_date = stored
        .watch_date
        .map(|d| {
            DateTime::<Utc>::from_timestamp_millis(d.timestamp_millis())
                .ok_or_else(|| schema_error(id, "watch_date out of range"))
        })
        .transpose()?;

    Ok(Movie {
        id: id.to_hex(),
        details: NewMovie {
            title: stored.title,
            original_title: stored.original_title,
            original_language: stored.original_language,
            series_name: stored.series_name,
            year: stored.year,
            director: stored.director,
            genres: stored.genres,
            rating: stored.rating,
            my_rating,
            watch_date,
            description: stored.description,
            poster_url: stored.poster_url,
            content_type: stored.content_type,
        },
    })
}

fn put_clearable<T>(set: &mut Document, key: &str, value: &Clearable<T>, to_bson: impl Fn(&T) -> Bson) {
    match value {
        Clearable::Unchanged => {}
        Clearable::Clear => {
            set.insert(key, Bson::Null);
        }
        Clearable::Set(v) => {
            set.insert(key, to_bson(v));
        }
    }
}

/// `$set` document holding only the fields the update names. Cleared
/// optionals are written as null, the same way absent optionals are stored.
fn changes_document(update: &MovieUpdate) -> Document {
    let mut set = Document::new();
    if let Some(title) = &update.title {
        set.insert("title", title.as_str());
    }
    put_clearable(&mut set, "original_title", &update.original_title, |v| Bson::String(v.clone()));
    put_clearable(&mut set, "original_language", &update.original_language, |v| {
        Bson::String(v.clone())
    });
    put_clearable(&mut set, "series_name", &update.series_name, |v| Bson::String(v.clone()));
    if let Some(year) = update.year {
        set.insert("year", year);
    }
    if let Some(director) = &update.director {
        set.insert("director", director.as_str());
    }
    if let Some(genres) = &update.genres {
        set.insert("genres", genres.clone());
    }
    put_clearable(&mut set, "rating", &update.rating, |v| Bson::Double(*v));
    put_clearable(&mut set, "my_rating", &update.my_rating, |v| Bson::Int32(v.get()));
    put_clearable(&mut set, "watch_date", &update.watch_date, |v| {
        Bson::DateTime(to_bson_date(v))
    });
    put_clearable(&mut set, "description", &update.description, |v| Bson::String(v.clone()));
    put_clearable(&mut set, "poster_url", &update.poster_url, |v| Bson::String(v.clone()));
    if let Some(content_type) = update.content_type {
        set.insert("content_type", content_type.as_str());
    }
    set
}

/// Parses an external id; anything that is not a 24-char ObjectId hex string
/// is treated as an unknown entry.
pub fn parse_id(id: &str) -> Option<ObjectId> {
    match ObjectId::parse_str(id) {
        Ok(oid) => Some(oid),
        Err(_) => {
            warn!("Invalid entry id: {}", id);
            None
        }
    }
}

#[derive(Clone)]
pub struct MovieRepository {
    store: Arc<dyn MovieStore>,
}

impl MovieRepository {
    pub fn new(store: Arc<dyn MovieStore>) -> Self {
        Self { store }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    /// Inserts the entry as given. No duplicate detection is performed.
    pub async fn create(&self, data: NewMovie) -> Result<Movie, StoreError> {
        let id = self.store.insert(encode(&data)?).await?;
        info!("Created '{}' with id {}", data.title, id);
        Ok(Movie {
            id: id.to_hex(),
            details: data,
        })
    }

    pub async fn list(&self, content_type: Option<ContentType>) -> Result<Vec<Movie>, StoreError> {
        let filter = MovieFilter::by_type(content_type);
        let docs = self.store.find(&filter, SortOrder::RatingDesc).await?;
        debug!(?content_type, count = docs.len(), "Listed entries");
        docs.into_iter().map(decode).collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Movie>, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        self.find(&oid).await
    }

    /// Whether a document with this id is stored, whatever its shape. Used
    /// where a drifted document must still be reachable, e.g. to delete it.
    pub async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        Ok(self.store.find_by_id(&oid).await?.is_some())
    }

    async fn find(&self, oid: &ObjectId) -> Result<Option<Movie>, StoreError> {
        self.store.find_by_id(oid).await?.map(decode).transpose()
    }

    /// Writes only the fields `changes` names. An update naming nothing does
    /// not touch the store beyond a read.
    pub async fn update(&self, id: &str, changes: MovieUpdate) -> Result<WriteOutcome, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(WriteOutcome::NotFound);
        };
        if changes.is_empty() {
            return Ok(match self.find(&oid).await? {
                Some(movie) => WriteOutcome::Unchanged(movie),
                None => WriteOutcome::NotFound,
            });
        }
        self.write_fields(&oid, changes_document(&changes)).await
    }

    /// Sets `my_rating` alone. The range check is repeated here so callers
    /// holding a raw integer cannot bypass it.
    pub async fn update_rating(&self, id: &str, rating: i64) -> Result<WriteOutcome, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(WriteOutcome::NotFound);
        };
        let rating = match MyRating::new(rating) {
            Ok(r) => r,
            Err(e) => {
                warn!("Rejected rating {} for {}", rating, id);
                return Ok(WriteOutcome::Invalid(e));
            }
        };
        let mut set = Document::new();
        set.insert("my_rating", rating.get());
        self.write_fields(&oid, set).await
    }

    async fn write_fields(&self, oid: &ObjectId, set: Document) -> Result<WriteOutcome, StoreError> {
        let counts = self.store.set_fields(oid, set).await?;
        if counts.matched == 0 {
            return Ok(WriteOutcome::NotFound);
        }
        // Re-read even when nothing changed; the entry may be gone already.
        Ok(match self.find(oid).await? {
            Some(movie) if counts.modified > 0 => WriteOutcome::Updated(movie),
            Some(movie) => WriteOutcome::Unchanged(movie),
            None => WriteOutcome::NotFound,
        })
    }

    /// True only when exactly one document was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let deleted = self.store.delete(&oid).await?;
        Ok(deleted == 1)
    }

    pub async fn list_by_series(
        &self,
        series_name: &str,
        content_type: Option<ContentType>,
    ) -> Result<Vec<Movie>, StoreError> {
        let filter = MovieFilter {
            content_type,
            series_name: Some(series_name.to_string()),
        };
        let docs = self.store.find(&filter, SortOrder::YearAsc).await?;
        docs.into_iter().map(decode).collect()
    }
}
