use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
}

impl ContentType {
    /// Value stored in the `content_type` field of every document.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "MOVIE",
            ContentType::Series => "SERIES",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("my_rating must be between 1 and 100, got {0}")]
    RatingOutOfRange(i64),
    #[error("field '{0}' is required")]
    MissingField(&'static str),
}

/// Personal score, always within `MIN_RATING..=MAX_RATING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MyRating(i32);

impl MyRating {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value as i32))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl<'de> Deserialize<'de> for MyRating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        MyRating::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Patch value for an optional field.
///
/// In JSON an absent key is `Unchanged`, `null` is `Clear` and any other value
/// is `Set`. Fields using it must carry `#[serde(default)]` so that a missing
/// key falls back to `Unchanged`.
#[derive(Debug, Clone, PartialEq)]
pub enum Clearable<T> {
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Default for Clearable<T> {
    fn default() -> Self {
        Clearable::Unchanged
    }
}

impl<T> Clearable<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Clearable::Unchanged)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Clearable<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Clearable::Set(v),
            None => Clearable::Clear,
        })
    }
}

/// Payload for creating a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    /// Free-text label grouping multi-part works, e.g. "Shrek".
    #[serde(default)]
    pub series_name: Option<String>,
    pub year: i32,
    pub director: String,
    pub genres: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub my_rating: Option<MyRating>,
    #[serde(default)]
    pub watch_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// ObjectId hex string, under the same `_id` key the document uses.
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub details: NewMovie,
}

/// Partial update. Required fields cannot be cleared, so for them both an
/// absent key and `null` leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MovieUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Clearable<String>,
    #[serde(default)]
    pub original_language: Clearable<String>,
    #[serde(default)]
    pub series_name: Clearable<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Clearable<f64>,
    #[serde(default)]
    pub my_rating: Clearable<MyRating>,
    #[serde(default)]
    pub watch_date: Clearable<DateTime<Utc>>,
    #[serde(default)]
    pub description: Clearable<String>,
    #[serde(default)]
    pub poster_url: Clearable<String>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

impl MovieUpdate {
    /// True when the payload names no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.original_title.is_unchanged()
            && self.original_language.is_unchanged()
            && self.series_name.is_unchanged()
            && self.year.is_none()
            && self.director.is_none()
            && self.genres.is_none()
            && self.rating.is_unchanged()
            && self.my_rating.is_unchanged()
            && self.watch_date.is_unchanged()
            && self.description.is_unchanged()
            && self.poster_url.is_unchanged()
            && self.content_type.is_none()
    }
}
