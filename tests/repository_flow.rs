use filmshelf::models::{Clearable, ContentType, MovieUpdate, MyRating, NewMovie, ValidationError};
use filmshelf::repository::{MovieRepository, WriteOutcome};
use filmshelf::store::{MemoryStore, MovieFilter, MovieStore, SortOrder, StoreError, UpdateCounts};
use mongodb::bson::{doc, oid::ObjectId, Document};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a [`MemoryStore`] and counts every call that reaches it.
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MovieStore for CountingStore {
    async fn insert(&self, document: Document) -> Result<ObjectId, StoreError> {
        self.hit();
        self.inner.insert(document).await
    }
    async fn find(&self, filter: &MovieFilter, sort: SortOrder) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.find(filter, sort).await
    }
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.find_by_id(id).await
    }
    async fn set_fields(&self, id: &ObjectId, fields: Document) -> Result<UpdateCounts, StoreError> {
        self.hit();
        self.inner.set_fields(id, fields).await
    }
    async fn delete(&self, id: &ObjectId) -> Result<u64, StoreError> {
        self.hit();
        self.inner.delete(id).await
    }
    async fn ping(&self) -> Result<(), StoreError> {
        self.hit();
        self.inner.ping().await
    }
    async fn shutdown(&self) {}
}

fn entry(title: &str, year: i32, content_type: ContentType) -> NewMovie {
    NewMovie {
        title: title.to_string(),
        original_title: None,
        original_language: None,
        series_name: None,
        year,
        director: "Félix Dumont-Turgeon".to_string(),
        genres: vec!["Action".to_string()],
        rating: None,
        my_rating: None,
        watch_date: None,
        description: None,
        poster_url: None,
        content_type,
    }
}

fn setup() -> (MovieRepository, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new());
    (MovieRepository::new(store.clone()), store)
}

#[tokio::test]
async fn create_then_get_returns_the_same_entry() {
    let (repo, _) = setup();
    let created = repo
        .create(entry("District 13", 2019, ContentType::Movie))
        .await
        .unwrap();
    let fetched = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, Some(created));
}

#[tokio::test]
async fn malformed_ids_never_reach_the_store() {
    let (repo, store) = setup();
    let update = MovieUpdate {
        year: Some(2000),
        ..MovieUpdate::default()
    };

    for id in ["", "abc", "689751511bb87333c3fe855", "zz9751511bb87333c3fe855a"] {
        assert_eq!(repo.get_by_id(id).await.unwrap(), None);
        assert_eq!(repo.update(id, update.clone()).await.unwrap(), WriteOutcome::NotFound);
        assert_eq!(repo.update_rating(id, 50).await.unwrap(), WriteOutcome::NotFound);
        assert!(!repo.delete(id).await.unwrap());
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn list_is_partitioned_by_content_type() {
    let (repo, _) = setup();
    repo.create(entry("District 13", 2019, ContentType::Movie)).await.unwrap();
    repo.create(entry("Fargo", 2014, ContentType::Series)).await.unwrap();
    repo.create(entry("Heat", 1995, ContentType::Movie)).await.unwrap();

    let movies = repo.list(Some(ContentType::Movie)).await.unwrap();
    let series = repo.list(Some(ContentType::Series)).await.unwrap();
    let everything = repo.list(None).await.unwrap();
    assert_eq!(movies.len(), 2);
    assert_eq!(series.len(), 1);
    assert_eq!(everything.len(), 3);
    assert!(movies.iter().all(|m| m.details.content_type == ContentType::Movie));
    assert_eq!(series[0].details.title, "Fargo");
}

#[tokio::test]
async fn rating_writes_respect_bounds() {
    let (repo, _) = setup();
    let created = repo
        .create(entry("District 13", 2019, ContentType::Movie))
        .await
        .unwrap();

    for bad in [-5, 0, 101, 150] {
        assert_eq!(
            repo.update_rating(&created.id, bad).await.unwrap(),
            WriteOutcome::Invalid(ValidationError::RatingOutOfRange(bad))
        );
    }
    let stored = repo.get_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.details.my_rating, None);

    for good in [1, 55, 100] {
        match repo.update_rating(&created.id, good).await.unwrap() {
            WriteOutcome::Updated(movie) => {
                assert_eq!(movie.details.my_rating.map(MyRating::get), Some(good as i32))
            }
            other => panic!("rating {good} gave {other:?}"),
        }
    }
}

#[tokio::test]
async fn rewriting_the_same_value_is_unchanged_not_missing() {
    let (repo, _) = setup();
    let created = repo
        .create(entry("District 13", 2019, ContentType::Movie))
        .await
        .unwrap();

    assert!(matches!(
        repo.update_rating(&created.id, 80).await.unwrap(),
        WriteOutcome::Updated(_)
    ));
    assert!(matches!(
        repo.update_rating(&created.id, 80).await.unwrap(),
        WriteOutcome::Unchanged(_)
    ));

    let absent = ObjectId::new().to_hex();
    assert_eq!(repo.update_rating(&absent, 80).await.unwrap(), WriteOutcome::NotFound);
}

#[tokio::test]
async fn delete_removes_exactly_once() {
    let (repo, _) = setup();
    let created = repo
        .create(entry("District 13", 2019, ContentType::Movie))
        .await
        .unwrap();

    assert!(repo.delete(&created.id).await.unwrap());
    assert!(!repo.delete(&created.id).await.unwrap());
    assert_eq!(repo.get_by_id(&created.id).await.unwrap(), None);
}

#[tokio::test]
async fn empty_update_leaves_stored_document_untouched() {
    let store = Arc::new(MemoryStore::new());
    let repo = MovieRepository::new(store.clone());
    let created = repo
        .create(entry("District 13", 2019, ContentType::Movie))
        .await
        .unwrap();
    let oid = ObjectId::parse_str(&created.id).unwrap();
    let before = store.raw(&oid).await.unwrap();

    let outcome = repo.update(&created.id, MovieUpdate::default()).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Unchanged(created));
    assert_eq!(store.raw(&oid).await.unwrap(), before);
}

#[tokio::test]
async fn update_sets_and_clears_only_named_fields() {
    let store = Arc::new(MemoryStore::new());
    let repo = MovieRepository::new(store.clone());
    let mut data = entry("District 13", 2019, ContentType::Movie);
    data.description = Some("Banlieue".to_string());
    data.poster_url = Some("https://image.tmdb.org/t/p/w500/d13.jpg".to_string());
    let created = repo.create(data).await.unwrap();

    let update = MovieUpdate {
        series_name: Clearable::Set("District".to_string()),
        description: Clearable::Clear,
        ..MovieUpdate::default()
    };
    let WriteOutcome::Updated(movie) = repo.update(&created.id, update).await.unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(movie.details.series_name.as_deref(), Some("District"));
    assert_eq!(movie.details.description, None);
    assert_eq!(movie.details.poster_url, created.details.poster_url);
    assert_eq!(movie.details.year, 2019);

    let raw = store
        .raw(&ObjectId::parse_str(&created.id).unwrap())
        .await
        .unwrap();
    assert!(raw.is_null("description"));
}

#[tokio::test]
async fn collection_parts_are_ordered_by_year() {
    let (repo, _) = setup();
    for (title, year) in [("Shrek 2", 2004), ("Shrek", 2001), ("Shrek the Third", 2007)] {
        let mut part = entry(title, year, ContentType::Movie);
        part.series_name = Some("Shrek".to_string());
        repo.create(part).await.unwrap();
    }
    repo.create(entry("Heat", 1995, ContentType::Movie)).await.unwrap();

    let parts = repo.list_by_series("Shrek", None).await.unwrap();
    let years: Vec<i32> = parts.iter().map(|m| m.details.year).collect();
    assert_eq!(years, vec![2001, 2004, 2007]);
    assert!(repo
        .list_by_series("Shrek", Some(ContentType::Series))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn drifted_documents_are_reported_not_patched_over() {
    let store = Arc::new(MemoryStore::new());
    let repo = MovieRepository::new(store.clone());
    let id = store
        .insert_raw(doc! { "title": "Legacy", "director": "", "genres": [], "content_type": "MOVIE" })
        .await;

    let err = repo.get_by_id(&id.to_hex()).await.unwrap_err();
    assert!(matches!(err, StoreError::Schema { .. }));
    assert!(repo.list(Some(ContentType::Movie)).await.is_err());
}

#[tokio::test]
async fn existence_check_sees_documents_that_fail_to_decode() {
    let store = Arc::new(MemoryStore::new());
    let repo = MovieRepository::new(store.clone());
    let id = store
        .insert_raw(doc! { "title": "Legacy", "director": "", "genres": [], "content_type": "MOVIE" })
        .await
        .to_hex();

    assert!(repo.get_by_id(&id).await.is_err());
    assert!(repo.exists(&id).await.unwrap());
    assert!(repo.delete(&id).await.unwrap());
    assert!(!repo.exists(&id).await.unwrap());
    assert!(!repo.exists("not-an-id").await.unwrap());
}
