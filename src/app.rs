use crate::catalog::{Catalog, CatalogError};
use crate::config::Config;
use crate::models::{ContentType, Movie, MovieUpdate, NewMovie};
use crate::repository::MovieRepository;
use crate::store::MovieStore;
use crate::tmdb::{SearchResults, TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, FromRequestParts, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

/// JSON error body returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CatalogError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CatalogError::Store(e) => {
                error!("Store failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

impl ApiError {
    fn rejected(status: StatusCode, message: String) -> Self {
        warn!("Rejected request ({}): {}", status, message);
        Self { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

type ApiResult<T> = Result<T, ApiError>;

// Extractor wrappers so malformed input gets the same JSON error body as
// every other failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct JsonBody<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
struct PathParam<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
struct QueryParams<T>(T);

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
}

#[derive(Debug, Deserialize)]
struct CollectionQuery {
    content_type: Option<ContentType>,
}

#[derive(Debug, Deserialize)]
struct RatingRequest {
    my_rating: i64,
}

/// Serves until Ctrl+C/SIGTERM. The store is owned by the caller, which
/// shuts it down once this returns.
pub async fn run_server(config: &Config, store: Arc<dyn MovieStore>) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(config)?);
    let catalog = Catalog::new(MovieRepository::new(store), tmdb);
    let state = AppState {
        catalog: Arc::new(catalog),
    };

    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/movies", get(list_movies).post(create_movie))
        .route("/api/movies/search/tmdb", get(search_movies))
        .route("/api/movies/add-from-tmdb/:tmdb_id", post(add_movie_from_tmdb))
        .route(
            "/api/movies/:id",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
        .route("/api/movies/:id/rating", put(rate_entry))
        .route("/api/series", get(list_series).post(create_series))
        .route("/api/series/search/tmdb", get(search_series))
        .route("/api/series/add-from-tmdb/:tmdb_id", post(add_series_from_tmdb))
        .route(
            "/api/series/:id",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
        .route("/api/series/:id/rating", put(rate_entry))
        .route("/api/collections/:series_name", get(list_collection))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "filmshelf API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.catalog.health().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy" })),
            )
        }
    }
}

async fn list_movies(State(state): State<AppState>) -> ApiResult<Json<Vec<Movie>>> {
    Ok(Json(state.catalog.list_movies().await?))
}

async fn list_series(State(state): State<AppState>) -> ApiResult<Json<Vec<Movie>>> {
    Ok(Json(state.catalog.list_series().await?))
}

async fn create_movie(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<NewMovie>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    create_entry(&state, ContentType::Movie, data).await
}

async fn create_series(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<NewMovie>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    create_entry(&state, ContentType::Series, data).await
}

// The route decides the content type; a payload value is overridden.
async fn create_entry(
    state: &AppState,
    content_type: ContentType,
    mut data: NewMovie,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    data.content_type = content_type;
    info!("Creating {} '{}'", content_type, data.title);
    let created = state.catalog.create(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_entry(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> ApiResult<Json<Movie>> {
    debug!(id = %id, "Fetching entry");
    Ok(Json(state.catalog.get_by_id(&id).await?))
}

async fn update_entry(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(changes): JsonBody<MovieUpdate>,
) -> ApiResult<Json<Movie>> {
    Ok(Json(state.catalog.update(&id, changes).await?))
}

async fn delete_entry(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> ApiResult<StatusCode> {
    state.catalog.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rate_entry(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(body): JsonBody<RatingRequest>,
) -> ApiResult<Json<Movie>> {
    Ok(Json(
        state.catalog.update_rating(&id, body.my_rating).await?,
    ))
}

async fn search_movies(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
    let found = state
        .catalog
        .search_external(ContentType::Movie, &params.query)
        .await?;
    Ok(Json(found))
}

async fn search_series(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
    let found = state
        .catalog
        .search_external(ContentType::Series, &params.query)
        .await?;
    Ok(Json(found))
}

async fn add_movie_from_tmdb(
    State(state): State<AppState>,
    PathParam(tmdb_id): PathParam<i64>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let created = state
        .catalog
        .add_from_external(ContentType::Movie, tmdb_id)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn add_series_from_tmdb(
    State(state): State<AppState>,
    PathParam(tmdb_id): PathParam<i64>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let created = state
        .catalog
        .add_from_external(ContentType::Series, tmdb_id)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_collection(
    State(state): State<AppState>,
    PathParam(series_name): PathParam<String>,
    QueryParams(params): QueryParams<CollectionQuery>,
) -> ApiResult<Json<Vec<Movie>>> {
    let entries = state
        .catalog
        .list_by_series(&series_name, params.content_type)
        .await?;
    Ok(Json(entries))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
