// HTTP surface: a thin axum veneer over `Store`. Kept external to the core
// per its own design notes -- this module only translates requests into
// store calls and serializes the results, negotiating JSON/YAML the way
// the teacher's server negotiates its own response bodies.

use crate::http_types::ErrorResponse;
use crate::search::SearchQuery;
use crate::store::Store;
use crate::types::{IndexType, Value};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
}

/// Build the router over a shared `Store` handle. The caller owns binding
/// the listener (see `start_server`), mirroring the teacher's
/// create-then-serve split so tests can exercise the router without a
/// socket.
pub fn create_server(store: Arc<Store>) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/data/:key", get(get_data).post(set_data).delete(delete_data))
        .route("/search/text", post(search_text))
        .route("/search/vector", post(search_vector))
        .route("/search/combined", post(search_combined))
        .route("/index/create", post(create_index))
        .route("/index/remove", delete(remove_index))
        .route("/admin/sync", post(admin_sync))
        .route("/admin/stats", get(admin_stats))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn start_server(store: Arc<Store>, port: u16) -> anyhow::Result<()> {
    let app = create_server(store);
    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "http server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ---- content negotiation -------------------------------------------------

enum BodyFormat {
    Json,
    Yaml,
}

fn response_format(headers: &HeaderMap) -> BodyFormat {
    let accept = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept.contains("application/x-yaml") || accept.contains("text/yaml") {
        BodyFormat::Yaml
    } else {
        BodyFormat::Json
    }
}

fn request_format(headers: &HeaderMap) -> BodyFormat {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.contains("application/x-yaml") || content_type.contains("text/yaml") {
        BodyFormat::Yaml
    } else {
        BodyFormat::Json
    }
}

fn render<T: Serialize>(headers: &HeaderMap, status: StatusCode, body: &T) -> Response {
    match response_format(headers) {
        BodyFormat::Json => (status, axum::Json(body)).into_response(),
        BodyFormat::Yaml => match serde_yaml::to_string(body) {
            Ok(yaml) => (
                status,
                [(axum::http::header::CONTENT_TYPE, "application/x-yaml")],
                yaml,
            )
                .into_response(),
            Err(e) => AppError::internal(e.to_string()).into_response(),
        },
    }
}

fn parse_body<T: DeserializeOwned>(headers: &HeaderMap, bytes: &[u8]) -> Result<T, AppError> {
    match request_format(headers) {
        BodyFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}"))),
        BodyFormat::Yaml => serde_yaml::from_slice(bytes)
            .map_err(|e| AppError::bad_request(format!("invalid YAML body: {e}"))),
    }
}

/// Parse a minimal human-readable duration: an integer followed by one of
/// `s`/`m`/`h`/`d`. Kept hand-rolled since the grammar is this small and
/// fully specified, rather than pulling in a duration-parsing crate.
fn parse_ttl_header(value: &str) -> Result<Duration, AppError> {
    let value = value.trim();
    let (digits, unit) = value.split_at(
        value
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| AppError::bad_request(format!("invalid X-TTL value: {value}")))?,
    );
    let amount: u64 = digits
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid X-TTL value: {value}")))?;
    let secs = match unit {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 3600,
        "d" => amount * 86400,
        other => {
            return Err(AppError::bad_request(format!(
                "invalid X-TTL unit `{other}`, expected one of s/m/h/d"
            )))
        }
    };
    Ok(Duration::from_secs(secs))
}

// ---- error handling -------------------------------------------------------

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<crate::error::StoreError> for AppError {
    fn from(e: crate::error::StoreError) -> Self {
        use crate::error::StoreError::*;
        match &e {
            UnknownIndexType(_) | InvalidKey(_) | InvalidTtl(_) | DimensionMismatch { .. }
            | NotAMapping { .. } => AppError::bad_request(e.to_string()),
            IndexNotFound { .. } => AppError::not_found(e.to_string()),
            Io(_) | Codec(_) => AppError::internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "request failed");
        (
            self.status,
            axum::Json(ErrorResponse::new(
                self.status.canonical_reason().unwrap_or("error"),
                self.message,
            )),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct StatusOk {
    status: &'static str,
}

fn ok() -> StatusOk {
    StatusOk { status: "ok" }
}

// ---- /data/:key -----------------------------------------------------------

async fn get_data(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match state.store.get(&key).await? {
        Some(value) => Ok(render(&headers, StatusCode::OK, &value)),
        None => Err(AppError::not_found(format!("no value for key `{key}`"))),
    }
}

async fn set_data(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let value: Value = parse_body(&headers, &body)?;
    match headers.get("x-ttl").and_then(|v| v.to_str().ok()) {
        Some(ttl_str) => {
            let ttl = parse_ttl_header(ttl_str)?;
            state.store.set_with_ttl(&key, value, ttl).await?;
        }
        None => state.store.set(&key, value).await?,
    }
    Ok(render(&headers, StatusCode::OK, &ok()))
}

async fn delete_data(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state.store.delete(&key).await?;
    Ok(render(&headers, StatusCode::OK, &ok()))
}

// ---- search -----------------------------------------------------------

#[derive(Deserialize)]
struct TextSearchRequest {
    text: String,
    #[serde(default)]
    max_results: usize,
    #[serde(default)]
    min_score: f64,
}

#[derive(Deserialize)]
struct VectorSearchRequest {
    vector: Vec<f32>,
    #[serde(default)]
    max_results: usize,
    #[serde(default)]
    min_score: f64,
}

async fn search_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let req: TextSearchRequest = parse_body(&headers, &body)?;
    let query = SearchQuery {
        text: Some(req.text),
        max_results: req.max_results,
        min_score: req.min_score,
        ..Default::default()
    };
    let results = state.store.search(&query).await?;
    Ok(render(&headers, StatusCode::OK, &results))
}

async fn search_vector(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let req: VectorSearchRequest = parse_body(&headers, &body)?;
    let query = SearchQuery {
        vector: Some(req.vector),
        max_results: req.max_results,
        min_score: req.min_score,
        ..Default::default()
    };
    let results = state.store.search(&query).await?;
    Ok(render(&headers, StatusCode::OK, &results))
}

async fn search_combined(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let query: SearchQuery = parse_body(&headers, &body)?;
    let results = state.store.search(&query).await?;
    Ok(render(&headers, StatusCode::OK, &results))
}

// ---- index management -------------------------------------------------

#[derive(Deserialize)]
struct IndexRequest {
    field: String,
    #[serde(rename = "type")]
    index_type: String,
}

async fn create_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let req: IndexRequest = parse_body(&headers, &body)?;
    let index_type = IndexType::parse(&req.index_type)?;
    state.store.create_index(&req.field, index_type);
    Ok(render(&headers, StatusCode::OK, &ok()))
}

async fn remove_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let req: IndexRequest = parse_body(&headers, &body)?;
    let index_type = IndexType::parse(&req.index_type)?;
    state.store.remove_index(&req.field, index_type)?;
    Ok(render(&headers, StatusCode::OK, &ok()))
}

// ---- admin --------------------------------------------------------------

async fn admin_sync(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    state.store.sync().await?;
    Ok(render(&headers, StatusCode::OK, &ok()))
}

async fn admin_stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let snapshot = state.store.get_stats();
    render(&headers, StatusCode::OK, &snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::tempdir;
    use tower::ServiceExt;

    async fn test_store() -> Arc<Store> {
        let dir = tempdir().unwrap();
        Arc::new(
            Store::new(
                dir.path().join("db"),
                StoreOptions {
                    sync_interval: Duration::from_secs(3600),
                    ..Default::default()
                },
            )
            .await
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn set_then_get_round_trips_over_http() {
        let app = create_server(test_store().await);
        let set_req = Request::builder()
            .method("POST")
            .uri("/data/a")
            .header("content-type", "application/json")
            .body(Body::from(r#""hello""#))
            .unwrap();
        let resp = app.clone().oneshot(set_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let get_req = Request::builder().uri("/data/a").body(Body::empty()).unwrap();
        let resp = app.oneshot(get_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_missing_key_is_404() {
        let app = create_server(test_store().await);
        let req = Request::builder().uri("/data/missing").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn ttl_header_parses_units() {
        assert_eq!(parse_ttl_header("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_ttl_header("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_ttl_header("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_ttl_header("1d").unwrap(), Duration::from_secs(86400));
        assert!(parse_ttl_header("bogus").is_err());
    }

    #[tokio::test]
    async fn remove_unknown_index_is_404() {
        let app = create_server(test_store().await);
        let req = Request::builder()
            .method("DELETE")
            .uri("/index/remove")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"field":"missing","type":"text"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
