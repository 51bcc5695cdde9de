//! HTTP surface for Linkshelf.
//!
//! This module exposes an Axum router over the library service:
//!
//! - `GET /health` – Liveness probe.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools.
//! - `GET /items` – The caller's items, newest first, filtered by `q` and `status`.
//! - `POST /items` – Import one URL and return the item in its final status.
//! - `GET /items/:id` – One of the caller's items.
//! - `POST /items/bulk` – Import many URLs; progress arrives as Server-Sent Events.
//! - `POST /items/:id/tags` – Store a summary and the tags derived from it.
//! - `POST /discover` – Web search for candidate URLs.
//! - `POST /discover/map` – Links reachable from a site.
//! - `POST /api/ai/summary` – Summary of an item streamed as plain text.
//! - `GET /metrics` – Import counters.
//!
//! Every route except `/health` and `/commands` requires a session cookie; see [`crate::auth`].

use crate::auth::{AuthSettings, CurrentUser};
use crate::processing::{DiscoveryResult, LibraryApi, LibraryError};
use crate::store::{ItemFilter, SavedItem};
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{convert::Infallible, sync::Arc};
use tower_http::trace::TraceLayer;

/// Shared router state: the library service plus cookie settings.
pub struct ApiState<S> {
    /// Service handling every operation.
    pub service: Arc<S>,
    /// Session cookie and login redirect settings.
    pub auth: Arc<AuthSettings>,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Build the HTTP router exposing the library API surface.
pub fn create_router<S>(service: Arc<S>, auth: AuthSettings) -> Router
where
    S: LibraryApi + 'static,
{
    let state = ApiState {
        service,
        auth: Arc::new(auth),
    };

    Router::new()
        .route("/health", get(health))
        .route("/commands", get(get_commands))
        .route("/items", get(list_items::<S>).post(import_item::<S>))
        .route("/items/bulk", post(bulk_import::<S>))
        .route("/items/:id", get(get_item::<S>))
        .route("/items/:id/tags", post(extract_tags::<S>))
        .route("/discover", post(discover::<S>))
        .route("/discover/map", post(map_site::<S>))
        .route("/api/ai/summary", post(stream_summary::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// List the caller's items.
async fn list_items<S>(
    State(state): State<ApiState<S>>,
    user: CurrentUser,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<Vec<SavedItem>>, AppError>
where
    S: LibraryApi,
{
    let items = state.service.list_items(&user.user_id, &filter).await?;
    Ok(Json(items))
}

#[derive(Deserialize)]
struct ImportRequest {
    url: String,
}

/// Import a single URL. A failed extraction still answers 200 with the `FAILED` item.
async fn import_item<S>(
    State(state): State<ApiState<S>>,
    user: CurrentUser,
    Json(request): Json<ImportRequest>,
) -> Result<Json<SavedItem>, AppError>
where
    S: LibraryApi,
{
    let item = state.service.import_url(&user.user_id, &request.url).await?;
    Ok(Json(item))
}

async fn get_item<S>(
    State(state): State<ApiState<S>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SavedItem>, AppError>
where
    S: LibraryApi,
{
    Ok(Json(state.service.get_item(&user.user_id, &id).await?))
}

#[derive(Deserialize)]
struct BulkImportRequest {
    urls: Vec<String>,
}

/// Start a bulk import and relay its progress as `progress` events.
///
/// The batch is validated before the response starts, so a bad URL is still a plain 400.
/// Closing the connection drops the stream, which stops the pipeline after its current item.
async fn bulk_import<S>(
    State(state): State<ApiState<S>>,
    user: CurrentUser,
    Json(request): Json<BulkImportRequest>,
) -> Result<Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>>, AppError>
where
    S: LibraryApi,
{
    let total = request.urls.len();
    let progress = state.service.bulk_import(&user.user_id, request.urls)?;
    tracing::info!(user_id = %user.user_id, total, "Bulk import accepted");

    let events = progress.map(|update| {
        Event::default()
            .event("progress")
            .json_data(&update)
            .or_else(|error| {
                tracing::warn!(error = %error, "Failed to encode progress event");
                Ok(Event::default().event("progress").data(update.url))
            })
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
struct TagsRequest {
    summary: String,
}

async fn extract_tags<S>(
    State(state): State<ApiState<S>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<TagsRequest>,
) -> Result<Json<SavedItem>, AppError>
where
    S: LibraryApi,
{
    let item = state
        .service
        .extract_tags(&user.user_id, &id, request.summary)
        .await?;
    Ok(Json(item))
}

#[derive(Deserialize)]
struct DiscoverRequest {
    query: String,
}

#[derive(Serialize)]
struct DiscoverResponse {
    results: Vec<DiscoveryResult>,
}

async fn discover<S>(
    State(state): State<ApiState<S>>,
    _user: CurrentUser,
    Json(request): Json<DiscoverRequest>,
) -> Result<Json<DiscoverResponse>, AppError>
where
    S: LibraryApi,
{
    let results = state.service.discover(&request.query).await?;
    Ok(Json(DiscoverResponse { results }))
}

#[derive(Deserialize)]
struct MapRequest {
    url: String,
    #[serde(default)]
    search: Option<String>,
}

#[derive(Serialize)]
struct MapResponse {
    links: Vec<DiscoveryResult>,
}

async fn map_site<S>(
    State(state): State<ApiState<S>>,
    _user: CurrentUser,
    Json(request): Json<MapRequest>,
) -> Result<Json<MapResponse>, AppError>
where
    S: LibraryApi,
{
    let links = state.service.map_site(&request.url, request.search).await?;
    Ok(Json(MapResponse { links }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest {
    item_id: String,
    #[serde(default)]
    prompt: Option<String>,
}

/// Stream a summary as plain text, chunk by chunk.
///
/// Once streaming has started the status is already sent; a provider failure mid-stream ends
/// the body early.
async fn stream_summary<S>(
    State(state): State<ApiState<S>>,
    user: CurrentUser,
    Json(request): Json<SummaryRequest>,
) -> Result<Response, AppError>
where
    S: LibraryApi,
{
    let text = state
        .service
        .stream_summary(&user.user_id, &request.item_id, request.prompt)
        .await?;

    let item_id = request.item_id;
    let body = text.map(move |chunk| {
        chunk.inspect_err(|error| {
            tracing::warn!(item_id = %item_id, error = %error, "Summary stream interrupted");
        })
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

/// Return the import counters.
async fn get_metrics<S>(
    State(state): State<ApiState<S>>,
    _user: CurrentUser,
) -> Json<crate::metrics::MetricsSnapshot>
where
    S: LibraryApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "list_items",
                method: "GET",
                path: "/items",
                description: "List saved items newest first. Optional query parameters `q` (title or tag text) and `status` (PENDING, PROCESSING, COMPLETED, FAILED or all).",
                request_example: None,
            },
            CommandDescriptor {
                name: "import",
                method: "POST",
                path: "/items",
                description: "Fetch one URL, extract its content, and return the saved item with status COMPLETED or FAILED.",
                request_example: Some(json!({ "url": "https://example.com/article" })),
            },
            CommandDescriptor {
                name: "get_item",
                method: "GET",
                path: "/items/:id",
                description: "Return one saved item.",
                request_example: None,
            },
            CommandDescriptor {
                name: "bulk_import",
                method: "POST",
                path: "/items/bulk",
                description: "Import several URLs in order. Responds with Server-Sent Events named `progress` carrying { completed, total, url, status }.",
                request_example: Some(json!({
                    "urls": ["https://example.com/a", "https://example.com/b"]
                })),
            },
            CommandDescriptor {
                name: "extract_tags",
                method: "POST",
                path: "/items/:id/tags",
                description: "Store a summary on the item and derive up to five tags from it.",
                request_example: Some(json!({ "summary": "A short summary." })),
            },
            CommandDescriptor {
                name: "discover",
                method: "POST",
                path: "/discover",
                description: "Search the web for pages worth importing. Nothing is saved.",
                request_example: Some(json!({ "query": "rust async runtimes" })),
            },
            CommandDescriptor {
                name: "map_site",
                method: "POST",
                path: "/discover/map",
                description: "List links reachable from a site, optionally narrowed by a search term.",
                request_example: Some(json!({
                    "url": "https://example.com",
                    "search": "blog"
                })),
            },
            CommandDescriptor {
                name: "summary",
                method: "POST",
                path: "/api/ai/summary",
                description: "Stream a plain-text summary of an item, or of `prompt` when given.",
                request_example: Some(json!({ "itemId": "item-id" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return import counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(LibraryError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LibraryError::NotFound => StatusCode::NOT_FOUND,
            LibraryError::Validation(_) => StatusCode::BAD_REQUEST,
            LibraryError::Extraction(_) | LibraryError::Model(_) => StatusCode::BAD_GATEWAY,
            LibraryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<LibraryError> for AppError {
    fn from(inner: LibraryError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::auth::AuthSettings;
    use crate::llm::{LlmError, TextStream};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        BulkImportProgress, DiscoveryResult, LibraryApi, LibraryError, ProgressStatus,
        ProgressStream,
    };
    use crate::store::{ItemFilter, ItemStatus, SavedItem, Session};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const TOKEN: &str = "valid-token";

    #[tokio::test]
    async fn commands_catalog_lists_bulk_import() {
        let commands = get_commands().await.0.commands;
        let bulk = commands
            .iter()
            .find(|cmd| cmd.name == "bulk_import")
            .expect("bulk command present");

        assert_eq!(bulk.method, "POST");
        assert_eq!(bulk.path, "/items/bulk");
        assert!(bulk.description.contains("progress"));
        assert!(commands.len() >= 9);
    }

    #[tokio::test]
    async fn health_needs_no_session() {
        let app = create_router(Arc::new(StubLibrary::default()), AuthSettings::default());
        let response = app
            .oneshot(get_request("/health", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_unknown_session_redirects_to_login() {
        let auth = AuthSettings {
            cookie_name: "session_token".into(),
            login_path: "/sign-in".into(),
        };
        let app = create_router(Arc::new(StubLibrary::default()), auth);

        for cookie in [None, Some("session_token=stale")] {
            let response = app
                .clone()
                .oneshot(get_request("/items", cookie))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(
                response.headers().get(header::LOCATION).expect("location"),
                "/sign-in"
            );
        }
    }

    #[tokio::test]
    async fn foreign_item_is_not_found() {
        let app = create_router(Arc::new(StubLibrary::default()), AuthSettings::default());
        let response = app
            .oneshot(get_request("/items/someone-elses", Some(&cookie())))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_import_url_is_bad_request() {
        let app = create_router(Arc::new(StubLibrary::default()), AuthSettings::default());
        let response = app
            .oneshot(post_json("/items", json!({ "url": "not a url" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_import_still_answers_ok() {
        let service = Arc::new(StubLibrary::default());
        let app = create_router(service.clone(), AuthSettings::default());
        let response = app
            .oneshot(post_json(
                "/items",
                json!({ "url": "https://unreachable.example" }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["userId"], "alice");
        assert_eq!(
            service.imports.lock().await.as_slice(),
            ["https://unreachable.example"]
        );
    }

    #[tokio::test]
    async fn bulk_import_streams_progress_events() {
        let app = create_router(Arc::new(StubLibrary::default()), AuthSettings::default());
        let response = app
            .oneshot(post_json(
                "/items/bulk",
                json!({ "urls": ["https://a.dev", "https://b.dev", "https://c.dev"] }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).expect("type"),
            "text/event-stream"
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert_eq!(text.matches("event:").count(), 3);
        assert!(text.contains("progress"));
        assert!(text.contains(r#""completed":3,"total":3"#));
        assert!(text.contains(r#""status":"success""#));
    }

    #[tokio::test]
    async fn summary_streams_plain_text() {
        let app = create_router(Arc::new(StubLibrary::default()), AuthSettings::default());
        let response = app
            .oneshot(post_json("/api/ai/summary", json!({ "itemId": "mine" })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.starts_with("text/plain"))
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], b"Short summary.");
    }

    #[tokio::test]
    async fn upstream_discovery_failure_is_bad_gateway() {
        let app = create_router(Arc::new(StubLibrary::default()), AuthSettings::default());
        let response = app
            .oneshot(post_json("/discover", json!({ "query": "explode" })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    fn cookie() -> String {
        format!("session_token={TOKEN}")
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn post_json(uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::COOKIE, cookie())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    fn item(id: &str, url: &str, status: ItemStatus) -> SavedItem {
        SavedItem {
            id: id.into(),
            url: url.into(),
            title: None,
            content: None,
            og_image: None,
            author: None,
            published_at: None,
            summary: None,
            tags: Vec::new(),
            status,
            user_id: "alice".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[derive(Default)]
    struct StubLibrary {
        imports: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LibraryApi for StubLibrary {
        async fn authenticate(&self, token: &str) -> Result<Option<Session>, LibraryError> {
            Ok((token == TOKEN).then(|| Session {
                token: token.into(),
                user_id: "alice".into(),
                expires_at: OffsetDateTime::now_utc() + time::Duration::hours(1),
            }))
        }

        async fn import_url(&self, user_id: &str, url: &str) -> Result<SavedItem, LibraryError> {
            crate::processing::sanitize::validate_url(url)?;
            self.imports.lock().await.push(url.to_string());
            let mut saved = item("new", url, ItemStatus::Failed);
            saved.user_id = user_id.to_string();
            Ok(saved)
        }

        fn bulk_import(
            &self,
            _user_id: &str,
            urls: Vec<String>,
        ) -> Result<ProgressStream, LibraryError> {
            let total = urls.len();
            let events: Vec<BulkImportProgress> = urls
                .into_iter()
                .enumerate()
                .map(|(index, url)| BulkImportProgress {
                    completed: index + 1,
                    total,
                    url,
                    status: ProgressStatus::Success,
                })
                .collect();
            Ok(Box::pin(futures_util::stream::iter(events)))
        }

        async fn list_items(
            &self,
            _user_id: &str,
            _filter: &ItemFilter,
        ) -> Result<Vec<SavedItem>, LibraryError> {
            Ok(vec![item("mine", "https://a.dev", ItemStatus::Completed)])
        }

        async fn get_item(&self, _user_id: &str, item_id: &str) -> Result<SavedItem, LibraryError> {
            if item_id == "mine" {
                Ok(item("mine", "https://a.dev", ItemStatus::Completed))
            } else {
                Err(LibraryError::NotFound)
            }
        }

        async fn discover(&self, query: &str) -> Result<Vec<DiscoveryResult>, LibraryError> {
            if query == "explode" {
                return Err(LibraryError::Model(LlmError::ProviderUnavailable(
                    "down".into(),
                )));
            }
            Ok(Vec::new())
        }

        async fn map_site(
            &self,
            _url: &str,
            _search: Option<String>,
        ) -> Result<Vec<DiscoveryResult>, LibraryError> {
            Ok(Vec::new())
        }

        async fn stream_summary(
            &self,
            user_id: &str,
            item_id: &str,
            _prompt: Option<String>,
        ) -> Result<TextStream, LibraryError> {
            self.get_item(user_id, item_id).await?;
            let chunks: Vec<Result<String, LlmError>> =
                vec![Ok("Short ".into()), Ok("summary.".into())];
            Ok(Box::pin(futures_util::stream::iter(chunks)))
        }

        async fn extract_tags(
            &self,
            user_id: &str,
            item_id: &str,
            summary: String,
        ) -> Result<SavedItem, LibraryError> {
            let mut updated = self.get_item(user_id, item_id).await?;
            updated.summary = Some(summary);
            Ok(updated)
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
    }
}
