//! HTTP route handlers for the travel guide API.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::export::DOWNLOAD_NAME;
use crate::places::PlacesError;
use crate::reply::StructuredReply;
use crate::storage::{StoreError, Turn, TurnRole};

use super::session::Session;
use super::state::AppState;

type HandlerResult = Result<Response, (StatusCode, String)>;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/history", get(history))
        .route("/clear-history", post(clear_history))
        .route("/export", get(export_pdf))
        .route("/export-pdf", post(export_pdf))
        .route("/map-search", get(map_search))
        .route("/api/place_detail", get(place_detail))
        .fallback_service(assets)
        .with_state(state)
}

fn store_failure(err: &StoreError) -> (StatusCode, String) {
    tracing::error!("Transcript store failure: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage unavailable".to_string(),
    )
}

fn places_failure(err: &PlacesError) -> (StatusCode, String) {
    if err.is_unconfigured() {
        (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
    } else {
        tracing::warn!("Places lookup failed: {err}");
        (StatusCode::BAD_GATEWAY, "places lookup failed".to_string())
    }
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "travel-guide",
        "version": env!("CARGO_PKG_VERSION"),
        "credentials": state.assistant.credential_count(),
        "places": state.places.is_configured(),
    }))
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    #[serde(default)]
    pub msg: String,
}

/// Answer one chat message. Provider failures come back as a normal reply.
async fn chat(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(request): Json<ChatRequest>,
) -> HandlerResult {
    let message = request.msg.trim();
    if message.is_empty() {
        return Ok(session.respond((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "empty"})),
        )));
    }

    let reply = state
        .assistant
        .respond(&session.id, message)
        .await
        .map_err(|e| store_failure(&e))?;
    Ok(session.respond(Json(reply)))
}

/// One persisted turn as returned by `/history`.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    /// Author of the turn.
    pub role: TurnRole,
    /// Stored content.
    pub content: String,
    /// Decoded reply for structured assistant turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<StructuredReply>,
    /// Insertion time.
    pub timestamp: DateTime<Utc>,
}

impl From<Turn> for HistoryEntry {
    fn from(turn: Turn) -> Self {
        let reply = match turn.role {
            TurnRole::Assistant => StructuredReply::from_stored(&turn.content),
            TurnRole::User => None,
        };
        Self {
            role: turn.role,
            content: turn.content,
            reply,
            timestamp: turn.timestamp,
        }
    }
}

/// Return the session transcript in insertion order.
async fn history(State(state): State<Arc<AppState>>, session: Session) -> HandlerResult {
    let turns = state
        .store
        .read(session.id.clone())
        .await
        .map_err(|e| store_failure(&e))?;
    let entries: Vec<HistoryEntry> = turns.into_iter().map(HistoryEntry::from).collect();
    Ok(session.respond(Json(entries)))
}

/// Delete the session transcript. Idempotent.
async fn clear_history(State(state): State<Arc<AppState>>, session: Session) -> HandlerResult {
    let removed = state
        .store
        .clear(session.id.clone())
        .await
        .map_err(|e| store_failure(&e))?;
    tracing::info!(session = %session.id, removed, "Cleared chat history");
    Ok(session.respond(Json(serde_json::json!({"status": "cleared"}))))
}

/// Render the session transcript as a PDF attachment.
async fn export_pdf(State(state): State<Arc<AppState>>, session: Session) -> HandlerResult {
    let turns = state
        .store
        .read(session.id.clone())
        .await
        .map_err(|e| store_failure(&e))?;

    let bytes = state.exporter.render(&turns).await.map_err(|e| {
        tracing::error!("Export failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "export failed".to_string())
    })?;

    let disposition = format!("attachment; filename=\"{DOWNLOAD_NAME}\"");
    Ok(session.respond((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )))
}

/// Map search query string.
#[derive(Debug, Deserialize)]
pub struct MapSearchParams {
    /// Free-text query; defaults to the configured city.
    pub q: Option<String>,
}

/// Search places for the map view.
async fn map_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapSearchParams>,
) -> HandlerResult {
    let results = state
        .places
        .search(params.q.as_deref())
        .await
        .map_err(|e| places_failure(&e))?;
    Ok(Json(results).into_response())
}

/// Place detail query string.
#[derive(Debug, Deserialize)]
pub struct PlaceDetailParams {
    /// Backend place identifier.
    pub place_id: Option<String>,
    /// Name used when the backend has no title.
    pub name: Option<String>,
}

/// Detail card for one place.
async fn place_detail(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaceDetailParams>,
) -> HandlerResult {
    let detail = state
        .places
        .detail(params.place_id.as_deref(), params.name.as_deref())
        .await
        .map_err(|e| places_failure(&e))?;
    Ok(Json(detail).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::credentials::{Credential, CredentialPool};
    use crate::export::{ExportError, ExportResult, ImageFetcher};
    use crate::provider::{GenerationRequest, ProviderClient, ProviderError};
    use crate::reply::NO_CREDENTIALS_TEXT;
    use crate::storage::{SqliteTranscriptStore, TranscriptStore};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    fn key(fill: char) -> String {
        format!("AIza{}", fill.to_string().repeat(35))
    }

    /// Rate-limits every credential except `good`, which gets `output`.
    struct QuotaClient {
        good: String,
        output: String,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ProviderClient for QuotaClient {
        async fn generate(
            &self,
            credential: &Credential,
            _request: GenerationRequest<'_>,
        ) -> Result<String, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            if credential.expose() == self.good {
                Ok(self.output.clone())
            } else {
                Err(ProviderError::RateLimited {
                    status: 429,
                    message: "RESOURCE_EXHAUSTED".to_string(),
                })
            }
        }
    }

    struct OfflineFetcher;

    #[async_trait]
    impl ImageFetcher for OfflineFetcher {
        async fn fetch(&self, _url: &str) -> ExportResult<Vec<u8>> {
            Err(ExportError::Status(503))
        }
    }

    async fn app(pool_keys: &[String], good: &str, output: &str) -> (Router, Arc<QuotaClient>) {
        let mut config = AppConfig::default();
        config.provider.transient_backoff = Duration::ZERO;
        config.provider.traversal = crate::config::Traversal::Fixed;
        config.export.font_path = "missing.ttf".into();

        let store: Arc<dyn TranscriptStore> =
            Arc::new(SqliteTranscriptStore::in_memory().await.unwrap());
        let client = Arc::new(QuotaClient {
            good: good.to_string(),
            output: output.to_string(),
            calls: Mutex::new(0),
        });
        let pool = CredentialPool::from_credentials(
            pool_keys.iter().filter_map(|k| Credential::parse(k)).collect(),
        );
        let state = AppState::from_parts(
            config,
            store,
            client.clone(),
            pool,
            Arc::new(OfflineFetcher),
        )
        .unwrap();
        (create_router(state), client)
    }

    fn chat_request(msg: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder
            .body(Body::from(serde_json::json!({"msg": msg}).to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_without_credentials_returns_notice() {
        let (app, client) = app(&[], "", "").await;

        let response = app.oneshot(chat_request("Hanoi", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_some());

        let body = json_body(response).await;
        assert_eq!(body["text"], NO_CREDENTIALS_TEXT);
        assert_eq!(body["images"], serde_json::json!([]));
        assert_eq!(body["video_links"], serde_json::json!([]));
        assert_eq!(body["suggestions"], serde_json::json!([]));
        assert_eq!(*client.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_chat_falls_through_quota_errors_and_filters_images() {
        let keys = [key('a'), key('b'), key('c')];
        let output = serde_json::json!({
            "text": "Phố cổ Hà Nội",
            "images": [
                {"url": "https://upload.wikimedia.org/hanoi.jpg", "caption": "Hồ Gươm"},
                {"url": "https://tracker.example/pixel.gif", "caption": "x"},
                {"url": "https://images.unsplash.com/photo-1", "caption": "Phố"},
                {"url": "http://upload.wikimedia.org/insecure.jpg", "caption": "y"},
                {"url": "https://blog.example.net/z.png", "caption": "z"}
            ],
            "suggestions": ["Ăn gì ở Hà Nội?"]
        })
        .to_string();
        let (app, client) = app(&keys, &keys[2], &output).await;

        let response = app.oneshot(chat_request("Hà Nội", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;

        let urls: Vec<&str> = body["images"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|i| i["url"].as_str())
            .collect();
        assert_eq!(
            urls,
            [
                "https://upload.wikimedia.org/hanoi.jpg",
                "https://images.unsplash.com/photo-1"
            ]
        );
        assert_eq!(*client.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let (app, _) = app(&[], "", "").await;
        let response = app.oneshot(chat_request("   ", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, serde_json::json!({"error": "empty"}));
    }

    #[tokio::test]
    async fn test_export_of_empty_session_is_a_pdf() {
        let (app, _) = app(&[], "", "").await;
        let response = app
            .oneshot(Request::get("/export").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert!(response.headers()[CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(DOWNLOAD_NAME));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_history_and_clear_follow_cookie() {
        let (app, _) = app(&[], "", "").await;
        let cookie = "sid=session-1";

        app.clone()
            .oneshot(chat_request("Nha Trang", Some(cookie)))
            .await
            .unwrap();

        let history = |app: Router| async move {
            let response = app
                .oneshot(
                    Request::get("/history")
                        .header(COOKIE, cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert!(response.headers().get(SET_COOKIE).is_none());
            json_body(response).await
        };

        let body = history(app.clone()).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["role"], "user");
        assert_eq!(body[0]["content"], "Nha Trang");
        assert_eq!(body[1]["reply"]["text"], NO_CREDENTIALS_TEXT);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::post("/clear-history")
                        .header(COOKIE, cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(
                json_body(response).await,
                serde_json::json!({"status": "cleared"})
            );
        }
        assert_eq!(history(app).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_map_search_without_key_is_unavailable() {
        let (app, _) = app(&[], "", "").await;
        let response = app
            .oneshot(Request::get("/map-search?q=Hue").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health() {
        let keys = [key('a')];
        let (app, _) = app(&keys, "", "").await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["credentials"], 1);
    }
}
