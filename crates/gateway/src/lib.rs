//! HTTP gateway for CampusDesk.
//!
//! Serves the embedded chat page and the JSON API:
//!
//! - `POST /api/chat`          — ask a question, get `{response, images}`
//! - `GET  /api/campus_images` — named campus image paths
//! - `GET  /health`            — liveness probe
//!
//! Built on Axum. Sessions are owned by the [`ChatService`] in the shared
//! state and selected per request by the `X-Session-Id` header or the
//! `session_id` body field.

pub mod frontend;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use campusdesk_chat::{ChatReply, ChatService};
use campusdesk_config::{AppConfig, GatewayConfig};

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared application state for the gateway.
pub struct GatewayState {
    pub chat: ChatService,
    pub body_limit: usize,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(chat: ChatService, gateway: &GatewayConfig) -> SharedState {
        Arc::new(Self {
            chat,
            body_limit: gateway.body_limit,
        })
    }
}

/// Build the Axum router with the API and the embedded frontend.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/campus_images", get(campus_images_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the page served by this gateway. Only same-host origins on the
/// configured port are allowed.
fn cors_layer(gateway: &GatewayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = [gateway.host.as_str(), "localhost", "127.0.0.1"]
        .iter()
        .filter_map(|host| HeaderValue::from_str(&format!("http://{host}:{}", gateway.port)).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static(SESSION_HEADER)])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Fails before binding when the backend credential is missing or the
/// knowledge base cannot be loaded.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.require_api_key()?;

    let provider = campusdesk_providers::build_from_config(&config)?;
    let chat = ChatService::from_config(&config, provider)?;
    let state = GatewayState::new(chat, &config.gateway);

    let app = build_router(state).layer(cors_layer(&config.gateway));

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(addr = %addr, model = %config.backend.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    let error = message.into();
    warn!(error = %error, "Rejected chat request");
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

/// A validated `/api/chat` body.
#[derive(Debug, PartialEq)]
struct ChatRequest {
    message: String,
    session_id: Option<String>,
}

/// Parse the body by hand so that every malformed shape gets the same
/// `{"error": ...}` response instead of an extractor rejection.
fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| bad_request(format!("Request body must be valid JSON: {e}")))?;

    let Value::Object(mut fields) = value else {
        return Err(bad_request("Request body must be a JSON object"));
    };

    let message = match fields.remove("message") {
        Some(Value::String(message)) => message,
        Some(_) => return Err(bad_request("'message' must be a string")),
        None => return Err(bad_request("Missing 'message' field")),
    };
    if message.trim().is_empty() {
        return Err(bad_request("'message' must not be empty"));
    }

    let session_id = match fields.remove("session_id") {
        Some(Value::String(id)) => Some(id),
        Some(Value::Null) | None => None,
        Some(_) => return Err(bad_request("'session_id' must be a string")),
    };

    Ok(ChatRequest { message, session_id })
}

async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let request = parse_chat_request(&body)?;

    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(request.session_id);

    let reply = state
        .chat
        .respond(session.as_deref(), &request.message)
        .await
        .map_err(|e| bad_request(e.0))?;
    Ok(Json(reply))
}

#[derive(Serialize)]
struct CampusImagesResponse {
    images: BTreeMap<String, String>,
}

async fn campus_images_handler(State(state): State<SharedState>) -> Json<CampusImagesResponse> {
    Json(CampusImagesResponse {
        images: state.chat.campus_images(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use campusdesk_chat::{APOLOGY, KnowledgeBase, SessionStore};
    use campusdesk_config::SessionMode;
    use campusdesk_core::error::ProviderError;
    use campusdesk_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct FixedProvider;

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                text: "Thanks for asking!".into(),
                usage: None,
                model: request.model,
                finish_reason: None,
            })
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl Provider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Timeout("60s elapsed".into()))
        }
    }

    fn state_with(provider: Arc<dyn Provider>) -> SharedState {
        let chat = ChatService::new(provider, KnowledgeBase::embedded().unwrap());
        GatewayState::new(chat, &GatewayConfig::default())
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(state_with(Arc::new(FixedProvider)));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_response_and_empty_images() {
        let state = state_with(Arc::new(FixedProvider));
        let app = build_router(state.clone());

        let response = app
            .oneshot(chat_request(r#"{"message": "How much is tuition?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["response"], "Thanks for asking!");
        assert_eq!(body["images"], serde_json::json!([]));
        assert_eq!(state.chat.transcript_len(None).await, 2);
    }

    #[tokio::test]
    async fn backend_failure_is_ok_with_apology() {
        let state = state_with(Arc::new(BrokenProvider));
        let app = build_router(state.clone());

        let response = app
            .oneshot(chat_request(r#"{"message": "Where is the campus?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["response"], APOLOGY);
        assert_eq!(body["images"], serde_json::json!([]));
        assert_eq!(state.chat.transcript_len(None).await, 0);
    }

    #[tokio::test]
    async fn invalid_bodies_are_400() {
        let cases = [
            "{}",
            r#"{"message": 42}"#,
            r#"{"message": "   "}"#,
            r#"["message"]"#,
            "not json",
            r#"{"message": "hi", "session_id": 7}"#,
        ];

        for body in cases {
            let app = build_router(state_with(Arc::new(FixedProvider)));
            let response = app.oneshot(chat_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let json = json_body(response).await;
            assert!(json["error"].is_string(), "body: {body}");
        }
    }

    #[tokio::test]
    async fn campus_images_endpoint() {
        let app = build_router(state_with(Arc::new(FixedProvider)));
        let req = Request::builder()
            .uri("/api/campus_images")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"images": {"logo": "/static/logo.svg"}})
        );
    }

    #[tokio::test]
    async fn session_header_selects_session() {
        let chat = ChatService::new(Arc::new(FixedProvider), KnowledgeBase::embedded().unwrap())
            .with_sessions(SessionStore::new(SessionMode::PerClient, 10));
        let state = GatewayState::new(chat, &GatewayConfig::default());

        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(SESSION_HEADER, "tab-1")
            .body(Body::from(r#"{"message": "hello", "session_id": "ignored"}"#))
            .unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(state.clone())
            .oneshot(chat_request(r#"{"message": "hello", "session_id": "tab-2"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(state.chat.transcript_len(Some("tab-1")).await, 2);
        assert_eq!(state.chat.transcript_len(Some("tab-2")).await, 2);
        assert_eq!(state.chat.transcript_len(Some("ignored")).await, 0);
        assert_eq!(state.chat.transcript_len(None).await, 0);
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let chat = ChatService::new(Arc::new(FixedProvider), KnowledgeBase::embedded().unwrap());
        let gateway = GatewayConfig {
            body_limit: 32,
            ..GatewayConfig::default()
        };
        let app = build_router(GatewayState::new(chat, &gateway));

        let big = format!(r#"{{"message": "{}"}}"#, "x".repeat(100));
        let response = app.oneshot(chat_request(&big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn parse_accepts_null_session() {
        let parsed = parse_chat_request(br#"{"message": "hi", "session_id": null}"#).unwrap();
        assert_eq!(
            parsed,
            ChatRequest {
                message: "hi".into(),
                session_id: None
            }
        );
    }

    #[tokio::test]
    async fn start_fails_without_api_key() {
        let result = start(AppConfig::default()).await;
        let err = result.err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
