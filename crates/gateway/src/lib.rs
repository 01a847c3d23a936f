//! HTTP API gateway for PinChat.
//!
//! Routes:
//! - `GET /`: plain-text liveness banner
//! - `GET /health`: `{status, version}`
//! - `POST /api/auth/login`: PIN in, session token + full history out
//! - `POST /api/chat/send`: authenticated; one chat turn
//!
//! Built on Axum.

pub mod auth;
pub mod chat;
pub mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{
    Router,
    middleware,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use pinchat_agent::ChatAgent;
use pinchat_config::{AppConfig, GatewayConfig};
use pinchat_memory::Conversations;
use pinchat_security::{AuditLogger, IdentityResolver, PinHasher, SessionManager};

/// Shared application state. Immutable after startup.
pub struct GatewayState {
    pub resolver: IdentityResolver,
    pub sessions: SessionManager,
    pub agent: ChatAgent,
    pub audit: Arc<AuditLogger>,
    pub pin_length: usize,
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with all routes and layers:
/// - session check on `/api/chat/*`
/// - CORS (any origin unless `allowed_origins` is set)
/// - request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let chat = Router::new()
        .route("/api/chat/send", post(chat::send_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .merge(chat)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::AUTH_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Wire every collaborator from configuration.
pub async fn build_state(config: &AppConfig) -> Result<SharedState, Box<dyn std::error::Error>> {
    let stores = pinchat_memory::open(&config.database).await?;

    let pin_count = stores.pins.count().await?;
    if pin_count == 0 {
        warn!("No PINs provisioned; every login will fail. Run `pinchat provision`.");
    } else {
        info!(pins = pin_count, "PIN records loaded");
    }

    let audit = Arc::new(AuditLogger::tracing());
    let hasher = Arc::new(PinHasher::from_config(&config.pin)?);
    let resolver = IdentityResolver::new(stores.pins, hasher)
        .with_duplicate_audit(config.pin.audit_duplicates)
        .with_audit(audit.clone());
    let sessions = SessionManager::from_config(&config.session)?;
    let provider = pinchat_providers::build_from_config(&config.model)?;
    let agent = ChatAgent::from_config(config, Conversations::new(stores.messages), provider);

    Ok(Arc::new(GatewayState {
        resolver,
        sessions,
        agent,
        audit,
        pin_length: config.pin.length,
    }))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate_for_serve()?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config).await?;
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.model.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

async fn root_handler() -> &'static str {
    "PinChat backend is running!"
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use pinchat_agent::testing::ScriptedProvider;
    use pinchat_core::error::ProviderError;
    use pinchat_core::identity::{IdentityId, PinRecord};
    use pinchat_core::store::PinStore;
    use pinchat_core::provider::Provider;
    use pinchat_memory::InMemoryStore;
    use pinchat_security::{AuditEvent, AuditOutcome, Pin};

    use crate::auth::LoginResponse;
    use crate::chat::SendResponse;

    const SECRET: &str = "gateway-test-secret";

    struct Harness {
        app: Router,
        state: SharedState,
    }

    async fn harness(pins: &[&str], provider: ScriptedProvider) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let hasher = Arc::new(PinHasher::new(8, 1, 1).unwrap());
        let audit = Arc::new(AuditLogger::new());
        // Seed records directly so tests can store the same PIN twice.
        for p in pins {
            let hash = hasher.hash(&Pin::parse(p, 6).unwrap()).unwrap();
            PinStore::insert(store.as_ref(), PinRecord::new(hash)).await.unwrap();
        }
        let resolver = IdentityResolver::new(store.clone(), hasher).with_audit(audit.clone());

        let provider: Arc<dyn Provider> = Arc::new(provider);
        let agent = ChatAgent::from_config(
            &AppConfig::default(),
            Conversations::new(store),
            provider,
        );
        let state = Arc::new(GatewayState {
            resolver,
            sessions: SessionManager::new(SECRET),
            agent,
            audit,
            pin_length: 6,
        });

        Harness {
            app: build_router(state.clone(), &GatewayConfig::default()),
            state,
        }
    }

    fn login_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn send_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/chat/send")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-auth-token", token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn login(app: &Router, pin: &str) -> LoginResponse {
        let response = app
            .clone()
            .oneshot(login_request(serde_json::json!({ "pin": pin })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_value(json_body(response).await).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let h = harness(&[], ScriptedProvider::default()).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = h.app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn root_banner() {
        let h = harness(&[], ScriptedProvider::default()).await;
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = h.app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("running"));
    }

    #[tokio::test]
    async fn login_with_provisioned_pin_returns_token_and_empty_history() {
        let h = harness(&["123456", "654321"], ScriptedProvider::default()).await;

        let body = login(&h.app, "654321").await;
        assert!(body.success);
        assert!(body.history.is_empty());
        assert!(h.state.sessions.verify(&body.token).is_ok());
    }

    #[tokio::test]
    async fn malformed_pins_rejected_before_lookup() {
        let h = harness(&["123456"], ScriptedProvider::default()).await;

        for body in [
            serde_json::json!({ "pin": "12345" }),
            serde_json::json!({ "pin": "1234567" }),
            serde_json::json!({ "pin": "12a456" }),
            serde_json::json!({ "pin": 123456 }),
            serde_json::json!({}),
        ] {
            let response = h.app.clone().oneshot(login_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await["msg"],
                "Please enter a valid 6-digit PIN."
            );
        }
        assert_eq!(h.state.audit.count(), 0);
    }

    #[tokio::test]
    async fn unknown_pin_is_invalid() {
        let h = harness(&["123456"], ScriptedProvider::default()).await;

        let response = h
            .app
            .oneshot(login_request(serde_json::json!({ "pin": "000000" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["msg"], "Invalid PIN.");
        assert_eq!(h.state.audit.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
    }

    #[tokio::test]
    async fn duplicate_pin_login_succeeds_and_is_audited() {
        let h = harness(&["424242", "424242"], ScriptedProvider::default()).await;

        let body = login(&h.app, "424242").await;
        assert!(body.success);

        let duplicates: Vec<_> = h
            .state
            .audit
            .entries()
            .into_iter()
            .filter(|e| e.event == AuditEvent::DuplicatePin)
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].outcome, AuditOutcome::Failure);
    }

    #[tokio::test]
    async fn chat_round_trip_then_history_on_next_login() {
        let h = harness(&["123456"], ScriptedProvider::replies(&["Hello! How can I help?"])).await;
        let token = login(&h.app, "123456").await.token;

        let response = h
            .app
            .clone()
            .oneshot(send_request(Some(&token), serde_json::json!({ "message": "Hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply: SendResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(reply.reply, "Hello! How can I help?");

        let again = login(&h.app, "123456").await;
        let history: Vec<_> = again
            .history
            .iter()
            .map(|m| (m.from.as_str(), m.text.as_str()))
            .collect();
        assert_eq!(history, vec![("user", "Hi"), ("ai", "Hello! How can I help?")]);
        assert!(again.history[0].time <= again.history[1].time);
    }

    #[tokio::test]
    async fn history_is_scoped_to_the_pin() {
        let h = harness(&["111111", "222222"], ScriptedProvider::replies(&["for one"])).await;
        let token = login(&h.app, "111111").await.token;

        h.app
            .clone()
            .oneshot(send_request(Some(&token), serde_json::json!({ "message": "mine" })))
            .await
            .unwrap();

        assert!(login(&h.app, "222222").await.history.is_empty());
        assert_eq!(login(&h.app, "111111").await.history.len(), 2);
    }

    #[tokio::test]
    async fn bearer_header_is_accepted() {
        let h = harness(&["123456"], ScriptedProvider::replies(&["ok"])).await;
        let token = login(&h.app, "123456").await.token;

        let req = Request::builder()
            .method("POST")
            .uri("/api/chat/send")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let response = h.app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let h = harness(&[], ScriptedProvider::default()).await;

        let response = h
            .app
            .oneshot(send_request(None, serde_json::json!({ "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["msg"], "No token, authorization denied");
    }

    #[tokio::test]
    async fn expired_token_is_401_with_expiry_message() {
        let h = harness(&["123456"], ScriptedProvider::replies(&["unused"])).await;
        let stale = h
            .state
            .sessions
            .issue_at(&IdentityId::new(), Utc::now() - Duration::hours(25))
            .unwrap();

        let response = h
            .app
            .oneshot(send_request(Some(&stale), serde_json::json!({ "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["msg"],
            "Token is expired, please log in again"
        );
    }

    #[tokio::test]
    async fn forged_token_is_401() {
        let h = harness(&[], ScriptedProvider::default()).await;
        let forged = SessionManager::new("not-the-secret")
            .issue(&IdentityId::new())
            .unwrap();

        let response = h
            .app
            .oneshot(send_request(Some(&forged), serde_json::json!({ "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["msg"], "Token is not valid");
    }

    #[tokio::test]
    async fn empty_message_is_400_and_stores_nothing() {
        let h = harness(&["123456"], ScriptedProvider::replies(&["unused"])).await;
        let token = login(&h.app, "123456").await.token;

        for body in [
            serde_json::json!({ "message": "   " }),
            serde_json::json!({ "message": 42 }),
            serde_json::json!({}),
        ] {
            let response = h
                .app
                .clone()
                .oneshot(send_request(Some(&token), body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["msg"], "Message cannot be empty.");
        }
        assert!(login(&h.app, "123456").await.history.is_empty());
    }

    #[tokio::test]
    async fn blocked_message_is_400_with_details() {
        let h = harness(&["123456"], ScriptedProvider::blocked("SAFETY")).await;
        let token = login(&h.app, "123456").await.token;

        let response = h
            .app
            .clone()
            .oneshot(send_request(Some(&token), serde_json::json!({ "message": "bad idea" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["msg"], "Message blocked by AI safety settings.");
        assert_eq!(body["details"]["blockReason"], "SAFETY");

        let history = login(&h.app, "123456").await.history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "bad idea");
    }

    #[tokio::test]
    async fn provider_failure_is_generic_500() {
        let h = harness(
            &["123456"],
            ScriptedProvider::failing(ProviderError::Network("connection refused".into())),
        )
        .await;
        let token = login(&h.app, "123456").await.token;

        let response = h
            .app
            .oneshot(send_request(Some(&token), serde_json::json!({ "message": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["msg"], "Server error while processing chat message.");
        assert!(!body.to_string().contains("connection refused"));
    }

    #[test]
    fn cors_accepts_configured_origins() {
        // Construction must not panic on bad entries.
        let _ = cors_layer(&["http://localhost:5173".into(), "not a\norigin".into()]);
        let _ = cors_layer(&[]);
    }
}
