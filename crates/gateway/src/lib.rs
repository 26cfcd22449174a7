//! HTTP API gateway for PropDesk.
//!
//! One gateway process serves exactly one surface (admin or client). It
//! exposes a health check plus the v1 API for access checks and the
//! assistant.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use propdesk_assistant::{Dispatcher, DispatcherSettings, PromptRegistry};
use propdesk_config::{AppConfig, GatewayConfig};
use propdesk_core::OperatingContext;
use propdesk_security::{AccessGuard, AuditLogger, StaticIdentityProvider, TracingSink};

/// Build the full router: `/health` plus the v1 API.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit
/// - In-memory rate limiting per client
/// - HTTP trace logging
pub fn build_router(state: api_v1::SharedApiState, gateway: &GatewayConfig) -> Router {
    let origins: Vec<HeaderValue> = gateway
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(3600));

    let rate_limiter = Arc::new(RateLimiter::new(
        gateway.rate_limit_per_minute,
        Duration::from_secs(60),
    ));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(gateway.body_limit_bytes))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Assemble the shared state for one surface from configuration.
///
/// Builds the provider chain, identity provider, access guard and dispatcher
/// once; every request shares them via `Arc`.
pub fn build_state(
    config: &AppConfig,
    context: OperatingContext,
) -> Result<api_v1::SharedApiState, Box<dyn std::error::Error>> {
    config.validate()?;

    let router = propdesk_providers::router::build_from_config(config);
    let provider = router
        .chain()
        .ok_or("No default provider configured, set an API key")?;

    let audit = Arc::new(
        AuditLogger::with_sinks(vec![Box::new(TracingSink)])
            .with_retention(config.gateway.audit_retention),
    );
    let identity = Arc::new(StaticIdentityProvider::from_config(&config.identity));
    let guard = AccessGuard::from_config(config, identity)?.with_audit(audit.clone());

    let assistant_resource = context.assistant_resource();
    if !guard.table().contains(&assistant_resource) {
        return Err(format!("access table has no entry for '{assistant_resource}'").into());
    }

    let dispatcher = Dispatcher::new(
        context,
        Arc::new(PromptRegistry::standard()),
        provider,
        DispatcherSettings::from_config(config),
    );

    Ok(Arc::new(api_v1::ApiV1State {
        context,
        guard: Arc::new(guard),
        dispatcher: Arc::new(dispatcher),
        audit,
    }))
}

/// Start the gateway HTTP server for one surface.
pub async fn start(
    config: AppConfig,
    context: OperatingContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config, context)?;
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, surface = %context, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key (bearer token or "anonymous").
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Periodic cleanup: if map grows too large, evict stale entries
        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Returns 429 Too Many Requests once a client exceeds its window.
/// `/health` is exempt so monitoring can poll it freely.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let client_key = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&client_key) {
        warn!(client = %client_key.chars().take(20).collect::<String>(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    surface: OperatingContext,
}

async fn health_handler(State(state): State<api_v1::SharedApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        surface: state.context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use propdesk_config::SessionConfig;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".into());
        config.identity.sessions = vec![SessionConfig {
            token: "tok-admin".into(),
            subject: Some("ops@example.com".into()),
            roles: vec!["admin".into()],
        }];
        config
    }

    #[tokio::test]
    async fn health_endpoint_reports_surface() {
        let config = test_config();
        let state = build_state(&config, OperatingContext::Client).unwrap();
        let app = build_router(state, &config.gateway);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["surface"], "client");
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = test_config();
        config.gateway.body_limit_bytes = 64;
        let state = build_state(&config, OperatingContext::Admin).unwrap();
        let app = build_router(state, &config.gateway);

        let big = serde_json::json!({"task_kind": "dev-helper", "input": "x".repeat(1024)});
        let req = Request::builder()
            .method("POST")
            .uri("/v1/assistant")
            .header("Content-Type", "application/json")
            .header("Authorization", "Bearer tok-admin")
            .body(Body::from(big.to_string()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let mut config = test_config();
        config.gateway.rate_limit_per_minute = 1;
        let state = build_state(&config, OperatingContext::Admin).unwrap();
        let app = build_router(state, &config.gateway);

        let check = || {
            Request::builder()
                .method("POST")
                .uri("/v1/access/check")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"resource":"admin.dashboard"}"#))
                .unwrap()
        };

        let first = app.clone().oneshot(check()).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
        let second = app.oneshot(check()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn rate_limiter_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[tokio::test]
    async fn audit_log_respects_configured_retention() {
        let mut config = test_config();
        config.gateway.audit_retention = 2;
        config.gateway.rate_limit_per_minute = 100;
        let state = build_state(&config, OperatingContext::Admin).unwrap();
        let app = build_router(state.clone(), &config.gateway);

        for _ in 0..5 {
            let request = Request::builder()
                .method("POST")
                .uri("/v1/access/check")
                .header("Content-Type", "application/json")
                .header("Authorization", "Bearer tok-admin")
                .body(Body::from(r#"{"resource":"admin.dashboard"}"#))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(state.audit.count(), 2);
    }

    #[test]
    fn missing_assistant_resource_fails_startup() {
        let mut config = test_config();
        config.access.resources.remove("client.assistant");
        assert!(build_state(&config, OperatingContext::Client).is_err());
    }
}
