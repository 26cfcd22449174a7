//! HTTP API v1: access checks and the assistant for one surface.
//!
//! Endpoints:
//!
//! - `POST /v1/access/check`: Evaluate the caller against a resource
//! - `POST /v1/assistant`   : Run an assistant task (guarded by `<surface>.assistant`)
//! - `GET  /v1/templates`   : List the task kinds this surface accepts

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use propdesk_assistant::{AssistantReply, Dispatcher, StructuredInput};
use propdesk_core::{AssistantError, Credentials, DenyReason, OperatingContext, TaskKind};
use propdesk_security::{
    AccessGuard, AccessPolicyError, AuditEvent, AuditLogger, AuditOutcome, Decision, Guarded,
};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    /// The surface this gateway serves; fixed at startup
    pub context: OperatingContext,
    pub guard: Arc<AccessGuard>,
    pub dispatcher: Arc<Dispatcher>,
    pub audit: Arc<AuditLogger>,
}

pub type SharedApiState = Arc<ApiV1State>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/access/check", post(access_check_handler))
        .route("/assistant", post(assistant_handler))
        .route("/templates", get(list_templates_handler))
        .with_state(state)
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessCheckRequest {
    pub resource: String,
}

/// A gate decision as seen by HTTP clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    pub task_kind: String,
    #[serde(default)]
    pub input: StructuredInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub text: String,
    pub model: String,
    pub task_kind: TaskKind,
    pub context: OperatingContext,
}

impl From<AssistantReply> for AssistantResponse {
    fn from(reply: AssistantReply) -> Self {
        Self {
            text: reply.text,
            model: reply.model,
            task_kind: reply.task_kind,
            context: reply.context,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplatesResponse {
    pub context: OperatingContext,
    pub task_kinds: Vec<TaskKind>,
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn credentials(headers: &HeaderMap) -> Credentials {
    Credentials::from_authorization(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    )
}

fn deny_response(reason: DenyReason, login_path: &str) -> Response {
    let (status, redirect) = match reason {
        DenyReason::NotAuthenticated => (StatusCode::UNAUTHORIZED, Some(login_path.to_string())),
        DenyReason::InsufficientRole => (StatusCode::FORBIDDEN, None),
    };
    let body = DecisionResponse {
        decision: "deny".into(),
        reason: Some(reason.as_str().into()),
        redirect,
    };
    (status, Json(body)).into_response()
}

fn abandoned_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new("abandoned", "Request abandoned before a decision")),
    )
        .into_response()
}

fn policy_error_response(err: AccessPolicyError, status: StatusCode) -> Response {
    (status, Json(ErrorResponse::new("unknown_resource", err.to_string()))).into_response()
}

fn assistant_error_response(err: &AssistantError) -> Response {
    let status = match err {
        AssistantError::UnknownTaskKind(_) => StatusCode::BAD_REQUEST,
        AssistantError::Unavailable { .. } | AssistantError::Cancelled => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, Json(ErrorResponse::new(err.code(), err.public_message()))).into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn access_check_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<AccessCheckRequest>,
) -> Response {
    let creds = credentials(&headers);
    let cancel = CancellationToken::new();
    // Cancels the in-flight identity lookup if the client goes away.
    let _drop_guard = cancel.clone().drop_guard();

    match state.guard.check(&creds, &payload.resource, &cancel).await {
        Ok(Some(Decision::Permit)) => (
            StatusCode::OK,
            Json(DecisionResponse {
                decision: "permit".into(),
                reason: None,
                redirect: None,
            }),
        )
            .into_response(),
        Ok(Some(Decision::Deny(reason))) => deny_response(reason, state.guard.login_path()),
        Ok(None) => abandoned_response(),
        Err(e) => policy_error_response(e, StatusCode::BAD_REQUEST),
    }
}

async fn assistant_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<AssistantRequest>,
) -> Response {
    let creds = credentials(&headers);
    let resource = state.context.assistant_resource();
    let cancel = CancellationToken::new();
    let _drop_guard = cancel.clone().drop_guard();

    info!(context = %state.context, task_kind = %payload.task_kind, "v1/assistant request");

    let dispatcher = &state.dispatcher;
    let audit = &state.audit;
    let context = state.context;
    let payload = &payload;
    let cancel_ref = &cancel;

    let guarded = state
        .guard
        .protect(&creds, &resource, &cancel, |caller| async move {
            audit.log(
                AuditEvent::AssistantRequest {
                    task_kind: payload.task_kind.clone(),
                    context: context.as_str().into(),
                },
                caller.display_name(),
                dispatcher.provider_name(),
                AuditOutcome::Success,
                None,
            );
            let result = dispatcher
                .handle_cancellable(&payload.task_kind, &payload.input, cancel_ref)
                .await;
            if let Err(e) = &result {
                audit.log(
                    AuditEvent::AssistantFailure {
                        task_kind: payload.task_kind.clone(),
                    },
                    caller.display_name(),
                    dispatcher.provider_name(),
                    AuditOutcome::Failure,
                    Some(e.to_string()),
                );
            }
            result
        })
        .await;

    match guarded {
        Ok(Guarded::Rendered(Ok(reply))) => {
            (StatusCode::OK, Json(AssistantResponse::from(reply))).into_response()
        }
        Ok(Guarded::Rendered(Err(e))) => assistant_error_response(&e),
        Ok(Guarded::Redirect { .. }) => {
            deny_response(DenyReason::NotAuthenticated, state.guard.login_path())
        }
        Ok(Guarded::Forbidden) => {
            deny_response(DenyReason::InsufficientRole, state.guard.login_path())
        }
        Ok(Guarded::Abandoned) => abandoned_response(),
        Err(e) => {
            // The surface's own assistant resource is missing from the access table.
            error!(error = %e, resource = %resource, "Access table misconfigured");
            policy_error_response(e, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn list_templates_handler(State(state): State<SharedApiState>) -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        context: state.context,
        task_kinds: state.dispatcher.registry().kinds().collect(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
