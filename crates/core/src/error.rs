//! Error types for the PropDesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them for callers that do not care which boundary failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all PropDesk operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Identity provider errors ---
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    // --- Assistant errors ---
    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether resubmitting the same prompt may succeed.
    ///
    /// Rate limits, timeouts, network faults and 5xx responses are transient.
    /// Authentication and configuration problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// Failures while resolving the caller from the identity provider.
///
/// These never reach presentation code: the access guard folds every
/// variant into `DenyReason::NotAuthenticated`.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Identity resolution timed out after {0}ms")]
    Timeout(u64),
}

/// Why the access gate refused a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The caller has no resolvable session at all.
    NotAuthenticated,
    /// The caller is authenticated but holds none of the allowed roles.
    InsufficientRole,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotAuthenticated => "not_authenticated",
            DenyReason::InsufficientRole => "insufficient_role",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced by the assistant dispatcher.
#[derive(Debug, Clone, Error)]
pub enum AssistantError {
    /// No template is registered for the requested task kind.
    #[error("Unknown task kind: {0}")]
    UnknownTaskKind(String),

    /// The generation provider failed; shown to users as "assistant unavailable".
    #[error("Assistant unavailable ({provider}): {source}")]
    Unavailable {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// The caller abandoned the request before the provider answered.
    #[error("Assistant request cancelled")]
    Cancelled,
}

impl AssistantError {
    /// Stable machine-readable code for surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            AssistantError::UnknownTaskKind(_) => "unknown_task_kind",
            AssistantError::Unavailable { .. } => "assistant_unavailable",
            AssistantError::Cancelled => "cancelled",
        }
    }

    /// Message safe to show an end user. Never includes transport details.
    pub fn public_message(&self) -> String {
        match self {
            AssistantError::UnknownTaskKind(kind) => format!("Unknown task kind: {kind}"),
            AssistantError::Unavailable { .. } => "Assistant unavailable".into(),
            AssistantError::Cancelled => "Request cancelled".into(),
        }
    }
}
