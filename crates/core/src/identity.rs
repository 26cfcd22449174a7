//! Identity boundary: resolving who the caller is.
//!
//! The identity provider is an external collaborator (a hosted auth service
//! in production). The core only needs one question answered: given the
//! credentials presented with this request, who is calling and which roles
//! do they hold?

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::caller::Caller;
use crate::error::IdentityError;

/// Credentials presented by a surface on behalf of the caller.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token, if the caller sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self { bearer: None }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
        }
    }

    /// Parse an `Authorization` header value. Anything but `Bearer <token>` is ignored.
    pub fn from_authorization(header: Option<&str>) -> Self {
        let bearer = header
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        Self { bearer }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer", &self.bearer.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Resolves the current caller.
///
/// Resolution is asynchronous and may be slow; callers are expected to bound
/// the wait. `Ok(None)` means the credentials identify nobody.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Resolve the caller behind `credentials`.
    async fn current_caller(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Option<Caller>, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_header_parsing() {
        let creds = Credentials::from_authorization(Some("Bearer abc123"));
        assert_eq!(creds.bearer.as_deref(), Some("abc123"));

        assert!(Credentials::from_authorization(Some("Basic dXNlcg==")).bearer.is_none());
        assert!(Credentials::from_authorization(Some("Bearer   ")).bearer.is_none());
        assert!(Credentials::from_authorization(None).bearer.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let creds = Credentials::bearer("super-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
