//! Access guard: gates a protected view behind identity resolution and the
//! access table.
//!
//! The guard resolves the caller (bounded by a timeout, abandonable through a
//! [`CancellationToken`]), evaluates the [`AccessGate`], and only then invokes
//! the render closure. Unauthenticated callers get a redirect to the login
//! path; authenticated callers without a matching role get `Forbidden`.
//! Identity failures never permit: they are treated as no session.

use propdesk_config::AppConfig;
use propdesk_core::{Caller, Credentials, DenyReason, IdentityError, IdentityProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditLogger, AuditOutcome};
use crate::gate::{AccessGate, Decision};
use crate::policy::{AccessPolicyError, AccessTable};

/// What a protected view produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// Access permitted; the protected content
    Rendered(T),
    /// No session; send the caller to the login path
    Redirect { location: String },
    /// Authenticated but not allowed
    Forbidden,
    /// The request was cancelled before a decision was reached
    Abandoned,
}

impl<T> Guarded<T> {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Guarded::Rendered(_))
    }
}

pub struct AccessGuard {
    identity: Arc<dyn IdentityProvider>,
    table: Arc<AccessTable>,
    identity_timeout: Duration,
    login_path: String,
    audit: Option<Arc<AuditLogger>>,
}

impl AccessGuard {
    pub fn new(identity: Arc<dyn IdentityProvider>, table: Arc<AccessTable>) -> Self {
        Self {
            identity,
            table,
            identity_timeout: Duration::from_secs(10),
            login_path: "/login".into(),
            audit: None,
        }
    }

    pub fn with_identity_timeout(mut self, timeout: Duration) -> Self {
        self.identity_timeout = timeout;
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build a guard from `[access]` and `[identity]` config sections.
    pub fn from_config(
        config: &AppConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AccessPolicyError> {
        let table = AccessTable::from_config(&config.access)?;
        Ok(Self::new(identity, Arc::new(table))
            .with_identity_timeout(Duration::from_millis(config.identity.timeout_ms))
            .with_login_path(config.access.login_path.clone()))
    }

    pub fn table(&self) -> &AccessTable {
        &self.table
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Evaluate access to `resource` without rendering anything.
    ///
    /// Returns `Ok(None)` when `cancel` fires before the caller is resolved.
    pub async fn check(
        &self,
        credentials: &Credentials,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Decision>, AccessPolicyError> {
        Ok(self
            .decide(credentials, resource, cancel)
            .await?
            .map(|(_, decision)| decision))
    }

    /// Gate a view. `render` runs only on `Permit` and receives the resolved caller.
    pub async fn protect<T, F, Fut>(
        &self,
        credentials: &Credentials,
        resource: &str,
        cancel: &CancellationToken,
        render: F,
    ) -> Result<Guarded<T>, AccessPolicyError>
    where
        F: FnOnce(Caller) -> Fut,
        Fut: Future<Output = T>,
    {
        let Some((caller, decision)) = self.decide(credentials, resource, cancel).await? else {
            return Ok(Guarded::Abandoned);
        };

        Ok(match decision {
            Decision::Permit => Guarded::Rendered(render(caller).await),
            Decision::Deny(DenyReason::NotAuthenticated) => Guarded::Redirect {
                location: self.login_path.clone(),
            },
            Decision::Deny(DenyReason::InsufficientRole) => Guarded::Forbidden,
        })
    }

    async fn decide(
        &self,
        credentials: &Credentials,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<(Caller, Decision)>, AccessPolicyError> {
        // Unknown resources are a setup error, reported before touching identity.
        let allowed = self.table.get(resource)?;

        let Some(caller) = self.resolve_caller(credentials, resource, cancel).await else {
            debug!(resource, "Access check abandoned");
            return Ok(None);
        };

        let decision = AccessGate::evaluate(&caller, allowed);
        match decision {
            Decision::Permit => {
                info!(resource, caller = %caller.display_name(), "Access granted");
                self.record(
                    AuditEvent::AccessGranted { resource: resource.into() },
                    &caller,
                    resource,
                    AuditOutcome::Success,
                );
            }
            Decision::Deny(reason) => {
                info!(resource, caller = %caller.display_name(), %reason, "Access denied");
                self.record(
                    AuditEvent::AccessDenied {
                        resource: resource.into(),
                        reason: reason.as_str().into(),
                    },
                    &caller,
                    resource,
                    AuditOutcome::Denied,
                );
            }
        }

        Ok(Some((caller, decision)))
    }

    /// `None` means cancelled. Failures and timeouts resolve to an anonymous caller.
    async fn resolve_caller(
        &self,
        credentials: &Credentials,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Option<Caller> {
        if cancel.is_cancelled() {
            return None;
        }

        let lookup = tokio::time::timeout(
            self.identity_timeout,
            self.identity.current_caller(credentials),
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            outcome = lookup => outcome,
        };

        let caller = match outcome {
            Ok(Ok(Some(caller))) => caller,
            Ok(Ok(None)) => Caller::anonymous(),
            Ok(Err(e)) => {
                warn!(provider = self.identity.name(), error = %e, "Identity resolution failed");
                self.record_identity_failure(resource, e.to_string());
                Caller::anonymous()
            }
            Err(_) => {
                let e = IdentityError::Timeout(self.identity_timeout.as_millis() as u64);
                warn!(provider = self.identity.name(), error = %e, "Identity resolution timed out");
                self.record_identity_failure(resource, e.to_string());
                Caller::anonymous()
            }
        };
        Some(caller)
    }

    fn record(&self, event: AuditEvent, caller: &Caller, resource: &str, outcome: AuditOutcome) {
        if let Some(audit) = &self.audit {
            audit.log(event, caller.display_name(), resource, outcome, None);
        }
    }

    fn record_identity_failure(&self, resource: &str, details: String) {
        if let Some(audit) = &self.audit {
            audit.log(
                AuditEvent::IdentityFailure,
                "anonymous",
                resource,
                AuditOutcome::Failure,
                Some(details),
            );
        }
    }
}
