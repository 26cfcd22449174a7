//! Static identity provider backed by configured bearer tokens.
//!
//! Meant for local development and tests. Tokens are kept only as SHA-256
//! digests, so neither `Debug` output nor a memory dump of the table reveals
//! a usable credential.

use async_trait::async_trait;
use propdesk_config::IdentityConfig;
use propdesk_core::{Caller, Credentials, IdentityError, IdentityProvider, RoleSet, SessionId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    sessions: HashMap<String, Caller>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token. The caller's session id is derived from the token digest.
    pub fn with_session<I, S>(mut self, token: &str, subject: Option<&str>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let digest = token_digest(token);
        let mut caller = Caller::authenticated(
            SessionId(format!("static-{}", &digest[..12])),
            RoleSet::from_labels(roles),
        );
        if let Some(subject) = subject {
            caller = caller.with_subject(subject);
        }
        self.sessions.insert(digest, caller);
        self
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        config.sessions.iter().fold(Self::new(), |provider, session| {
            provider.with_session(&session.token, session.subject.as_deref(), &session.roles)
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn current_caller(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Option<Caller>, IdentityError> {
        let Some(token) = credentials.bearer.as_deref() else {
            return Ok(None);
        };

        let caller = self.sessions.get(&token_digest(token)).cloned();
        if caller.is_none() {
            debug!("Bearer token did not match any configured session");
        }
        Ok(caller)
    }
}
