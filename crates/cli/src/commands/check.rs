//! `propdesk check`: Print the access decision for a resource.

use propdesk_config::AppConfig;
use propdesk_core::{Credentials, DenyReason};
use propdesk_security::{AccessGuard, Decision, StaticIdentityProvider};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(resource: String, token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let identity = Arc::new(StaticIdentityProvider::from_config(&config.identity));
    let guard = AccessGuard::from_config(&config, identity)?;

    let credentials = token.map(Credentials::bearer).unwrap_or_default();
    let cancel = CancellationToken::new();

    match guard.check(&credentials, &resource, &cancel).await? {
        Some(Decision::Permit) => println!("✅ permit: {resource}"),
        Some(Decision::Deny(DenyReason::NotAuthenticated)) => {
            println!("🔒 deny ({}): sign in at {}", DenyReason::NotAuthenticated, guard.login_path())
        }
        Some(Decision::Deny(reason)) => println!("⛔ deny ({reason}): {resource}"),
        None => println!("⚠️  abandoned"),
    }

    Ok(())
}
