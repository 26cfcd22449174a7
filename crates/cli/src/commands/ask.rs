//! `propdesk ask`: Run one assistant task through the access guard.
//!
//! Ctrl-C abandons the request: whichever wait is in progress (identity or
//! provider) stops and any late answer is dropped.

use propdesk_config::AppConfig;
use propdesk_core::{AssistantError, Credentials, OperatingContext};
use propdesk_security::Guarded;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::parse_input;

pub async fn run(
    surface: OperatingContext,
    task: String,
    input: Option<String>,
    token: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let state = propdesk_gateway::build_state(&config, surface)?;

    let input = parse_input(input.as_deref());
    let credentials = token.map(Credentials::bearer).unwrap_or_default();
    let resource = surface.assistant_resource();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, abandoning request");
            on_interrupt.cancel();
        }
    });

    let dispatcher = &state.dispatcher;
    let outcome = state
        .guard
        .protect(&credentials, &resource, &cancel, |_caller| {
            dispatcher.handle_cancellable(&task, &input, &cancel)
        })
        .await?;

    match outcome {
        Guarded::Rendered(Ok(reply)) => {
            println!("{}", reply.text);
            debug!(model = %reply.model, attempts = reply.attempts, "Assistant replied");
        }
        Guarded::Rendered(Err(AssistantError::Cancelled)) | Guarded::Abandoned => {
            println!("⚠️  Request abandoned");
        }
        Guarded::Rendered(Err(e)) => return Err(e.public_message().into()),
        Guarded::Redirect { location } => {
            return Err(format!("Not signed in; authenticate at {location}").into());
        }
        Guarded::Forbidden => {
            return Err(format!("Forbidden: your roles do not grant access to {resource}").into());
        }
    }

    Ok(())
}
