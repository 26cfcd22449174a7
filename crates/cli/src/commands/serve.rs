//! `propdesk serve`: Start the HTTP gateway for one surface.

use propdesk_config::AppConfig;
use propdesk_core::OperatingContext;

pub async fn run(
    surface: OperatingContext,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🏠 PropDesk Gateway ({surface} surface)");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} / {}", config.default_provider, config.default_model);

    propdesk_gateway::start(config, surface).await?;

    Ok(())
}
