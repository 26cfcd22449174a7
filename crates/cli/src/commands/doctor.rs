//! `propdesk doctor`: Diagnose configuration health.

use propdesk_config::AppConfig;
use propdesk_core::OperatingContext;
use propdesk_security::AccessTable;
use std::time::Duration;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 PropDesk Doctor: Configuration Diagnostics");
    println!("=============================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `propdesk onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured for {}", config.default_provider);
    } else {
        println!("  ⚠️  No API key configured, add api_key to config.toml or export PROPDESK_API_KEY");
        issues += 1;
    }

    let router = propdesk_providers::router::build_from_config(&config);
    let mut names = router.list();
    names.sort_unstable();
    println!("  ✅ Providers: {}", names.join(", "));

    if config.has_api_key() {
        match router.chain() {
            Some(chain) => {
                match tokio::time::timeout(Duration::from_secs(10), chain.health_check()).await {
                    Ok(Ok(true)) => println!("  ✅ Provider {} reachable", chain.name()),
                    Ok(Ok(false)) => {
                        println!("  ⚠️  Provider {} answered but rejected the health check", chain.name());
                        issues += 1;
                    }
                    Ok(Err(e)) => {
                        println!("  ❌ Provider {} unreachable: {e}", chain.name());
                        issues += 1;
                    }
                    Err(_) => {
                        println!("  ❌ Provider {} did not answer within 10s", chain.name());
                        issues += 1;
                    }
                }
            }
            None => {
                println!("  ❌ Default provider {} is not configured", config.default_provider);
                issues += 1;
            }
        }
    }

    match AccessTable::from_config(&config.access) {
        Ok(table) => {
            println!("  ✅ Access table: {} resources", table.len());
            for context in OperatingContext::ALL {
                let resource = context.assistant_resource();
                match table.get(&resource) {
                    Ok(allowed) => println!("     {resource} → {}", allowed.roles()),
                    Err(_) => {
                        println!("  ❌ {resource} is not declared; the {context} assistant is unreachable");
                        issues += 1;
                    }
                }
            }
        }
        Err(e) => {
            println!("  ❌ Access table invalid: {e}");
            issues += 1;
        }
    }

    if config.identity.sessions.is_empty() {
        println!("  ⚠️  No identity sessions configured; every caller is anonymous");
        issues += 1;
    } else {
        println!("  ✅ {} identity session(s)", config.identity.sessions.len());
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
