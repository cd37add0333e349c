//! `carebridge gateway`: Start the HTTP API server.

use carebridge_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("AI 케어브릿지 Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);
    println!("   CORS:      {}", config.gateway.cors_origins.join(", "));

    carebridge_gateway::start(config).await?;

    Ok(())
}
