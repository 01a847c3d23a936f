//! `pinchat serve`: start the HTTP API server.

use pinchat_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("💬 PinChat");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.model);
    println!("   Store:     {}", config.database.backend);

    pinchat_gateway::start(config).await?;

    Ok(())
}
