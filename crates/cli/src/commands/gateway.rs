//! `liftlog gateway`: start the HTTP API server.

use liftlog_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("liftlog gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Storage:   {:?} ({})", config.storage.backend, config.storage.path);
    println!("   Model:     {}", config.active_model());

    liftlog_gateway::start(config).await?;

    Ok(())
}
