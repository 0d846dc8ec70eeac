//! `campusdesk serve` — Start the HTTP gateway.

use campusdesk_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    // Missing credential is fatal before anything is printed or bound
    config.require_api_key()?;

    println!("🎓 CampusDesk Gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.backend.model);
    println!("   Sessions:  {:?}", config.session.mode);

    campusdesk_gateway::start(config).await?;

    Ok(())
}
