//! `liftlog ask`: one question, one graph run.

use liftlog_config::AppConfig;
use liftlog_gateway::GatewayState;

pub async fn run(question: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set LIFTLOG_API_KEY or OPENAI_API_KEY, or add api_key to:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let state = GatewayState::from_config(&config).await?;
    let record = state.graph.run(question).await;

    if let Some(code) = record.error_code() {
        tracing::debug!(error_code = code, run_id = %record.run_id, "Run ended in ErrorHandler");
    }
    println!("{}", record.answer.unwrap_or_default());

    Ok(())
}
