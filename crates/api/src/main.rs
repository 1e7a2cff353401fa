//! Driver Safety Monitor - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Driver Safety Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Sampling every {}ms, escalating after {}s, SOS contact {}",
        settings.sampler.interval_ms,
        settings.escalation.escalation_delay_secs,
        settings.escalation.default_contact
    );

    run_server(settings).await?;

    Ok(())
}
