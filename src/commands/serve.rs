use color_eyre::eyre::{self, Result};
use newsnexus::{app::App, config::Config};
use tracing::info;

/// Run the API server until a shutdown signal arrives
pub async fn run_server(config: &Config) -> Result<()> {
    info!(
        "Starting {} on {}:{}",
        config.server.service_name, config.server.host, config.server.port
    );

    let app = App::new(config.clone())
        .await
        .map_err(|e| eyre::eyre!("Failed to create application: {}", e))?;

    app.run_until_shutdown().await.map_err(|e| eyre::eyre!("Server error: {}", e))?;
    Ok(())
}
