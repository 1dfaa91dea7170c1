//! NewsNexus API entry point

mod commands;

use clap::Command;
use newsnexus::{config::Config, error};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    error::install_error_handlers()?;

    let config = Config::load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    let base_app = Command::new("NewsNexus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("News-curation API: Google News RSS ingestion and report review");

    let app = commands::register_commands(base_app);
    let matches = app.get_matches();

    commands::handle_commands(matches, &config).await?;

    info!("Execution completed successfully");
    Ok(())
}

fn init_logging(config: &Config) {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.default_level));

    let noisy_crates = "h2=warn,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,sqlx=warn";
    let filter_string = format!("{},{}", env_filter, noisy_crates);
    env_filter = EnvFilter::try_new(&filter_string).unwrap_or(env_filter);

    if let Some(dep_filter) = &config.logging.dependency_filter {
        let filter_string = format!("{},{}", env_filter, dep_filter);
        env_filter = EnvFilter::try_new(&filter_string).unwrap_or(env_filter);
    }

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_current_span(false)).init();
    } else {
        let format = fmt::format().with_thread_ids(true).with_target(false);
        registry.with(fmt::layer().event_format(format)).init();
    }
}
