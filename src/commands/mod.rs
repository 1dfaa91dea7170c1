pub mod query;
pub mod serve;

use clap::Command;
use color_eyre::eyre::Result;
use newsnexus::config::Config;

/// Register all application commands
pub fn register_commands(app: Command) -> Command {
    app.subcommand(Command::new("serve").about("Start the API server"))
        .subcommand(query::register_commands(Command::new("query")))
}

/// Handle all application commands
pub async fn handle_commands(matches: clap::ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("serve", _)) => serve::run_server(config).await,
        Some(("query", query_matches)) => query::handle_command(query_matches, config).await,
        _ => {
            println!("Please specify a subcommand. Use --help for more information.");
            Ok(())
        },
    }
}
