use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use color_eyre::eyre::{self, Result};
use newsnexus::{
    app::wait_for_shutdown,
    automation::{RssAutomation, load_query_rows, resolve_request_delay},
    config::Config,
    database::{Database, InMemoryNewsRepository, NewsRepository, PostgresNewsRepository},
    feed::GoogleRssClient,
    query::{QueryRequest, build_query},
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn term_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help).action(ArgAction::Set)
}

/// Register query commands
pub fn register_commands(app: Command) -> Command {
    app.about("Google News RSS query commands")
        .subcommand(
            Command::new("build")
                .about("Print the search query and RSS URL for the given terms")
                .arg(term_arg("and-keywords", "Comma-separated terms that must all appear"))
                .arg(term_arg("and-exact-phrases", "Comma-separated phrases that must all appear"))
                .arg(term_arg("or-keywords", "Comma-separated terms of which any may appear"))
                .arg(term_arg("or-exact-phrases", "Comma-separated phrases of which any may appear"))
                .arg(term_arg("time-range", "Lookback window such as 30d")),
        )
        .subcommand(
            Command::new("automate")
                .about("Run every saved query in a query spreadsheet against Google News RSS")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .help("XLSX workbook whose first sheet holds the query rows")
                        .required(true)
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Store results in memory instead of the database")
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Handle query commands
pub async fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("build", build_matches)) => print_query(build_matches, config),
        Some(("automate", automate_matches)) => automate(automate_matches, config).await,
        _ => {
            register_commands(Command::new("query")).print_help()?;
            Ok(())
        },
    }
}

fn print_query(matches: &ArgMatches, config: &Config) -> Result<()> {
    let value = |name: &str| matches.get_one::<String>(name).cloned();
    let request = QueryRequest {
        and_keywords: value("and-keywords"),
        and_exact_phrases: value("and-exact-phrases"),
        or_keywords: value("or-keywords"),
        or_exact_phrases: value("or-exact-phrases"),
        time_range: value("time-range"),
    };

    let result = build_query(&request);
    let url = config.google_rss.locale().search_url(&result.query);

    println!("query: {}", result.query);
    println!("and:   {}", result.and_string);
    println!("or:    {}", result.or_string);
    if result.time_range_invalid {
        println!("time range missing or invalid, using {}", result.time_range);
    }
    println!("url:   {}", url);
    Ok(())
}

async fn automate(matches: &ArgMatches, config: &Config) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("file")
        .ok_or_else(|| eyre::eyre!("--file is required"))?;
    let rows = load_query_rows(path).await?;

    let repo: Arc<dyn NewsRepository> = if matches.get_flag("dry-run") {
        info!("Dry run: results are kept in memory");
        Arc::new(InMemoryNewsRepository::new())
    } else {
        let database = Arc::new(
            Database::new(&config.database)
                .await
                .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?,
        );
        database.log_connection_info();
        Arc::new(PostgresNewsRepository::new(database))
    };

    let feed = Arc::new(GoogleRssClient::new(&config.google_rss)?);
    let automation = RssAutomation::new(repo, feed, config.google_rss.locale())
        .with_delay(resolve_request_delay(&config.automation));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown().await {
            error!("Failed to listen for shutdown signals: {}", e);
            return;
        }
        signal_cancel.cancel();
    });

    let summary = automation.run(&rows, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
