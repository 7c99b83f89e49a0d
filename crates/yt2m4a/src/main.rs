use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use yt2m4a::cli::{Cli, Commands};
use yt2m4a::web_server::{start_web_server, WebState};
use yt2m4a_core::core::{init_logger, log_extractor_configuration};
use yt2m4a_core::extractor::extractor_version;
use yt2m4a_core::{Config, ExtractorConfig, MetadataFetcher, ValidatedUrl};

/// Entry point
///
/// Loads `.env`, parses CLI arguments, and dispatches to the subcommand.
/// Without a subcommand the web server is started.
///
/// # Errors
/// Returns an error if configuration, logging, or the selected command fails.
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so clap's `env` fallbacks and Config see it
    let _ = dotenv();

    let cli = Cli::parse_args();
    let mut config = Config::from_env()?;

    init_logger(cli.level_filter()?, config.log_file_path.as_deref())?;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            run_server(config).await
        }
        Some(Commands::Info { url }) => run_cli_info(&config.extractor, &url).await,
        Some(Commands::Check) => run_check(&config.extractor).await,
        None => run_server(config).await,
    }
}

/// Run the web server until shutdown
async fn run_server(config: Config) -> Result<()> {
    log_extractor_configuration(&config.extractor);

    match extractor_version(&config.extractor).await {
        Ok(version) => log::info!("yt-dlp version: {}", version),
        Err(e) => log::warn!("Could not determine yt-dlp version: {}", e),
    }

    let state = WebState::new(Arc::new(config.extractor));
    start_web_server(&config.web, state).await
}

/// Print the metadata the info endpoint would return
async fn run_cli_info(extractor: &ExtractorConfig, url: &str) -> Result<()> {
    let url = ValidatedUrl::parse(url)?;
    let fetcher = MetadataFetcher::new(Arc::new(extractor.clone()));

    let metadata = fetcher.fetch(&url).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);

    Ok(())
}

/// Print the yt-dlp version, failing when it cannot be run
async fn run_check(extractor: &ExtractorConfig) -> Result<()> {
    log_extractor_configuration(extractor);

    let version = extractor_version(extractor).await?;
    println!("{} {}", extractor.bin, version);

    Ok(())
}
