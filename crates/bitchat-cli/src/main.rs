//! BitChat trust CLI entry point

use std::path::Path;

use clap::Parser;
use tracing::{debug, error};

use bitchat_cli::{
    cli::Cli, commands::CommandDispatcher, config::CliAppConfig, error::Result, TrustApp,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = CliAppConfig::load(cli.config.as_deref().map(Path::new))?
        .with_overrides(cli.data_dir.as_deref(), cli.verbose);

    // Initialize logging
    setup_logging(config.cli.verbose);
    debug!(?config, "Configuration loaded");

    let app = TrustApp::open(config).await?;
    let outcome = CommandDispatcher::execute(cli.command, &app).await;
    app.shutdown();

    if let Err(e) = outcome {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
