//! MSSQL Config Advisor entry point.
//!
//! Reads the server list, analyzes every server and writes the
//! recommendations table and the detailed analysis next to each other.

use anyhow::{Context, Result};
use clap::Parser;
use mssql_config_advisor::server_list::read_server_list;
use mssql_config_advisor::{Config, MssqlFactSource, Runner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line overrides; everything else comes from the environment.
#[derive(Debug, Parser)]
#[command(name = "mssql-config-advisor", version, about)]
struct Cli {
    /// Newline-delimited list of servers to analyze
    #[arg(short, long, env = "ADVISOR_SERVER_LIST")]
    servers: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(short, long, env = "ADVISOR_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Number of servers analyzed at once
    #[arg(short, long, env = "ADVISOR_CONCURRENCY")]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let version = env!("CARGO_PKG_VERSION");
    info!("MSSQL Config Advisor v{version} starting");

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(servers) = cli.servers {
        config.run.server_list = servers;
    }
    if let Some(output_dir) = cli.output_dir {
        config.run.output_dir = output_dir;
    }
    if let Some(concurrency) = cli.concurrency {
        config.run.concurrency = concurrency;
    }
    config.validate()?;

    // A missing server list is fatal before any server is touched
    let targets = read_server_list(&config.run.server_list).await?;
    info!(
        "Loaded {} server(s) from {}",
        targets.len(),
        config.run.server_list.display()
    );

    let source = MssqlFactSource::new(Arc::new(config.connection.clone()));
    let runner = Runner::new(
        source,
        config.run.concurrency,
        config.connection.query_timeout,
    );
    let (report, summary) = runner.run(&targets).await;

    let files = report
        .write_to_dir(&config.run.output_dir, chrono::Local::now())
        .await
        .context("failed to write reports")?;

    info!(
        "Run {} finished: {} of {} server(s) analyzed, {} failed",
        summary.run_id, summary.analyzed, summary.servers, summary.failed
    );
    eprintln!("Recommendations: {}", files.recommendations.display());
    eprintln!("Detailed analysis: {}", files.detailed.display());

    Ok(())
}

/// Initialize tracing subscriber with stderr output.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,mssql_config_advisor=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
