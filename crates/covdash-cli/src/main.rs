mod capture;
mod extract;
mod reprocess;
mod series;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "covdash")]
#[command(about = "Archive the campus COVID-19 dashboard and extract its daily counts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the dashboard and archive it if anything changed
    Capture {
        /// Archive even when the page and its images are unchanged
        #[arg(long)]
        force: bool,
    },
    /// Print the daily counts read from one archived capture
    Extract {
        /// Capture name, e.g. 2020-10-03T13.24.17_0
        capture: String,
    },
    /// Append one series row per archived day not yet in the series
    Reprocess {
        /// Skip captures before this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Append a manually read observation to the series
    Append {
        /// New positive results
        #[arg(long)]
        positive: u64,
        /// New tests administered
        #[arg(long)]
        tests: u64,
        /// Day of the observation (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = covdash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Capture { force } => capture::run_capture(&config, force).await,
        Commands::Extract { capture } => extract::run_extract(&config, &capture),
        Commands::Reprocess { since } => reprocess::run_reprocess(&config, since),
        Commands::Append {
            positive,
            tests,
            date,
        } => series::run_append(&config, positive, tests, date),
    }
}
