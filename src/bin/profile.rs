//! Worker activity profile generator.
//!
//! Reconstructs per-analysis worker concurrency over time from a hive
//! database and emits it as a tab-separated table on stdout, or as a
//! stacked-area chart when an output file is given (the extension selects
//! the format).

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDateTime;
use clap::Parser;
use sea_orm::Database;
use tracing_subscriber::EnvFilter;

use apiary::profiler::{render, ActivityProfile, ProfileOptions, TopSelection};

#[derive(Parser)]
#[command(
    name = "apiary-profile",
    version,
    about = "Reconstruct historical worker activity of a hive"
)]
struct Cli {
    /// Database URL of the hive to profile
    #[arg(long, env = "HIVE_URL")]
    url: String,

    /// Start of the profiled range (e.g. 2026-08-01T00:00:00); defaults to
    /// the first worker birth
    #[arg(long)]
    start_date: Option<NaiveDateTime>,

    /// End of the profiled range; defaults to the last worker death
    #[arg(long)]
    end_date: Option<NaiveDateTime>,

    /// Bucket granularity in minutes
    #[arg(long, default_value_t = 5)]
    granularity: u32,

    /// Collapse idle periods longer than this many minutes
    #[arg(long, default_value_t = 120)]
    skip_no_activity: u32,

    /// Keep the top N analyses (integer) or the smallest set covering this
    /// fraction of total worker time (fraction below 1); chart output only
    #[arg(long)]
    top: Option<TopSelection>,

    /// Output file; the extension selects the chart format (svg, png, jpg,
    /// gif, bmp). Without it the profile goes to stdout as TSV
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), apiary::Error> {
    let db = Database::connect(&cli.url).await?;

    let options = ProfileOptions {
        start: cli.start_date,
        end: cli.end_date,
        granularity_minutes: cli.granularity,
        skip_no_activity_minutes: cli.skip_no_activity,
    };

    let profile = ActivityProfile::load(&db, &options).await?;

    match &cli.output {
        Some(output) => {
            render::render_chart(&profile, cli.top.as_ref(), output)?;
            tracing::info!(output = %output.display(), "chart written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            profile.write_tsv(&mut handle)?;
            handle.flush()?;
        }
    }

    Ok(())
}
