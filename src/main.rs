mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use colorin::config::Config;

#[derive(Parser)]
#[command(
    name = "colorin",
    version,
    about = "Equitable teacher assignment and recommendation engine for event staffing",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file (defaults to COLORIN_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// JSON snapshot to seed the in-memory store with
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Address to bind to
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Rank candidate teachers for an event
    Rank {
        /// JSON snapshot file
        #[arg(short, long)]
        data: PathBuf,

        /// Event id
        #[arg(short, long)]
        event: i64,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Assign the least loaded teachers to an event
    AutoAssign {
        /// JSON snapshot file
        #[arg(short, long)]
        data: PathBuf,

        /// Event id
        #[arg(short, long)]
        event: i64,

        /// Number of teachers to assign
        #[arg(short = 'n', long)]
        count: usize,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Write the updated snapshot back to the data file
        #[arg(long, default_value = "false")]
        save: bool,
    },

    /// Show how evenly future work is spread
    Report {
        /// JSON snapshot file
        #[arg(short, long)]
        data: PathBuf,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show assignment counts per teacher
    Stats {
        /// JSON snapshot file
        #[arg(short, long)]
        data: PathBuf,

        /// First event date included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last event date included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    let log_format = cli
        .log_format
        .as_deref()
        .unwrap_or(config.logging.format.as_str())
        .to_string();
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("colorin starting");

    match cli.command {
        Commands::Serve { data, bind } => {
            tracing::info!(data = ?data, bind = ?bind, "Starting serve command");
            commands::serve(config, data, bind).await?;
        }

        Commands::Rank { data, event, as_of } => {
            tracing::info!(data = %data.display(), event = %event, "Starting rank command");
            commands::rank(&config, &data, event, as_of).await?;
        }

        Commands::AutoAssign {
            data,
            event,
            count,
            as_of,
            save,
        } => {
            tracing::info!(
                data = %data.display(),
                event = %event,
                count = %count,
                save = %save,
                "Starting auto-assign command"
            );
            commands::auto_assign(&config, &data, event, count, as_of, save).await?;
        }

        Commands::Report { data, as_of } => {
            tracing::info!(data = %data.display(), "Starting report command");
            commands::report(&config, &data, as_of).await?;
        }

        Commands::Stats { data, from, to } => {
            tracing::info!(data = %data.display(), from = ?from, to = ?to, "Starting stats command");
            commands::stats(&config, &data, from, to).await?;
        }
    }

    tracing::info!("colorin completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("colorin=debug,info")
    } else if level == "info" {
        tracing_subscriber::EnvFilter::new("colorin=info,warn")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("colorin={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
