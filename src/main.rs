use barkpower::api::HttpBackend;
use barkpower::config::Config;
use barkpower::dashboard::{self, DashboardState};
use barkpower::lookup::LookupService;
use barkpower::market::{fetch_pool_summary, fetch_trade_history};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "barkpower")]
#[command(about = "Bark Power lookups for The Barking Game on Hedera")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "BARK_CONFIG", default_value = "barkpower.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a Hedera account ID (0.0.x) or Twitter handle
    Check {
        query: String,
        /// Include account details
        #[arg(short, long)]
        details: bool,
    },
    /// Accounts ranked by remaining barking power
    Leaderboard {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// $HBARK pool market summary
    Pool,
    /// Recent pool trades with sender details
    Trades,
    /// Run the HTTP dashboard
    Serve {
        /// Overrides dashboard.bind_addr
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_path = Path::new(&cli.config);
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        Config::from_env()
    };

    // Logs go to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("barkpower v{} starting", env!("CARGO_PKG_VERSION"));
    if !config_path.exists() {
        info!(path = %cli.config, "no config file found, using env-only config");
    }

    let backend = Arc::new(HttpBackend::new(&config.api)?);
    let lookup = LookupService::new(backend.clone(), &config.leaderboard);

    match cli.command {
        Command::Check { query, details } => {
            let view = lookup.check(&query, details).await;
            print!("{}", view.to_text());
            if view.error.is_some() {
                std::process::exit(1);
            }
        }
        Command::Leaderboard { limit } => {
            let table = lookup.load_leaderboard(limit).await?;
            print!("{}", table.to_text());
        }
        Command::Pool => {
            let summary = fetch_pool_summary(backend.as_ref()).await?;
            print!("{}", summary.to_text());
        }
        Command::Trades => {
            let history = fetch_trade_history(backend.as_ref(), backend.as_ref()).await?;
            if history.trades.is_empty() {
                println!("  no recent trades");
            } else {
                print!("{}", history.to_text());
            }
        }
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.dashboard.bind_addr.clone());
            let state = DashboardState {
                lookup,
                market: backend,
            };
            dashboard::serve(state, &bind_addr).await?;
        }
    }

    Ok(())
}
