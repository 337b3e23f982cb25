mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::ExportFormat;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "league-simulator")]
#[command(about = "Round-robin football league simulator with Monte-Carlo predictions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Overrides SERVER_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize the database
    InitDb,
    /// Insert the default teams if none exist
    Seed,
    /// Create a league from every stored team
    CreateLeague {
        #[arg(short, long)]
        name: String,
    },
    /// Simulate the next week, or every remaining week with --all
    Simulate {
        #[arg(short, long)]
        league: i64,
        #[arg(short, long)]
        all: bool,
    },
    /// Show the current standings of a league
    Standings {
        #[arg(short, long)]
        league: i64,
    },
    /// Predict the final standings of a league
    Predict {
        #[arg(short, long)]
        league: i64,
    },
    /// Query a team by (approximate) name
    Team {
        #[arg(short, long)]
        name: String,
    },
    /// Export the current standings of a league
    Export {
        #[arg(short, long)]
        league: i64,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.server_port);
            tracing::info!("Starting league simulator API server on port {}", port);
            api::serve(&config, port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database(&config.database_url).await?;
        }
        Some(Commands::Seed) => cli::seed(&config).await?,
        Some(Commands::CreateLeague { name }) => cli::create_league(&config, &name).await?,
        Some(Commands::Simulate { league, all }) => cli::simulate(&config, league, all).await?,
        Some(Commands::Standings { league }) => cli::show_standings(&config, league).await?,
        Some(Commands::Predict { league }) => cli::predict(&config, league).await?,
        Some(Commands::Team { name }) => {
            tracing::info!("Querying team: {}", name);
            cli::query_team(&config, &name).await?;
        }
        Some(Commands::Export {
            league,
            format,
            output,
        }) => cli::export(&config, league, format, output).await?,
        None => {
            // Default to serving
            tracing::info!("Starting league simulator API server on port {}", config.server_port);
            api::serve(&config, config.server_port).await?;
        }
    }

    Ok(())
}
