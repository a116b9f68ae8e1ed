use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crafty_kid::config::AppConfig;
use crafty_kid::db::{open_and_prepare, DynError};
use crafty_kid::seed::run_seed;
use crafty_kid::serve::serve;

#[derive(Parser, Debug)]
#[command(author, version, about = "Crafty Kid marketplace: craft classes for children")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the site and API over HTTP
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the database schema and record its version
    InitDb {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write the demo pages, site settings and catalog (idempotent)
    Seed {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), DynError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Serve { config, port } => {
            let mut config = AppConfig::load(&config)?;
            if let Some(port) = port {
                config.port = port;
            }
            serve(config)
        }
        Command::InitDb { config } => {
            let config = AppConfig::load(&config)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let pool = open_and_prepare(&config.database_path).await?;
                pool.close().await;
                info!("Database ready: {}", config.database_path.display());
                Ok::<(), DynError>(())
            })
        }
        Command::Seed { config } => {
            let config = AppConfig::load(&config)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let pool = open_and_prepare(&config.database_path).await?;
                let report = run_seed(&pool).await;
                pool.close().await;
                if report.failed > 0 {
                    return Err(format!("{} seed item(s) failed, see log", report.failed).into());
                }
                Ok::<(), DynError>(())
            })
        }
    }
}
