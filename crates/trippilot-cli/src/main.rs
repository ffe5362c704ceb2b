mod plan;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::plan::PlanCommands;

#[derive(Debug, Parser)]
#[command(name = "trippilot-cli")]
#[command(about = "Trip package planner")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Rank destinations and assemble packages for a plan request
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the configured database answers
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = trippilot_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Db { command }) => {
            let pool = trippilot_db::connect_pool_from_config(&config).await?;
            match command {
                DbCommands::Ping => {
                    trippilot_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = trippilot_db::run_migrations(&pool).await?;
                    println!("applied {applied} migrations");
                }
            }
        }
        Some(Commands::Plan { command }) => plan::run(&config, command).await?,
        None => println!("trippilot-cli ready; run with --help for commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
