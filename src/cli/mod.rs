pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::database::{DatabaseManager, PgRepository};

#[derive(Parser)]
#[command(name = "centralctl")]
#[command(about = "centralctl - administration tasks for the central server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "User accounts and session tokens")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Organizations")]
    Org {
        #[command(subcommand)]
        cmd: commands::org::OrgCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Database handle shared by the commands that need one.
pub(crate) async fn connect() -> anyhow::Result<(DatabaseManager, PgRepository)> {
    let config = crate::config::config();
    let database = DatabaseManager::connect(&config.database).await?;
    let repo = PgRepository::new(database.pool().clone());
    Ok((database, repo))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
        Commands::Org { cmd } => commands::org::handle(cmd, output_format).await,
    }
}
