use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "course-forge")]
#[command(version, about = "eLearning course generator: research, design spec and storyboard")]
pub struct Cli {
    /// Path to config.toml (default: .course-forge/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port to serve on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path (overrides config and DATABASE_PATH)
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Permissive CORS and bind on all interfaces
        #[arg(long)]
        dev: bool,
    },
    /// Create the database schema and exit
    InitDb {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Load example courses from a JSON array into the knowledge base
    SeedExamples {
        /// JSON file holding an array of example courses
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate configuration and report missing settings
    Validate,
    /// Write a default config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { port, db_path, dev } => {
            cmd::cmd_serve(config_path, port, db_path, dev).await?;
        }
        Commands::InitDb { db_path } => cmd::cmd_init_db(config_path, db_path)?,
        Commands::SeedExamples { file, db_path } => {
            cmd::cmd_seed_examples(config_path, db_path, &file)?
        }
        Commands::Config { command } => cmd::cmd_config(config_path, command)?,
    }

    Ok(())
}
