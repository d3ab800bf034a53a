mod commands;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tideway")]
#[command(about = "Tideway schema migration tooling")]
struct Cli {
    /// Database connection string; falls back to DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Apply,

    /// Revert applied migrations down to, and excluding, the given version
    Rollback {
        /// Target version to roll back to
        version: String,
    },

    /// List applied and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .context("no database URL given; pass --database-url or set DATABASE_URL")?;

    match cli.command {
        Commands::Apply => commands::apply::run(&database_url).await,
        Commands::Rollback { version } => commands::rollback::run(&database_url, &version).await,
        Commands::Status { json } => commands::status::run(&database_url, json).await,
    }
}
