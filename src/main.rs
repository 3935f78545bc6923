use anyhow::Result;
use clap::{Parser, Subcommand};
use mailgrant_core::{config::Config, migration, server, telemetry};
use tracing::info;

#[derive(Parser)]
#[command(name = "mailgrant-core", version, about = "Delegated mail grant service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database if needed and apply migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    telemetry::init(&config.telemetry);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting Mailgrant Core");
            info!("HTTP server listening on {}", config.http_addr());
            server::run(config).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
    }
}
