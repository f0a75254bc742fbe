use anyhow::Result;
use clap::{Parser, Subcommand};
use portal_core::{config::Config, migration, server, state::HasServices, telemetry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "portal-core")]
#[command(about = "Customer portal backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database if needed and apply migrations
    Migrate,
    /// Pull every identity-provider user into the local users table
    SyncUsers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let prometheus_handle = telemetry::init(&config.telemetry);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting Portal Core on {}", config.http_addr());
            server::run(config, prometheus_handle).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
        Command::SyncUsers => {
            let state = server::AppState::connect(config, prometheus_handle).await?;
            let synced = state.identity_sync_service().sync_users().await?;
            info!(synced, "Identity sync finished");
            Ok(())
        }
    }
}
