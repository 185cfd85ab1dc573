//! `smidgen` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`   : start the API server.
//! - `check-db`: verify the database is reachable with the read tier.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use db::{AuditSink, ConnectionManager, DatabaseConfig, Privilege, RecordMapper};
use service::Services;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(
    name = "smidgen",
    about = "Logistics record-keeping backend",
    version
)]
struct Cli {
    /// Server environments file.
    #[arg(long, env = "SMIDGEN_SERVER_CONFIG", default_value = "configs/server.yaml")]
    server_config: PathBuf,

    /// Per-tier database credentials file.
    #[arg(long, env = "SMIDGEN_DB_CONFIG", default_value = "configs/db_conn.yaml")]
    db_config: PathBuf,

    /// Environment to run, as named in the server config.
    #[arg(long, env = "SMIDGEN_ENVIRONMENT", default_value = "Development")]
    environment: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve,
    /// Check that the database accepts connections, retrying a few times.
    CheckDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let server_config = ServerConfig::load(&cli.server_config)?;
    let env = server_config.environment(&cli.environment)?.clone();
    logging::init_logging(env.debug)?;
    info!("Loaded server configuration for {}", cli.environment);

    let db_config = DatabaseConfig::load(&cli.db_config)
        .with_context(|| format!("failed to load {}", cli.db_config.display()))?;
    let manager = Arc::new(ConnectionManager::new(db_config));

    match cli.command {
        Command::Serve => {
            let latency =
                wait_for_database(&manager, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await?;
            debug!("Database connection successful ({}ms)", latency.as_millis());

            let audit = Arc::new(AuditSink::postgres(manager.clone()));
            let mapper = Arc::new(RecordMapper::new(manager.clone(), audit.clone()));
            let state = api::AppState::new(Services::new(mapper));

            let bind = env.bind_addr();
            info!("Starting API server on {bind}");
            let served = api::serve(&bind, state, &env.root_path, shutdown_signal()).await;

            let stats = audit.shutdown().await;
            info!(
                written = stats.written,
                failed = stats.failed,
                dropped = stats.dropped,
                "Audit sink drained"
            );
            manager.close().await;
            served.context("API server failed")?;
        }
        Command::CheckDb => {
            let latency =
                wait_for_database(&manager, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await?;
            println!("Database reachable ({}ms)", latency.as_millis());
            manager.close().await;
        }
    }
    Ok(())
}

/// Ping the read tier up to `attempts` times, sleeping `delay` between tries.
async fn wait_for_database(
    manager: &ConnectionManager,
    attempts: u32,
    delay: Duration,
) -> Result<Duration> {
    for attempt in 1..=attempts {
        match manager.ping(Privilege::Read).await {
            Ok(latency) => return Ok(latency),
            Err(e) if attempt < attempts => {
                warn!(
                    "Failed to connect to database: {e}. Retrying in {}s... (attempt {attempt}/{attempts})",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => warn!("Failed to connect to database: {e}"),
        }
    }
    bail!(
        "failed to connect to database after {attempts} attempts; \
         verify the database is running then relaunch the server"
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_manager() -> ConnectionManager {
        let tier = "{ host: 127.0.0.1, port: 1, user: nobody, password: x, database: none }";
        let config = DatabaseConfig::from_yaml(&format!(
            "admin: {tier}\nread: {tier}\nwrite: {tier}\ndelete: {tier}\n\
             pool: {{ max_connections: 1, acquire_timeout_secs: 1 }}\n"
        ))
        .unwrap();
        ConnectionManager::new(config)
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["smidgen", "serve"]).unwrap();
        assert_eq!(cli.environment, "Development");
        assert_eq!(cli.server_config, PathBuf::from("configs/server.yaml"));
        assert_eq!(cli.db_config, PathBuf::from("configs/db_conn.yaml"));
        assert!(matches!(cli.command, Command::Serve));

        let cli = Cli::try_parse_from(["smidgen", "--environment", "Production", "check-db"]).unwrap();
        assert_eq!(cli.environment, "Production");
        assert!(matches!(cli.command, Command::CheckDb));
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let manager = unreachable_manager();
        let err = wait_for_database(&manager, 2, Duration::ZERO).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to connect to database after 2 attempts; \
             verify the database is running then relaunch the server"
        );
    }

    #[tokio::test]
    async fn closed_manager_is_never_retried_into_life() {
        let manager = unreachable_manager();
        manager.close().await;
        assert!(wait_for_database(&manager, 1, Duration::ZERO).await.is_err());
    }
}
