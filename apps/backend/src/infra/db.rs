use std::future::Future;
use std::time::Duration;

use migration::{migrate, MigrationCommand};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{info, warn};

use crate::config::db::{db_url, DbKind, RuntimeEnv};
use crate::error::AppError;

/// Retry a connection attempt with fixed interval delays.
/// Returns the last error once the attempts are exhausted.
async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval: Duration,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    loop {
        match connect_fn().await {
            Ok(conn) => {
                if attempt > 1 {
                    info!(attempts = attempt, "connection_retry=success");
                }
                return Ok(conn);
            }
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "connection_retry=failed");
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn connect_options(url: &str, kind: DbKind) -> ConnectOptions {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.acquire_timeout(Duration::from_secs(5)).sqlx_logging(false);
    match kind {
        // Every connection to `sqlite::memory:` opens its own database, so the
        // pool must hold exactly one.
        DbKind::SqliteMemory => {
            opt.min_connections(1).max_connections(1);
        }
        // SQLite admits one writer per file; a wider pool only trades queueing
        // for SQLITE_BUSY. Other processes on the same file still can contend,
        // and `map_db_err` reports that as a retryable `DbBusy`.
        DbKind::SqliteFile => {
            opt.min_connections(1).max_connections(1);
        }
        DbKind::Postgres => {
            opt.min_connections(1).max_connections(16);
        }
    }
    opt
}

/// Open a pool for the given environment and engine. Runs no migrations.
pub async fn connect_db(env: RuntimeEnv, kind: DbKind) -> Result<DatabaseConnection, AppError> {
    let url = db_url(env, kind)?;
    let opt = connect_options(&url, kind);

    if kind == DbKind::Postgres {
        retry_connection(
            || {
                let opt = opt.clone();
                async move {
                    Database::connect(opt).await.map_err(|e| {
                        AppError::db_unavailable(format!("failed to connect to Postgres: {e}"))
                    })
                }
            },
            5,
            Duration::from_millis(500),
        )
        .await
    } else {
        Database::connect(opt)
            .await
            .map_err(|e| AppError::db_unavailable(format!("failed to open SQLite database: {e}")))
    }
}

/// Connect and bring the schema up to date. The single entrypoint used by
/// the server and by test state builders.
pub async fn bootstrap_db(env: RuntimeEnv, kind: DbKind) -> Result<DatabaseConnection, AppError> {
    info!(?env, ?kind, "bootstrap=start");
    let conn = connect_db(env, kind).await?;
    migrate(&conn, MigrationCommand::Up)
        .await
        .map_err(|e| AppError::config(format!("migration failed: {e}")))?;
    info!(?env, ?kind, "bootstrap=ready");
    Ok(conn)
}
