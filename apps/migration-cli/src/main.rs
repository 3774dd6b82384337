//! `migration`: schema and housekeeping commands for the telephone database.
//!
//! ```text
//! migration --db sqlite-file --sqlite-path ./telephone.sqlite3 up
//! migration --env prod status
//! migration --env prod prune --older-than-hours 48
//! ```

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use migration::{count_applied_migrations, get_latest_migration_version, migrate, MigrationCommand};
use telephone::config::db::{DbKind, RuntimeEnv};
use telephone::infra::db::connect_db;
use telephone::repos::sessions;
use time::OffsetDateTime;
use tracing::info;

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Prod,
    Test,
}

/// In-memory SQLite is not offered: it would be gone before the command returns.
#[derive(Clone, Copy, ValueEnum)]
enum Store {
    Postgres,
    SqliteFile,
}

#[derive(Subcommand)]
enum Action {
    /// Apply pending migrations
    Up,
    /// Roll back the latest migration
    Down,
    /// Drop every table, then migrate up
    Fresh,
    /// Roll back every migration
    Reset,
    /// Reset, then migrate up
    Refresh,
    /// Show applied migrations
    Status,
    /// Delete finished sessions older than the cutoff
    Prune {
        #[arg(long, default_value_t = 24)]
        older_than_hours: u64,
    },
}

#[derive(Parser)]
#[command(name = "migration", about = "Telephone database tool")]
struct Cli {
    #[command(subcommand)]
    action: Action,

    #[arg(short, long, value_enum, default_value = "test")]
    env: Target,

    #[arg(short, long, value_enum, default_value = "postgres")]
    db: Store,

    /// Database file for `--db sqlite-file`; overrides SQLITE_PATH
    #[arg(long)]
    sqlite_path: Option<String>,

    /// Required for destructive actions against prod
    #[arg(long)]
    yes: bool,
}

impl Action {
    fn destructive(&self) -> bool {
        matches!(self, Action::Down | Action::Fresh | Action::Reset | Action::Refresh)
    }

    fn schema_command(&self) -> Option<MigrationCommand> {
        Some(match self {
            Action::Up => MigrationCommand::Up,
            Action::Down => MigrationCommand::Down,
            Action::Fresh => MigrationCommand::Fresh,
            Action::Reset => MigrationCommand::Reset,
            Action::Refresh => MigrationCommand::Refresh,
            Action::Status => MigrationCommand::Status,
            Action::Prune { .. } => return None,
        })
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let env = match cli.env {
        Target::Prod => RuntimeEnv::Prod,
        Target::Test => RuntimeEnv::Test,
    };
    let kind = match cli.db {
        Store::Postgres => DbKind::Postgres,
        Store::SqliteFile => DbKind::SqliteFile,
    };

    if env == RuntimeEnv::Prod && cli.action.destructive() && !cli.yes {
        return Err("refusing a destructive action on prod without --yes".into());
    }
    if let Some(path) = &cli.sqlite_path {
        std::env::set_var("SQLITE_PATH", path);
    }

    let conn = connect_db(env, kind)
        .await
        .map_err(|e| format!("failed to connect: {e}"))?;

    if let Action::Prune { older_than_hours } = cli.action {
        let cutoff = OffsetDateTime::now_utc() - Duration::from_secs(older_than_hours * 3600);
        let removed = sessions::reap_finished(&conn, cutoff)
            .await
            .map_err(|e| format!("prune failed: {e}"))?;
        info!(removed, older_than_hours, "pruned finished sessions");
    }

    if let Some(command) = cli.action.schema_command() {
        migrate(&conn, command)
            .await
            .map_err(|e| format!("migration failed: {e}"))?;
        let applied = count_applied_migrations(&conn).await.unwrap_or(0);
        let latest = get_latest_migration_version(&conn).await.ok().flatten();
        info!(applied, latest = latest.as_deref().unwrap_or("none"), "schema");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_env_filter("migration=info,telephone=info,sqlx=warn")
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
