use sqlx::Row;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use workforce_authz::authz::{PermissionCode, PolicyEvaluator};
use workforce_authz::db::SqliteIdentityStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "workforce-authz operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Check whether a caller holds the given permission codes
    Check {
        #[arg(long)]
        caller: String,
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,
        /// Require every permission instead of any one
        #[arg(long)]
        all: bool,
    },
    /// Print the advisory capability summary for a caller
    Capabilities {
        #[arg(long)]
        caller: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fall back to the crate-local `.env` when the CWD has none.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::Check { caller, permissions, all } => {
            let permissions = permissions
                .into_iter()
                .map(PermissionCode::new)
                .collect::<Result<Vec<_>, _>>()?;
            let policy = get_policy().await?;
            let allowed = if all {
                policy.has_all_permissions(&caller, &permissions).await?
            } else {
                policy.has_any_permission(&caller, &permissions).await?
            };
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
        Commands::Capabilities { caller } => {
            let policy = get_policy().await?;
            let rows = [
                ("active", policy.is_user_active(&caller).await?),
                ("can_send_commands", policy.can_send_commands(&caller).await?),
                ("can_manage_users", policy.can_manage_users(&caller).await?),
                ("can_access_pso", policy.can_access_pso(&caller).await?),
                ("can_access_admin", policy.can_access_admin(&caller).await?),
                ("is_admin_or_super_admin", policy.is_admin_or_super_admin(&caller).await?),
                ("is_super_admin", policy.is_super_admin(&caller).await?),
            ];
            for (name, value) in rows {
                println!("{:<26} {}", name, value);
            }
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn get_policy() -> anyhow::Result<PolicyEvaluator> {
    let pool = get_pool().await?;
    Ok(PolicyEvaluator::new(Arc::new(SqliteIdentityStore::new(pool))))
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations, then the crate-local folder.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
