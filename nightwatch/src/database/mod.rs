//! SQLite-backed operational history (§6 ADDED): safety-evaluation
//! records, tool execution log, and mount command log. Deliberately does
//! NOT hold alert history (kept in-memory per §3) or session logs
//! (persisted as JSON per §6); deleting this database loses no state any
//! invariant requires to survive a restart.

mod history;

pub use history::{MountCommandRecord, SafetyEvalRecord, ToolExecRecord};

use std::path::Path;

use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let database_url = format!("sqlite:{database_path}?mode=rwc");
        info!(url = %database_url, "opening operational history database");
        let pool = SqlitePool::connect(&database_url).await?;
        let database = Self { pool };
        database.initialize_tables().await?;
        Ok(database)
    }

    async fn initialize_tables(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS safety_evaluations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                at TEXT NOT NULL,
                action TEXT NOT NULL,
                is_safe INTEGER NOT NULL,
                level TEXT NOT NULL,
                reasons TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tool_executions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                at TEXT NOT NULL,
                tool TEXT NOT NULL,
                status TEXT NOT NULL,
                elapsed_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mount_commands (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                at TEXT NOT NULL,
                opcode TEXT NOT NULL,
                ok INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
