//! Insert/prune operations for each history table, each bounded to its
//! window constant so the database never grows unbounded (§3, §6).

use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, error};

use crate::constants::safety::HISTORY_WINDOW_ROWS;
use crate::constants::tools::EXECUTION_LOG_WINDOW_ROWS;

use super::Database;

#[derive(Debug, Clone)]
pub struct SafetyEvalRecord {
    pub at: DateTime<Utc>,
    pub action: String,
    pub is_safe: bool,
    pub level: String,
    pub reasons: String,
}

#[derive(Debug, Clone)]
pub struct ToolExecRecord {
    pub at: DateTime<Utc>,
    pub tool: String,
    pub status: String,
    pub elapsed_ms: i64,
}

#[derive(Debug, Clone)]
pub struct MountCommandRecord {
    pub at: DateTime<Utc>,
    pub opcode: String,
    pub ok: bool,
}

impl Database {
    pub async fn record_safety_eval(&self, record: &SafetyEvalRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO safety_evaluations (at, action, is_safe, level, reasons) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.at)
        .bind(&record.action)
        .bind(record.is_safe)
        .bind(&record.level)
        .bind(&record.reasons)
        .execute(self.pool())
        .await
        .map_err(|err| {
            error!(error = %err, "failed to record safety evaluation");
            err
        })?;
        self.trim_table("safety_evaluations", HISTORY_WINDOW_ROWS).await
    }

    pub async fn record_tool_exec(&self, record: &ToolExecRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO tool_executions (at, tool, status, elapsed_ms) VALUES (?, ?, ?, ?)",
        )
        .bind(record.at)
        .bind(&record.tool)
        .bind(&record.status)
        .bind(record.elapsed_ms)
        .execute(self.pool())
        .await
        .map_err(|err| {
            error!(error = %err, "failed to record tool execution");
            err
        })?;
        self.trim_table("tool_executions", EXECUTION_LOG_WINDOW_ROWS).await
    }

    pub async fn record_mount_command(&self, record: &MountCommandRecord) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO mount_commands (at, opcode, ok) VALUES (?, ?, ?)")
            .bind(record.at)
            .bind(&record.opcode)
            .bind(record.ok)
            .execute(self.pool())
            .await
            .map_err(|err| {
                error!(error = %err, "failed to record mount command");
                err
            })?;
        self.trim_table("mount_commands", HISTORY_WINDOW_ROWS).await
    }

    pub async fn recent_safety_evals(&self, limit: i64) -> anyhow::Result<Vec<SafetyEvalRecord>> {
        let rows = sqlx::query(
            "SELECT at, action, is_safe, level, reasons FROM safety_evaluations ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SafetyEvalRecord {
                at: row.get("at"),
                action: row.get("action"),
                is_safe: row.get("is_safe"),
                level: row.get("level"),
                reasons: row.get("reasons"),
            })
            .collect())
    }

    /// Deletes the oldest rows once a table exceeds `window`, keeping each
    /// history table a bounded rolling window rather than growing forever.
    async fn trim_table(&self, table: &str, window: i64) -> anyhow::Result<()> {
        let query = format!(
            "DELETE FROM {table} WHERE id NOT IN (SELECT id FROM {table} ORDER BY id DESC LIMIT ?)"
        );
        sqlx::query(&query).bind(window).execute(self.pool()).await?;
        debug!(table, window, "trimmed history table");
        Ok(())
    }
}
