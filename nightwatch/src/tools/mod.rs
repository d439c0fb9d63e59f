//! Tool executor (§4.G): component G in the spec's component table.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::constants::tools as tool_consts;
use crate::database::{Database, ToolExecRecord};
use crate::safety::SafetyMonitor;

pub type Params = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolStatus {
    Ok,
    NotFound,
    InvalidParams,
    Vetoed,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub data: Value,
    pub message: String,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ToolStatus::Ok,
            data,
            message: String::new(),
        }
    }

    pub fn error(status: ToolStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            data: Value::Null,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Whether safety must be consulted before running (motion-causing
    /// tools per §4.G step 3).
    fn is_motion_causing(&self) -> bool {
        false
    }

    fn required_params(&self) -> &'static [&'static str] {
        &[]
    }

    async fn call(&self, params: &Params) -> anyhow::Result<ToolResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    pub tool: String,
    pub status: ToolStatus,
    pub elapsed_ms: u64,
    pub at: DateTime<Utc>,
}

pub struct ToolExecutor {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    safety: Option<Arc<SafetyMonitor>>,
    database: Option<Arc<Database>>,
    deadline: Duration,
    log: Mutex<Vec<ToolExecutionRecord>>,
}

impl ToolExecutor {
    pub fn new(safety: Option<Arc<SafetyMonitor>>, database: Option<Arc<Database>>) -> Self {
        Self {
            handlers: HashMap::new(),
            safety,
            database,
            deadline: tool_consts::DEFAULT_DEADLINE,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub async fn execute(&self, name: &str, params: Params) -> ToolResult {
        let started = std::time::Instant::now();

        let result = self.execute_inner(name, &params).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let at = Utc::now();

        let mut log = self.log.lock().await;
        log.push(ToolExecutionRecord {
            tool: name.to_string(),
            status: result.status.clone(),
            elapsed_ms,
            at,
        });
        if log.len() > tool_consts::EXECUTION_LOG_WINDOW_ROWS as usize {
            let overflow = log.len() - tool_consts::EXECUTION_LOG_WINDOW_ROWS as usize;
            log.drain(0..overflow);
        }
        drop(log);

        if let Some(database) = &self.database {
            let _ = database
                .record_tool_exec(&ToolExecRecord {
                    at,
                    tool: name.to_string(),
                    status: format!("{:?}", result.status),
                    elapsed_ms: elapsed_ms as i64,
                })
                .await;
        }

        result
    }

    async fn execute_inner(&self, name: &str, params: &Params) -> ToolResult {
        let Some(handler) = self.handlers.get(name) else {
            return ToolResult::error(ToolStatus::NotFound, format!("unknown tool '{name}'"));
        };

        for field in handler.required_params() {
            if !params.contains_key(*field) {
                return ToolResult::error(
                    ToolStatus::InvalidParams,
                    format!("missing required parameter '{field}'"),
                );
            }
        }

        if handler.is_motion_causing() {
            if let Some(safety) = &self.safety {
                let status = safety.evaluate().await;
                if !status.is_safe {
                    return ToolResult::error(ToolStatus::Vetoed, status.reasons.join("; "));
                }
            }
        }

        match tokio::time::timeout(self.deadline, handler.call(params)).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => ToolResult::error(ToolStatus::Error, err.to_string()),
            Err(_) => ToolResult::error(ToolStatus::Timeout, format!("'{name}' exceeded deadline")),
        }
    }

    pub async fn recent_log(&self, limit: usize) -> Vec<ToolExecutionRecord> {
        let log = self.log.lock().await;
        log.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, params: &Params) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(serde_json::json!(params)))
        }
    }

    struct RequiresName;

    #[async_trait]
    impl ToolHandler for RequiresName {
        fn required_params(&self) -> &'static [&'static str] {
            &["object_name"]
        }

        async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(Value::Null))
        }
    }

    struct Motion;

    #[async_trait]
    impl ToolHandler for Motion {
        fn is_motion_causing(&self) -> bool {
            true
        }

        async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(Value::Null))
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let executor = ToolExecutor::new(None, None);
        let result = executor.execute("bogus", Params::new()).await;
        assert_eq!(result.status, ToolStatus::NotFound);
    }

    #[tokio::test]
    async fn missing_required_param_is_invalid() {
        let mut executor = ToolExecutor::new(None, None);
        executor.register("goto_object", Arc::new(RequiresName));
        let result = executor.execute("goto_object", Params::new()).await;
        assert_eq!(result.status, ToolStatus::InvalidParams);
    }

    #[tokio::test]
    async fn motion_tool_vetoed_when_unsafe() {
        let safety = Arc::new(SafetyMonitor::new(Default::default()));
        // No weather sample at all => unsafe (weather data unavailable).
        let mut executor = ToolExecutor::new(Some(safety), None);
        executor.register("start_tracking", Arc::new(Motion));
        let result = executor.execute("start_tracking", Params::new()).await;
        assert_eq!(result.status, ToolStatus::Vetoed);
    }

    #[tokio::test]
    async fn successful_call_records_execution_log() {
        let mut executor = ToolExecutor::new(None, None);
        executor.register("echo", Arc::new(Echo));
        executor.execute("echo", Params::new()).await;
        let log = executor.recent_log(10).await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].tool, "echo");
    }
}
