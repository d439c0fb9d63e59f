//! Business Rule Tests: Tool Execution Deadline
//!
//! A handler that blows through the deadline yields `TIMEOUT`, but the gate
//! is per-call: a later call with a cooperative handler still succeeds
//! (§8 item 8).

use std::sync::Arc;

use async_trait::async_trait;
use nightwatch::tools::{Params, ToolExecutor, ToolHandler, ToolResult, ToolStatus};

struct SlowHandler;

#[async_trait]
impl ToolHandler for SlowHandler {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(ToolResult::ok(serde_json::Value::Null))
    }
}

struct FastHandler;

#[async_trait]
impl ToolHandler for FastHandler {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::ok(serde_json::Value::Null))
    }
}

#[tokio::test]
async fn timeout_does_not_latch_the_executor() {
    let mut executor = ToolExecutor::new(None, None);
    executor.register("slow", Arc::new(SlowHandler));
    executor.register("fast", Arc::new(FastHandler));

    let timed_out = executor.execute("slow", Params::new()).await;
    assert_eq!(timed_out.status, ToolStatus::Timeout);

    let succeeded = executor.execute("fast", Params::new()).await;
    assert_eq!(succeeded.status, ToolStatus::Ok, "gate is per-call, not latched after a timeout");
}
