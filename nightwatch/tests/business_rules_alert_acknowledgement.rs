//! Business Rule Tests: Alert Acknowledgement
//!
//! Acknowledging the same alert twice must not flip state back and forth;
//! the second call reports it was already handled (§8 item 7).

use std::collections::HashMap;
use std::sync::Arc;

use nightwatch::alerts::{Alert, AlertConfig, AlertLevel, AlertManager};
use nightwatch::tools::handlers::AcknowledgeAlert;
use nightwatch::tools::{ToolExecutor, ToolHandler, ToolStatus};
use tokio_util::sync::CancellationToken;

fn params(alert_id: &str, user: &str) -> HashMap<String, serde_json::Value> {
    HashMap::from([
        ("alert_id".to_string(), serde_json::json!(alert_id)),
        ("user".to_string(), serde_json::json!(user)),
    ])
}

#[tokio::test]
async fn acknowledge_alert_is_idempotent() {
    let manager = Arc::new(AlertManager::new(AlertConfig::default(), CancellationToken::new()));
    manager
        .raise(Alert::new(AlertLevel::Info, "test", "first"))
        .await;
    let alert = manager.recent(1).await.into_iter().next().unwrap();

    let handler = AcknowledgeAlert { alerts: manager.clone() };
    let first = handler.call(&params(&alert.id, "operator")).await.unwrap();
    assert_eq!(first.status, ToolStatus::Ok);

    let second = handler.call(&params(&alert.id, "operator")).await.unwrap();
    assert_eq!(second.status, ToolStatus::Error, "second acknowledgement reports failure, not success");
}

#[tokio::test]
async fn acknowledge_unknown_alert_fails_through_the_executor() {
    let manager = Arc::new(AlertManager::new(AlertConfig::default(), CancellationToken::new()));
    let mut executor = ToolExecutor::new(None, None);
    executor.register("acknowledge_alert", Arc::new(AcknowledgeAlert { alerts: manager }));

    let result = executor
        .execute("acknowledge_alert", params("does-not-exist", "operator"))
        .await;
    assert_eq!(result.status, ToolStatus::Error);
}
