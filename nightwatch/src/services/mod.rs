//! Stub domain services (§1, §4.B ADDED): meteor tracking, focus, frame
//! analysis, and enclosure actuation. Real device SDKs are out of scope
//! (§1); what's in scope is each service's shape, a `Service` lifecycle
//! plus the operations the tool executor and orchestrator need to call.

pub mod enclosure_controller;
pub mod focus;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ServiceHealth {
    Starting,
    Running,
    Degraded,
    Stopped,
}

#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()>;

    async fn health(&self) -> ServiceHealth;
}

/// A no-op poller used for meteor-tracking and frame-analysis, whose real
/// device integration is out of scope (§1) but whose lifecycle the
/// registry and orchestrator still need to manage uniformly.
pub struct StubPollingService {
    name: &'static str,
    health: tokio::sync::RwLock<ServiceHealth>,
}

impl StubPollingService {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            health: tokio::sync::RwLock::new(ServiceHealth::Starting),
        }
    }
}

#[async_trait]
impl Service for StubPollingService {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        *self.health.write().await = ServiceHealth::Running;
        cancel.cancelled().await;
        *self.health.write().await = ServiceHealth::Stopped;
        Ok(())
    }

    async fn health(&self) -> ServiceHealth {
        *self.health.read().await
    }
}
