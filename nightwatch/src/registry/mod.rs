//! Service registry (§4.E).
//!
//! Holds type-erased service handles behind a single mutex-guarded map, per
//! §9's note that dynamic dispatch in the source becomes an explicit
//! interface abstraction here: every dependency is accepted by trait
//! object, never by concrete type, and resolved through the registry by
//! name rather than a direct field reference.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Unknown,
    Starting,
    Running,
    Degraded,
    Stopped,
    Error,
}

#[derive(Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub handle: Arc<dyn Any + Send + Sync>,
    pub required: bool,
    pub status: ServiceStatus,
    pub last_check: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A snapshot of an entry, safe to hand to callers without holding the lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub name: String,
    pub required: bool,
    pub status: ServiceStatus,
    pub last_check: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl From<&ServiceEntry> for ServiceSnapshot {
    fn from(e: &ServiceEntry) -> Self {
        Self {
            name: e.name.clone(),
            required: e.required,
            status: e.status,
            last_check: e.last_check,
            last_error: e.last_error.clone(),
        }
    }
}

#[derive(Default)]
pub struct ServiceRegistry {
    entries: Mutex<HashMap<String, ServiceEntry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service handle under `name`. §3 invariant: at most one
    /// entry per name: a second registration replaces the first and is
    /// logged as a correction, not silently ignored.
    pub async fn register<T: Any + Send + Sync + 'static>(
        &self,
        name: impl Into<String>,
        handle: Arc<T>,
        required: bool,
    ) {
        let name = name.into();
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&name) {
            tracing::warn!(service = %name, "re-registering service, replacing prior handle");
        }
        entries.insert(
            name.clone(),
            ServiceEntry {
                name,
                handle,
                required,
                status: ServiceStatus::Unknown,
                last_check: Utc::now(),
                last_error: None,
            },
        );
    }

    pub async fn unregister(&self, name: &str) -> bool {
        self.entries.lock().await.remove(name).is_some()
    }

    pub async fn get<T: Any + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        let entries = self.entries.lock().await;
        entries
            .get(name)
            .and_then(|e| e.handle.clone().downcast::<T>().ok())
    }

    pub async fn list(&self) -> Vec<ServiceSnapshot> {
        let entries = self.entries.lock().await;
        entries.values().map(ServiceSnapshot::from).collect()
    }

    pub async fn get_status(&self, name: &str) -> Option<ServiceStatus> {
        self.entries.lock().await.get(name).map(|e| e.status)
    }

    pub async fn set_status(&self, name: &str, status: ServiceStatus, error: Option<String>) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(name) {
            entry.status = status;
            entry.last_check = Utc::now();
            entry.last_error = error;
        }
    }

    pub async fn list_required(&self) -> Vec<String> {
        let entries = self.entries.lock().await;
        entries
            .values()
            .filter(|e| e.required)
            .map(|e| e.name.clone())
            .collect()
    }

    pub async fn all_required_running(&self) -> bool {
        let entries = self.entries.lock().await;
        entries
            .values()
            .filter(|e| e.required)
            .all(|e| e.status == ServiceStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_get_round_trips() {
        let registry = ServiceRegistry::new();
        registry.register("mount", Arc::new(42u32), true).await;
        let value: Option<Arc<u32>> = registry.get("mount").await;
        assert_eq!(*value.unwrap(), 42);
    }

    #[tokio::test]
    async fn all_required_running_is_false_until_every_required_service_reports_running() {
        let registry = ServiceRegistry::new();
        registry.register("mount", Arc::new(()), true).await;
        registry.register("weather", Arc::new(()), false).await;

        assert!(!registry.all_required_running().await);

        registry
            .set_status("mount", ServiceStatus::Running, None)
            .await;
        assert!(registry.all_required_running().await);
    }

    #[tokio::test]
    async fn reregistering_replaces_rather_than_duplicates() {
        let registry = ServiceRegistry::new();
        registry.register("mount", Arc::new(1u32), true).await;
        registry.register("mount", Arc::new(2u32), true).await;
        assert_eq!(registry.list().await.len(), 1);
        let value: Option<Arc<u32>> = registry.get("mount").await;
        assert_eq!(*value.unwrap(), 2);
    }
}
