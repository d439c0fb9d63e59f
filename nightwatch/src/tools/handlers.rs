//! Concrete tool handlers (§6), registered into a `ToolExecutor` by the
//! orchestrator at startup. Each handler owns only the `Arc`s it needs to
//! do its job; the executor supplies parameter validation and the safety
//! veto uniformly.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::alerts::AlertManager;
use crate::catalog::Catalog;
use crate::events::{EventBus, EventKind, OrchestratorEvent};
use crate::mount::MountEngine;
use crate::orchestrator::session::SessionManager;
use crate::safety::SafetyMonitor;
use crate::services::enclosure_controller::EnclosureController;
use crate::services::focus::FocusService;

use super::{Params, ToolHandler, ToolResult, ToolStatus};

fn param_str<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn param_f64(params: &Params, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

pub struct GotoObject {
    pub mount: Arc<MountEngine>,
    pub catalog: Arc<dyn Catalog>,
    pub events: Arc<EventBus>,
}

#[async_trait]
impl ToolHandler for GotoObject {
    fn is_motion_causing(&self) -> bool {
        true
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["object_name"]
    }

    async fn call(&self, params: &Params) -> anyhow::Result<ToolResult> {
        let name = param_str(params, "object_name").unwrap_or_default();
        let object = self.catalog.resolve(name).await?;
        self.mount.set_target(object.ra_hours, object.dec_deg).await?;
        self.mount.slew().await?;
        self.events
            .emit(OrchestratorEvent::new(EventKind::MountSlewStarted, "mount", format!("slewing to {name}")))
            .await;
        Ok(ToolResult::ok(json!({
            "catalog_id": object.catalog_id,
            "ra_hours": object.ra_hours,
            "dec_deg": object.dec_deg,
        })))
    }
}

pub struct GotoCoordinates {
    pub mount: Arc<MountEngine>,
    pub events: Arc<EventBus>,
}

#[async_trait]
impl ToolHandler for GotoCoordinates {
    fn is_motion_causing(&self) -> bool {
        true
    }

    fn required_params(&self) -> &'static [&'static str] {
        &["ra", "dec"]
    }

    async fn call(&self, params: &Params) -> anyhow::Result<ToolResult> {
        let ra_hours = param_f64(params, "ra").unwrap_or_default();
        let dec_deg = param_f64(params, "dec").unwrap_or_default();
        self.mount.set_target(ra_hours, dec_deg).await?;
        self.mount.slew().await?;
        self.events
            .emit(OrchestratorEvent::new(
                EventKind::MountSlewStarted,
                "mount",
                format!("slewing to {ra_hours:.4}h/{dec_deg:.4}\u{b0}"),
            ))
            .await;
        Ok(ToolResult::ok(json!({ "ra_hours": ra_hours, "dec_deg": dec_deg })))
    }
}

pub struct ParkTelescope {
    pub mount: Arc<MountEngine>,
}

#[async_trait]
impl ToolHandler for ParkTelescope {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let ok = self.mount.park().await?;
        Ok(ToolResult::ok(json!({ "parked": ok })))
    }
}

pub struct UnparkTelescope {
    pub mount: Arc<MountEngine>,
}

#[async_trait]
impl ToolHandler for UnparkTelescope {
    fn is_motion_causing(&self) -> bool {
        true
    }

    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let ok = self.mount.unpark().await?;
        Ok(ToolResult::ok(json!({ "unparked": ok })))
    }
}

pub struct GetMountStatus {
    pub mount: Arc<MountEngine>,
}

#[async_trait]
impl ToolHandler for GetMountStatus {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let status = self.mount.get_status().await?;
        Ok(ToolResult::ok(serde_json::to_value(status)?))
    }
}

pub struct StopMount {
    pub mount: Arc<MountEngine>,
    pub events: Arc<EventBus>,
}

#[async_trait]
impl ToolHandler for StopMount {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        self.mount.stop().await?;
        self.events
            .emit(OrchestratorEvent::new(EventKind::MountSlewComplete, "mount", "motion stopped"))
            .await;
        Ok(ToolResult::ok(Value::Null))
    }
}

pub struct StartTracking {
    pub mount: Arc<MountEngine>,
}

#[async_trait]
impl ToolHandler for StartTracking {
    fn is_motion_causing(&self) -> bool {
        true
    }

    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let ok = self.mount.start_tracking().await?;
        Ok(ToolResult::ok(json!({ "tracking": ok })))
    }
}

pub struct StopTracking {
    pub mount: Arc<MountEngine>,
}

#[async_trait]
impl ToolHandler for StopTracking {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let ok = self.mount.stop_tracking().await?;
        Ok(ToolResult::ok(json!({ "tracking": !ok })))
    }
}

pub struct GetWeather {
    pub safety: Arc<SafetyMonitor>,
}

#[async_trait]
impl ToolHandler for GetWeather {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let status = self.safety.evaluate().await;
        Ok(ToolResult::ok(json!({
            "weather_ok": status.weather_ok,
            "clouds_ok": status.clouds_ok,
            "reasons": status.reasons,
        })))
    }
}

pub struct IsWeatherSafe {
    pub safety: Arc<SafetyMonitor>,
}

#[async_trait]
impl ToolHandler for IsWeatherSafe {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let status = self.safety.evaluate().await;
        Ok(ToolResult::ok(json!(status.weather_ok && status.clouds_ok)))
    }
}

pub struct GetSafetyStatus {
    pub safety: Arc<SafetyMonitor>,
}

#[async_trait]
impl ToolHandler for GetSafetyStatus {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let status = self.safety.evaluate().await;
        Ok(ToolResult::ok(serde_json::to_value(status)?))
    }
}

pub struct StartSession {
    pub sessions: Arc<SessionManager>,
    pub events: Arc<EventBus>,
}

#[async_trait]
impl ToolHandler for StartSession {
    async fn call(&self, params: &Params) -> anyhow::Result<ToolResult> {
        let target = param_str(params, "object_name").map(str::to_string);
        let session = self.sessions.start(target).await;
        self.events
            .emit(OrchestratorEvent::new(EventKind::SessionStarted, "session", format!("session {} started", session.id)))
            .await;
        Ok(ToolResult::ok(serde_json::to_value(session)?))
    }
}

pub struct EndSession {
    pub sessions: Arc<SessionManager>,
    pub events: Arc<EventBus>,
}

#[async_trait]
impl ToolHandler for EndSession {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        match self.sessions.end().await {
            Some(session) => {
                self.events
                    .emit(OrchestratorEvent::new(EventKind::SessionEnded, "session", format!("session {} ended", session.id)))
                    .await;
                Ok(ToolResult::ok(serde_json::to_value(session)?))
            }
            None => Ok(ToolResult::error(ToolStatus::Error, "no active session")),
        }
    }
}

pub struct GetSessionStatus {
    pub sessions: Arc<SessionManager>,
}

#[async_trait]
impl ToolHandler for GetSessionStatus {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        let status = self.sessions.status().await;
        Ok(ToolResult::ok(serde_json::to_value(status)?))
    }
}

pub struct OpenEnclosure {
    pub enclosure: Arc<EnclosureController>,
    pub mount: Arc<MountEngine>,
}

#[async_trait]
impl ToolHandler for OpenEnclosure {
    fn is_motion_causing(&self) -> bool {
        true
    }

    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        self.enclosure.open(&self.mount).await?;
        Ok(ToolResult::ok(json!({ "state": self.enclosure.state().await })))
    }
}

pub struct CloseEnclosure {
    pub enclosure: Arc<EnclosureController>,
}

#[async_trait]
impl ToolHandler for CloseEnclosure {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        self.enclosure.close().await?;
        Ok(ToolResult::ok(json!({ "state": self.enclosure.state().await })))
    }
}

pub struct AcknowledgeAlert {
    pub alerts: Arc<AlertManager>,
}

#[async_trait]
impl ToolHandler for AcknowledgeAlert {
    fn required_params(&self) -> &'static [&'static str] {
        &["alert_id", "user"]
    }

    async fn call(&self, params: &Params) -> anyhow::Result<ToolResult> {
        let id = param_str(params, "alert_id").unwrap_or_default();
        let user = param_str(params, "user").unwrap_or("unknown");
        let ok = self.alerts.acknowledge(id, user).await;
        if ok {
            Ok(ToolResult::ok(json!({ "acknowledged": true })))
        } else {
            Ok(ToolResult::error(ToolStatus::Error, format!("no alert with id '{id}'")))
        }
    }
}

pub struct ListRecentAlerts {
    pub alerts: Arc<AlertManager>,
}

#[async_trait]
impl ToolHandler for ListRecentAlerts {
    async fn call(&self, params: &Params) -> anyhow::Result<ToolResult> {
        let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(20) as usize;
        let recent = self.alerts.recent(limit).await;
        Ok(ToolResult::ok(serde_json::to_value(recent)?))
    }
}

pub struct GetFocusStatus {
    pub focus: Arc<FocusService>,
}

#[async_trait]
impl ToolHandler for GetFocusStatus {
    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::ok(serde_json::to_value(self.focus.status().await)?))
    }
}

pub struct RunAutofocus {
    pub focus: Arc<FocusService>,
    pub enclosure: Arc<EnclosureController>,
}

#[async_trait]
impl ToolHandler for RunAutofocus {
    fn is_motion_causing(&self) -> bool {
        true
    }

    async fn call(&self, _params: &Params) -> anyhow::Result<ToolResult> {
        if self.enclosure.state().await != crate::services::enclosure_controller::RoofState::Open {
            return Ok(ToolResult::error(ToolStatus::Vetoed, "enclosure must be open to autofocus"));
        }
        let status = self.focus.run_autofocus().await?;
        Ok(ToolResult::ok(serde_json::to_value(status)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::mount::MountConnection;

    #[tokio::test]
    async fn goto_object_resolves_unknown_target_as_error() {
        let handler = GotoObject {
            mount: Arc::new(MountEngine::new(MountConnection::default())),
            catalog: Arc::new(InMemoryCatalog::new()),
            events: Arc::new(EventBus::new()),
        };
        let mut params = Params::new();
        params.insert("object_name".to_string(), json!("not a real object"));
        assert!(handler.call(&params).await.is_err());
    }

    #[tokio::test]
    async fn run_autofocus_vetoed_when_enclosure_closed() {
        let handler = RunAutofocus {
            focus: Arc::new(FocusService::new(50000, 3.0)),
            enclosure: Arc::new(EnclosureController::new()),
        };
        let result = handler.call(&Params::new()).await.unwrap();
        assert_eq!(result.status, ToolStatus::Vetoed);
    }
}
