//! Orchestrator (§4.H): component H in the spec's component table. Owns
//! the registry, event bus, session state, and the application lifecycle.

pub mod metrics;
pub mod session;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::alerts::{Alert, AlertLevel, AlertManager};
use crate::catalog::{Catalog, InMemoryCatalog};
use crate::config::Config;
use crate::database::Database;
use crate::events::{EventBus, EventKind, OrchestratorEvent};
use crate::mount::{ConnectionState, MountEngine};
use crate::registry::{ServiceRegistry, ServiceStatus};
use crate::safety::{ObservatoryState, SafetyAction, SafetyMonitor, SafetyThresholds};
use crate::sensors::cloud::CloudAdapter;
use crate::sensors::ecowitt::EcowittAdapter;
use crate::sensors::enclosure::EnclosureAdapter;
use crate::sensors::power::PowerAdapter;
use crate::sensors::SensorAdapter;
use crate::services::enclosure_controller::EnclosureController;
use crate::services::focus::FocusService;
use crate::services::{Service, StubPollingService};
use crate::tools::{handlers, ToolExecutor};
use crate::voice_client::{StubLlmClient, VoiceCoordinator};

use self::metrics::OrchestratorMetrics;
use self::session::{Session, SessionLog, SessionManager};

pub struct Orchestrator {
    pub registry: Arc<ServiceRegistry>,
    pub events: Arc<EventBus>,
    pub metrics: Arc<OrchestratorMetrics>,
    pub sessions: Arc<SessionManager>,
    pub mount: Arc<MountEngine>,
    pub safety: Arc<SafetyMonitor>,
    pub alerts: Arc<AlertManager>,
    pub catalog: Arc<dyn Catalog>,
    pub enclosure: Arc<EnclosureController>,
    pub focus: Arc<FocusService>,
    pub tools: Arc<ToolExecutor>,
    pub database: Option<Arc<Database>>,
    pub voice: Option<Arc<VoiceCoordinator>>,
    cancel: CancellationToken,
    data_dir: String,
    weather: Arc<EcowittAdapter>,
    cloud: Option<Arc<CloudAdapter>>,
    power: Option<Arc<PowerAdapter>>,
    enclosure_sensor: Option<Arc<EnclosureAdapter>>,
    last_safety_action: Mutex<Option<SafetyAction>>,
    last_weather_ok: Mutex<Option<bool>>,
    mount_faulted: Mutex<bool>,
}

impl Orchestrator {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();
        let registry = Arc::new(ServiceRegistry::new());
        let events = Arc::new(EventBus::new());
        let metrics = Arc::new(OrchestratorMetrics::new());
        let sessions = Arc::new(SessionManager::new());

        let mount = Arc::new(MountEngine::new(config.mount.connection()));
        let thresholds = config.safety.apply(SafetyThresholds::default());
        let safety = Arc::new(SafetyMonitor::new(thresholds));
        let alerts = Arc::new(AlertManager::new(
            config.alerts.clone().into_alert_config(),
            cancel.child_token(),
        ));
        let catalog: Arc<dyn Catalog> = Arc::new(InMemoryCatalog::new());
        let enclosure = Arc::new(EnclosureController::new());
        let focus = Arc::new(FocusService::new(50_000, 3.0));

        let weather = Arc::new(EcowittAdapter::new(&config.sensors.weather.host, config.sensors.weather.port));
        let cloud = config
            .sensors
            .cloud
            .as_ref()
            .map(|gw| Arc::new(CloudAdapter::new(&gw.host, gw.port)));
        let power = config
            .sensors
            .power
            .as_ref()
            .map(|gw| Arc::new(PowerAdapter::new(&gw.host, gw.port)));
        let enclosure_sensor = config
            .sensors
            .enclosure
            .as_ref()
            .map(|gw| Arc::new(EnclosureAdapter::new(&gw.host, gw.port)));

        let database = match Database::new(&format!("{}/nightwatch.db", config.data_dir())).await {
            Ok(db) => Some(Arc::new(db)),
            Err(err) => {
                warn!(error = %err, "operational history database unavailable, continuing without it");
                None
            }
        };
        if let Some(db) = &database {
            mount.set_database(db.clone());
        }

        let mut tools = ToolExecutor::new(Some(safety.clone()), database.clone());
        register_tools(&mut tools, &mount, &safety, &alerts, &catalog, &sessions, &enclosure, &focus, &events);
        let tools = Arc::new(tools);

        let voice = if config.voice.enabled {
            Some(VoiceCoordinator::new(
                config.voice.stt_addr.clone(),
                config.voice.tts_addr.clone(),
                tools.clone(),
                Arc::new(StubLlmClient),
                cancel.child_token(),
            ))
        } else {
            None
        };

        Ok(Self {
            registry,
            events,
            metrics,
            sessions,
            mount,
            safety,
            alerts,
            catalog,
            enclosure,
            focus,
            tools,
            database,
            voice,
            cancel,
            data_dir: config.data_dir(),
            weather,
            cloud,
            power,
            enclosure_sensor,
            last_safety_action: Mutex::new(None),
            last_weather_ok: Mutex::new(None),
            mount_faulted: Mutex::new(false),
        })
    }

    /// Startup sequence (§4.H): register services, start each in turn,
    /// start the safety loop, emit `ServiceStarted` per service.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        self.registry.register("mount", self.mount.clone(), true).await;
        self.registry.register("safety", self.safety.clone(), true).await;
        self.registry.register("alerts", self.alerts.clone(), true).await;
        self.registry.register("enclosure", self.enclosure.clone(), false).await;
        self.registry.register("focus", self.focus.clone(), false).await;

        if let Err(err) = self.mount.connect().await {
            warn!(error = %err, "mount did not connect at startup, continuing degraded");
            self.registry.set_status("mount", ServiceStatus::Degraded, Some(err.to_string())).await;
        } else {
            self.registry.set_status("mount", ServiceStatus::Running, None).await;
        }
        self.metrics.mark_service_started("mount").await;

        self.spawn_sensor_loop::<crate::sensors::WeatherSample>("weather", self.weather.clone());
        if let Some(cloud) = &self.cloud {
            self.spawn_sensor_loop::<crate::sensors::CloudSample>("cloud", cloud.clone());
        }
        if let Some(power) = &self.power {
            self.spawn_sensor_loop::<crate::sensors::PowerSample>("power", power.clone());
        }
        if let Some(enclosure_sensor) = &self.enclosure_sensor {
            self.spawn_sensor_loop::<crate::sensors::EnclosureSample>("enclosure_sensor", enclosure_sensor.clone());
        }

        self.spawn_stub_service("meteor_watch");
        self.spawn_stub_service("frame_analysis");

        self.spawn_safety_loop();

        for name in ["safety", "alerts", "enclosure", "focus"] {
            self.registry.set_status(name, ServiceStatus::Running, None).await;
            self.metrics.mark_service_started(name).await;
            self.events
                .emit(OrchestratorEvent::new(EventKind::ServiceStarted, name, "service started"))
                .await;
        }

        if !self.registry.all_required_running().await {
            error!("a required service failed to start, aborting startup");
            self.shutdown(false).await;
            anyhow::bail!("required service failed to start");
        }

        if self.voice.is_some() {
            info!("voice pipeline configured and running");
        }

        Ok(())
    }

    fn spawn_sensor_loop<T>(&self, name: &'static str, adapter: Arc<dyn SensorAdapter<T>>)
    where
        T: Copy + Send + Sync + 'static,
    {
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            info!(service = name, "sensor loop starting");
            adapter.run(cancel).await;
            info!(service = name, "sensor loop stopped");
        });
    }

    fn spawn_stub_service(&self, name: &'static str) {
        let cancel = self.cancel.child_token();
        let service = Arc::new(StubPollingService::new(name));
        tokio::spawn(async move {
            if let Err(err) = service.start(cancel).await {
                error!(service = name, error = %err, "stub service exited with error");
            }
        });
    }

    /// Evaluates safety on a fixed tick, actions the debounced recommendation
    /// exactly once per transition, and raises alerts for emergencies.
    fn spawn_safety_loop(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
                crate::constants::safety::EVALUATION_INTERVAL_SECS,
            ));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        this.run_safety_tick().await;
                    }
                }
            }
        });
    }

    async fn run_safety_tick(&self) {
        if let Some(sample) = self.weather.latest().get().await {
            self.safety.update_weather(sample).await;
        }
        if let Some(cloud) = &self.cloud {
            if let Some(sample) = cloud.latest().get().await {
                self.safety.update_cloud(sample).await;
            }
        }
        if let Some(power) = &self.power {
            if let Some(sample) = power.latest().get().await {
                self.safety.update_power(sample.battery_percent, sample.on_battery).await;
            }
        }
        if let Some(enclosure_sensor) = &self.enclosure_sensor {
            if let Some(sample) = enclosure_sensor.latest().get().await {
                self.safety.update_enclosure(sample.open).await;
            }
        }

        let status = self.safety.evaluate().await;
        if let Some(db) = &self.database {
            let _ = db
                .record_safety_eval(&crate::database::SafetyEvalRecord {
                    at: status.at,
                    action: format!("{:?}", status.action),
                    is_safe: status.is_safe,
                    level: format!("{:?}", status.level),
                    reasons: status.reasons.join("; "),
                })
                .await;
        }

        self.events
            .emit(
                OrchestratorEvent::new(EventKind::SafetyStateChanged, "safety", status.reasons.join("; "))
                    .with_data("status", serde_json::to_value(&status).unwrap_or_default()),
            )
            .await;

        let mut last_weather_ok = self.last_weather_ok.lock().await;
        let weather_ok = status.weather_ok && status.clouds_ok;
        if *last_weather_ok != Some(weather_ok) {
            let kind = if weather_ok { EventKind::WeatherSafe } else { EventKind::WeatherUnsafe };
            self.events
                .emit(OrchestratorEvent::new(kind, "safety", status.reasons.join("; ")))
                .await;
            *last_weather_ok = Some(weather_ok);
        }
        drop(last_weather_ok);

        self.check_mount_health().await;

        if !self.safety.should_execute(&status).await {
            return;
        }

        {
            let mut last_action = self.last_safety_action.lock().await;
            if *last_action == Some(status.action) {
                return;
            }
            *last_action = Some(status.action);
        }

        match status.action {
            SafetyAction::EmergencyClose => {
                self.safety.set_observatory_state(ObservatoryState::Emergency).await;
                let _ = self.mount.park().await;
                let _ = self.enclosure.close().await;
                self.alerts
                    .raise(Alert::new(AlertLevel::Emergency, "safety", status.reasons.join("; ")))
                    .await;
            }
            SafetyAction::ParkAndWait | SafetyAction::ParkForDaylight | SafetyAction::LowBatteryPark => {
                self.safety.set_observatory_state(ObservatoryState::Parking).await;
                let _ = self.mount.park().await;
                self.alerts
                    .raise(Alert::new(AlertLevel::Warning, "safety", status.reasons.join("; ")))
                    .await;
                self.safety.set_observatory_state(ObservatoryState::Parked).await;
            }
            SafetyAction::LowBatteryShutdown => {
                let _ = self.mount.park().await;
                let _ = self.enclosure.close().await;
                self.alerts
                    .raise(Alert::new(AlertLevel::Critical, "power", status.reasons.join("; ")))
                    .await;
            }
            SafetyAction::NetworkFailure => {
                let _ = self.mount.park().await;
                self.alerts
                    .raise(Alert::new(AlertLevel::Warning, "network", status.reasons.join("; ")))
                    .await;
            }
            SafetyAction::LowBatteryWarning | SafetyAction::SafeToObserve => {
                self.safety.set_observatory_state(ObservatoryState::OpenIdle).await;
            }
        }
    }

    /// Detects a mount connection fault and marks the service accordingly
    /// (§7 Device/connection error taxonomy): fires `ServiceError` exactly
    /// once on the transition into `Faulted`, and clears it once the mount
    /// reconnects.
    async fn check_mount_health(&self) {
        let faulted = self.mount.state().await == ConnectionState::Faulted;
        let mut was_faulted = self.mount_faulted.lock().await;
        if faulted && !*was_faulted {
            self.registry
                .set_status("mount", ServiceStatus::Error, Some("mount connection faulted".to_string()))
                .await;
            self.events
                .emit(OrchestratorEvent::new(EventKind::ServiceError, "mount", "mount connection faulted"))
                .await;
        } else if !faulted && *was_faulted {
            self.registry.set_status("mount", ServiceStatus::Running, None).await;
        }
        *was_faulted = faulted;
    }

    /// Shutdown sequence (§4.H). `safe=true` parks the mount and closes the
    /// enclosure before stopping services; `safe=false` only stops them.
    pub async fn shutdown(&self, safe: bool) {
        self.events
            .emit(OrchestratorEvent::new(EventKind::ShutdownInitiated, "orchestrator", "shutdown requested"))
            .await;

        if safe {
            if let Some(session) = self.sessions.end().await {
                self.events
                    .emit(OrchestratorEvent::new(EventKind::SessionEnded, "session", format!("session {} ended", session.id)))
                    .await;
                if let Err(err) = self.save_session_log(&session).await {
                    error!(error = %err, "failed to save session log");
                }
            }
            if let Ok(status) = self.mount.get_status().await {
                if !status.is_parked {
                    if let Err(err) = self.mount.park().await {
                        error!(error = %err, "failed to park mount during shutdown");
                        self.metrics.record_error("mount").await;
                    }
                }
            }
            if let Err(err) = self.enclosure.close().await {
                error!(error = %err, "failed to close enclosure during shutdown");
                self.metrics.record_error("enclosure").await;
            }
        }

        self.cancel.cancel();
        self.mount.disconnect().await;
        for entry in self.registry.list().await {
            self.registry.set_status(&entry.name, ServiceStatus::Stopped, None).await;
            self.events
                .emit(OrchestratorEvent::new(EventKind::ServiceStopped, &entry.name, "service stopped"))
                .await;
        }
    }

    /// Writes `<data_dir>/session_<id>.json` (§6 persisted layout). This
    /// is the only on-disk trace of a session; the SQLite history is
    /// purely additive operational data, not session state.
    async fn save_session_log(&self, session: &Session) -> anyhow::Result<()> {
        let metrics = self.metrics.snapshot().await;
        let log = SessionLog {
            session_id: session.id.clone(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            images_captured: metrics.images_captured,
            total_exposure_sec: metrics.total_exposure_sec,
            current_target: session.target.clone(),
            error_count: metrics.error_count_total,
            last_error: None,
            metrics,
        };
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = format!("{}/session_{}.json", self.data_dir, session.id);
        tokio::fs::write(&path, serde_json::to_vec_pretty(&log)?).await?;
        info!(path, "saved session log");
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn register_tools(
    tools: &mut ToolExecutor,
    mount: &Arc<MountEngine>,
    safety: &Arc<SafetyMonitor>,
    alerts: &Arc<AlertManager>,
    catalog: &Arc<dyn Catalog>,
    sessions: &Arc<SessionManager>,
    enclosure: &Arc<EnclosureController>,
    focus: &Arc<FocusService>,
    events: &Arc<EventBus>,
) {
    tools.register(
        "goto_object",
        Arc::new(handlers::GotoObject {
            mount: mount.clone(),
            catalog: catalog.clone(),
            events: events.clone(),
        }),
    );
    tools.register(
        "goto_coordinates",
        Arc::new(handlers::GotoCoordinates { mount: mount.clone(), events: events.clone() }),
    );
    tools.register("park_telescope", Arc::new(handlers::ParkTelescope { mount: mount.clone() }));
    tools.register("unpark_telescope", Arc::new(handlers::UnparkTelescope { mount: mount.clone() }));
    tools.register("get_mount_status", Arc::new(handlers::GetMountStatus { mount: mount.clone() }));
    tools.register(
        "stop_mount",
        Arc::new(handlers::StopMount { mount: mount.clone(), events: events.clone() }),
    );
    tools.register("start_tracking", Arc::new(handlers::StartTracking { mount: mount.clone() }));
    tools.register("stop_tracking", Arc::new(handlers::StopTracking { mount: mount.clone() }));
    tools.register("get_weather", Arc::new(handlers::GetWeather { safety: safety.clone() }));
    tools.register("is_weather_safe", Arc::new(handlers::IsWeatherSafe { safety: safety.clone() }));
    tools.register("get_safety_status", Arc::new(handlers::GetSafetyStatus { safety: safety.clone() }));
    tools.register(
        "start_session",
        Arc::new(handlers::StartSession { sessions: sessions.clone(), events: events.clone() }),
    );
    tools.register(
        "end_session",
        Arc::new(handlers::EndSession { sessions: sessions.clone(), events: events.clone() }),
    );
    tools.register("get_session_status", Arc::new(handlers::GetSessionStatus { sessions: sessions.clone() }));
    tools.register(
        "open_enclosure",
        Arc::new(handlers::OpenEnclosure {
            enclosure: enclosure.clone(),
            mount: mount.clone(),
        }),
    );
    tools.register("close_enclosure", Arc::new(handlers::CloseEnclosure { enclosure: enclosure.clone() }));
    tools.register("acknowledge_alert", Arc::new(handlers::AcknowledgeAlert { alerts: alerts.clone() }));
    tools.register("list_recent_alerts", Arc::new(handlers::ListRecentAlerts { alerts: alerts.clone() }));
    tools.register("get_focus_status", Arc::new(handlers::GetFocusStatus { focus: focus.clone() }));
    tools.register(
        "run_autofocus",
        Arc::new(handlers::RunAutofocus {
            focus: focus.clone(),
            enclosure: enclosure.clone(),
        }),
    );
}
