//! Alert manager (§4.D): component D in the spec's component table.

pub mod channels;
pub mod templates;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::constants::alerts as alert_consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Critical = 3,
    Emergency = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertChannel {
    Log,
    Email,
    Push,
    Sms,
    Call,
    Webhook,
}

fn channels_for_level(level: AlertLevel) -> &'static [AlertChannel] {
    match level {
        AlertLevel::Debug => &[AlertChannel::Log],
        AlertLevel::Info => &[AlertChannel::Log, AlertChannel::Email],
        AlertLevel::Warning => &[AlertChannel::Log, AlertChannel::Push, AlertChannel::Email],
        AlertLevel::Critical => &[
            AlertChannel::Log,
            AlertChannel::Push,
            AlertChannel::Sms,
            AlertChannel::Email,
        ],
        AlertLevel::Emergency => &[
            AlertChannel::Log,
            AlertChannel::Push,
            AlertChannel::Sms,
            AlertChannel::Email,
            AlertChannel::Call,
        ],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub source: String,
    pub message: String,
    pub at: DateTime<Utc>,
    pub data: HashMap<String, serde_json::Value>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub channels_sent: Vec<AlertChannel>,
}

impl Alert {
    pub fn new(level: AlertLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            level,
            source: source.into(),
            message: message.into(),
            at: Utc::now(),
            data: HashMap::new(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            channels_sent: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub email_recipients: Vec<String>,
    pub webhook_urls: Vec<String>,
    pub max_per_hour: u32,
    pub min_interval_seconds: i64,
    pub email_min_interval_seconds: i64,
    pub dedup_window_seconds: i64,
    pub escalation_timeout_seconds: i64,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: u32,
    pub quiet_hours_end: u32,
    pub quiet_hours_min_level: AlertLevel,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            email_recipients: Vec::new(),
            webhook_urls: Vec::new(),
            max_per_hour: alert_consts::MAX_PER_HOUR,
            min_interval_seconds: alert_consts::MIN_INTERVAL_SECONDS,
            email_min_interval_seconds: alert_consts::EMAIL_MIN_INTERVAL_SECONDS,
            dedup_window_seconds: alert_consts::DEDUP_WINDOW_SECONDS,
            escalation_timeout_seconds: alert_consts::ESCALATION_TIMEOUT_SECONDS,
            quiet_hours_enabled: false,
            quiet_hours_start: alert_consts::QUIET_HOURS_START,
            quiet_hours_end: alert_consts::QUIET_HOURS_END,
            quiet_hours_min_level: AlertLevel::Critical,
        }
    }
}

#[derive(Default)]
struct AlertBookkeeping {
    recent_alerts: HashMap<String, DateTime<Utc>>,
    recent_emails: HashMap<String, DateTime<Utc>>,
    alert_count_hour: u32,
    last_hour_reset: Option<DateTime<Utc>>,
    history: Vec<Alert>,
}

pub struct AlertManager {
    config: AlertConfig,
    http: reqwest::Client,
    bookkeeping: Mutex<AlertBookkeeping>,
    cancel: CancellationToken,
}

impl AlertManager {
    pub fn new(config: AlertConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            bookkeeping: Mutex::new(AlertBookkeeping::default()),
            cancel,
        }
    }

    fn is_quiet_hours(&self, now: DateTime<Utc>) -> bool {
        if !self.config.quiet_hours_enabled {
            return false;
        }
        let hour = now.hour();
        if self.config.quiet_hours_start > self.config.quiet_hours_end {
            hour >= self.config.quiet_hours_start || hour < self.config.quiet_hours_end
        } else {
            hour >= self.config.quiet_hours_start && hour < self.config.quiet_hours_end
        }
    }

    /// Dispatches `alert`, subject to rate limiting, dedup, and quiet
    /// hours. Returns once channel attempts complete or the alert is
    /// suppressed; escalation is a separately scheduled effect.
    pub fn raise<'a>(
        self: &'a Arc<Self>,
        alert: Alert,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>> {
        Box::pin(self.raise_inner(alert))
    }

    async fn raise_inner(self: &Arc<Self>, mut alert: Alert) -> bool {
        let now = Utc::now();
        let key = format!("{}:{}", alert.source, alert.message);

        let mut book = self.bookkeeping.lock().await;

        if book
            .last_hour_reset
            .map(|t| (now - t).num_seconds() > 3600)
            .unwrap_or(true)
        {
            book.alert_count_hour = 0;
            book.last_hour_reset = Some(now);
        }

        let rate_limited = book.alert_count_hour >= self.config.max_per_hour
            || book
                .recent_alerts
                .get(&key)
                .map(|t| (now - *t).num_seconds() < self.config.min_interval_seconds)
                .unwrap_or(false);

        let is_duplicate = book
            .recent_alerts
            .get(&key)
            .map(|t| (now - *t).num_seconds() < self.config.dedup_window_seconds)
            .unwrap_or(false);

        let suppressed_for_quiet_hours =
            self.is_quiet_hours(now) && alert.level < self.config.quiet_hours_min_level;

        book.history.push(alert.clone());
        if book.history.len() > crate::constants::safety::HISTORY_WINDOW_ROWS as usize {
            let overflow = book.history.len() - crate::constants::safety::HISTORY_WINDOW_ROWS as usize;
            book.history.drain(0..overflow);
        }

        if rate_limited || is_duplicate || suppressed_for_quiet_hours {
            tracing::debug!(id = %alert.id, "alert suppressed");
            return false;
        }

        book.recent_alerts.insert(key, now);
        book.alert_count_hour += 1;
        drop(book);

        let channels = channels_for_level(alert.level);
        for &channel in channels {
            match channel {
                AlertChannel::Log => channels::send_log(&alert).await,
                AlertChannel::Email => {
                    let mut book = self.bookkeeping.lock().await;
                    let allowed = book
                        .recent_emails
                        .get(&alert.source)
                        .map(|t| (now - *t).num_seconds() >= self.config.email_min_interval_seconds)
                        .unwrap_or(true);
                    if allowed {
                        book.recent_emails.insert(alert.source.clone(), now);
                        drop(book);
                        if let Some(followup) =
                            channels::send_email(&alert, &self.config.email_recipients).await
                        {
                            let this = Arc::clone(self);
                            tokio::spawn(async move {
                                this.raise(followup).await;
                            });
                        }
                    }
                }
                AlertChannel::Push => channels::send_push(&alert).await,
                AlertChannel::Sms => channels::send_sms(&alert).await,
                AlertChannel::Call => channels::send_call(&alert).await,
                AlertChannel::Webhook => {}
            }
            alert.channels_sent.push(channel);
        }
        for url in &self.config.webhook_urls {
            channels::send_webhook(&self.http, url, &alert).await;
        }

        if matches!(alert.level, AlertLevel::Critical | AlertLevel::Emergency) {
            self.start_escalation(alert.clone());
        }

        true
    }

    pub async fn raise_from_template(
        self: &Arc<Self>,
        template_name: &str,
        source: &str,
        params: HashMap<String, String>,
    ) -> bool {
        let templates = templates::templates();
        let Some(template) = templates.get(template_name) else {
            tracing::error!(template = %template_name, "unknown alert template");
            return false;
        };
        let message = templates::render(template.message, &params);
        self.raise(Alert::new(template.level, source, message)).await
    }

    fn start_escalation(self: &Arc<Self>, alert: Alert) {
        let this = Arc::clone(self);
        let cancel = self.cancel.child_token();
        let timeout = std::time::Duration::from_secs(self.config.escalation_timeout_seconds as u64);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let still_unacked = {
                        let book = this.bookkeeping.lock().await;
                        book.history
                            .iter()
                            .find(|a| a.id == alert.id)
                            .map(|a| !a.acknowledged)
                            .unwrap_or(false)
                    };
                    if still_unacked {
                        tracing::warn!(id = %alert.id, "escalating unacknowledged alert");
                        channels::send_push(&alert).await;
                        channels::send_sms(&alert).await;
                        channels::send_call(&alert).await;
                    }
                }
            }
        });
    }

    /// Marks an alert acknowledged; idempotent, so a second call for the
    /// same id is a no-op that still returns true.
    pub async fn acknowledge(&self, id: &str, user: &str) -> bool {
        let mut book = self.bookkeeping.lock().await;
        if let Some(alert) = book.history.iter_mut().find(|a| a.id == id) {
            alert.acknowledged = true;
            alert.acknowledged_by = Some(user.to_string());
            alert.acknowledged_at = Some(Utc::now());
            true
        } else {
            false
        }
    }

    pub async fn recent(&self, limit: usize) -> Vec<Alert> {
        let book = self.bookkeeping.lock().await;
        book.history.iter().rev().take(limit).cloned().collect()
    }

    pub async fn unacknowledged(&self) -> Vec<Alert> {
        let book = self.bookkeeping.lock().await;
        book.history.iter().filter(|a| !a.acknowledged).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<AlertManager> {
        Arc::new(AlertManager::new(AlertConfig::default(), CancellationToken::new()))
    }

    #[tokio::test]
    async fn duplicate_within_dedup_window_is_suppressed() {
        let manager = manager();
        assert!(manager.raise(Alert::new(AlertLevel::Warning, "safety", "wind high")).await);
        assert!(!manager.raise(Alert::new(AlertLevel::Warning, "safety", "wind high")).await);
    }

    #[tokio::test]
    async fn hourly_cap_suppresses_after_limit() {
        let mut config = AlertConfig::default();
        config.max_per_hour = 2;
        config.min_interval_seconds = 0;
        config.dedup_window_seconds = 0;
        let manager = Arc::new(AlertManager::new(config, CancellationToken::new()));

        assert!(manager.raise(Alert::new(AlertLevel::Info, "a", "one")).await);
        assert!(manager.raise(Alert::new(AlertLevel::Info, "a", "two")).await);
        assert!(!manager.raise(Alert::new(AlertLevel::Info, "a", "three")).await);
    }

    #[tokio::test]
    async fn quiet_hours_suppress_below_minimum_level() {
        let mut config = AlertConfig::default();
        config.quiet_hours_enabled = true;
        config.quiet_hours_start = 0;
        config.quiet_hours_end = 24;
        config.quiet_hours_min_level = AlertLevel::Critical;
        let manager = Arc::new(AlertManager::new(config, CancellationToken::new()));

        assert!(!manager.raise(Alert::new(AlertLevel::Warning, "safety", "quiet test")).await);
        assert!(manager.raise(Alert::new(AlertLevel::Critical, "safety", "loud enough")).await);
    }

    #[tokio::test]
    async fn acknowledge_is_idempotent() {
        let manager = manager();
        let alert = Alert::new(AlertLevel::Critical, "mount", "error");
        let id = alert.id.clone();
        manager.raise(alert).await;

        assert!(manager.acknowledge(&id, "operator").await);
        assert!(manager.acknowledge(&id, "operator").await);
        assert!(manager.unacknowledged().await.is_empty());
    }

    #[tokio::test]
    async fn raise_from_template_renders_params() {
        let manager = manager();
        let mut params = HashMap::new();
        params.insert("reason".to_string(), "cloud cover".to_string());
        assert!(manager.raise_from_template("weather_unsafe", "safety", params).await);
        let recent = manager.recent(1).await;
        assert_eq!(recent[0].message, "Weather conditions unsafe: cloud cover. Telescope parking.");
    }
}
