//! Orchestrator metrics (§4.H), a mutex-guarded running aggregate with a
//! cheap `snapshot()`, grounded in the teacher's `operation_tracker.rs`
//! pattern of tracking state behind one lock and exposing a serializable
//! view for the web status API.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub avg_ms: f64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            count: 0,
            min_ms: u64::MAX,
            max_ms: 0,
            avg_ms: 0.0,
        }
    }
}

impl LatencyStats {
    fn record(&mut self, elapsed_ms: u64) {
        self.count += 1;
        self.min_ms = self.min_ms.min(elapsed_ms);
        self.max_ms = self.max_ms.max(elapsed_ms);
        self.avg_ms += (elapsed_ms as f64 - self.avg_ms) / self.count as f64;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub command_latency: LatencyStats,
    pub command_count: u64,
    pub error_count_total: u64,
    pub error_count_by_service: HashMap<String, u64>,
    pub uptime_seconds: HashMap<String, u64>,
    pub images_captured: u64,
    pub total_exposure_sec: f64,
}

struct MetricsState {
    command_latency: LatencyStats,
    command_count: u64,
    error_count_total: u64,
    error_count_by_service: HashMap<String, u64>,
    service_started_at: HashMap<String, Instant>,
    images_captured: u64,
    total_exposure_sec: f64,
}

pub struct OrchestratorMetrics {
    state: Mutex<MetricsState>,
}

impl OrchestratorMetrics {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MetricsState {
                command_latency: LatencyStats::default(),
                command_count: 0,
                error_count_total: 0,
                error_count_by_service: HashMap::new(),
                service_started_at: HashMap::new(),
                images_captured: 0,
                total_exposure_sec: 0.0,
            }),
        }
    }

    pub async fn record_command(&self, elapsed_ms: u64) {
        let mut state = self.state.lock().await;
        state.command_latency.record(elapsed_ms);
        state.command_count += 1;
    }

    pub async fn record_error(&self, service: &str) {
        let mut state = self.state.lock().await;
        state.error_count_total += 1;
        *state.error_count_by_service.entry(service.to_string()).or_insert(0) += 1;
    }

    pub async fn mark_service_started(&self, service: &str) {
        self.state
            .lock()
            .await
            .service_started_at
            .insert(service.to_string(), Instant::now());
    }

    pub async fn record_exposure(&self, exposure_sec: f64) {
        let mut state = self.state.lock().await;
        state.images_captured += 1;
        state.total_exposure_sec += exposure_sec;
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().await;
        let uptime_seconds = state
            .service_started_at
            .iter()
            .map(|(name, started)| (name.clone(), started.elapsed().as_secs()))
            .collect();

        MetricsSnapshot {
            command_latency: state.command_latency.clone(),
            command_count: state.command_count,
            error_count_total: state.error_count_total,
            error_count_by_service: state.error_count_by_service.clone(),
            uptime_seconds,
            images_captured: state.images_captured,
            total_exposure_sec: state.total_exposure_sec,
        }
    }
}

impl Default for OrchestratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latency_stats_track_min_max_and_running_average() {
        let metrics = OrchestratorMetrics::new();
        metrics.record_command(100).await;
        metrics.record_command(200).await;
        metrics.record_command(50).await;
        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.command_latency.count, 3);
        assert_eq!(snapshot.command_latency.min_ms, 50);
        assert_eq!(snapshot.command_latency.max_ms, 200);
        assert!((snapshot.command_latency.avg_ms - 116.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn errors_are_tallied_per_service_and_total() {
        let metrics = OrchestratorMetrics::new();
        metrics.record_error("mount").await;
        metrics.record_error("mount").await;
        metrics.record_error("alerts").await;
        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.error_count_total, 3);
        assert_eq!(snapshot.error_count_by_service["mount"], 2);
        assert_eq!(snapshot.error_count_by_service["alerts"], 1);
    }
}
