//! Sensor adapters (§4.B): component B in the spec's component table.
//!
//! Each adapter polls an external source on a timer and publishes the most
//! recent sample into a single-writer cell. A sample is only published if
//! parsing succeeds; a parse failure is logged and leaves the previous
//! sample (and its timestamp) untouched, so staleness takes effect on its
//! own rather than needing a separate "failed" flag.

pub mod cloud;
pub mod ecowitt;
pub mod enclosure;
pub mod power;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeatherSample {
    pub at: DateTime<Utc>,
    pub temperature_f: f64,
    pub humidity_percent: f64,
    pub dew_point_f: f64,
    pub wind_speed_mph: f64,
    pub wind_gust_mph: f64,
    pub rain_rate_in_hr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CloudSample {
    pub at: DateTime<Utc>,
    pub sky_minus_ambient_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PowerSample {
    pub at: DateTime<Utc>,
    pub battery_percent: f64,
    pub on_battery: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnclosureSample {
    pub at: DateTime<Utc>,
    pub open: bool,
}

/// A single-writer, many-reader cell holding the most recent sample and
/// the moment it was captured. Readers take a brief lock for an atomic
/// snapshot rather than relying on interior mutability tricks.
pub struct LatestSample<T: Copy> {
    value: RwLock<Option<T>>,
}

impl<T: Copy> Default for LatestSample<T> {
    fn default() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }
}

impl<T: Copy> LatestSample<T> {
    pub async fn get(&self) -> Option<T> {
        *self.value.read().await
    }

    pub async fn publish(&self, sample: T) {
        *self.value.write().await = Some(sample);
    }
}

/// Common polling contract shared by every adapter. `poll_once` fetches and
/// parses a single reading without mutating shared state; `run` is the
/// cancellable loop that publishes successful reads.
#[async_trait]
pub trait SensorAdapter<T: Copy + Send + Sync>: Send + Sync {
    async fn poll_once(&self) -> anyhow::Result<T>;

    fn latest(&self) -> &LatestSample<T>;

    fn poll_interval(&self) -> std::time::Duration;

    async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(sample) => self.latest().publish(sample).await,
                        Err(err) => {
                            tracing::warn!(error = %err, "sensor poll failed, keeping prior sample");
                        }
                    }
                }
            }
        }
    }
}
