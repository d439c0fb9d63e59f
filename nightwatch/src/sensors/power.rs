//! UPS power adapter (§4.B ADDED): a battery-percent/on-battery pair polled
//! from a local UPS management API.

use async_trait::async_trait;
use chrono::Utc;

use crate::constants::sensors as sensor_consts;
use crate::sensors::{LatestSample, PowerSample, SensorAdapter};

pub struct PowerAdapter {
    base_url: String,
    client: reqwest::Client,
    latest: LatestSample<PowerSample>,
}

impl PowerAdapter {
    pub fn new(gateway_host: &str, gateway_port: u16) -> Self {
        Self {
            base_url: format!("http://{gateway_host}:{gateway_port}"),
            client: reqwest::Client::new(),
            latest: LatestSample::default(),
        }
    }
}

#[async_trait]
impl SensorAdapter<PowerSample> for PowerAdapter {
    async fn poll_once(&self) -> anyhow::Result<PowerSample> {
        let url = format!("{}/status", self.base_url);
        let body: serde_json::Value = self.client.get(&url).send().await?.json().await?;
        let battery_percent = body
            .get("battery_percent")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("missing battery_percent field"))?;
        let on_battery = body
            .get("on_battery")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        Ok(PowerSample {
            at: Utc::now(),
            battery_percent,
            on_battery,
        })
    }

    fn latest(&self) -> &LatestSample<PowerSample> {
        &self.latest
    }

    fn poll_interval(&self) -> std::time::Duration {
        sensor_consts::POWER_POLL_INTERVAL
    }
}
