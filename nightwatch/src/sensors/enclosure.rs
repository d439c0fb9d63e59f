//! Enclosure adapter (§4.B ADDED): an open/closed boolean polled from a roof
//! or dome controller's status endpoint.

use async_trait::async_trait;
use chrono::Utc;

use crate::constants::sensors as sensor_consts;
use crate::sensors::{EnclosureSample, LatestSample, SensorAdapter};

pub struct EnclosureAdapter {
    base_url: String,
    client: reqwest::Client,
    latest: LatestSample<EnclosureSample>,
}

impl EnclosureAdapter {
    pub fn new(gateway_host: &str, gateway_port: u16) -> Self {
        Self {
            base_url: format!("http://{gateway_host}:{gateway_port}"),
            client: reqwest::Client::new(),
            latest: LatestSample::default(),
        }
    }
}

#[async_trait]
impl SensorAdapter<EnclosureSample> for EnclosureAdapter {
    async fn poll_once(&self) -> anyhow::Result<EnclosureSample> {
        let url = format!("{}/status", self.base_url);
        let body: serde_json::Value = self.client.get(&url).send().await?.json().await?;
        let open = body
            .get("open")
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| anyhow::anyhow!("missing open field"))?;
        Ok(EnclosureSample {
            at: Utc::now(),
            open,
        })
    }

    fn latest(&self) -> &LatestSample<EnclosureSample> {
        &self.latest
    }

    fn poll_interval(&self) -> std::time::Duration {
        sensor_consts::ENCLOSURE_POLL_INTERVAL
    }
}
