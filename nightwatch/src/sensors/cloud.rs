//! Cloud sensor adapter (§4.B ADDED): a single sky-minus-ambient differential
//! reading from an infrared cloud sensor, out of scope for a concrete SDK
//! per §1 but in scope for the push/staleness coupling contract.

use async_trait::async_trait;
use chrono::Utc;

use crate::constants::sensors as sensor_consts;
use crate::sensors::{CloudSample, LatestSample, SensorAdapter};

pub struct CloudAdapter {
    base_url: String,
    client: reqwest::Client,
    latest: LatestSample<CloudSample>,
}

impl CloudAdapter {
    pub fn new(gateway_host: &str, gateway_port: u16) -> Self {
        Self {
            base_url: format!("http://{gateway_host}:{gateway_port}"),
            client: reqwest::Client::new(),
            latest: LatestSample::default(),
        }
    }
}

#[async_trait]
impl SensorAdapter<CloudSample> for CloudAdapter {
    async fn poll_once(&self) -> anyhow::Result<CloudSample> {
        let url = format!("{}/differential", self.base_url);
        let body: serde_json::Value = self.client.get(&url).send().await?.json().await?;
        let sky_minus_ambient_c = body
            .get("sky_minus_ambient_c")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("missing sky_minus_ambient_c field"))?;
        Ok(CloudSample {
            at: Utc::now(),
            sky_minus_ambient_c,
        })
    }

    fn latest(&self) -> &LatestSample<CloudSample> {
        &self.latest
    }

    fn poll_interval(&self) -> std::time::Duration {
        sensor_consts::CLOUD_POLL_INTERVAL
    }
}
