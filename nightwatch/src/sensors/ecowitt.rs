//! Ecowitt weather gateway adapter (§4.B ADDED, §6), grounded in
//! `original_source/services/weather/ecowitt.py`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::constants::sensors as sensor_consts;
use crate::sensors::{LatestSample, SensorAdapter, WeatherSample};

pub struct EcowittAdapter {
    base_url: String,
    client: reqwest::Client,
    latest: LatestSample<WeatherSample>,
}

impl EcowittAdapter {
    pub fn new(gateway_host: &str, gateway_port: u16) -> Self {
        Self {
            base_url: format!("http://{gateway_host}:{gateway_port}"),
            client: reqwest::Client::new(),
            latest: LatestSample::default(),
        }
    }

    fn common_value(common: &[Value], id: &str, default: f64) -> f64 {
        common
            .iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(id))
            .and_then(|item| item.get("val"))
            .and_then(|v| v.as_str().and_then(|s| s.parse::<f64>().ok()).or_else(|| v.as_f64()))
            .unwrap_or(default)
    }

    fn dew_point_f(temp_f: f64, humidity_percent: f64) -> f64 {
        let temp_c = (temp_f - 32.0) * 5.0 / 9.0;
        let a = 17.27;
        let b = 237.7;
        let alpha = (humidity_percent / 100.0).ln() + (a * temp_c) / (b + temp_c);
        let dew_c = (b * alpha) / (a - alpha);
        dew_c * 9.0 / 5.0 + 32.0
    }

    fn parse(body: &Value) -> anyhow::Result<WeatherSample> {
        let common = body
            .get("common_list")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let rain = body.get("rain").cloned().unwrap_or(Value::Null);

        let temperature_f = Self::common_value(&common, "0x02", 70.0);
        let humidity_percent = Self::common_value(&common, "0x07", 50.0);
        let wind_speed_mph = Self::common_value(&common, "0x0B", 0.0);
        let wind_gust_mph = Self::common_value(&common, "0x0C", 0.0);

        let rain_rate_in_hr = rain
            .get("rain_rate")
            .and_then(|v| v.get("val"))
            .and_then(|v| v.as_str().and_then(|s| s.parse::<f64>().ok()).or_else(|| v.as_f64()))
            .unwrap_or(0.0);

        Ok(WeatherSample {
            at: Utc::now(),
            temperature_f,
            humidity_percent,
            dew_point_f: Self::dew_point_f(temperature_f, humidity_percent),
            wind_speed_mph,
            wind_gust_mph,
            rain_rate_in_hr,
        })
    }
}

#[async_trait]
impl SensorAdapter<WeatherSample> for EcowittAdapter {
    async fn poll_once(&self) -> anyhow::Result<WeatherSample> {
        let url = format!("{}/get_livedata_info", self.base_url);
        let body: Value = self.client.get(&url).send().await?.json().await?;
        Self::parse(&body)
    }

    fn latest(&self) -> &LatestSample<WeatherSample> {
        &self.latest
    }

    fn poll_interval(&self) -> std::time::Duration {
        sensor_consts::WEATHER_POLL_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_common_list_fields() {
        let body = json!({
            "common_list": [
                {"id": "0x02", "val": "68.5"},
                {"id": "0x07", "val": "55"},
                {"id": "0x0B", "val": "12.3"},
                {"id": "0x0C", "val": "18.0"},
            ],
            "rain": {"rain_rate": {"val": "0.0"}},
        });
        let sample = EcowittAdapter::parse(&body).unwrap();
        assert!((sample.temperature_f - 68.5).abs() < 1e-6);
        assert!((sample.humidity_percent - 55.0).abs() < 1e-6);
        assert!((sample.wind_speed_mph - 12.3).abs() < 1e-6);
        assert!((sample.wind_gust_mph - 18.0).abs() < 1e-6);
        assert_eq!(sample.rain_rate_in_hr, 0.0);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let body = json!({});
        let sample = EcowittAdapter::parse(&body).unwrap();
        assert_eq!(sample.temperature_f, 70.0);
        assert_eq!(sample.humidity_percent, 50.0);
    }
}
