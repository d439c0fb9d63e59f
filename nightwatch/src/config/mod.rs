//! Configuration loading (§6 ADDED): TOML file plus
//! `NIGHTWATCH_<SECTION>_<KEY>` environment overrides.

use serde::{Deserialize, Serialize};

use crate::alerts::{AlertConfig, AlertLevel};
use crate::errors::ConfigError;
use crate::mount::MountConnection;
use crate::safety::SafetyThresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountSection {
    pub host: String,
    pub port: u16,
    pub serial_path: Option<String>,
    pub baud_rate: u32,
}

impl Default for MountSection {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: crate::constants::mount::DEFAULT_TCP_PORT,
            serial_path: None,
            baud_rate: crate::constants::mount::DEFAULT_BAUD_RATE,
        }
    }
}

impl MountSection {
    pub fn connection(&self) -> MountConnection {
        match &self.serial_path {
            Some(path) => MountConnection::Serial {
                path: path.clone(),
                baud_rate: self.baud_rate,
            },
            None => MountConnection::Tcp {
                host: self.host.clone(),
                port: self.port,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsSection {
    pub weather: GatewaySection,
    pub cloud: Option<GatewaySection>,
    pub power: Option<GatewaySection>,
    pub enclosure: Option<GatewaySection>,
}

impl Default for SensorsSection {
    fn default() -> Self {
        Self {
            weather: GatewaySection {
                host: "192.168.1.50".to_string(),
                port: 80,
            },
            cloud: None,
            power: None,
            enclosure: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsSection {
    pub email_recipients: Vec<String>,
    pub webhook_urls: Vec<String>,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: u32,
    pub quiet_hours_end: u32,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            email_recipients: Vec::new(),
            webhook_urls: Vec::new(),
            quiet_hours_enabled: false,
            quiet_hours_start: crate::constants::alerts::QUIET_HOURS_START,
            quiet_hours_end: crate::constants::alerts::QUIET_HOURS_END,
        }
    }
}

impl AlertsSection {
    pub fn into_alert_config(self) -> AlertConfig {
        AlertConfig {
            email_recipients: self.email_recipients,
            webhook_urls: self.webhook_urls,
            quiet_hours_enabled: self.quiet_hours_enabled,
            quiet_hours_start: self.quiet_hours_start,
            quiet_hours_end: self.quiet_hours_end,
            quiet_hours_min_level: AlertLevel::Critical,
            ..AlertConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSection {
    pub host: String,
    pub port: u16,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            host: crate::constants::web::DEFAULT_HOST.to_string(),
            port: crate::constants::web::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSection {
    pub enabled: bool,
    pub stt_addr: String,
    pub tts_addr: String,
}

impl Default for VoiceSection {
    fn default() -> Self {
        Self {
            enabled: false,
            stt_addr: format!("127.0.0.1:{}", crate::constants::wyoming::DEFAULT_STT_PORT),
            tts_addr: format!("127.0.0.1:{}", crate::constants::wyoming::DEFAULT_TTS_PORT),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub mount: MountSection,
    #[serde(default)]
    pub sensors: SensorsSection,
    #[serde(default)]
    pub alerts: AlertsSection,
    #[serde(default)]
    pub web: WebSection,
    #[serde(default)]
    pub safety: SafetyOverrides,
    #[serde(default)]
    pub voice: VoiceSection,
}

/// Only the thresholds an operator is likely to tune; anything absent
/// falls back to `SafetyThresholds::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SafetyOverrides {
    pub wind_limit_mph: Option<f64>,
    pub min_target_altitude_deg: Option<f64>,
}

impl SafetyOverrides {
    pub fn apply(&self, mut thresholds: SafetyThresholds) -> SafetyThresholds {
        if let Some(v) = self.wind_limit_mph {
            thresholds.wind_limit_mph = v;
        }
        if let Some(v) = self.min_target_altitude_deg {
            thresholds.min_target_altitude_deg = v;
        }
        thresholds
    }
}

impl Config {
    pub fn data_dir(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub async fn load(path: &str) -> Result<Config, ConfigError> {
        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| ConfigError::LoadFailed {
                path: path.to_string(),
                reason: err.to_string(),
            })?;
        let mut config: Config = toml::from_str(&body).map_err(|err| ConfigError::ParseError {
            reason: err.to_string(),
        })?;
        apply_env_overrides(&mut config)?;
        Ok(config)
    }
}

/// Applies `NIGHTWATCH_<SECTION>_<KEY>` overrides on top of a loaded
/// config. Only the handful of fields an operator would realistically
/// override from the environment are wired up; unknown variables are
/// silently ignored rather than rejected, matching the non-strict
/// dotted-path semantics described in §6.
fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(host) = std::env::var("NIGHTWATCH_MOUNT_HOST") {
        config.mount.host = host;
    }
    if let Ok(port) = std::env::var("NIGHTWATCH_MOUNT_PORT") {
        config.mount.port = port.parse().map_err(|_| ConfigError::InvalidValue {
            field: "mount.port".to_string(),
            reason: format!("'{port}' is not a valid port"),
        })?;
    }
    if let Ok(host) = std::env::var("NIGHTWATCH_SENSORS_WEATHER_HOST") {
        config.sensors.weather.host = host;
    }
    if let Ok(host) = std::env::var("NIGHTWATCH_WEB_HOST") {
        config.web.host = host;
    }
    if let Ok(port) = std::env::var("NIGHTWATCH_WEB_PORT") {
        config.web.port = port.parse().map_err(|_| ConfigError::InvalidValue {
            field: "web.port".to_string(),
            reason: format!("'{port}' is not a valid port"),
        })?;
    }
    if let Ok(dir) = std::env::var("NIGHTWATCH_DATA_DIR") {
        config.data_dir = Some(dir);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_usable_config() {
        let config = Config::default();
        assert_eq!(config.web.port, crate::constants::web::DEFAULT_PORT);
        assert_eq!(config.data_dir(), "./data");
    }

    #[test]
    fn mount_section_without_serial_path_is_tcp() {
        let section = MountSection::default();
        matches!(section.connection(), MountConnection::Tcp { .. });
    }
}
