//! Named alert templates (§4.D), seeded from
//! `original_source/services/alerts/alert_manager.py`'s `ALERT_TEMPLATES`
//! and extended with the battery/network conditions this port's safety
//! monitor can raise that the original did not have a template for.

use std::collections::HashMap;

use super::{AlertChannel, AlertLevel};

pub struct AlertTemplate {
    pub level: AlertLevel,
    pub message: &'static str,
    pub channels: &'static [AlertChannel],
}

pub fn templates() -> HashMap<&'static str, AlertTemplate> {
    let mut map = HashMap::new();
    map.insert(
        "weather_unsafe",
        AlertTemplate {
            level: AlertLevel::Warning,
            message: "Weather conditions unsafe: {reason}. Telescope parking.",
            channels: &[AlertChannel::Push, AlertChannel::Email],
        },
    );
    map.insert(
        "rain_detected",
        AlertTemplate {
            level: AlertLevel::Emergency,
            message: "Rain detected. Emergency close initiated.",
            channels: &[
                AlertChannel::Push,
                AlertChannel::Sms,
                AlertChannel::Email,
                AlertChannel::Call,
            ],
        },
    );
    map.insert(
        "guiding_failed",
        AlertTemplate {
            level: AlertLevel::Warning,
            message: "Autoguiding lost star. RMS was {rms}\".",
            channels: &[AlertChannel::Push],
        },
    );
    map.insert(
        "capture_complete",
        AlertTemplate {
            level: AlertLevel::Info,
            message: "Capture of {target} complete. {frames} frames captured.",
            channels: &[AlertChannel::Email],
        },
    );
    map.insert(
        "sensor_offline",
        AlertTemplate {
            level: AlertLevel::Critical,
            message: "Sensor {sensor} offline for {duration}. Safety degraded.",
            channels: &[AlertChannel::Push, AlertChannel::Sms, AlertChannel::Email],
        },
    );
    map.insert(
        "battery_low",
        AlertTemplate {
            level: AlertLevel::Critical,
            message: "UPS battery at {percent}%. {stage}.",
            channels: &[AlertChannel::Push, AlertChannel::Email],
        },
    );
    map.insert(
        "network_failure",
        AlertTemplate {
            level: AlertLevel::Warning,
            message: "Network unreachable after {failures} consecutive checks. Parking telescope.",
            channels: &[AlertChannel::Push, AlertChannel::Email],
        },
    );
    map
}

/// Substitutes `{key}` placeholders in a template's message with the given
/// keyword values. Missing keys are left as-is so a bug in a call site is
/// visible in the rendered message rather than panicking.
pub fn render(message: &str, params: &HashMap<String, String>) -> String {
    let mut rendered = message.to_string();
    for (key, value) in params {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_placeholders() {
        let mut params = HashMap::new();
        params.insert("reason".to_string(), "high wind".to_string());
        let rendered = render("Weather conditions unsafe: {reason}. Telescope parking.", &params);
        assert_eq!(rendered, "Weather conditions unsafe: high wind. Telescope parking.");
    }

    #[test]
    fn leaves_unknown_placeholders_untouched() {
        let params = HashMap::new();
        let rendered = render("{target} finished", &params);
        assert_eq!(rendered, "{target} finished");
    }
}
