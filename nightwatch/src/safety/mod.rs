//! Safety monitor (§4.C): component C in the spec's component table.
//!
//! Reduces the current sensor snapshot to a boolean `safe_to_observe`, a
//! `SafetyAction` in a closed priority-ordered set, and a severity level,
//! then debounces transient transitions before anything is handed to the
//! orchestrator to execute against the mount/enclosure/power services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::constants::safety as safety_consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyAction {
    SafeToObserve,
    ParkAndWait,
    ParkForDaylight,
    EmergencyClose,
    LowBatteryWarning,
    LowBatteryPark,
    LowBatteryShutdown,
    NetworkFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyLevel {
    Info,
    Warning,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservatoryState {
    Unknown,
    Closed,
    Opening,
    OpenIdle,
    Observing,
    Parking,
    Parked,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyStatus {
    pub at: DateTime<Utc>,
    pub action: SafetyAction,
    pub is_safe: bool,
    pub reasons: Vec<String>,
    pub level: SafetyLevel,
    pub weather_ok: bool,
    pub clouds_ok: bool,
    pub daylight_ok: bool,
    pub power_ok: bool,
    pub enclosure_ok: bool,
    pub altitude_ok: bool,
    pub meridian_ok: bool,
    pub network_ok: bool,
    pub battery_shutdown_stage: u8,
    pub rain_holdoff_active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyThresholds {
    pub wind_limit_mph: f64,
    pub wind_gust_limit_mph: f64,
    pub wind_hysteresis_mph: f64,
    pub humidity_limit_percent: f64,
    pub humidity_hysteresis_percent: f64,
    pub dew_point_margin_f: f64,
    pub clear_sky_threshold_c: f64,
    pub cloudy_threshold_c: f64,
    pub cloud_hysteresis_c: f64,
    pub twilight_altitude_deg: f64,
    pub twilight_hysteresis_deg: f64,
    pub min_target_altitude_deg: f64,
    pub meridian_warn_zone_deg: f64,
    pub meridian_flip_zone_deg: f64,
    pub rain_holdoff_minutes: f64,
    pub battery_stage1_warn_percent: f64,
    pub battery_stage2_park_percent: f64,
    pub battery_stage3_close_percent: f64,
    pub battery_stage4_shutdown_percent: f64,
    pub weather_staleness_secs: i64,
    pub cloud_staleness_secs: i64,
    pub network_fail_count_park: u32,
    pub network_latency_warning_ms: f64,
    pub unsafe_duration_to_park_secs: i64,
    pub safe_duration_to_resume_secs: i64,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            wind_limit_mph: safety_consts::WIND_LIMIT_MPH,
            wind_gust_limit_mph: safety_consts::WIND_GUST_LIMIT_MPH,
            wind_hysteresis_mph: safety_consts::WIND_HYSTERESIS_MPH,
            humidity_limit_percent: safety_consts::HUMIDITY_LIMIT_PERCENT,
            humidity_hysteresis_percent: safety_consts::HUMIDITY_HYSTERESIS_PERCENT,
            dew_point_margin_f: safety_consts::DEW_POINT_MARGIN_F,
            clear_sky_threshold_c: safety_consts::CLOUD_CLEAR_THRESHOLD_C,
            cloudy_threshold_c: safety_consts::CLOUD_CLOUDY_THRESHOLD_C,
            cloud_hysteresis_c: safety_consts::CLOUD_HYSTERESIS_C,
            twilight_altitude_deg: safety_consts::TWILIGHT_ALTITUDE_DEG,
            twilight_hysteresis_deg: safety_consts::TWILIGHT_HYSTERESIS_DEG,
            min_target_altitude_deg: safety_consts::MIN_TARGET_ALTITUDE_DEG,
            meridian_warn_zone_deg: safety_consts::MERIDIAN_WARN_ZONE_DEG,
            meridian_flip_zone_deg: safety_consts::MERIDIAN_FLIP_ZONE_DEG,
            rain_holdoff_minutes: safety_consts::RAIN_HOLDOFF_MINUTES,
            battery_stage1_warn_percent: safety_consts::BATTERY_STAGE1_WARN_PERCENT,
            battery_stage2_park_percent: safety_consts::BATTERY_STAGE2_PARK_PERCENT,
            battery_stage3_close_percent: safety_consts::BATTERY_STAGE3_CLOSE_PERCENT,
            battery_stage4_shutdown_percent: safety_consts::BATTERY_STAGE4_SHUTDOWN_PERCENT,
            weather_staleness_secs: safety_consts::WEATHER_STALENESS_SECS,
            cloud_staleness_secs: safety_consts::CLOUD_STALENESS_SECS,
            network_fail_count_park: safety_consts::NETWORK_FAIL_COUNT_PARK,
            network_latency_warning_ms: safety_consts::NETWORK_LATENCY_WARNING_MS,
            unsafe_duration_to_park_secs: safety_consts::UNSAFE_DURATION_TO_PARK_SECS,
            safe_duration_to_resume_secs: safety_consts::SAFE_DURATION_TO_RESUME_SECS,
        }
    }
}

/// Every piece of mutable state the evaluation touches, held behind one
/// lock so `evaluate` observes and updates it atomically.
#[derive(Default)]
struct SafetyState {
    weather: Option<crate::sensors::WeatherSample>,
    cloud: Option<crate::sensors::CloudSample>,
    sun_altitude_deg: Option<f64>,
    target_altitude_deg: Option<f64>,
    battery_percent: Option<f64>,
    on_battery: bool,
    enclosure_open: Option<bool>,
    hour_angle_deg: Option<f64>,
    network_connected: bool,
    network_latency_ms: Option<f64>,
    network_fail_count: u32,

    wind_triggered: bool,
    humidity_triggered: bool,
    cloud_triggered: bool,
    daylight_triggered: bool,

    last_rain_at: Option<DateTime<Utc>>,
    battery_stage: u8,

    unsafe_since: Option<DateTime<Utc>>,
    safe_since: Option<DateTime<Utc>>,
    observatory_state: ObservatoryState,
}

impl Default for ObservatoryState {
    fn default() -> Self {
        ObservatoryState::Unknown
    }
}

pub struct SafetyMonitor {
    thresholds: SafetyThresholds,
    state: Mutex<SafetyState>,
}

impl SafetyMonitor {
    pub fn new(thresholds: SafetyThresholds) -> Self {
        Self {
            thresholds,
            state: Mutex::new(SafetyState {
                network_connected: true,
                ..Default::default()
            }),
        }
    }

    pub async fn update_weather(&self, sample: crate::sensors::WeatherSample) {
        let mut state = self.state.lock().await;
        if sample.rain_rate_in_hr > 0.0 {
            state.last_rain_at = Some(Utc::now());
        }
        state.weather = Some(sample);
    }

    pub async fn update_cloud(&self, sample: crate::sensors::CloudSample) {
        self.state.lock().await.cloud = Some(sample);
    }

    pub async fn update_sun_altitude(&self, altitude_deg: f64) {
        self.state.lock().await.sun_altitude_deg = Some(altitude_deg);
    }

    pub async fn update_target_altitude(&self, altitude_deg: f64) {
        self.state.lock().await.target_altitude_deg = Some(altitude_deg);
    }

    pub async fn update_power(&self, battery_percent: f64, on_battery: bool) {
        let mut state = self.state.lock().await;
        state.battery_percent = Some(battery_percent);
        state.on_battery = on_battery;
    }

    pub async fn update_enclosure(&self, open: bool) {
        self.state.lock().await.enclosure_open = Some(open);
    }

    pub async fn update_hour_angle(&self, hour_angle_deg: f64) {
        self.state.lock().await.hour_angle_deg = Some(hour_angle_deg);
    }

    pub async fn update_network(&self, connected: bool, latency_ms: Option<f64>) {
        let mut state = self.state.lock().await;
        if connected {
            state.network_fail_count = 0;
            state.network_connected = true;
            state.network_latency_ms = latency_ms;
        } else {
            state.network_fail_count += 1;
            if state.network_fail_count >= self.thresholds.network_fail_count_park {
                state.network_connected = false;
            }
        }
    }

    pub async fn observatory_state(&self) -> ObservatoryState {
        self.state.lock().await.observatory_state
    }

    /// Pure reduction over the current state; mutates only the hysteresis
    /// and staged-battery bookkeeping that the algorithm itself defines.
    pub async fn evaluate(&self) -> SafetyStatus {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut reasons = Vec::new();

        let (weather_ok, weather_reasons, is_raining) = Self::evaluate_weather(&self.thresholds, &mut state, now);
        let (clouds_ok, cloud_reasons) = Self::evaluate_clouds(&self.thresholds, &mut state, now);
        let (daylight_ok, daylight_reasons) = Self::evaluate_daylight(&self.thresholds, &mut state);
        let (rain_holdoff_ok, rain_reasons) = Self::evaluate_rain_holdoff(&self.thresholds, &state, now);
        let (altitude_ok, altitude_reasons) = Self::evaluate_altitude(&self.thresholds, &state);
        let (power_ok, power_reasons, power_emergency) = Self::evaluate_power(&self.thresholds, &state);
        let (enclosure_ok, enclosure_reasons) = Self::evaluate_enclosure(&state);
        let (meridian_ok, meridian_reasons) = Self::evaluate_meridian(&self.thresholds, &state);
        let (battery_ok, battery_reasons, battery_action) =
            Self::evaluate_staged_battery(&self.thresholds, &mut state);
        let (network_ok, network_reasons) = Self::evaluate_network(&self.thresholds, &state);

        reasons.extend(weather_reasons);
        reasons.extend(cloud_reasons);
        reasons.extend(daylight_reasons);
        reasons.extend(rain_reasons);
        reasons.extend(altitude_reasons);
        reasons.extend(power_reasons);
        reasons.extend(enclosure_reasons);
        reasons.extend(meridian_reasons);
        reasons.extend(battery_reasons);
        reasons.extend(network_reasons);

        let is_safe = weather_ok
            && clouds_ok
            && daylight_ok
            && rain_holdoff_ok
            && altitude_ok
            && power_ok
            && enclosure_ok
            && meridian_ok
            && battery_ok
            && network_ok;

        let is_emergency = is_raining || power_emergency || state.battery_stage >= 3;

        let (action, level) = if is_emergency {
            (SafetyAction::EmergencyClose, SafetyLevel::Emergency)
        } else if matches!(
            battery_action,
            SafetyAction::LowBatteryShutdown | SafetyAction::LowBatteryPark
        ) {
            (battery_action, SafetyLevel::Critical)
        } else if !network_ok {
            (SafetyAction::NetworkFailure, SafetyLevel::Warning)
        } else if !daylight_ok {
            (SafetyAction::ParkForDaylight, SafetyLevel::Info)
        } else if !weather_ok || !clouds_ok || !rain_holdoff_ok {
            (SafetyAction::ParkAndWait, SafetyLevel::Warning)
        } else if !power_ok {
            (SafetyAction::ParkAndWait, SafetyLevel::Critical)
        } else if !altitude_ok || !enclosure_ok {
            (SafetyAction::ParkAndWait, SafetyLevel::Warning)
        } else if battery_action == SafetyAction::LowBatteryWarning {
            (SafetyAction::SafeToObserve, SafetyLevel::Warning)
        } else {
            (SafetyAction::SafeToObserve, SafetyLevel::Info)
        };

        if is_safe {
            state.unsafe_since = None;
            if state.safe_since.is_none() {
                state.safe_since = Some(now);
            }
        } else {
            state.safe_since = None;
            if state.unsafe_since.is_none() {
                state.unsafe_since = Some(now);
            }
        }

        if reasons.is_empty() {
            reasons.push("all systems nominal".to_string());
        }

        SafetyStatus {
            at: now,
            action,
            is_safe,
            reasons,
            level,
            weather_ok,
            clouds_ok,
            daylight_ok,
            power_ok,
            enclosure_ok,
            altitude_ok,
            meridian_ok,
            network_ok,
            battery_shutdown_stage: state.battery_stage,
            rain_holdoff_active: !rain_holdoff_ok,
        }
    }

    /// Debounce gate: an action is only actionable once the unsafe/safe
    /// condition has persisted for its hold time, except emergencies which
    /// bypass debouncing and execute on first evaluation.
    pub async fn should_execute(&self, status: &SafetyStatus) -> bool {
        let state = self.state.lock().await;
        if status.level == SafetyLevel::Emergency {
            return true;
        }
        let now = Utc::now();
        if status.is_safe {
            state
                .safe_since
                .map(|since| (now - since).num_seconds() >= self.thresholds.safe_duration_to_resume_secs)
                .unwrap_or(false)
        } else {
            state
                .unsafe_since
                .map(|since| (now - since).num_seconds() >= self.thresholds.unsafe_duration_to_park_secs)
                .unwrap_or(false)
        }
    }

    pub async fn set_observatory_state(&self, new_state: ObservatoryState) {
        self.state.lock().await.observatory_state = new_state;
    }

    fn evaluate_weather(
        thresholds: &SafetyThresholds,
        state: &mut SafetyState,
        now: DateTime<Utc>,
    ) -> (bool, Vec<String>, bool) {
        let Some(weather) = state.weather else {
            return (false, vec!["weather data unavailable".to_string()], false);
        };
        if (now - weather.at).num_seconds() > thresholds.weather_staleness_secs {
            return (
                false,
                vec!["weather data stale or unavailable, treating as unsafe".to_string()],
                false,
            );
        }
        if weather.rain_rate_in_hr > 0.0 {
            return (
                false,
                vec![format!("rain rate {:.2} in/hr, emergency", weather.rain_rate_in_hr)],
                true,
            );
        }

        let mut reasons = Vec::new();
        if weather.wind_gust_mph > thresholds.wind_gust_limit_mph {
            state.wind_triggered = true;
            return (
                false,
                vec![format!("wind gust {:.1} mph exceeds limit", weather.wind_gust_mph)],
                false,
            );
        }

        if state.wind_triggered {
            let clear = thresholds.wind_limit_mph - thresholds.wind_hysteresis_mph;
            if weather.wind_speed_mph < clear {
                state.wind_triggered = false;
            } else {
                reasons.push(format!(
                    "wind {:.1} mph, waiting for drop below {:.0} mph",
                    weather.wind_speed_mph, clear
                ));
            }
        } else if weather.wind_speed_mph > thresholds.wind_limit_mph {
            state.wind_triggered = true;
            reasons.push(format!("wind {:.1} mph exceeds limit", weather.wind_speed_mph));
        }

        if state.humidity_triggered {
            let clear = thresholds.humidity_limit_percent - thresholds.humidity_hysteresis_percent;
            if weather.humidity_percent < clear {
                state.humidity_triggered = false;
            } else {
                reasons.push(format!(
                    "humidity {:.1}%, waiting for drop below {:.0}%",
                    weather.humidity_percent, clear
                ));
            }
        } else if weather.humidity_percent > thresholds.humidity_limit_percent {
            state.humidity_triggered = true;
            reasons.push(format!("humidity {:.1}% exceeds limit", weather.humidity_percent));
        }

        let margin = weather.temperature_f - weather.dew_point_f;
        if margin < thresholds.dew_point_margin_f {
            reasons.push(format!("within {:.1}\u{b0}F of dew point, condensation risk", margin));
        }

        (reasons.is_empty(), reasons, false)
    }

    fn evaluate_clouds(
        thresholds: &SafetyThresholds,
        state: &mut SafetyState,
        now: DateTime<Utc>,
    ) -> (bool, Vec<String>) {
        let Some(cloud) = state.cloud else {
            return (true, Vec::new());
        };
        if (now - cloud.at).num_seconds() > thresholds.cloud_staleness_secs {
            return (
                true,
                vec!["cloud sensor data stale, relying on weather sensor".to_string()],
            );
        }

        if state.cloud_triggered {
            let clear = thresholds.clear_sky_threshold_c - thresholds.cloud_hysteresis_c;
            if cloud.sky_minus_ambient_c < clear {
                state.cloud_triggered = false;
                (true, vec![format!("clouds clearing: sky-ambient diff {:.1}C", cloud.sky_minus_ambient_c)])
            } else {
                (
                    false,
                    vec![format!(
                        "cloudy: sky-ambient diff {:.1}C, waiting for < {:.0}C",
                        cloud.sky_minus_ambient_c, clear
                    )],
                )
            }
        } else if cloud.sky_minus_ambient_c > thresholds.cloudy_threshold_c {
            state.cloud_triggered = true;
            (false, vec![format!("cloudy: sky-ambient diff {:.1}C", cloud.sky_minus_ambient_c)])
        } else {
            (true, Vec::new())
        }
    }

    fn evaluate_daylight(thresholds: &SafetyThresholds, state: &mut SafetyState) -> (bool, Vec<String>) {
        let Some(altitude) = state.sun_altitude_deg else {
            return (true, Vec::new());
        };

        if state.daylight_triggered {
            let clear = thresholds.twilight_altitude_deg - thresholds.twilight_hysteresis_deg;
            if altitude < clear {
                state.daylight_triggered = false;
                (true, vec![format!("astronomical night beginning (sun at {:.1}\u{b0})", altitude)])
            } else {
                (false, vec![format!("sun altitude {:.1}\u{b0}, waiting for < {:.0}\u{b0}", altitude, clear)])
            }
        } else if altitude > thresholds.twilight_altitude_deg {
            state.daylight_triggered = true;
            (false, vec![format!("sun altitude {:.1}\u{b0}, not astronomical night", altitude)])
        } else {
            (true, Vec::new())
        }
    }

    fn evaluate_rain_holdoff(
        thresholds: &SafetyThresholds,
        state: &SafetyState,
        now: DateTime<Utc>,
    ) -> (bool, Vec<String>) {
        let Some(last_rain) = state.last_rain_at else {
            return (true, Vec::new());
        };
        let elapsed_minutes = (now - last_rain).num_seconds() as f64 / 60.0;
        if elapsed_minutes < thresholds.rain_holdoff_minutes {
            let remaining = thresholds.rain_holdoff_minutes - elapsed_minutes;
            (false, vec![format!("rain holdoff: {:.0} minutes remaining", remaining)])
        } else {
            (true, Vec::new())
        }
    }

    fn evaluate_altitude(thresholds: &SafetyThresholds, state: &SafetyState) -> (bool, Vec<String>) {
        let Some(target) = state.target_altitude_deg else {
            return (true, Vec::new());
        };
        if target < thresholds.min_target_altitude_deg {
            (false, vec![format!("target altitude {:.1}\u{b0} below minimum {:.0}\u{b0}", target, thresholds.min_target_altitude_deg)])
        } else {
            (true, Vec::new())
        }
    }

    fn evaluate_power(thresholds: &SafetyThresholds, state: &SafetyState) -> (bool, Vec<String>, bool) {
        let Some(battery) = state.battery_percent else {
            return (true, Vec::new(), false);
        };
        if battery < thresholds.battery_stage4_shutdown_percent {
            return (
                false,
                vec![format!("UPS battery critical: {:.0}%, emergency shutdown", battery)],
                true,
            );
        }
        if battery < thresholds.battery_stage2_park_percent {
            return (false, vec![format!("UPS battery low: {:.0}%, parking telescope", battery)], false);
        }
        let mut reasons = Vec::new();
        if battery < thresholds.battery_stage1_warn_percent {
            reasons.push(format!("UPS battery warning: {:.0}%", battery));
        }
        if state.on_battery {
            reasons.push("running on battery power".to_string());
        }
        (true, reasons, false)
    }

    fn evaluate_enclosure(state: &SafetyState) -> (bool, Vec<String>) {
        match state.enclosure_open {
            None => (true, vec!["enclosure status unknown".to_string()]),
            Some(true) => (true, Vec::new()),
            Some(false) => (false, vec!["enclosure closed, cannot observe".to_string()]),
        }
    }

    fn evaluate_meridian(thresholds: &SafetyThresholds, state: &SafetyState) -> (bool, Vec<String>) {
        let Some(hour_angle) = state.hour_angle_deg else {
            return (true, Vec::new());
        };
        let ha = crate::coords::normalize_hour_angle_deg(hour_angle);
        let abs_ha = ha.abs();
        if abs_ha < thresholds.meridian_flip_zone_deg {
            (false, vec![format!("at meridian (HA={:.1}\u{b0}), flip required", ha)])
        } else if abs_ha < thresholds.meridian_warn_zone_deg {
            (true, vec![format!("approaching meridian (HA={:.1}\u{b0}), flip soon", ha)])
        } else {
            (true, Vec::new())
        }
    }

    fn evaluate_staged_battery(
        thresholds: &SafetyThresholds,
        state: &mut SafetyState,
    ) -> (bool, Vec<String>, SafetyAction) {
        let Some(battery) = state.battery_percent else {
            return (true, Vec::new(), SafetyAction::SafeToObserve);
        };

        let (new_stage, reason, action) = if battery < thresholds.battery_stage4_shutdown_percent {
            (4, format!("critical: battery {:.0}%, emergency shutdown required", battery), SafetyAction::LowBatteryShutdown)
        } else if battery < thresholds.battery_stage3_close_percent {
            (3, format!("battery {:.0}%, closing roof and preparing shutdown", battery), SafetyAction::LowBatteryShutdown)
        } else if battery < thresholds.battery_stage2_park_percent {
            (2, format!("battery {:.0}%, parking telescope", battery), SafetyAction::LowBatteryPark)
        } else if battery < thresholds.battery_stage1_warn_percent {
            (1, format!("battery {:.0}%, low battery warning", battery), SafetyAction::LowBatteryWarning)
        } else {
            (0, String::new(), SafetyAction::SafeToObserve)
        };

        if new_stage != state.battery_stage {
            if new_stage > state.battery_stage {
                tracing::warn!(from = state.battery_stage, to = new_stage, "battery shutdown stage increased");
            } else {
                tracing::info!(from = state.battery_stage, to = new_stage, "battery shutdown stage decreased");
            }
            state.battery_stage = new_stage;
        }

        let is_ok = new_stage < 2;
        let reasons = if reason.is_empty() { Vec::new() } else { vec![reason] };
        (is_ok, reasons, action)
    }

    fn evaluate_network(thresholds: &SafetyThresholds, state: &SafetyState) -> (bool, Vec<String>) {
        let mut reasons = Vec::new();
        if !state.network_connected {
            reasons.push(format!(
                "network disconnected ({} consecutive failures)",
                state.network_fail_count
            ));
            return (false, reasons);
        }
        if let Some(latency) = state.network_latency_ms {
            if latency > thresholds.network_latency_warning_ms {
                reasons.push(format!("high network latency: {:.0}ms", latency));
            }
        }
        (true, reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::WeatherSample;

    fn calm_weather() -> WeatherSample {
        WeatherSample {
            at: Utc::now(),
            temperature_f: 60.0,
            humidity_percent: 40.0,
            dew_point_f: 40.0,
            wind_speed_mph: 5.0,
            wind_gust_mph: 8.0,
            rain_rate_in_hr: 0.0,
        }
    }

    #[tokio::test]
    async fn rain_forces_emergency_close_immediately() {
        let monitor = SafetyMonitor::new(SafetyThresholds::default());
        let mut weather = calm_weather();
        weather.rain_rate_in_hr = 0.2;
        monitor.update_weather(weather).await;

        let status = monitor.evaluate().await;
        assert!(!status.is_safe);
        assert_eq!(status.action, SafetyAction::EmergencyClose);
        assert_eq!(status.level, SafetyLevel::Emergency);
        assert!(monitor.should_execute(&status).await, "emergencies bypass debouncing");
    }

    #[tokio::test]
    async fn wind_hysteresis_requires_margin_to_clear() {
        let monitor = SafetyMonitor::new(SafetyThresholds::default());
        let mut gusty = calm_weather();
        gusty.wind_speed_mph = 30.0;
        monitor.update_weather(gusty).await;
        let first = monitor.evaluate().await;
        assert!(!first.is_safe);

        let mut almost_clear = calm_weather();
        almost_clear.wind_speed_mph = 22.0;
        monitor.update_weather(almost_clear).await;
        let second = monitor.evaluate().await;
        assert!(!second.is_safe, "22mph is above limit-minus-hysteresis of 20mph");

        let mut clear = calm_weather();
        clear.wind_speed_mph = 15.0;
        monitor.update_weather(clear).await;
        let third = monitor.evaluate().await;
        assert!(third.is_safe);
    }

    #[tokio::test]
    async fn staged_battery_shutdown_escalates_with_depletion() {
        let monitor = SafetyMonitor::new(SafetyThresholds::default());
        monitor.update_weather(calm_weather()).await;
        monitor.update_power(8.0, true).await;

        let status = monitor.evaluate().await;
        assert_eq!(status.action, SafetyAction::EmergencyClose);
        assert_eq!(status.battery_shutdown_stage, 4);
    }

    #[tokio::test]
    async fn debounce_blocks_park_until_unsafe_duration_elapses() {
        let monitor = SafetyMonitor::new(SafetyThresholds::default());
        let mut windy = calm_weather();
        windy.wind_speed_mph = 30.0;
        monitor.update_weather(windy).await;

        let status = monitor.evaluate().await;
        assert!(!status.is_safe);
        assert!(!monitor.should_execute(&status).await, "unsafe_since was just set");
    }

    #[tokio::test]
    async fn missing_enclosure_data_warns_but_does_not_block() {
        let monitor = SafetyMonitor::new(SafetyThresholds::default());
        monitor.update_weather(calm_weather()).await;
        let status = monitor.evaluate().await;
        assert!(status.is_safe);
        assert!(status.reasons.iter().any(|r| r.contains("enclosure status unknown")));
    }
}
