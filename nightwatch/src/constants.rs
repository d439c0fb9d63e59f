//! Default timeouts, thresholds, and ports.
//!
//! Central repository for the magic numbers in §4 and §6 of the
//! specification, organized by the component that owns them.

#![allow(dead_code)]

use std::time::Duration;

/// LX200 mount protocol constants (§4.A, §6).
pub mod mount {
    use super::Duration;

    pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_TCP_PORT: u16 = 9999;
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
    pub const TERMINATOR: u8 = b'#';
}

/// Sensor adapter poll intervals (§4.B).
pub mod sensors {
    use super::Duration;

    pub const WEATHER_POLL_INTERVAL: Duration = Duration::from_secs(30);
    pub const CLOUD_POLL_INTERVAL: Duration = Duration::from_secs(45);
    pub const POWER_POLL_INTERVAL: Duration = Duration::from_secs(5);
    pub const ENCLOSURE_POLL_INTERVAL: Duration = Duration::from_secs(10);
}

/// Safety monitor thresholds (§4.C).
pub mod safety {
    pub const WIND_LIMIT_MPH: f64 = 25.0;
    pub const WIND_GUST_LIMIT_MPH: f64 = 35.0;
    pub const WIND_HYSTERESIS_MPH: f64 = 5.0;

    pub const HUMIDITY_LIMIT_PERCENT: f64 = 85.0;
    pub const HUMIDITY_HYSTERESIS_PERCENT: f64 = 5.0;
    pub const DEW_POINT_MARGIN_F: f64 = 5.0;

    pub const RAIN_HOLDOFF_MINUTES: f64 = 30.0;

    pub const CLOUD_CLEAR_THRESHOLD_C: f64 = -25.0;
    pub const CLOUD_CLOUDY_THRESHOLD_C: f64 = -15.0;
    pub const CLOUD_HYSTERESIS_C: f64 = 3.0;

    pub const TWILIGHT_ALTITUDE_DEG: f64 = -12.0;
    pub const TWILIGHT_HYSTERESIS_DEG: f64 = 2.0;

    pub const MIN_TARGET_ALTITUDE_DEG: f64 = 10.0;

    pub const MERIDIAN_WARN_ZONE_DEG: f64 = 5.0;
    pub const MERIDIAN_FLIP_ZONE_DEG: f64 = 2.0;

    pub const BATTERY_STAGE1_WARN_PERCENT: f64 = 50.0;
    pub const BATTERY_STAGE2_PARK_PERCENT: f64 = 30.0;
    pub const BATTERY_STAGE3_CLOSE_PERCENT: f64 = 15.0;
    pub const BATTERY_STAGE4_SHUTDOWN_PERCENT: f64 = 10.0;

    pub const WEATHER_STALENESS_SECS: i64 = 120;
    pub const CLOUD_STALENESS_SECS: i64 = 180;
    pub const EPHEMERIS_STALENESS_SECS: i64 = 600;

    pub const UNSAFE_DURATION_TO_PARK_SECS: i64 = 60;
    pub const SAFE_DURATION_TO_RESUME_SECS: i64 = 300;

    pub const NETWORK_CHECK_HOSTS: [&str; 2] = ["8.8.8.8", "1.1.1.1"];
    pub const NETWORK_TIMEOUT_SECS: u64 = 5;
    pub const NETWORK_FAIL_COUNT_PARK: u32 = 3;
    pub const NETWORK_LATENCY_WARNING_MS: f64 = 500.0;

    pub const EVALUATION_INTERVAL_SECS: u64 = 10;

    /// Rolling window of persisted safety evaluations kept in the history store.
    pub const HISTORY_WINDOW_ROWS: i64 = 2000;
}

/// Alert manager constants (§4.D).
pub mod alerts {
    pub const MAX_PER_HOUR: u32 = 20;
    pub const MIN_INTERVAL_SECONDS: i64 = 60;
    pub const EMAIL_MIN_INTERVAL_SECONDS: i64 = 3600;
    pub const DEDUP_WINDOW_SECONDS: i64 = 300;
    pub const ESCALATION_TIMEOUT_SECONDS: i64 = 300;
    pub const QUIET_HOURS_START: u32 = 22;
    pub const QUIET_HOURS_END: u32 = 7;
    pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;
}

/// Tool executor constants (§4.G).
pub mod tools {
    use super::Duration;

    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);
    /// Rolling window of persisted tool invocations kept in the history store.
    pub const EXECUTION_LOG_WINDOW_ROWS: i64 = 2000;
}

/// Wyoming protocol defaults (§6).
pub mod wyoming {
    pub const DEFAULT_STT_PORT: u16 = 10300;
    pub const DEFAULT_TTS_PORT: u16 = 10301;
    pub const SAMPLE_RATE_HZ: u32 = 16000;
}

/// Voice coordinator constants (§4.J).
pub mod voice {
    use super::Duration;

    pub const SILENCE_DURATION: Duration = Duration::from_millis(800);
    pub const RESPONSE_QUEUE_CAPACITY: usize = 8;
    pub const MIN_CONFIDENCE: f32 = 0.55;
}

/// Web status API defaults (§4.H ADDED).
pub mod web {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8420;
}

/// CLI exit codes (§6).
pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const CONFIG_INVALID: i32 = 1;
    pub const STARTUP_FAILED: i32 = 2;
    pub const INTERRUPTED: i32 = 130;
}
