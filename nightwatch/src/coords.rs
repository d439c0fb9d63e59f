//! Celestial coordinate types and sexagesimal (de)serialization (§3).
//!
//! Right ascension is stored as fractional hours in `[0, 24)`; declination
//! as fractional degrees in `[-90, 90]`. Formatting to and parsing from
//! LX200-style sexagesimal strings is a pure function pair, independent of
//! any connection state.

use crate::errors::ProtocolError;

/// A celestial position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinates {
    pub ra_hours: f64,
    pub dec_deg: f64,
}

/// A horizontal position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AltAz {
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
}

fn protocol_err(reason: impl Into<String>) -> ProtocolError {
    ProtocolError {
        context: "coordinates".to_string(),
        reason: reason.into(),
    }
}

/// Formats RA hours as `HH:MM:SS` (no terminator; callers append `#` and
/// the `:Sr` prefix as needed).
pub fn format_ra(ra_hours: f64) -> String {
    let ra = ra_hours.rem_euclid(24.0);
    let total_seconds = (ra * 3600.0).round() as i64;
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Formats Dec degrees as `sDD*MM:SS` (sign, degrees, arcmin, arcsec).
pub fn format_dec(dec_deg: f64) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let magnitude = dec_deg.abs().min(90.0);
    let total_arcsec = (magnitude * 3600.0).round() as i64;
    let d = total_arcsec / 3600;
    let m = (total_arcsec % 3600) / 60;
    let s = total_arcsec % 60;
    format!("{}{:02}*{:02}:{:02}", sign, d, m, s)
}

/// Parses a `HH:MM:SS` RA string (terminator already stripped) into hours.
pub fn parse_ra(s: &str) -> Result<f64, ProtocolError> {
    let parts: Vec<&str> = s.trim().splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err(protocol_err(format!("malformed RA string '{}'", s)));
    }
    let h: f64 = parts[0]
        .parse()
        .map_err(|_| protocol_err(format!("bad RA hours in '{}'", s)))?;
    let m: f64 = parts[1]
        .parse()
        .map_err(|_| protocol_err(format!("bad RA minutes in '{}'", s)))?;
    let sec: f64 = parts[2]
        .parse()
        .map_err(|_| protocol_err(format!("bad RA seconds in '{}'", s)))?;
    Ok((h + m / 60.0 + sec / 3600.0).rem_euclid(24.0))
}

/// Parses a `sDD*MM:SS` Dec string into degrees. Also accepts `sDD*MM'SS`
/// as used by the `GA` (altitude) opcode.
pub fn parse_dec(s: &str) -> Result<f64, ProtocolError> {
    let s = s.trim();
    let (sign, rest) = match s.chars().next() {
        Some('-') => (-1.0, &s[1..]),
        Some('+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let rest = rest.replace('\'', ":").replace('*', ":");
    let parts: Vec<&str> = rest.splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err(protocol_err(format!("malformed Dec string '{}'", s)));
    }
    let d: f64 = parts[0]
        .parse()
        .map_err(|_| protocol_err(format!("bad Dec degrees in '{}'", s)))?;
    let m: f64 = parts[1]
        .parse()
        .map_err(|_| protocol_err(format!("bad Dec minutes in '{}'", s)))?;
    let sec: f64 = parts[2]
        .parse()
        .map_err(|_| protocol_err(format!("bad Dec seconds in '{}'", s)))?;
    let magnitude = d + m / 60.0 + sec / 3600.0;
    Ok((sign * magnitude).clamp(-90.0, 90.0))
}

/// Normalizes a hour-angle style difference into `[-180, 180]` degrees,
/// matching the source's `LST - RA` convention (§9 Open Question: both
/// sides of the meridian are treated as equally urgent, east/west is not
/// distinguished here).
pub fn normalize_hour_angle_deg(raw_deg: f64) -> f64 {
    let mut a = raw_deg % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ra_round_trips() {
        for &ra in &[0.0, 0.7125, 6.0, 12.5, 18.333_333, 23.999_722] {
            let formatted = format_ra(ra);
            let parsed = parse_ra(&formatted).unwrap();
            assert!((parsed - ra).abs() < 1.0 / 3600.0, "{} -> {} -> {}", ra, formatted, parsed);
        }
    }

    #[test]
    fn dec_round_trips() {
        for &dec in &[-90.0, -41.2692, -0.0001, 0.0, 41.2692, 89.9999] {
            let formatted = format_dec(dec);
            let parsed = parse_dec(&formatted).unwrap();
            assert!((parsed - dec).abs() < 1.0 / 3600.0, "{} -> {} -> {}", dec, formatted, parsed);
        }
    }

    #[test]
    fn m31_formats_to_known_string() {
        // End-to-end scenario 1: RA=0.7125h, Dec=+41.2692 deg.
        assert_eq!(format_ra(0.7125), "00:42:45");
        assert_eq!(format_dec(41.2692), "+41*16:09");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(parse_ra("not-a-time").is_err());
        assert!(parse_dec("+41*16").is_err());
    }

    #[test]
    fn meridian_zone_is_symmetric() {
        assert_eq!(normalize_hour_angle_deg(190.0), -170.0);
        assert_eq!(normalize_hour_angle_deg(-190.0), 170.0);
        assert!((normalize_hour_angle_deg(1.0)).abs() < crate::constants::safety::MERIDIAN_WARN_ZONE_DEG);
    }
}
