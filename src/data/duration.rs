use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to milliseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Parse interval strings like "5s", "500ms", "1.5m", "2h".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            return to_duration(val_str, *multiplier, s);
        }
    }

    to_duration(s, 1_000.0, s)
}

fn to_duration(val_str: &str, multiplier: f64, original: &str) -> Result<Duration> {
    let Ok(val) = val_str.trim().parse::<f64>() else {
        bail!("Unknown duration format: {}", original);
    };
    if !val.is_finite() || val < 0.0 {
        bail!("Duration must be a non-negative number: {}", original);
    }
    Ok(Duration::from_micros((val * multiplier * 1_000.0) as u64))
}

/// Format how long ago something happened, for the status bar.
pub fn format_age(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 1 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m {}s ago", secs / 60, secs % 60)
    } else {
        format!("{}h {}m ago", secs / 3600, (secs % 3600) / 60)
    }
}
