// src/config/duration.rs

use std::time::Duration;

use crate::errors::{GantryError, Result};

/// Parse a duration string like `"250ms"`, `"3s"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(GantryError::Config("empty duration string".to_string()));
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| {
            GantryError::Config(format!("duration '{s}' is missing a unit suffix"))
        })?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part.parse().map_err(|e| {
        GantryError::Config(format!("invalid duration number '{num_part}': {e}"))
    })?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        unit => Err(GantryError::Config(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        ))),
    }
}
