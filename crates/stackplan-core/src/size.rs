//! Human-readable size handling.
//!
//! Provisioners and charm constraints express memory and disk either as
//! plain megabyte counts or as strings such as `"2G"` or `"1.5T"`. All
//! comparisons inside stackplan happen in megabytes.

use crate::error::{CoreError, CoreResult};

const MB_PER_GB: f64 = 1024.0;

/// Parse a size string like `"512M"`, `"2G"`, `"1.5TiB"` into megabytes.
///
/// A bare number is already megabytes.
pub fn human_to_mb(s: &str) -> CoreResult<u64> {
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| CoreError::InvalidSize(s.to_string()))?;

    let unit = unit.trim().to_ascii_lowercase();
    let unit = unit
        .strip_suffix("ib")
        .or_else(|| unit.strip_suffix('b'))
        .unwrap_or(&unit);

    let multiplier = match unit {
        "" | "m" => 1.0,
        "g" => MB_PER_GB,
        "t" => MB_PER_GB * MB_PER_GB,
        "p" => MB_PER_GB * MB_PER_GB * MB_PER_GB,
        _ => return Err(CoreError::InvalidSize(s.to_string())),
    };

    Ok((value * multiplier).round() as u64)
}

/// Render a megabyte count with the largest unit that keeps it >= 1.
pub fn mb_to_human(mb: u64) -> String {
    let units = [("P", 3), ("T", 2), ("G", 1)];
    for (suffix, power) in units {
        let scale = MB_PER_GB.powi(power);
        let value = mb as f64 / scale;
        if value >= 1.0 {
            return format!("{}{suffix}", trim_decimal(value));
        }
    }
    format!("{mb}M")
}

fn trim_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as u64)
    } else {
        format!("{rounded:.1}")
    }
}
