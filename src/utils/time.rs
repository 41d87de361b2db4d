//! Timestamp parsing and formatting utilities

use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};

/// Format a duration as `HH:MM:SS.fff`, the form the encoder takes for `-ss`/`-to`.
/// Hours are not wrapped at 24.
pub fn format_timestamp(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let milliseconds = total_millis % 1000;

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        hours, minutes, seconds, milliseconds
    )
}

/// Parse seconds (`90.5`), `MM:SS.ms` or `HH:MM:SS.ms`
pub fn parse_timestamp(time_str: &str) -> DomainResult<Duration> {
    let trimmed = time_str.trim();
    let invalid = |reason: &str| {
        DomainError::BadArgs(format!("Invalid time '{}': {}", trimmed, reason))
    };

    // Try parsing as seconds (float)
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid("time cannot be negative"));
        }
        return Ok(Duration::from_secs_f64(seconds));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0u64, *minutes, *seconds),
        [hours, minutes, seconds] => (
            hours
                .parse::<u64>()
                .map_err(|_| invalid("hours must be a whole number"))?,
            *minutes,
            *seconds,
        ),
        _ => {
            return Err(invalid(
                "supported formats are seconds (123.45), MM:SS.ms (2:30.5) and HH:MM:SS.ms (1:02:30.5)",
            ))
        }
    };

    let minutes = minutes
        .parse::<u64>()
        .map_err(|_| invalid("minutes must be a whole number"))?;
    let seconds = seconds
        .parse::<f64>()
        .map_err(|_| invalid("seconds must be a number"))?;

    if parts.len() == 3 && minutes >= 60 {
        return Err(invalid("minutes must be less than 60"));
    }
    if !(0.0..60.0).contains(&seconds) {
        return Err(invalid("seconds must be between 0 and 60"));
    }

    Ok(Duration::from_secs(hours * 3600 + minutes * 60) + Duration::from_secs_f64(seconds))
}
