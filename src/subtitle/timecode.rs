//! Conversion between SubRip timestamps and seconds.

use crate::error::{Result, SubverifyError};

// Absorbs binary floating point error so whole milliseconds survive truncation
const MILLIS_TOLERANCE: f64 = 1e-4;

/// Parse `HH:MM:SS,mmm` or `HH:MM:SS.mmm` into seconds
pub fn to_seconds(text: &str) -> Result<f64> {
    let invalid = || SubverifyError::InvalidTimestamp(text.to_string());

    let mut parts = text.trim().split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hours = parse_digits(hours).ok_or_else(invalid)?;
    let minutes = parse_digits(minutes).ok_or_else(invalid)?;

    let (whole, fraction) = match seconds.split_once([',', '.']) {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    let whole = parse_digits(whole).ok_or_else(invalid)?;
    let fraction = match fraction {
        Some(digits) => {
            parse_digits(digits).ok_or_else(invalid)?;
            format!("0.{}", digits).parse::<f64>().map_err(|_| invalid())?
        }
        None => 0.0,
    };

    let total = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(whole))
        .ok_or_else(invalid)?;

    Ok(total as f64 + fraction)
}

/// Render seconds as `HH:MM:SS,mmm`, truncating to whole milliseconds
pub fn to_text(seconds: f64) -> String {
    let total_milliseconds = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0 + MILLIS_TOLERANCE).floor() as u64
    } else {
        0
    };
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

fn parse_digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
