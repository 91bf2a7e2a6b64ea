//! Shared utilities for CLI commands.

use std::io::Write;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;

/// Pre-compiled regex for relative date parsing.
static RELATIVE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(day|week)s?\s+ago$").unwrap());

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour)s?\s+ago$").unwrap());

/// Conservative bound for relative parsing (~1000 years in days).
const MAX_RELATIVE_DAYS: i64 = 1000 * 365;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a date relative to `today`.
///
/// Supports:
/// - ISO dates: "2025-03-05"
/// - "today", "yesterday"
/// - Relative: "3 days ago", "1 week ago"
pub fn parse_date(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }
    if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        return Ok(date);
    }

    let Some(caps) = RELATIVE_DATE_RE.captures(&s) else {
        anyhow::bail!(
            "Invalid date: {s}. Use YYYY-MM-DD, 'today', 'yesterday', or relative (e.g., '3 days ago')"
        );
    };
    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative date")?;
    let days_per_unit = if &caps[2] == "week" { 7 } else { 1 };
    if n > MAX_RELATIVE_DAYS / days_per_unit {
        anyhow::bail!("Relative date value too large: {n} {}", &caps[2]);
    }
    Ok(today - Duration::days(n * days_per_unit))
}

/// Parse a local timestamp relative to `now`.
///
/// Supports:
/// - Full timestamps: "2025-03-05 09:30", "2025-03-05T09:30:00"
/// - A clock time today: "09:30"
/// - "now" and relative: "90 minutes ago", "2 hours ago"
pub fn parse_datetime(s: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(time) = parse_clock(s) {
        return Ok(now.date().and_time(time));
    }

    let s = s.to_lowercase();
    if s == "now" {
        return Ok(now);
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(&s) else {
        anyhow::bail!(
            "Invalid time: {s}. Use 'YYYY-MM-DD HH:MM', 'HH:MM', or relative (e.g., '2 hours ago')"
        );
    };
    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;
    let minutes_per_unit = if &caps[2] == "hour" { 60 } else { 1 };
    if n > MAX_RELATIVE_DAYS * 24 * 60 / minutes_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }
    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Parse a clock time ("HH:MM").
pub fn parse_clock(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid clock time: {s}. Use HH:MM"))
}

/// Formats minutes as "Xh Ym" if >= 1 hour, "Xm" otherwise.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours >= 1 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

/// Formats an optional mean with one decimal, or "-" when absent.
pub fn format_mean(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("failed to serialize output")?;
    writeln!(writer)?;
    Ok(())
}
