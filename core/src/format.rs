//! Display formatting helpers
//!
//! Pure functions turning numbers and timestamps into the strings shown on
//! the pages. Absent or non-finite inputs render as `"N/A"`.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

/// Placeholder for values that cannot be shown
pub const NOT_AVAILABLE: &str = "N/A";

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Fixed decimals with `,` thousands separators
pub fn format_number(value: Option<f64>, decimals: usize) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `"{value:.decimals}%"`
pub fn format_percent(value: Option<f64>, decimals: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.*}%", decimals, v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Human readable byte count (1024 based)
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, SIZE_UNITS[unit])
}

/// `YYYY-MM-DD HH:MM:SS` in the timestamp's own zone
pub fn format_time<Tz>(timestamp: Option<&DateTime<Tz>>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match timestamp {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `HH:MM:SS`, used for chart axis labels and the tick stream
pub fn format_clock<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format("%H:%M:%S").to_string()
}

/// Coarse "how long ago" text relative to `now`
pub fn relative_time(timestamp: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = timestamp else {
        return NOT_AVAILABLE.to_string();
    };

    let secs = (now - *ts).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        "just now".to_string()
    } else if mins < 60 {
        plural(mins, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Bootstrap colour class for a status word
pub fn status_color(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "healthy" | "online" | "active" | "enabled" => "success",
        "warning" => "warning",
        "error" | "critical" | "offline" => "danger",
        _ => "secondary",
    }
}

/// Font Awesome icon class for a status word
pub fn status_icon(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "healthy" | "online" | "active" | "enabled" => "fas fa-check-circle",
        "warning" => "fas fa-exclamation-triangle",
        "error" | "critical" | "offline" => "fas fa-times-circle",
        "disabled" => "fas fa-minus-circle",
        _ => "fas fa-question-circle",
    }
}

/// Text colour for a utilisation figure: > 80 danger, > 60 warning
pub fn load_class(percent: f64) -> &'static str {
    if percent > 80.0 {
        "text-danger"
    } else if percent > 60.0 {
        "text-warning"
    } else {
        "text-success"
    }
}

/// Escape text before it is interpolated into markup
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(None, 1), "N/A");
        assert_eq!(format_percent(Some(f64::NAN), 1), "N/A");
        assert_eq!(format_percent(Some(12.345), 1), "12.3%");
        assert_eq!(format_percent(Some(0.0), 1), "0.0%");
    }

    #[test]
    fn test_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn test_number_grouping() {
        assert_eq!(format_number(Some(1234567.891), 2), "1,234,567.89");
        assert_eq!(format_number(Some(999.0), 0), "999");
        assert_eq!(format_number(Some(-1234.5), 1), "-1,234.5");
        assert_eq!(format_number(Some(-0.001), 2), "0.00");
        assert_eq!(format_number(None, 2), "N/A");
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let at = |d: Duration| now - d;
        assert_eq!(relative_time(Some(&at(Duration::seconds(5))), now), "just now");
        assert_eq!(relative_time(Some(&at(Duration::minutes(1))), now), "1 minute ago");
        assert_eq!(relative_time(Some(&at(Duration::minutes(42))), now), "42 minutes ago");
        assert_eq!(relative_time(Some(&at(Duration::hours(3))), now), "3 hours ago");
        assert_eq!(relative_time(Some(&at(Duration::days(2))), now), "2 days ago");
        assert_eq!(relative_time(Some(&at(Duration::days(30))), now), "2024-05-11");
        assert_eq!(relative_time(None, now), "N/A");
    }

    #[test]
    fn test_format_time() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 13, 4, 5).unwrap();
        assert_eq!(format_time(Some(&ts)), "2024-01-05 13:04:05");
        assert_eq!(format_time::<Utc>(None), "N/A");
    }

    #[test]
    fn test_status_lookup_fallbacks() {
        assert_eq!(status_color("ONLINE"), "success");
        assert_eq!(status_color("mystery"), "secondary");
        assert_eq!(status_color("info"), "secondary");
        assert_eq!(status_color("DEBUG"), "secondary");
        assert_eq!(status_color("critical"), "danger");
        assert_eq!(status_icon("disabled"), "fas fa-minus-circle");
        assert_eq!(status_icon("mystery"), "fas fa-question-circle");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<b>\"x\" & 'y'</b>"),
            "&lt;b&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/b&gt;"
        );
    }
}
