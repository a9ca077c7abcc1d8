// src/utils/formatter.rs

use chrono::{DateTime, Utc};

/// Format a monthly USD amount for insight and report text
pub fn format_currency(value: f64) -> String {
    format!("${:.2}", value)
}

/// Format a ratio as a percentage with one decimal place
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Format an optional value with fallback to "N/A"
pub fn format_optional<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "N/A".to_string(),
    }
}

/// Format a millisecond timestamp to a readable UTC string
pub fn format_timestamp(timestamp: u64) -> String {
    let datetime = DateTime::from_timestamp_millis(timestamp as i64).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
