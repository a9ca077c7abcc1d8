// src/utils/time.rs

use chrono::{DateTime, Utc};

pub const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Service for handling time-related operations.
#[derive(Debug, Clone)]
pub struct TimeService;

impl TimeService {
    /// Creates a new instance of `TimeService`.
    pub fn new() -> Self {
        TimeService
    }

    /// Gets the current UTC date and time.
    pub fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Gets the current timestamp in milliseconds since Unix epoch.
    pub fn current_timestamp_ms(&self) -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}

impl Default for TimeService {
    fn default() -> Self {
        Self::new()
    }
}

/// Gets the current timestamp in milliseconds since Unix epoch (standalone function).
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Converts a number of days into milliseconds.
pub fn days_to_ms(days: u32) -> u64 {
    days as u64 * MS_PER_DAY
}

/// Timestamp the given number of days before now, in milliseconds.
pub fn ms_days_ago(days: u32) -> u64 {
    current_timestamp_ms().saturating_sub(days_to_ms(days))
}
