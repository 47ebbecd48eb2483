//! Timestamp and calendar-day utilities

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar day (the store's day granularity)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The `days` calendar days ending at `end`, newest first
pub fn trailing_days(end: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64).map(|offset| end - Duration::days(offset)).collect()
}
