//! Human-readable date and time lines for the log.

use chrono::{DateTime, Datelike};

use crate::render::TimeParts;

// Short names except where the full name is short anyway
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "June", "July", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// "<Weekday>, <Month> <Day>, <Year>", e.g. "Tuesday, July 4, 2023".
/// `None` outside the representable calendar range.
pub fn date_line(local: i64) -> Option<String> {
    let date = DateTime::from_timestamp(local, 0)?.date_naive();
    Some(format!(
        "{}, {} {}, {}",
        date.format("%A"),
        MONTHS[date.month0() as usize],
        date.day(),
        date.year()
    ))
}

/// Zero-padded 12-hour time without seconds, e.g. "09:05 PM".
pub fn time_line(local: i64) -> String {
    if let Some(dt) = DateTime::from_timestamp(local, 0) {
        return dt.naive_utc().format("%I:%M %p").to_string();
    }

    // Beyond chrono's calendar the time of day is still well defined
    let parts = TimeParts::from_local(local);
    format!(
        "{:02}:{:02} {}",
        parts.hour12,
        parts.minute,
        if parts.is_pm { "PM" } else { "AM" }
    )
}
