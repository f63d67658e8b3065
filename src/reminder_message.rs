// src/reminder_message.rs

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Utc};

/// Stored representation of `booking.date`.
pub const BOOKING_DATE_FORMAT: &str = "%Y-%m-%d";

pub const MISSING_DESCRIPTION_MESSAGE: &str = "No description provided.";
pub const MISSING_DESCRIPTION_LOG: &str = "No description provided";

/// Calendar day after `now`, as seen from `offset`.
pub fn tomorrow(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    let today = now.with_timezone(&offset).date_naive();
    // Only fails at NaiveDate::MAX
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

pub fn booking_date_string(date: NaiveDate) -> String {
    date.format(BOOKING_DATE_FORMAT).to_string()
}

/// Prefix `+` when absent; an already prefixed number is returned as-is.
pub fn normalize_phone_number(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{trimmed}")
    }
}

/// "June 2nd, 2024"
pub fn human_date(date: NaiveDate) -> String {
    let day = date.day();
    format!("{} {}{}, {}", date.format("%B"), day, ordinal_suffix(day), date.year())
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

pub fn compose_reminder(doctor_name: &str, date: NaiveDate, description: Option<&str>) -> String {
    let details = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(MISSING_DESCRIPTION_MESSAGE);

    format!(
        "Reminder: Your appointment with Dr. {doctor_name} is scheduled for {}. Details: {details}",
        human_date(date)
    )
}
