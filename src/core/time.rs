// Time helpers - epoch millis, relative "time ago" labels and clock labels

use chrono::{DateTime, Utc};

use crate::models::Millis;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> Millis {
    Utc::now().timestamp_millis()
}

pub fn to_datetime(millis: Millis) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Relative label for `created` as seen at `now`.
///
/// Buckets: under a minute is "just now", then minutes, hours, days, weeks,
/// months (30 days) and years (365 days). Future timestamps read "just now".
pub fn time_ago_at(created: Millis, now: Millis) -> String {
    let seconds = (now - created).max(0) / 1000;
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 7 {
        return format!("{}d", days);
    }

    let weeks = days / 7;
    if weeks < 4 {
        return format!("{}w", weeks);
    }

    let months = (days / 30).max(1);
    if months < 12 {
        return format!("{}mo", months);
    }

    format!("{}y", (days / 365).max(1))
}

pub fn time_ago(created: Millis) -> String {
    time_ago_at(created, current_time_millis())
}

/// "HH:MM" label used on thread messages.
pub fn clock_label(millis: Millis) -> String {
    to_datetime(millis).format("%H:%M").to_string()
}
