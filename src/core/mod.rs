// Core helpers - time labels and display formatting shared by every service

pub mod formatting;
pub mod time;

pub use formatting::{avatar_url, capitalize_name, display_name, handle};
pub use time::{clock_label, current_time_millis, time_ago, time_ago_at, to_datetime};
