//! Local wall-clock sampling.

use chrono::{DateTime, Local, TimeZone};

/// Display format, e.g. `Oct 17 09:05:31`.
pub const TIME_FORMAT: &str = "%b %d %H:%M:%S";

/// Returns the local wall clock formatted as `Mon DD HH:MM:SS`.
pub fn sample_time() -> String {
    format_time(&Local::now())
}

pub fn format_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(TIME_FORMAT).to_string()
}
