//! Play timestamp utilities
//!
//! The playback server stores `last_played` as local wall-clock text,
//! `YYYY-MM-DD HH:MM:SS`. Older rows may carry a `T` separator, fractional
//! seconds, or just a date.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

/// Format written to the play-history store
pub const PLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds
pub fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Render a timestamp the way the playback server stores it
pub fn format_play_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(PLAY_TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored `last_played` value; unparsable text yields `None`
pub fn parse_play_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
