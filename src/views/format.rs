use serde::Deserialize;
use serde_json::Value;

use crate::record::value_text;

/// A point in time as the backend flattens it into `<key>_hour`, `<key>_min`
/// and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stamp {
    pub hour: u32,
    pub min: u32,
    pub day: u32,
    pub month: u32,
    pub istoday: bool,
    pub istomorrow: bool,
}

/// `"HH:MM"` today, `"tomorrow HH:MM"` tomorrow, `"DD.MM HH:MM"` otherwise.
pub fn print_time(t: &Stamp) -> String {
    if t.istoday {
        format!("{:02}:{:02}", t.hour, t.min)
    } else if t.istomorrow {
        format!("tomorrow {:02}:{:02}", t.hour, t.min)
    } else {
        format!("{:02}.{:02} {:02}:{:02}", t.day, t.month, t.hour, t.min)
    }
}

pub fn duration(seconds: i64) -> String {
    format!("{}'", seconds.div_euclid(60))
}

/// Hz to MHz with three decimals.
pub fn frequency(hz: u64) -> String {
    format!("{:.3}", hz as f64 / 1_000_000.0)
}

/// Label for enum values the client does not know.
pub const UNKNOWN: &str = "?";

pub fn epg_state(state: i64) -> &'static str {
    match state {
        0 => "Missing",
        1 => "ok",
        2 => "Updating",
        3 => "N/A",
        _ => UNKNOWN,
    }
}

pub fn recording_state(state: i64) -> &'static str {
    match state {
        0 => "New",
        1 => "Scheduled",
        2 => "Starting",
        3 => "Running",
        4 => "Done",
        5 => "Aborted",
        6 => "Failed",
        7 => "Missed",
        _ => UNKNOWN,
    }
}

pub fn transponder_state(state: i64) -> &'static str {
    match state {
        0 => "New",
        1 => "Selected",
        2 => "Tuning",
        3 => "Tuned",
        4 => "No Tune",
        5 => "Scanning",
        6 => "Scanned",
        7 => "Scanning failed",
        8 => "Idle",
        9 => "Duplicate",
        _ => UNKNOWN,
    }
}

/// Linux DVB delivery system numbers.
pub fn delivery_system(delsys: i64) -> &'static str {
    match delsys {
        1 => "DVB-C",
        3 => "DVB-T",
        5 => "DVB-S",
        6 => "DVB-S2",
        11 => "ATSC",
        16 => "DVB-T2",
        _ => UNKNOWN,
    }
}

/// The backend sends flags as 0/1 integers. Anything else but `true` is unset.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// Accepts a string or a number and keeps it as text, `null` is empty.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}
