//! Dynamic time-zone descriptor and its ISO-8601 date representation.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{DmError, Result};
use crate::util::truncate_utf16;

/// Room in the OS standard/daylight name fields, terminator excluded.
pub const NAME_MAX_UNITS: usize = 31;
/// Room in the OS zone key name field, terminator excluded.
pub const KEY_NAME_MAX_UNITS: usize = 127;

const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// OS calendar record.  In a transition rule `month == 0` means the zone has
/// no such transition, and `day` may denote the Nth weekday of the month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTime {
    pub year:         u16,
    pub month:        u16,
    pub day_of_week:  u16,
    pub day:          u16,
    pub hour:         u16,
    pub minute:       u16,
    pub second:       u16,
    pub milliseconds: u16,
}

impl SystemTime {
    /// Parse `YYYY-MM-DDThh:mm:ss`, optionally followed by fractional seconds
    /// and a `Z` designator.
    pub fn from_iso8601(value: &str) -> Result<Self> {
        let invalid = |source| DmError::DateParse { value: value.to_string(), source };

        let text = value.strip_suffix('Z').unwrap_or(value);
        let dt = NaiveDateTime::parse_from_str(text, ISO8601_FORMAT).map_err(|e| invalid(Some(e)))?;
        let year = u16::try_from(dt.year()).map_err(|_| invalid(None))?;

        Ok(SystemTime {
            year,
            month:        dt.month() as u16,
            day_of_week:  dt.weekday().num_days_from_sunday() as u16,
            day:          dt.day() as u16,
            hour:         dt.hour() as u16,
            minute:       dt.minute() as u16,
            second:       dt.second() as u16,
            milliseconds: (dt.nanosecond() / 1_000_000).min(999) as u16,
        })
    }

    /// Render as ISO-8601.  A record without a month encodes as the empty
    /// string, the same value that requests use for "no transition".
    pub fn to_iso8601(&self) -> String {
        if self.month == 0 {
            return String::new();
        }
        let mut s = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        if self.milliseconds != 0 {
            s.push_str(&format!(".{:03}", self.milliseconds));
        }
        s
    }
}

/// One standard or daylight transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRule {
    pub name: String,
    pub date: SystemTime,
    /// Minutes added to the zone bias while this rule is in effect.
    pub bias: i32,
}

impl TransitionRule {
    /// Build a rule from request fields.  The name is truncated to the OS
    /// field width; an empty date yields `month == 0`.
    pub fn from_fields(name: &str, date: &str, day_of_week: u16, bias: i32) -> Result<Self> {
        let mut date = if date.is_empty() {
            SystemTime::default()
        } else {
            SystemTime::from_iso8601(date)?
        };
        date.day_of_week = day_of_week;
        Ok(TransitionRule { name: truncate_utf16(name, NAME_MAX_UNITS), date, bias })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicTimeZone {
    /// UTC = local time + bias, in minutes.
    pub bias:                           i32,
    pub standard:                       TransitionRule,
    pub daylight:                       TransitionRule,
    pub time_zone_key_name:             String,
    pub dynamic_daylight_time_disabled: bool,
}

impl DynamicTimeZone {
    pub fn set_key_name(&mut self, key_name: &str) {
        self.time_zone_key_name = truncate_utf16(key_name, KEY_NAME_MAX_UNITS);
    }
}
