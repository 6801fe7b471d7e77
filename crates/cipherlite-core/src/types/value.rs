//! Dynamically typed values exchanged with the host abstraction.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Text form used when binding date-times (ISO-8601 with milliseconds).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
/// Text form used when binding times of day.
pub const TIME_FORMAT: &str = "%H:%M:%S%.3f";
/// Text form used when binding calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats accepted when reading a date-time back from text. The engine's own
/// `datetime()` output uses a space separator and no fraction.
const DATETIME_PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A single column or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// How floating-point columns are handed back on fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericPrecision {
    /// Truncate to a 32-bit integer.
    LowInt32,
    /// Truncate to a 64-bit integer.
    LowInt64,
    /// Keep as a double.
    LowDouble,
    /// Keep as a double. The engine has no exact decimal storage.
    #[default]
    High,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::BigInt(v) => Some(*v),
            Self::Double(v) => Some(*v as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(v) => Some(f64::from(*v)),
            Self::BigInt(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integers are true when non-zero; text accepts `true`/`false` too.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            other => other.as_i64().map(|v| v != 0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::Date(d) => d.and_hms_opt(0, 0, 0),
            Self::Text(s) => DATETIME_PARSE_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::DateTime(dt) => Some(dt.date()),
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .ok()
                .or_else(|| self.as_datetime().map(|dt| dt.date())),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Self::Time(t) => Some(*t),
            Self::DateTime(dt) => Some(dt.time()),
            Self::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    /// String form of the value; `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::BigInt(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
