//! Typed parameter values.
//!
//! Every converted parameter, default and constraint operand is a [`Value`].
//! Comparison comes in two flavours:
//!
//! - [`Value::loose_cmp`] / [`Value::loose_eq`] coerce both sides to a common
//!   representation (integer, float, duration, timestamp) and fall back to
//!   comparing the rendered strings. Used by `eq`, `neq`, `gt`, `gte`, `lt`
//!   and `lte`.
//! - [`Value::exact_eq`] only matches values of the same kind, treating all
//!   numeric kinds as one. Used by `in` and `notIn`.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{parse_duration, parse_time};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Duration(Duration),
    Date(NaiveDate),
    Time(DateTime<FixedOffset>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Duration(_) => "duration",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
        }
    }

    /// A value counts as present when it is not null and does not render to an
    /// empty string.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(i128::from(*i)),
            Value::Uint(u) => Some(i128::from(*u)),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i128),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            Value::String(s) => parse_duration(s).ok(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Date(d) => Some(d.and_time(NaiveTime::MIN).and_utc().fixed_offset()),
            Value::String(s) => parse_time(s).ok(),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Uint(_) | Value::Float(_))
    }

    /// Orders two values after coercing them to a shared representation.
    ///
    /// Returns `None` only when a numeric comparison is undefined (NaN).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return Some(a.cmp(&b));
        }

        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.partial_cmp(&b);
        }

        if matches!(self, Value::Duration(_)) || matches!(other, Value::Duration(_)) {
            if let (Some(a), Some(b)) = (self.as_duration(), other.as_duration()) {
                return Some(a.cmp(&b));
            }
        }

        let temporal = |v: &Value| matches!(v, Value::Date(_) | Value::Time(_));
        if temporal(self) || temporal(other) {
            if let (Some(a), Some(b)) = (self.as_timestamp(), other.as_timestamp()) {
                return Some(a.cmp(&b));
            }
        }

        Some(self.to_string().cmp(&other.to_string()))
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        self.loose_cmp(other) == Some(Ordering::Equal)
    }

    pub fn exact_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.as_integer(), b.as_integer()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a.as_number() == b.as_number(),
                }
            }
            _ => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Uint(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Duration(_) | Value::Date(_) | Value::Time(_) => {
                serde_json::Value::String(self.to_string())
            }
        }
    }
}

/// Renders a duration the way Go's `time.Duration` prints: `1h30m0s`,
/// `1.5s`, `300ms`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < 1_000_000_000 {
        let (scale, unit) = if nanos < 1_000 {
            (1.0, "ns")
        } else if nanos < 1_000_000 {
            (1_000.0, "µs")
        } else {
            (1_000_000.0, "ms")
        };
        return format!("{}{unit}", f64::from(duration.subsec_nanos()) / scale);
    }

    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut rendered = String::new();
    if hours > 0 {
        rendered.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        rendered.push_str(&format!("{minutes}m"));
    }

    let subsec = duration.subsec_nanos();
    if subsec == 0 {
        rendered.push_str(&format!("{seconds}s"));
    } else {
        let fractional = f64::from(subsec) / 1_000_000_000.0;
        rendered.push_str(&format!("{}s", seconds as f64 + fractional));
    }

    rendered
}

impl Display for Value {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => formatter.write_str(s),
            Value::Bool(b) => write!(formatter, "{b}"),
            Value::Int(i) => write!(formatter, "{i}"),
            Value::Uint(u) => write!(formatter, "{u}"),
            Value::Float(f) => write!(formatter, "{f}"),
            Value::Duration(d) => formatter.write_str(&format_duration(*d)),
            Value::Date(d) => write!(formatter, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => formatter.write_str(&t.to_rfc3339()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Value::Duration(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Duration(_) | Value::Date(_) | Value::Time(_) => serializer.collect_str(self),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a string, number, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::Uint(v), Value::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_cmp_prefers_numbers() {
        assert_eq!(
            Value::from("10").loose_cmp(&Value::Int(9)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Float(2.5).loose_cmp(&Value::Int(3)),
            Some(Ordering::Less)
        );
        assert!(Value::Uint(5).loose_eq(&Value::Float(5.0)));
    }

    #[test]
    fn test_loose_cmp_falls_back_to_strings() {
        assert_eq!(
            Value::from("apple").loose_cmp(&Value::from("banana")),
            Some(Ordering::Less)
        );
        assert!(Value::Bool(true).loose_eq(&Value::from("true")));
    }

    #[test]
    fn test_loose_cmp_durations() {
        let value = Value::Duration(Duration::from_secs(90));
        assert_eq!(value.loose_cmp(&Value::from("1m")), Some(Ordering::Greater));
        assert_eq!(value.loose_cmp(&Value::from("2m")), Some(Ordering::Less));
    }

    #[test]
    fn test_loose_cmp_dates() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(
            date.loose_cmp(&Value::from("2024-01-01")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_nan_is_incomparable() {
        assert_eq!(Value::Float(f64::NAN).loose_cmp(&Value::Int(1)), None);
    }

    #[test]
    fn test_exact_eq_keeps_kinds_apart() {
        assert!(Value::Int(1).exact_eq(&Value::Uint(1)));
        assert!(Value::Float(42.0).exact_eq(&Value::Int(42)));
        assert!(!Value::from("1").exact_eq(&Value::Int(1)));
        assert!(!Value::Bool(true).exact_eq(&Value::from("true")));
    }

    #[test]
    fn test_is_present() {
        assert!(!Value::Null.is_present());
        assert!(!Value::from("").is_present());
        assert!(Value::Int(0).is_present());
        assert!(Value::Bool(false).is_present());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(42.0).to_string(), "42");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).to_string(),
            "2024-02-29"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(300)), "300ms");
        assert_eq!(format_duration(Duration::from_micros(2)), "2µs");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
    }

    #[test]
    fn test_deserialize_scalars() {
        let values: Vec<Value> = serde_yaml::from_str("[1, -2, 2.5, true, text, ~]").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Int(-2),
                Value::Float(2.5),
                Value::Bool(true),
                Value::from("text"),
                Value::Null,
            ]
        );
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(Value::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
        assert_eq!(
            Value::Duration(Duration::from_secs(2)).to_json(),
            serde_json::json!("2s")
        );
    }
}
