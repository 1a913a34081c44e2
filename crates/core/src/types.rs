//! Type conversion registry.
//!
//! Maps a type name (as written in a parameter definition) to a zero value and
//! a function converting a raw string into a [`Value`]. The registry starts
//! with the built-in vocabulary and can be extended before validation runs.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::error::{Error, Result};
use crate::value::Value;

/// Type used when a parameter definition does not name one.
pub const DEFAULT_TYPE: &str = "string";

pub type Converter = Box<dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync>;

pub struct TypeDefinition {
    name: String,
    zero: Value,
    converter: Converter,
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zero(&self) -> &Value {
        &self.zero
    }

    pub fn convert(&self, raw: &str) -> std::result::Result<Value, String> {
        (self.converter)(raw)
    }
}

impl std::fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.name)
            .field("zero", &self.zero)
            .finish_non_exhaustive()
    }
}

type BuiltinConverter = fn(&str) -> std::result::Result<Value, String>;

const BUILTINS: &[(&str, fn() -> Value, BuiltinConverter)] = &[
    ("string", || Value::from(""), |raw| Ok(Value::from(raw))),
    ("bool", || Value::Bool(false), convert_bool),
    ("boolean", || Value::Bool(false), convert_bool),
    ("int", || Value::Int(0), |raw| convert_signed(raw, i64::MIN, i64::MAX)),
    ("int8", || Value::Int(0), |raw| convert_signed(raw, i8::MIN.into(), i8::MAX.into())),
    ("int16", || Value::Int(0), |raw| convert_signed(raw, i16::MIN.into(), i16::MAX.into())),
    ("int32", || Value::Int(0), |raw| convert_signed(raw, i32::MIN.into(), i32::MAX.into())),
    ("int64", || Value::Int(0), |raw| convert_signed(raw, i64::MIN, i64::MAX)),
    ("uint", || Value::Uint(0), |raw| convert_unsigned(raw, u64::MAX)),
    ("uint8", || Value::Uint(0), |raw| convert_unsigned(raw, u8::MAX.into())),
    ("uint16", || Value::Uint(0), |raw| convert_unsigned(raw, u16::MAX.into())),
    ("uint32", || Value::Uint(0), |raw| convert_unsigned(raw, u32::MAX.into())),
    ("uint64", || Value::Uint(0), |raw| convert_unsigned(raw, u64::MAX)),
    ("float64", || Value::Float(0.0), convert_float),
    ("number", || Value::Float(0.0), convert_float),
    ("float32", || Value::Float(0.0), convert_float32),
    ("duration", || Value::Duration(Duration::ZERO), |raw| {
        parse_duration(raw).map(Value::Duration)
    }),
    ("date", || Value::Date(NaiveDate::default()), |raw| {
        parse_date(raw).map(Value::Date)
    }),
    ("time", || Value::Time(DateTime::<FixedOffset>::default()), |raw| {
        parse_time(raw).map(Value::Time)
    }),
];

#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDefinition>,
}

impl TypeRegistry {
    /// A registry with no types at all.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, zero, convert) in BUILTINS {
            registry.types.insert(
                (*name).to_string(),
                TypeDefinition {
                    name: (*name).to_string(),
                    zero: zero(),
                    converter: Box::new(*convert),
                },
            );
        }
        registry
    }

    /// Adds a new type. Built-in and previously registered names cannot be
    /// replaced.
    pub fn register<F>(&mut self, name: &str, zero: Value, convert: F) -> Result<()>
    where
        F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        if self.types.contains_key(name) {
            return Err(Error::DuplicateType(name.to_string()));
        }

        debug!("Registering parameter type `{name}`");
        self.types.insert(
            name.to_string(),
            TypeDefinition {
                name: name.to_string(),
                zero,
                converter: Box::new(convert),
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&TypeDefinition> {
        self.types
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

pub fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err(format!("`{raw}` is not a boolean")),
    }
}

fn convert_bool(raw: &str) -> std::result::Result<Value, String> {
    parse_bool(raw).map(Value::Bool)
}

/// Parses an integer literal with optional sign, `0x`/`0o`/`0b` prefix and a
/// trailing all-zero fraction (`42.0`).
fn parse_integer(raw: &str) -> std::result::Result<i128, String> {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let lower = unsigned.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex.to_string(), 16)
    } else if let Some(octal) = lower.strip_prefix("0o") {
        (octal.to_string(), 8)
    } else if let Some(binary) = lower.strip_prefix("0b") {
        (binary.to_string(), 2)
    } else {
        match lower.split_once('.') {
            Some((whole, fraction)) if !whole.is_empty() && fraction.chars().all(|c| c == '0') => {
                (whole.to_string(), 10)
            }
            _ => (lower.clone(), 10),
        }
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("`{raw}` is not an integer"));
    }

    let magnitude = i128::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|_| format!("`{raw}` is not an integer"))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn convert_signed(raw: &str, min: i64, max: i64) -> std::result::Result<Value, String> {
    let parsed = parse_integer(raw)?;
    if parsed < i128::from(min) || parsed > i128::from(max) {
        return Err(format!("`{raw}` is out of range [{min}, {max}]"));
    }
    i64::try_from(parsed)
        .map(Value::Int)
        .map_err(|e| e.to_string())
}

fn convert_unsigned(raw: &str, max: u64) -> std::result::Result<Value, String> {
    let parsed = parse_integer(raw)?;
    if parsed < 0 || parsed > i128::from(max) {
        return Err(format!("`{raw}` is out of range [0, {max}]"));
    }
    u64::try_from(parsed)
        .map(Value::Uint)
        .map_err(|e| e.to_string())
}

fn convert_float(raw: &str) -> std::result::Result<Value, String> {
    raw.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| format!("`{raw}` is not a number"))
}

fn convert_float32(raw: &str) -> std::result::Result<Value, String> {
    let parsed = raw
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if parsed.is_infinite() && !raw.to_ascii_lowercase().contains("inf") {
        return Err(format!("`{raw}` is out of range for float32"));
    }
    Ok(Value::Float(f64::from(parsed)))
}

/// Parses `1h30m`, `1.5s`, `300ms` style durations. A bare integer is read as
/// nanoseconds.
pub fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(nanos) = trimmed.parse::<u64>() {
        return Ok(Duration::from_nanos(nanos));
    }

    let invalid = || format!("`{raw}` is not a valid duration");
    let mut rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_end == 0 {
            return Err(invalid());
        }
        let (whole, fraction) = rest[..number_end]
            .split_once('.')
            .unwrap_or((&rest[..number_end], ""));
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos: u128 = match &rest[..unit_end] {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_end..];

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let fraction: f64 = format!("0.{fraction}").parse().map_err(|_| invalid())?;
            (fraction * unit_nanos as f64).round() as u128
        };
        total_nanos = whole
            .checked_mul(unit_nanos)
            .and_then(|n| n.checked_add(fraction_nanos))
            .and_then(|n| total_nanos.checked_add(n))
            .ok_or_else(|| format!("`{raw}` overflows a duration"))?;
    }

    let seconds = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| format!("`{raw}` overflows a duration"))?;
    let nanos = u32::try_from(total_nanos % 1_000_000_000).map_err(|e| e.to_string())?;
    Ok(Duration::new(seconds, nanos))
}

pub fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|t| t.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y/%m/%d"))
        .map_err(|_| format!("`{raw}` is not a date (expected YYYY-MM-DD)"))
}

pub fn parse_time(raw: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    let trimmed = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(time);
    }
    if let Ok(time) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(time);
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| format!("`{raw}` is not a timestamp (expected RFC 3339)"))
}
