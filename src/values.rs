//! Runtime values.

use core::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;

use crate::types::ValueType;

/// A runtime value produced by evaluation or bound in a scope.
///
/// `Missing` is a first-class "field absent at this point" marker: references
/// bound to it evaluate to it, and `isPresent` distinguishes it from every
/// other value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(EcoString),
    Duration(TimeDelta),
    Time(DateTime<Utc>),
    Regex(Arc<Regex>),
    Missing,
}

impl Value {
    /// The type tag of this value. Total; never `Invalid` or `Numeric`.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Duration(_) => ValueType::Duration,
            Value::Time(_) => ValueType::Time,
            Value::Regex(_) => ValueType::Regex,
            Value::Missing => ValueType::Missing,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            // Regex has no structural equality; compare source patterns.
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            (Value::Missing, Value::Missing) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Duration(d) => f.write_str(&format_duration(*d)),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Regex(r) => f.write_str(r.as_str()),
            Value::Missing => f.write_str("missing"),
        }
    }
}

/// Total nanosecond count of a duration, saturating at the i64 range.
pub(crate) fn duration_nanos(d: TimeDelta) -> i64 {
    d.num_nanoseconds().unwrap_or(if d < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

/// Nanosecond scale of a duration unit suffix, or None for an unknown unit.
pub(crate) fn unit_nanos(unit: &str) -> Option<i64> {
    match unit {
        "ns" => Some(1),
        "u" | "µ" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        "d" => Some(NANOS_PER_DAY),
        "w" => Some(NANOS_PER_WEEK),
        _ => None,
    }
}

/// Format a duration using the largest unit that divides it evenly,
/// e.g. `90m` for one and a half hours and `2w` for fourteen days.
pub fn format_duration(d: TimeDelta) -> String {
    let nanos = duration_nanos(d);
    if nanos == 0 {
        return "0s".to_string();
    }
    let (sign, n) = if nanos < 0 {
        ("-", nanos.unsigned_abs())
    } else {
        ("", nanos.unsigned_abs())
    };
    for (scale, unit) in [
        (NANOS_PER_WEEK, "w"),
        (NANOS_PER_DAY, "d"),
        (NANOS_PER_HOUR, "h"),
        (NANOS_PER_MINUTE, "m"),
        (NANOS_PER_SECOND, "s"),
        (NANOS_PER_MILLI, "ms"),
        (NANOS_PER_MICRO, "u"),
    ] {
        let scale = scale as u64;
        if n % scale == 0 {
            return format!("{sign}{}{unit}", n / scale);
        }
    }
    format!("{sign}{n}ns")
}

/// Parse a duration literal of the form `<int><unit>[<int><unit>...]`, with
/// units `ns`, `u`/`µ`, `ms`, `s`, `m`, `h`, `d`, `w` and an optional leading
/// sign, e.g. `1h30m` or `-10s`.
pub fn parse_duration(text: &str) -> Result<TimeDelta, String> {
    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text),
    };
    if rest.is_empty() {
        return Err(format!("invalid duration {text:?}"));
    }
    let mut total: i64 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(format!("invalid duration {text:?}"));
        }
        let count: i64 = rest[..digits_end]
            .parse()
            .map_err(|_| format!("invalid duration {text:?}"))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let scale = unit_nanos(&rest[..unit_end])
            .ok_or_else(|| format!("invalid duration unit in {text:?}"))?;
        rest = &rest[unit_end..];

        total = total.saturating_add(count.saturating_mul(scale));
    }
    if negative {
        total = total.wrapping_neg();
    }
    Ok(TimeDelta::nanoseconds(total))
}
