//! Calendar-field extraction and `now()`.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::functions::{FuncError, Funcs, Stateless, expect_len, time_arg};
use crate::values::Value;

struct TimeField {
    name: &'static str,
    f: fn(DateTime<Utc>) -> i64,
}

impl super::Func for TimeField {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        expect_len(self.name, args, 1)?;
        let t = time_arg(self.name, args, 0)?;
        Ok(Value::Int((self.f)(t)))
    }

    fn reset(&mut self) {}
}

fn unix_nano(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let t = time_arg(name, args, 0)?;
    let nanos = t
        .timestamp_nanos_opt()
        .ok_or_else(|| FuncError::Message(format!("{t} out of range for a nanosecond timestamp")))?;
    Ok(Value::Int(nanos))
}

fn now(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 0)?;
    Ok(Value::Time(Utc::now()))
}

pub(super) fn register(funcs: &mut Funcs) {
    // weekday is 0-based starting at Sunday.
    let fields: [(&'static str, fn(DateTime<Utc>) -> i64); 6] = [
        ("minute", |t| t.minute() as i64),
        ("hour", |t| t.hour() as i64),
        ("weekday", |t| t.weekday().num_days_from_sunday() as i64),
        ("day", |t| t.day() as i64),
        ("month", |t| t.month() as i64),
        ("year", |t| t.year() as i64),
    ];
    for (name, f) in fields {
        funcs.insert(name, Box::new(TimeField { name, f }));
    }

    funcs.insert(
        "unixNano",
        Box::new(Stateless {
            name: "unixNano",
            f: unix_nano,
        }),
    );
    funcs.insert(
        "now",
        Box::new(Stateless {
            name: "now",
            f: now,
        }),
    );
}
