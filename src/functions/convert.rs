//! Type conversion functions: `bool`, `int`, `float`, `string`, `duration`.

use ecow::EcoString;

use crate::functions::{FuncError, Funcs, Stateless, expect_len};
use crate::values::{Value, duration_nanos, format_duration, parse_duration, unit_nanos};

fn cannot_convert(value: &Value, target: &str) -> FuncError {
    FuncError::Message(format!(
        "cannot convert {} {value} to {target}",
        value.value_type(),
    ))
}

fn to_bool(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let b = match &args[0] {
        Value::Bool(b) => *b,
        Value::Int(0) => false,
        Value::Int(1) => true,
        Value::Float(x) if *x == 0.0 => false,
        Value::Float(x) if *x == 1.0 => true,
        Value::String(s) => match s.as_str() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => true,
            "0" | "f" | "F" | "false" | "FALSE" | "False" => false,
            _ => return Err(cannot_convert(&args[0], "boolean")),
        },
        v => return Err(cannot_convert(v, "boolean")),
    };
    Ok(Value::Bool(b))
}

fn to_int(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let i = match &args[0] {
        Value::Int(i) => *i,
        Value::Float(x) => *x as i64,
        Value::Bool(b) => *b as i64,
        Value::Duration(d) => duration_nanos(*d),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| cannot_convert(&args[0], "int"))?,
        v => return Err(cannot_convert(v, "int")),
    };
    Ok(Value::Int(i))
}

fn to_float(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let x = match &args[0] {
        Value::Float(x) => *x,
        Value::Int(i) => *i as f64,
        Value::Bool(b) => *b as i64 as f64,
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| cannot_convert(&args[0], "float"))?,
        v => return Err(cannot_convert(v, "float")),
    };
    Ok(Value::Float(x))
}

fn to_string(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let s: EcoString = match &args[0] {
        Value::String(s) => s.clone(),
        Value::Bool(b) => EcoString::from(if *b { "true" } else { "false" }),
        Value::Int(i) => EcoString::from(i.to_string()),
        Value::Float(x) => EcoString::from(x.to_string()),
        Value::Duration(d) => EcoString::from(format_duration(*d)),
        v => return Err(cannot_convert(v, "string")),
    };
    Ok(Value::String(s))
}

/// `duration(duration)`, `duration(string)`, or `duration(int|float, unit)`
/// where unit is a duration-literal suffix string such as `"s"` or `"ms"`.
fn to_duration(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    let d = match args {
        [Value::Duration(d)] => *d,
        [Value::String(s)] => {
            parse_duration(s).map_err(FuncError::Message)?
        }
        [v, Value::String(unit)] => {
            let scale = unit_nanos(unit)
                .ok_or_else(|| FuncError::Message(format!("invalid duration unit {unit:?}")))?;
            let nanos = match v {
                Value::Int(i) => i.saturating_mul(scale),
                Value::Float(x) => (x * scale as f64) as i64,
                v => return Err(cannot_convert(v, "duration")),
            };
            chrono::TimeDelta::nanoseconds(nanos)
        }
        _ => {
            return Err(FuncError::Message(format!(
                "{name} expects (duration), (string), or (int|float, unit string)",
            )));
        }
    };
    Ok(Value::Duration(d))
}

pub(super) fn register(funcs: &mut Funcs) {
    let conversions: [(&'static str, super::StatelessFn); 5] = [
        ("bool", to_bool),
        ("int", to_int),
        ("float", to_float),
        ("string", to_string),
        ("duration", to_duration),
    ];
    for (name, f) in conversions {
        funcs.insert(name, Box::new(Stateless { name, f }));
    }
}
