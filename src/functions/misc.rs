//! `if`, `isPresent`, and `humanBytes`.

use ecow::EcoString;

use crate::functions::{FuncError, Funcs, Stateless, bool_arg, expect_len};
use crate::values::Value;

/// Ternary selection. Both branches are already evaluated by the time the
/// function runs and must have the same type.
fn if_func(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 3)?;
    let condition = bool_arg(name, args, 0)?;
    let (then_type, else_type) = (args[1].value_type(), args[2].value_type());
    if then_type != else_type {
        return Err(FuncError::Message(format!(
            "cannot select between different types {then_type} and {else_type}",
        )));
    }
    Ok(if condition {
        args[1].clone()
    } else {
        args[2].clone()
    })
}

fn is_present(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    Ok(Value::Bool(!matches!(args[0], Value::Missing)))
}

/// SI-unit byte count: 1000-based scaling, one decimal under 10 units.
fn humanize_bytes(bytes: f64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if !bytes.is_finite() || bytes < 1000.0 {
        return format!("{bytes:.0} B");
    }
    let exponent = ((bytes.ln() / 1000f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let scaled = bytes / 1000f64.powi(exponent as i32);
    if scaled < 10.0 {
        format!("{scaled:.1} {}", UNITS[exponent])
    } else {
        format!("{scaled:.0} {}", UNITS[exponent])
    }
}

fn human_bytes(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    expect_len(name, args, 1)?;
    let bytes = match &args[0] {
        Value::Int(i) => *i as f64,
        Value::Float(x) => *x,
        v => {
            return Err(FuncError::WrongArgType {
                name,
                position: 1,
                expected: "int or float",
                got: v.value_type(),
            });
        }
    };
    Ok(Value::String(EcoString::from(humanize_bytes(bytes))))
}

pub(super) fn register(funcs: &mut Funcs) {
    let functions: [(&'static str, super::StatelessFn); 3] = [
        ("if", if_func),
        ("isPresent", is_present),
        ("humanBytes", human_bytes),
    ];
    for (name, f) in functions {
        funcs.insert(name, Box::new(Stateless { name, f }));
    }
}
