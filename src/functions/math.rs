//! Float math functions.

use crate::functions::{FuncError, Funcs, expect_len, float_arg, int_arg};
use crate::values::Value;

struct Math1 {
    name: &'static str,
    f: fn(f64) -> f64,
}

impl super::Func for Math1 {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        expect_len(self.name, args, 1)?;
        let x = float_arg(self.name, args, 0)?;
        Ok(Value::Float((self.f)(x)))
    }

    fn reset(&mut self) {}
}

struct Math2 {
    name: &'static str,
    f: fn(f64, f64) -> f64,
}

impl super::Func for Math2 {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        expect_len(self.name, args, 2)?;
        let x = float_arg(self.name, args, 0)?;
        let y = float_arg(self.name, args, 1)?;
        Ok(Value::Float((self.f)(x, y)))
    }

    fn reset(&mut self) {}
}

/// `pow10` is the one integer-domain math function.
struct Pow10;

impl super::Func for Pow10 {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        expect_len("pow10", args, 1)?;
        let e = int_arg("pow10", args, 0)?;
        Ok(Value::Float(10f64.powi(e as i32)))
    }

    fn reset(&mut self) {}
}

/// Gauss error function, Abramowitz & Stegun formula 7.1.26.
/// Maximum absolute error 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

fn erfc(x: f64) -> f64 {
    1.0 - erf(x)
}

/// Binary exponent of x, matching IEEE `logb`.
fn logb(x: f64) -> f64 {
    x.abs().log2().floor()
}

fn fmod(x: f64, y: f64) -> f64 {
    x % y
}

pub(super) fn register(funcs: &mut Funcs) {
    let unary: [(&'static str, fn(f64) -> f64); 28] = [
        ("abs", f64::abs),
        ("acos", f64::acos),
        ("acosh", f64::acosh),
        ("asin", f64::asin),
        ("asinh", f64::asinh),
        ("atan", f64::atan),
        ("atanh", f64::atanh),
        ("cbrt", f64::cbrt),
        ("ceil", f64::ceil),
        ("cos", f64::cos),
        ("cosh", f64::cosh),
        ("erf", erf),
        ("erfc", erfc),
        ("exp", f64::exp),
        ("exp2", f64::exp2),
        ("expm1", f64::exp_m1),
        ("floor", f64::floor),
        ("log", f64::ln),
        ("log10", f64::log10),
        ("log1p", f64::ln_1p),
        ("log2", f64::log2),
        ("logb", logb),
        ("sin", f64::sin),
        ("sinh", f64::sinh),
        ("sqrt", f64::sqrt),
        ("tan", f64::tan),
        ("tanh", f64::tanh),
        ("trunc", f64::trunc),
    ];
    for (name, f) in unary {
        funcs.insert(name, Box::new(Math1 { name, f }));
    }

    let binary: [(&'static str, fn(f64, f64) -> f64); 6] = [
        ("atan2", f64::atan2),
        ("hypot", f64::hypot),
        ("max", f64::max),
        ("min", f64::min),
        ("mod", fmod),
        ("pow", f64::powf),
    ];
    for (name, f) in binary {
        funcs.insert(name, Box::new(Math2 { name, f }));
    }

    funcs.insert("pow10", Box::new(Pow10));
}
