//! Stateful aggregation functions.
//!
//! These accumulate across evaluations of one expression and are the reason
//! every expression owns its function instances. `reset` (and therefore
//! `Expression::reset`) returns them to their initial state.

use crate::functions::{FuncError, Funcs, expect_len, float_arg};
use crate::values::Value;

/// Number of calls so far, starting at 1 on the first call.
struct Count {
    n: i64,
}

impl super::Func for Count {
    fn call(&mut self, _args: &[Value]) -> Result<Value, FuncError> {
        self.n += 1;
        Ok(Value::Int(self.n))
    }

    fn reset(&mut self) {
        self.n = 0;
    }
}

/// Number of standard deviations the latest point is from the running mean,
/// using Welford's online variance. Returns 0 until there are at least two
/// points or while the variance is zero.
struct Sigma {
    mean: f64,
    variance: f64,
    m2: f64,
    n: f64,
}

impl super::Func for Sigma {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        expect_len("sigma", args, 1)?;
        let x = float_arg("sigma", args, 0)?;
        self.n += 1.0;
        let delta = x - self.mean;
        self.mean += delta / self.n;
        self.m2 += delta * (x - self.mean);
        self.variance = self.m2 / (self.n - 1.0);
        if self.n < 2.0 || self.variance == 0.0 {
            return Ok(Value::Float(0.0));
        }
        Ok(Value::Float((x - self.mean).abs() / self.variance.sqrt()))
    }

    fn reset(&mut self) {
        self.mean = 0.0;
        self.variance = 0.0;
        self.m2 = 0.0;
        self.n = 0.0;
    }
}

/// Running max - min of every point seen so far.
struct Spread {
    min: f64,
    max: f64,
}

impl super::Func for Spread {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        expect_len("spread", args, 1)?;
        let x = float_arg("spread", args, 0)?;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        Ok(Value::Float(self.max - self.min))
    }

    fn reset(&mut self) {
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }
}

pub(super) fn register(funcs: &mut Funcs) {
    funcs.insert("count", Box::new(Count { n: 0 }));
    funcs.insert(
        "sigma",
        Box::new(Sigma {
            mean: 0.0,
            variance: 0.0,
            m2: 0.0,
            n: 0.0,
        }),
    );
    funcs.insert(
        "spread",
        Box::new(Spread {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }),
    );
}
