//! Builtin function library.
//!
//! Each [`Expression`](crate::expr::Expression) owns a private instance of
//! every function, so stateful builtins accumulate per expression. Functions
//! take pre-evaluated [`Value`] arguments and validate arity and argument
//! types themselves, naming the offending argument position.

mod convert;
mod math;
mod misc;
mod stateful;
mod string;
mod time;


use std::sync::Arc;

use chrono::{DateTime, Utc};
use ecow::EcoString;
use hashbrown::HashMap;
use regex::Regex;
use thiserror::Error;

use crate::types::ValueType;
use crate::values::Value;

/// Errors raised by builtin functions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuncError {
    #[error("{name} expects {expected} arguments, got {got}")]
    WrongArity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("cannot pass {got} as argument {position} to {name}, must be {expected}")]
    WrongArgType {
        name: &'static str,
        /// 1-based argument position.
        position: usize,
        expected: &'static str,
        got: ValueType,
    },

    #[error("{0}")]
    Message(String),
}

/// One builtin function instance, owned by a single expression.
///
/// `call` takes `&mut self` so stateful functions can accumulate; stateless
/// ones simply ignore it. `reset` returns the instance to its initial state.
pub trait Func: Send {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError>;
    fn reset(&mut self);
}

/// The per-expression function registry.
pub type Funcs = HashMap<&'static str, Box<dyn Func>>;

/// Build a registry with a fresh instance of every builtin.
pub fn new_functions() -> Funcs {
    let mut funcs: Funcs = HashMap::new();
    convert::register(&mut funcs);
    math::register(&mut funcs);
    misc::register(&mut funcs);
    stateful::register(&mut funcs);
    string::register(&mut funcs);
    time::register(&mut funcs);
    funcs
}

// ==================== plumbing shared by the modules ====================

pub(crate) type StatelessFn = fn(name: &'static str, args: &[Value]) -> Result<Value, FuncError>;

/// Adapter turning a plain function into a [`Func`] with a no-op reset.
pub(crate) struct Stateless {
    pub name: &'static str,
    pub f: StatelessFn,
}

impl Func for Stateless {
    fn call(&mut self, args: &[Value]) -> Result<Value, FuncError> {
        (self.f)(self.name, args)
    }

    fn reset(&mut self) {}
}

pub(crate) fn expect_len(
    name: &'static str,
    args: &[Value],
    expected: usize,
) -> Result<(), FuncError> {
    if args.len() != expected {
        return Err(FuncError::WrongArity {
            name,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

macro_rules! typed_arg {
    ($fn_name:ident -> $ty:ty, $variant:ident, $expected:literal, $extract:expr) => {
        pub(crate) fn $fn_name(
            name: &'static str,
            args: &[Value],
            index: usize,
        ) -> Result<$ty, FuncError> {
            match &args[index] {
                Value::$variant(v) => Ok($extract(v)),
                other => Err(FuncError::WrongArgType {
                    name,
                    position: index + 1,
                    expected: $expected,
                    got: other.value_type(),
                }),
            }
        }
    };
}

typed_arg!(bool_arg -> bool, Bool, "boolean", |v: &bool| *v);
typed_arg!(int_arg -> i64, Int, "int", |v: &i64| *v);
typed_arg!(float_arg -> f64, Float, "float", |v: &f64| *v);
typed_arg!(string_arg -> EcoString, String, "string", |v: &EcoString| v.clone());
typed_arg!(time_arg -> DateTime<Utc>, Time, "time", |v: &DateTime<Utc>| *v);
typed_arg!(regex_arg -> Arc<Regex>, Regex, "regex", Arc::clone);
