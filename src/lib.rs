//! Compile-once, evaluate-millions expression evaluator.
//!
//! An expression tree is compiled into a graph of typed node evaluators
//! ([`Expression::compile`]), then evaluated repeatedly against per-point
//! [`Scope`] bindings. Binary operations specialize on the concrete operand
//! types the first time they see them and re-specialize when a dynamic
//! operand changes type mid-stream. Stateful builtins (`count`, `sigma`,
//! `spread`) accumulate across evaluations and reset with the expression.

pub mod ast;
pub mod eval;
pub mod expr;
pub mod functions;
pub mod scope;
pub mod types;
pub mod values;

pub use eval::error::EvalError;
pub use expr::{Expression, find_reference_variables};
pub use functions::FuncError;
pub use scope::{Scope, ScopePool};
pub use types::ValueType;
pub use values::Value;
