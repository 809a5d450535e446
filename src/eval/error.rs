//! Evaluation and compilation errors.

use thiserror::Error;

use crate::ast::Operator;
use crate::functions::FuncError;
use crate::types::ValueType;

/// Which operand of a binary operation an error came from.
///
/// The self-healing retry in the binary evaluator uses this to know which
/// side's resolved type to correct when a type guard trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

/// Any error raised while compiling or evaluating an expression.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A node was asked to produce one type but would produce another.
    #[error("TypeGuard: expression returned unexpected type {actual}, expected {requested}")]
    TypeGuard {
        requested: ValueType,
        actual: ValueType,
    },

    /// A referenced name has no value in the scope.
    #[error("name {name:?} is undefined. Names in scope: {}", .names_in_scope.join(","))]
    UndefinedReference {
        name: String,
        names_in_scope: Vec<String>,
    },

    /// A called function is not in the registry.
    #[error("undefined function: {0:?}")]
    UndefinedFunction(String),

    /// A registered function rejected its arguments or failed internally.
    #[error("error calling {name:?}: {source}")]
    FunctionCall {
        name: String,
        #[source]
        source: FuncError,
    },

    /// The operator cannot appear in a binary expression.
    #[error("unknown binary operator {0}")]
    UnknownBinaryOperator(Operator),

    /// The operator cannot appear in a unary expression.
    #[error("invalid unary operator {0}")]
    InvalidUnaryOperator(Operator),

    /// The operator exists but has no operation for the given type.
    #[error("invalid {kind} operator {operator} for type {operand}")]
    InvalidOperatorForType {
        kind: &'static str,
        operator: Operator,
        operand: ValueType,
    },

    /// No operation exists for this operator and operand-type pair.
    #[error(
        "mismatched type to binary operator. got {left} {operator} {right}. \
         see bool(), int(), float(), string(), duration()"
    )]
    TypeMismatch {
        operator: Operator,
        left: ValueType,
        right: ValueType,
    },

    /// A binary operand's type could not be determined at all.
    #[error("{side} value is invalid value type")]
    InvalidOperand { side: Side },

    /// Integer or duration division/modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The node kind has no evaluator (lists, stars).
    #[error("node type is not a valid evaluation node: {0}")]
    NotEvaluationNode(&'static str),

    /// Generic evaluation found a root type it cannot dispatch on.
    #[error("expression returned unexpected type {0}")]
    UnexpectedReturnType(ValueType),
}

/// An evaluation error tagged with the binary operand it came from, when
/// known. Specialized operation functions report guard failures through this
/// so the binary evaluator can re-resolve the offending side.
#[derive(Debug)]
pub(crate) struct SideError {
    pub side: Option<Side>,
    pub error: EvalError,
}

impl SideError {
    pub fn left(error: EvalError) -> Self {
        SideError {
            side: Some(Side::Left),
            error,
        }
    }

    pub fn right(error: EvalError) -> Self {
        SideError {
            side: Some(Side::Right),
            error,
        }
    }

    pub fn bare(error: EvalError) -> Self {
        SideError { side: None, error }
    }
}
