//! Value type tags.
//!
//! Every value and every compiled node evaluator carries a [`ValueType`].
//! Binary specialization keys on the pair of operand types; type guards
//! report mismatches in terms of these tags.

use core::fmt;

/// The type of a runtime value.
///
/// `Numeric` is a transient superclass meaning "int or float, not yet
/// resolved": it shows up while a dynamic operand's concrete type is still
/// unknown and never appears in the operation table or in a produced
/// [`Value`](crate::values::Value). `Invalid` marks nodes whose type cannot
/// be known before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Duration,
    Time,
    Regex,
    Missing,
    Numeric,
    Invalid,
}

impl ValueType {
    /// Whether this type is int, float, or the unresolved numeric superclass.
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float | ValueType::Numeric)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "boolean",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Duration => "duration",
            ValueType::Time => "time",
            ValueType::Regex => "regex",
            ValueType::Missing => "missing",
            ValueType::Numeric => "numeric",
            ValueType::Invalid => "invalid type",
        };
        f.write_str(name)
    }
}
