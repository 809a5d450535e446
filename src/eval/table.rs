//! The operation table.
//!
//! Every legal (operator, left type, right type) combination maps to a
//! monomorphic operation function that pulls each operand through the typed
//! evaluator method for its resolved type. The table is built once at first
//! use and read-only afterwards; binary nodes look operations up by key and
//! cache nothing mutable in the shared tree.

use hashbrown::{HashMap, HashSet};
use lazy_static::lazy_static;

use chrono::TimeDelta;

use crate::ast::Operator;
use crate::eval::error::{EvalError, Side, SideError};
use crate::eval::{ExecutionState, NodeEvaluator};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::{Value, duration_nanos};

/// Specialization key: one operator applied to one pair of operand types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OperationKey {
    pub operator: Operator,
    pub left: ValueType,
    pub right: ValueType,
}

/// A specialized operation function. Operand evaluation errors are tagged
/// with the side they came from so the caller can re-resolve that side's
/// type; errors raised by the operation itself carry no side.
pub(crate) type EvalFn = fn(
    scope: &Scope,
    state: &mut ExecutionState,
    left: &dyn NodeEvaluator,
    right: &dyn NodeEvaluator,
) -> Result<Value, SideError>;

pub(crate) struct OperationInfo {
    pub f: EvalFn,
    pub return_type: ValueType,
}

/// Insert one specialized entry. The two operands are evaluated left to
/// right through the named typed methods, then the body combines them.
macro_rules! op {
    ($map:ident, $op:ident, ($lt:ident : $lm:ident, $rt:ident : $rm:ident) -> $ret:ident,
     |$l:ident, $r:ident| $body:expr) => {
        $map.insert(
            OperationKey {
                operator: Operator::$op,
                left: ValueType::$lt,
                right: ValueType::$rt,
            },
            OperationInfo {
                f: |scope, state, left, right| {
                    let $l = left.$lm(scope, state).map_err(SideError::left)?;
                    let $r = right.$rm(scope, state).map_err(SideError::right)?;
                    $body
                },
                return_type: ValueType::$ret,
            },
        );
    };
}

/// Insert the six comparison entries for one operand-type pair. The
/// projection expressions bring both sides into a comparable type.
macro_rules! cmp_ops {
    ($map:ident, ($lt:ident : $lm:ident, $rt:ident : $rm:ident),
     |$l:ident, $r:ident| ($le:expr, $re:expr)) => {
        op!($map, Equal, ($lt: $lm, $rt: $rm) -> Bool, |$l, $r| Ok(Value::Bool($le == $re)));
        op!($map, NotEqual, ($lt: $lm, $rt: $rm) -> Bool, |$l, $r| Ok(Value::Bool($le != $re)));
        op!($map, Less, ($lt: $lm, $rt: $rm) -> Bool, |$l, $r| Ok(Value::Bool($le < $re)));
        op!($map, LessEqual, ($lt: $lm, $rt: $rm) -> Bool, |$l, $r| Ok(Value::Bool($le <= $re)));
        op!($map, Greater, ($lt: $lm, $rt: $rm) -> Bool, |$l, $r| Ok(Value::Bool($le > $re)));
        op!($map, GreaterEqual, ($lt: $lm, $rt: $rm) -> Bool, |$l, $r| Ok(Value::Bool($le >= $re)));
    };
}

fn build_table() -> HashMap<OperationKey, OperationInfo> {
    let mut m: HashMap<OperationKey, OperationInfo> = HashMap::new();

    // ==================== logical ====================
    // AND and OR evaluate the right operand only when the left one does not
    // already decide the result.
    m.insert(
        OperationKey {
            operator: Operator::And,
            left: ValueType::Bool,
            right: ValueType::Bool,
        },
        OperationInfo {
            f: |scope, state, left, right| {
                let l = left.eval_bool(scope, state).map_err(SideError::left)?;
                if !l {
                    return Ok(Value::Bool(false));
                }
                let r = right.eval_bool(scope, state).map_err(SideError::right)?;
                Ok(Value::Bool(r))
            },
            return_type: ValueType::Bool,
        },
    );
    m.insert(
        OperationKey {
            operator: Operator::Or,
            left: ValueType::Bool,
            right: ValueType::Bool,
        },
        OperationInfo {
            f: |scope, state, left, right| {
                let l = left.eval_bool(scope, state).map_err(SideError::left)?;
                if l {
                    return Ok(Value::Bool(true));
                }
                let r = right.eval_bool(scope, state).map_err(SideError::right)?;
                Ok(Value::Bool(r))
            },
            return_type: ValueType::Bool,
        },
    );

    // ==================== equality and ordering ====================
    op!(m, Equal, (Bool: eval_bool, Bool: eval_bool) -> Bool, |l, r| Ok(Value::Bool(l == r)));
    op!(m, NotEqual, (Bool: eval_bool, Bool: eval_bool) -> Bool, |l, r| Ok(Value::Bool(l != r)));

    cmp_ops!(m, (Int: eval_int, Int: eval_int), |l, r| (l, r));
    cmp_ops!(m, (Float: eval_float, Float: eval_float), |l, r| (l, r));
    cmp_ops!(m, (Int: eval_int, Float: eval_float), |l, r| (l as f64, r));
    cmp_ops!(m, (Float: eval_float, Int: eval_int), |l, r| (l, r as f64));
    cmp_ops!(m, (String: eval_string, String: eval_string), |l, r| (l.as_str(), r.as_str()));
    cmp_ops!(m, (Duration: eval_duration, Duration: eval_duration), |l, r| (l, r));

    // ==================== regex match ====================
    op!(m, RegexEqual, (String: eval_string, Regex: eval_regex) -> Bool,
        |l, r| Ok(Value::Bool(r.is_match(&l))));
    op!(m, RegexNotEqual, (String: eval_string, Regex: eval_regex) -> Bool,
        |l, r| Ok(Value::Bool(!r.is_match(&l))));

    // ==================== int arithmetic ====================
    // Wrapping matches two's-complement overflow; division and modulo by
    // zero are reported as errors rather than left to trap.
    op!(m, Plus, (Int: eval_int, Int: eval_int) -> Int,
        |l, r| Ok(Value::Int(l.wrapping_add(r))));
    op!(m, Minus, (Int: eval_int, Int: eval_int) -> Int,
        |l, r| Ok(Value::Int(l.wrapping_sub(r))));
    op!(m, Mult, (Int: eval_int, Int: eval_int) -> Int,
        |l, r| Ok(Value::Int(l.wrapping_mul(r))));
    op!(m, Div, (Int: eval_int, Int: eval_int) -> Int, |l, r| {
        if r == 0 {
            return Err(SideError::bare(EvalError::DivisionByZero));
        }
        Ok(Value::Int(l.wrapping_div(r)))
    });
    op!(m, Mod, (Int: eval_int, Int: eval_int) -> Int, |l, r| {
        if r == 0 {
            return Err(SideError::bare(EvalError::DivisionByZero));
        }
        Ok(Value::Int(l.wrapping_rem(r)))
    });

    // ==================== float arithmetic ====================
    op!(m, Plus, (Float: eval_float, Float: eval_float) -> Float,
        |l, r| Ok(Value::Float(l + r)));
    op!(m, Minus, (Float: eval_float, Float: eval_float) -> Float,
        |l, r| Ok(Value::Float(l - r)));
    op!(m, Mult, (Float: eval_float, Float: eval_float) -> Float,
        |l, r| Ok(Value::Float(l * r)));
    op!(m, Div, (Float: eval_float, Float: eval_float) -> Float,
        |l, r| Ok(Value::Float(l / r)));

    // ==================== string concatenation ====================
    op!(m, Plus, (String: eval_string, String: eval_string) -> String, |l, r| {
        let mut s = l;
        s.push_str(&r);
        Ok(Value::String(s))
    });

    // ==================== duration arithmetic ====================
    op!(m, Plus, (Duration: eval_duration, Duration: eval_duration) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            duration_nanos(l).wrapping_add(duration_nanos(r)),
        ))));
    op!(m, Minus, (Duration: eval_duration, Duration: eval_duration) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            duration_nanos(l).wrapping_sub(duration_nanos(r)),
        ))));
    op!(m, Mult, (Duration: eval_duration, Int: eval_int) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            duration_nanos(l).wrapping_mul(r),
        ))));
    op!(m, Mult, (Int: eval_int, Duration: eval_duration) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            l.wrapping_mul(duration_nanos(r)),
        ))));
    op!(m, Mult, (Duration: eval_duration, Float: eval_float) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            (duration_nanos(l) as f64 * r) as i64,
        ))));
    op!(m, Mult, (Float: eval_float, Duration: eval_duration) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            (l * duration_nanos(r) as f64) as i64,
        ))));
    op!(m, Div, (Duration: eval_duration, Int: eval_int) -> Duration, |l, r| {
        if r == 0 {
            return Err(SideError::bare(EvalError::DivisionByZero));
        }
        Ok(Value::Duration(TimeDelta::nanoseconds(
            duration_nanos(l).wrapping_div(r),
        )))
    });
    op!(m, Div, (Duration: eval_duration, Float: eval_float) -> Duration,
        |l, r| Ok(Value::Duration(TimeDelta::nanoseconds(
            (duration_nanos(l) as f64 / r) as i64,
        ))));
    // The ratio of two durations is a plain integer.
    op!(m, Div, (Duration: eval_duration, Duration: eval_duration) -> Int, |l, r| {
        let rn = duration_nanos(r);
        if rn == 0 {
            return Err(SideError::bare(EvalError::DivisionByZero));
        }
        Ok(Value::Int(duration_nanos(l).wrapping_div(rn)))
    });

    m
}

fn build_reverse_index(
    table: &HashMap<OperationKey, OperationInfo>,
) -> HashMap<ValueType, HashSet<Operator>> {
    let mut index: HashMap<ValueType, HashSet<Operator>> = HashMap::new();
    for key in table.keys() {
        index.entry(key.left).or_default().insert(key.operator);
        index.entry(key.right).or_default().insert(key.operator);
    }
    index
}

lazy_static! {
    static ref EVALUATION_FUNCS: HashMap<OperationKey, OperationInfo> = build_table();
    static ref TYPE_OPERATORS: HashMap<ValueType, HashSet<Operator>> =
        build_reverse_index(&EVALUATION_FUNCS);
}

/// Look up the specialized operation for an operator over resolved operand
/// types.
pub(crate) fn lookup(
    operator: Operator,
    left: ValueType,
    right: ValueType,
) -> Option<&'static OperationInfo> {
    EVALUATION_FUNCS.get(&OperationKey {
        operator,
        left,
        right,
    })
}

/// The type an operation produces, or `Invalid` when no entry exists.
pub(crate) fn binary_return_type(operator: Operator, left: ValueType, right: ValueType) -> ValueType {
    lookup(operator, left, right).map_or(ValueType::Invalid, |info| info.return_type)
}

/// The most specific error for a failed table lookup: an operand type with
/// no entry for the operator at all beats a plain pair mismatch.
pub(crate) fn operation_error(operator: Operator, left: ValueType, right: ValueType) -> EvalError {
    if left == ValueType::Invalid {
        return EvalError::InvalidOperand { side: Side::Left };
    }
    if right == ValueType::Invalid {
        return EvalError::InvalidOperand { side: Side::Right };
    }
    let supports = |t: ValueType| {
        TYPE_OPERATORS
            .get(&t)
            .is_some_and(|ops| ops.contains(&operator))
    };
    if !supports(left) {
        return EvalError::InvalidOperatorForType {
            kind: operator.kind(),
            operator,
            operand: left,
        };
    }
    if !supports(right) {
        return EvalError::InvalidOperatorForType {
            kind: operator.kind(),
            operator,
            operand: right,
        };
    }
    EvalError::TypeMismatch {
        operator,
        left,
        right,
    }
}
