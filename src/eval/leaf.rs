//! Literal and variable-reference evaluators.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;

use crate::eval::error::EvalError;
use crate::eval::{ExecutionState, NodeEvaluator};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::Value;

/// Emit the typed methods a node cannot satisfy, each failing with a type
/// guard naming the node's actual type.
macro_rules! type_guards {
    ($actual:ident; $($method:ident -> $ty:ty = $requested:ident),* $(,)?) => {
        $(
            fn $method(
                &self,
                _scope: &Scope,
                _state: &mut ExecutionState,
            ) -> Result<$ty, EvalError> {
                Err(EvalError::TypeGuard {
                    requested: ValueType::$requested,
                    actual: ValueType::$actual,
                })
            }
        )*
    };
}

// ==================== literals ====================

pub(crate) struct EvalBoolNode {
    value: bool,
}

impl EvalBoolNode {
    pub fn new(value: bool) -> Self {
        EvalBoolNode { value }
    }
}

impl NodeEvaluator for EvalBoolNode {
    fn eval_bool(&self, _scope: &Scope, _state: &mut ExecutionState) -> Result<bool, EvalError> {
        Ok(self.value)
    }

    type_guards!(Bool;
        eval_int -> i64 = Int,
        eval_float -> f64 = Float,
        eval_string -> EcoString = String,
        eval_duration -> TimeDelta = Duration,
        eval_time -> DateTime<Utc> = Time,
        eval_regex -> Arc<Regex> = Regex,
    );

    fn node_type(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(ValueType::Bool)
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

pub(crate) struct EvalIntNode {
    value: i64,
}

impl EvalIntNode {
    pub fn new(value: i64) -> Self {
        EvalIntNode { value }
    }
}

impl NodeEvaluator for EvalIntNode {
    fn eval_int(&self, _scope: &Scope, _state: &mut ExecutionState) -> Result<i64, EvalError> {
        Ok(self.value)
    }

    type_guards!(Int;
        eval_bool -> bool = Bool,
        eval_float -> f64 = Float,
        eval_string -> EcoString = String,
        eval_duration -> TimeDelta = Duration,
        eval_time -> DateTime<Utc> = Time,
        eval_regex -> Arc<Regex> = Regex,
    );

    fn node_type(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(ValueType::Int)
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

pub(crate) struct EvalFloatNode {
    value: f64,
}

impl EvalFloatNode {
    pub fn new(value: f64) -> Self {
        EvalFloatNode { value }
    }
}

impl NodeEvaluator for EvalFloatNode {
    fn eval_float(&self, _scope: &Scope, _state: &mut ExecutionState) -> Result<f64, EvalError> {
        Ok(self.value)
    }

    type_guards!(Float;
        eval_bool -> bool = Bool,
        eval_int -> i64 = Int,
        eval_string -> EcoString = String,
        eval_duration -> TimeDelta = Duration,
        eval_time -> DateTime<Utc> = Time,
        eval_regex -> Arc<Regex> = Regex,
    );

    fn node_type(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(ValueType::Float)
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

pub(crate) struct EvalStringNode {
    value: EcoString,
}

impl EvalStringNode {
    pub fn new(value: EcoString) -> Self {
        EvalStringNode { value }
    }
}

impl NodeEvaluator for EvalStringNode {
    fn eval_string(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<EcoString, EvalError> {
        Ok(self.value.clone())
    }

    type_guards!(String;
        eval_bool -> bool = Bool,
        eval_int -> i64 = Int,
        eval_float -> f64 = Float,
        eval_duration -> TimeDelta = Duration,
        eval_time -> DateTime<Utc> = Time,
        eval_regex -> Arc<Regex> = Regex,
    );

    fn node_type(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(ValueType::String)
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

pub(crate) struct EvalRegexNode {
    value: Arc<Regex>,
}

impl EvalRegexNode {
    pub fn new(value: Arc<Regex>) -> Self {
        EvalRegexNode { value }
    }
}

impl NodeEvaluator for EvalRegexNode {
    fn eval_regex(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError> {
        Ok(Arc::clone(&self.value))
    }

    type_guards!(Regex;
        eval_bool -> bool = Bool,
        eval_int -> i64 = Int,
        eval_float -> f64 = Float,
        eval_string -> EcoString = String,
        eval_duration -> TimeDelta = Duration,
        eval_time -> DateTime<Utc> = Time,
    );

    fn node_type(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(ValueType::Regex)
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

pub(crate) struct EvalDurationNode {
    value: TimeDelta,
}

impl EvalDurationNode {
    pub fn new(value: TimeDelta) -> Self {
        EvalDurationNode { value }
    }
}

impl NodeEvaluator for EvalDurationNode {
    fn eval_duration(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError> {
        Ok(self.value)
    }

    type_guards!(Duration;
        eval_bool -> bool = Bool,
        eval_int -> i64 = Int,
        eval_float -> f64 = Float,
        eval_string -> EcoString = String,
        eval_time -> DateTime<Utc> = Time,
        eval_regex -> Arc<Regex> = Regex,
    );

    fn node_type(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(ValueType::Duration)
    }

    fn is_dynamic(&self) -> bool {
        false
    }
}

// ==================== variable references ====================

/// Looks a name up in the scope on every evaluation. Always dynamic: the
/// bound value's type may differ from point to point.
pub(crate) struct EvalReferenceNode {
    name: String,
}

impl EvalReferenceNode {
    pub fn new(name: String) -> Self {
        EvalReferenceNode { name }
    }

    fn value<'a>(&self, scope: &'a Scope) -> Result<&'a Value, EvalError> {
        scope.get(&self.name)
    }

    fn guard(requested: ValueType, value: &Value) -> EvalError {
        EvalError::TypeGuard {
            requested,
            actual: value.value_type(),
        }
    }
}

impl NodeEvaluator for EvalReferenceNode {
    fn eval_bool(&self, scope: &Scope, _state: &mut ExecutionState) -> Result<bool, EvalError> {
        match self.value(scope)? {
            Value::Bool(b) => Ok(*b),
            v => Err(Self::guard(ValueType::Bool, v)),
        }
    }

    fn eval_int(&self, scope: &Scope, _state: &mut ExecutionState) -> Result<i64, EvalError> {
        match self.value(scope)? {
            Value::Int(i) => Ok(*i),
            v => Err(Self::guard(ValueType::Int, v)),
        }
    }

    fn eval_float(&self, scope: &Scope, _state: &mut ExecutionState) -> Result<f64, EvalError> {
        match self.value(scope)? {
            Value::Float(x) => Ok(*x),
            v => Err(Self::guard(ValueType::Float, v)),
        }
    }

    fn eval_string(
        &self,
        scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<EcoString, EvalError> {
        match self.value(scope)? {
            Value::String(s) => Ok(s.clone()),
            v => Err(Self::guard(ValueType::String, v)),
        }
    }

    fn eval_duration(
        &self,
        scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError> {
        match self.value(scope)? {
            Value::Duration(d) => Ok(*d),
            v => Err(Self::guard(ValueType::Duration, v)),
        }
    }

    fn eval_time(
        &self,
        scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<DateTime<Utc>, EvalError> {
        match self.value(scope)? {
            Value::Time(t) => Ok(*t),
            v => Err(Self::guard(ValueType::Time, v)),
        }
    }

    fn eval_regex(
        &self,
        scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError> {
        match self.value(scope)? {
            Value::Regex(r) => Ok(Arc::clone(r)),
            v => Err(Self::guard(ValueType::Regex, v)),
        }
    }

    fn node_type(
        &self,
        scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        Ok(self.value(scope)?.value_type())
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}
