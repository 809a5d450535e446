//! Function-call evaluator.
//!
//! Arguments are evaluated through the generic dispatcher (their types may
//! vary per point), then the named function instance is pulled from the
//! expression's [`ExecutionState`] and invoked. Stateful functions advance
//! only here, never during type probing.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;
use smallvec::SmallVec;

use crate::ast::Node;
use crate::eval::error::EvalError;
use crate::eval::{Compiler, ExecutionState, NodeEvaluator, eval_dynamic};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::Value;

pub(crate) struct EvalFunctionNode {
    name: String,
    args: Vec<Box<dyn NodeEvaluator>>,
}

impl EvalFunctionNode {
    pub fn new(compiler: &mut Compiler, name: String, args: &[Node]) -> Result<Self, EvalError> {
        let args = args
            .iter()
            .map(|arg| compiler.compile(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EvalFunctionNode { name, args })
    }

    fn call(&self, scope: &Scope, state: &mut ExecutionState) -> Result<Value, EvalError> {
        let mut args: SmallVec<[Value; 4]> = SmallVec::new();
        for arg in &self.args {
            args.push(eval_dynamic(&**arg, scope, state)?);
        }
        let func = state
            .funcs
            .get_mut(self.name.as_str())
            .ok_or_else(|| EvalError::UndefinedFunction(self.name.clone()))?;
        func.call(&args).map_err(|source| EvalError::FunctionCall {
            name: self.name.clone(),
            source,
        })
    }

    fn guard(&self, requested: ValueType, value: Value) -> EvalError {
        EvalError::TypeGuard {
            requested,
            actual: value.value_type(),
        }
    }
}

impl NodeEvaluator for EvalFunctionNode {
    fn eval_bool(&self, scope: &Scope, state: &mut ExecutionState) -> Result<bool, EvalError> {
        match self.call(scope, state)? {
            Value::Bool(b) => Ok(b),
            v => Err(self.guard(ValueType::Bool, v)),
        }
    }

    fn eval_int(&self, scope: &Scope, state: &mut ExecutionState) -> Result<i64, EvalError> {
        match self.call(scope, state)? {
            Value::Int(i) => Ok(i),
            v => Err(self.guard(ValueType::Int, v)),
        }
    }

    fn eval_float(&self, scope: &Scope, state: &mut ExecutionState) -> Result<f64, EvalError> {
        match self.call(scope, state)? {
            Value::Float(x) => Ok(x),
            v => Err(self.guard(ValueType::Float, v)),
        }
    }

    fn eval_string(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<EcoString, EvalError> {
        match self.call(scope, state)? {
            Value::String(s) => Ok(s),
            v => Err(self.guard(ValueType::String, v)),
        }
    }

    fn eval_duration(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError> {
        match self.call(scope, state)? {
            Value::Duration(d) => Ok(d),
            v => Err(self.guard(ValueType::Duration, v)),
        }
    }

    fn eval_time(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<DateTime<Utc>, EvalError> {
        match self.call(scope, state)? {
            Value::Time(t) => Ok(t),
            v => Err(self.guard(ValueType::Time, v)),
        }
    }

    fn eval_regex(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError> {
        match self.call(scope, state)? {
            Value::Regex(r) => Ok(r),
            v => Err(self.guard(ValueType::Regex, v)),
        }
    }

    fn node_type(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        // A function's return type can depend on argument types and on its
        // own accumulated state, so the only way to know it is to run it.
        Ok(self.call(scope, state)?.value_type())
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}
