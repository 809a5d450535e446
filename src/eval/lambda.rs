//! Lambda-wrapper evaluator.
//!
//! A lambda body evaluates inside its own nested [`ExecutionState`], so a
//! `count()` in one lambda never shares a counter with a `count()` in
//! another. The nested state is owned by the outer state and keyed by a slot
//! id assigned at compile time, which keeps the shared evaluator tree free
//! of mutable state and isolates `copy_reset` clones from each other.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;

use crate::ast::Node;
use crate::eval::error::EvalError;
use crate::eval::{Compiler, ExecutionState, NodeEvaluator, constant_node_type};
use crate::scope::Scope;
use crate::types::ValueType;

pub(crate) struct EvalLambdaNode {
    node: Box<dyn NodeEvaluator>,
    const_return_type: ValueType,
    slot: usize,
}

impl EvalLambdaNode {
    pub fn new(compiler: &mut Compiler, body: &Node) -> Result<Self, EvalError> {
        let slot = compiler.alloc_lambda_slot();
        let const_return_type = constant_node_type(body);
        let node = compiler.compile(body)?;
        Ok(EvalLambdaNode {
            node,
            const_return_type,
            slot,
        })
    }

    fn current_type(&self, scope: &Scope) -> Result<ValueType, EvalError> {
        if self.const_return_type != ValueType::Invalid {
            return Ok(self.const_return_type);
        }
        self.node.node_type(scope, &mut ExecutionState::new())
    }

    /// Run the body inside this lambda's nested state.
    fn in_own_state<T>(
        &self,
        state: &mut ExecutionState,
        f: impl FnOnce(&dyn NodeEvaluator, &mut ExecutionState) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let mut own = state.take_lambda_state(self.slot);
        let result = f(&*self.node, &mut own);
        state.restore_lambda_state(self.slot, own);
        result
    }
}

impl NodeEvaluator for EvalLambdaNode {
    fn eval_bool(&self, scope: &Scope, state: &mut ExecutionState) -> Result<bool, EvalError> {
        match self.current_type(scope)? {
            ValueType::Bool => self.in_own_state(state, |node, own| node.eval_bool(scope, own)),
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::Bool,
                actual,
            }),
        }
    }

    fn eval_int(&self, scope: &Scope, state: &mut ExecutionState) -> Result<i64, EvalError> {
        match self.current_type(scope)? {
            ValueType::Int => self.in_own_state(state, |node, own| node.eval_int(scope, own)),
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::Int,
                actual,
            }),
        }
    }

    fn eval_float(&self, scope: &Scope, state: &mut ExecutionState) -> Result<f64, EvalError> {
        match self.current_type(scope)? {
            ValueType::Float => self.in_own_state(state, |node, own| node.eval_float(scope, own)),
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::Float,
                actual,
            }),
        }
    }

    fn eval_string(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<EcoString, EvalError> {
        match self.current_type(scope)? {
            ValueType::String => {
                self.in_own_state(state, |node, own| node.eval_string(scope, own))
            }
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::String,
                actual,
            }),
        }
    }

    fn eval_duration(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError> {
        match self.current_type(scope)? {
            ValueType::Duration => {
                self.in_own_state(state, |node, own| node.eval_duration(scope, own))
            }
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::Duration,
                actual,
            }),
        }
    }

    fn eval_time(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<DateTime<Utc>, EvalError> {
        match self.current_type(scope)? {
            ValueType::Time => self.in_own_state(state, |node, own| node.eval_time(scope, own)),
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::Time,
                actual,
            }),
        }
    }

    fn eval_regex(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError> {
        match self.current_type(scope)? {
            ValueType::Regex => self.in_own_state(state, |node, own| node.eval_regex(scope, own)),
            actual => Err(EvalError::TypeGuard {
                requested: ValueType::Regex,
                actual,
            }),
        }
    }

    fn node_type(
        &self,
        scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        self.current_type(scope)
    }

    fn is_dynamic(&self) -> bool {
        self.const_return_type == ValueType::Invalid
    }
}
