//! Binary operation evaluator.
//!
//! When both operand types are known at compile time, the operation function
//! is bound once during construction and an impossible pairing is rejected
//! before the first evaluation. With a dynamic operand the node resolves
//! both types at each evaluation by probing, looks the operation up, and
//! runs it; if an operand then produces a different type than the probe
//! promised (a stateful function advancing between probe and run can do
//! this), the tripped type guard names the actual type, the offending side
//! is re-resolved, and the operation is retried once. Resolved types live in
//! locals of the evaluation call, never in the shared node.
//!
//! AND and OR take a separate dynamic path: the left operand alone can
//! decide the result, and when it does the right operand is never probed or
//! evaluated.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;
use tracing::debug;

use crate::ast::{Node, Operator};
use crate::eval::error::{EvalError, Side};
use crate::eval::table::{self, OperationInfo};
use crate::eval::{Compiler, ExecutionState, NodeEvaluator, constant_node_type};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::Value;

pub(crate) struct EvalBinaryNode {
    operator: Operator,
    left: Box<dyn NodeEvaluator>,
    right: Box<dyn NodeEvaluator>,
    /// Bound at construction when neither operand is dynamic.
    static_op: Option<&'static OperationInfo>,
    /// The produced type when knowable at compile time, `Invalid` otherwise.
    const_return_type: ValueType,
}

impl EvalBinaryNode {
    pub fn new(
        compiler: &mut Compiler,
        operator: Operator,
        left: &Node,
        right: &Node,
    ) -> Result<Self, EvalError> {
        if !operator.is_expr_operator() {
            return Err(EvalError::UnknownBinaryOperator(operator));
        }

        let left_type = constant_node_type(left);
        let right_type = constant_node_type(right);
        let left = compiler.compile(left)?;
        let right = compiler.compile(right)?;

        // Comparisons and logical operations always produce a boolean, even
        // over dynamic operands; math needs both operand types.
        let const_return_type = if operator.is_comparison() || operator.is_logical() {
            ValueType::Bool
        } else {
            table::binary_return_type(operator, left_type, right_type)
        };

        let static_op = if !left.is_dynamic() && !right.is_dynamic() {
            let info = table::lookup(operator, left_type, right_type)
                .ok_or_else(|| table::operation_error(operator, left_type, right_type))?;
            Some(info)
        } else {
            None
        };

        Ok(EvalBinaryNode {
            operator,
            left,
            right,
            static_op,
            const_return_type,
        })
    }

    /// Assemble a node over pre-built operand evaluators, always taking the
    /// dynamic resolution path.
    #[cfg(test)]
    pub(crate) fn with_operands(
        operator: Operator,
        left: Box<dyn NodeEvaluator>,
        right: Box<dyn NodeEvaluator>,
    ) -> Self {
        EvalBinaryNode {
            operator,
            left,
            right,
            static_op: None,
            const_return_type: ValueType::Invalid,
        }
    }

    fn eval(&self, scope: &Scope, state: &mut ExecutionState) -> Result<Value, EvalError> {
        if let Some(info) = self.static_op {
            return (info.f)(scope, state, &*self.left, &*self.right).map_err(|e| e.error);
        }

        if self.operator.is_logical() {
            return self.eval_logical(scope, state);
        }

        // Resolve operand types against the current scope with a throwaway
        // state so stateful functions are not advanced by probing.
        let mut probe = ExecutionState::new();
        let mut left_type = self.left.node_type(scope, &mut probe)?;
        let mut right_type = self.right.node_type(scope, &mut probe)?;

        let mut retried = false;
        loop {
            let Some(info) = table::lookup(self.operator, left_type, right_type) else {
                return Err(table::operation_error(self.operator, left_type, right_type));
            };
            match (info.f)(scope, state, &*self.left, &*self.right) {
                Ok(value) => return Ok(value),
                Err(side_err) => {
                    if !retried {
                        if let (Some(side), EvalError::TypeGuard { actual, .. }) =
                            (side_err.side, &side_err.error)
                        {
                            let actual = *actual;
                            match side {
                                Side::Left => left_type = actual,
                                Side::Right => right_type = actual,
                            }
                            retried = true;
                            debug!(
                                operator = %self.operator,
                                side = %side,
                                actual = %actual,
                                "operand type changed, re-specializing",
                            );
                            continue;
                        }
                    }
                    return Err(side_err.error);
                }
            }
        }
    }

    /// AND and OR over dynamic operands. The left side is resolved and
    /// evaluated first; a decided result returns before the right operand is
    /// probed or evaluated, so a right side that would error cannot poison a
    /// result the left side already determined.
    fn eval_logical(&self, scope: &Scope, state: &mut ExecutionState) -> Result<Value, EvalError> {
        let left_type = self.left.node_type(scope, &mut ExecutionState::new())?;
        if left_type != ValueType::Bool {
            return Err(table::operation_error(
                self.operator,
                left_type,
                ValueType::Bool,
            ));
        }
        let left = self.left.eval_bool(scope, state)?;
        match (self.operator, left) {
            (Operator::And, false) => return Ok(Value::Bool(false)),
            (Operator::Or, true) => return Ok(Value::Bool(true)),
            _ => {}
        }

        let right_type = self.right.node_type(scope, &mut ExecutionState::new())?;
        if right_type != ValueType::Bool {
            return Err(table::operation_error(
                self.operator,
                ValueType::Bool,
                right_type,
            ));
        }
        Ok(Value::Bool(self.right.eval_bool(scope, state)?))
    }

    fn guard(&self, requested: ValueType, value: Value) -> EvalError {
        EvalError::TypeGuard {
            requested,
            actual: value.value_type(),
        }
    }
}

impl NodeEvaluator for EvalBinaryNode {
    fn eval_bool(&self, scope: &Scope, state: &mut ExecutionState) -> Result<bool, EvalError> {
        match self.eval(scope, state)? {
            Value::Bool(b) => Ok(b),
            v => Err(self.guard(ValueType::Bool, v)),
        }
    }

    fn eval_int(&self, scope: &Scope, state: &mut ExecutionState) -> Result<i64, EvalError> {
        match self.eval(scope, state)? {
            Value::Int(i) => Ok(i),
            v => Err(self.guard(ValueType::Int, v)),
        }
    }

    fn eval_float(&self, scope: &Scope, state: &mut ExecutionState) -> Result<f64, EvalError> {
        match self.eval(scope, state)? {
            Value::Float(x) => Ok(x),
            v => Err(self.guard(ValueType::Float, v)),
        }
    }

    fn eval_string(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<EcoString, EvalError> {
        match self.eval(scope, state)? {
            Value::String(s) => Ok(s),
            v => Err(self.guard(ValueType::String, v)),
        }
    }

    fn eval_duration(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError> {
        match self.eval(scope, state)? {
            Value::Duration(d) => Ok(d),
            v => Err(self.guard(ValueType::Duration, v)),
        }
    }

    fn eval_time(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<DateTime<Utc>, EvalError> {
        match self.eval(scope, state)? {
            Value::Time(t) => Ok(t),
            v => Err(self.guard(ValueType::Time, v)),
        }
    }

    fn eval_regex(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError> {
        match self.eval(scope, state)? {
            Value::Regex(r) => Ok(r),
            v => Err(self.guard(ValueType::Regex, v)),
        }
    }

    fn node_type(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        if self.const_return_type != ValueType::Invalid {
            return Ok(self.const_return_type);
        }
        let left_type = self.left.node_type(scope, state)?;
        let right_type = self.right.node_type(scope, state)?;
        match table::lookup(self.operator, left_type, right_type) {
            Some(info) => Ok(info.return_type),
            None => Err(table::operation_error(self.operator, left_type, right_type)),
        }
    }

    fn is_dynamic(&self) -> bool {
        self.const_return_type == ValueType::Invalid
    }
}
