//! Unary operation evaluator.
//!
//! `!` applies to booleans and `-` to ints, floats, and durations. A static
//! operand of any other type is rejected at construction; a dynamic operand
//! is checked by the type guards of the typed methods at evaluation time.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;

use crate::ast::{Node, Operator};
use crate::eval::error::EvalError;
use crate::eval::{Compiler, ExecutionState, NodeEvaluator, constant_node_type};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::duration_nanos;

pub(crate) struct EvalUnaryNode {
    operator: Operator,
    node: Box<dyn NodeEvaluator>,
    /// `Bool` for `!`; the operand type for `-` over a static operand;
    /// `Numeric` for `-` over a dynamic operand, resolved per evaluation.
    return_type: ValueType,
}

impl EvalUnaryNode {
    pub fn new(compiler: &mut Compiler, operator: Operator, operand: &Node) -> Result<Self, EvalError> {
        if !matches!(operator, Operator::Not | Operator::Minus) {
            return Err(EvalError::InvalidUnaryOperator(operator));
        }

        let operand_type = constant_node_type(operand);
        let node = compiler.compile(operand)?;

        let invalid = |operand: ValueType| EvalError::InvalidOperatorForType {
            kind: "unary",
            operator,
            operand,
        };
        let return_type = match operator {
            Operator::Not => {
                if !node.is_dynamic() && operand_type != ValueType::Bool {
                    return Err(invalid(operand_type));
                }
                ValueType::Bool
            }
            _ => {
                if node.is_dynamic() {
                    ValueType::Numeric
                } else {
                    match operand_type {
                        ValueType::Int | ValueType::Float | ValueType::Duration => operand_type,
                        t => return Err(invalid(t)),
                    }
                }
            }
        };

        Ok(EvalUnaryNode {
            operator,
            node,
            return_type,
        })
    }

    fn guard(&self, requested: ValueType) -> EvalError {
        EvalError::TypeGuard {
            requested,
            actual: self.return_type,
        }
    }
}

impl NodeEvaluator for EvalUnaryNode {
    fn eval_bool(&self, scope: &Scope, state: &mut ExecutionState) -> Result<bool, EvalError> {
        if self.operator == Operator::Not {
            return Ok(!self.node.eval_bool(scope, state)?);
        }
        Err(self.guard(ValueType::Bool))
    }

    fn eval_int(&self, scope: &Scope, state: &mut ExecutionState) -> Result<i64, EvalError> {
        if self.operator == Operator::Minus && self.return_type.is_numeric() {
            return Ok(self.node.eval_int(scope, state)?.wrapping_neg());
        }
        Err(self.guard(ValueType::Int))
    }

    fn eval_float(&self, scope: &Scope, state: &mut ExecutionState) -> Result<f64, EvalError> {
        if self.operator == Operator::Minus && self.return_type.is_numeric() {
            return Ok(-self.node.eval_float(scope, state)?);
        }
        Err(self.guard(ValueType::Float))
    }

    fn eval_string(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<EcoString, EvalError> {
        Err(self.guard(ValueType::String))
    }

    fn eval_duration(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError> {
        if self.operator == Operator::Minus
            && matches!(self.return_type, ValueType::Duration | ValueType::Numeric)
        {
            let d = self.node.eval_duration(scope, state)?;
            return Ok(TimeDelta::nanoseconds(duration_nanos(d).wrapping_neg()));
        }
        Err(self.guard(ValueType::Duration))
    }

    fn eval_time(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<DateTime<Utc>, EvalError> {
        Err(self.guard(ValueType::Time))
    }

    fn eval_regex(
        &self,
        _scope: &Scope,
        _state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError> {
        Err(self.guard(ValueType::Regex))
    }

    fn node_type(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<ValueType, EvalError> {
        if self.return_type == ValueType::Numeric {
            // Dynamic negation: the produced type is the operand's current type.
            return self.node.node_type(scope, state);
        }
        Ok(self.return_type)
    }

    fn is_dynamic(&self) -> bool {
        self.node.is_dynamic()
    }
}
