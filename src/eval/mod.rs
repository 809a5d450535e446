//! Compiled node evaluators.
//!
//! [`Expression::compile`](crate::expr::Expression::compile) turns an
//! [`ast::Node`](crate::ast::Node) tree into a graph of [`NodeEvaluator`]s,
//! one per node, each pre-validated and pre-specialized as far as the
//! statically known operand types allow. The graph is immutable after
//! construction; all mutable state lives in [`ExecutionState`].
//!
//! ## Design Principles
//!
//! - **Never panic**: Division by zero, type flapping, and undefined names
//!   are all returned errors
//! - **Specialize once**: A binary node over static operands binds its
//!   operation function at compile time; dynamic operands resolve on first
//!   evaluation and re-resolve only when a type guard trips
//! - **Share freely**: Evaluator graphs are `Send + Sync` and shared across
//!   `copy_reset` clones without locking

pub mod error;
pub mod state;

mod binary;
mod function;
mod lambda;
mod leaf;
mod table;
mod unary;

#[cfg(test)]
mod eval_test;

pub use error::EvalError;
pub use state::ExecutionState;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;

use crate::ast::{Node, Number, Operator};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::Value;

/// A compiled expression node.
///
/// One typed `eval_*` method per value kind: the caller asks for the type it
/// wants and the node either produces it or fails with a type guard naming
/// the type it would have produced. `node_type` reports the type the node
/// would produce against the given scope; for static nodes this is constant,
/// for dynamic ones it may change from point to point.
pub trait NodeEvaluator: Send + Sync {
    fn eval_bool(&self, scope: &Scope, state: &mut ExecutionState) -> Result<bool, EvalError>;
    fn eval_int(&self, scope: &Scope, state: &mut ExecutionState) -> Result<i64, EvalError>;
    fn eval_float(&self, scope: &Scope, state: &mut ExecutionState) -> Result<f64, EvalError>;
    fn eval_string(&self, scope: &Scope, state: &mut ExecutionState)
    -> Result<EcoString, EvalError>;
    fn eval_duration(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<TimeDelta, EvalError>;
    fn eval_time(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<DateTime<Utc>, EvalError>;
    fn eval_regex(
        &self,
        scope: &Scope,
        state: &mut ExecutionState,
    ) -> Result<Arc<Regex>, EvalError>;

    /// The type this node would produce right now.
    fn node_type(&self, scope: &Scope, state: &mut ExecutionState)
    -> Result<ValueType, EvalError>;

    /// Whether the produced type can vary between evaluations.
    fn is_dynamic(&self) -> bool;
}

/// Compile-time context threaded through evaluator construction.
///
/// Currently its only job is handing out lambda slot ids, which key the
/// per-lambda nested states inside [`ExecutionState`].
pub(crate) struct Compiler {
    next_lambda_slot: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            next_lambda_slot: 0,
        }
    }

    pub fn alloc_lambda_slot(&mut self) -> usize {
        let slot = self.next_lambda_slot;
        self.next_lambda_slot += 1;
        slot
    }

    /// Build the evaluator for a syntax node, validating operators and any
    /// statically known operand types.
    pub fn compile(&mut self, node: &Node) -> Result<Box<dyn NodeEvaluator>, EvalError> {
        match node {
            Node::Bool(b) => Ok(Box::new(leaf::EvalBoolNode::new(*b))),
            Node::Number(Number::Int(i)) => Ok(Box::new(leaf::EvalIntNode::new(*i))),
            Node::Number(Number::Float(x)) => Ok(Box::new(leaf::EvalFloatNode::new(*x))),
            Node::String(s) => Ok(Box::new(leaf::EvalStringNode::new(EcoString::from(
                s.as_str(),
            )))),
            Node::Regex(r) => Ok(Box::new(leaf::EvalRegexNode::new(Arc::clone(r)))),
            Node::Duration(d) => Ok(Box::new(leaf::EvalDurationNode::new(*d))),
            Node::Reference(name) => Ok(Box::new(leaf::EvalReferenceNode::new(name.clone()))),
            Node::Unary { operator, node } => Ok(Box::new(unary::EvalUnaryNode::new(
                self, *operator, node,
            )?)),
            Node::Binary {
                operator,
                left,
                right,
            } => Ok(Box::new(binary::EvalBinaryNode::new(
                self, *operator, left, right,
            )?)),
            Node::Function { name, args } => Ok(Box::new(function::EvalFunctionNode::new(
                self,
                name.clone(),
                args,
            )?)),
            Node::Lambda(body) => Ok(Box::new(lambda::EvalLambdaNode::new(self, body)?)),
            Node::List(_) | Node::Star => Err(EvalError::NotEvaluationNode(node.kind())),
        }
    }
}

/// The produced type of a node when it is knowable without a scope, or
/// `Invalid` when it depends on runtime bindings.
pub(crate) fn constant_node_type(node: &Node) -> ValueType {
    match node {
        Node::Bool(_) => ValueType::Bool,
        Node::Number(Number::Int(_)) => ValueType::Int,
        Node::Number(Number::Float(_)) => ValueType::Float,
        Node::String(_) => ValueType::String,
        Node::Regex(_) => ValueType::Regex,
        Node::Duration(_) => ValueType::Duration,
        Node::Lambda(body) => constant_node_type(body),
        Node::Unary { operator, node } => match operator {
            Operator::Not => ValueType::Bool,
            Operator::Minus => match constant_node_type(node) {
                t @ (ValueType::Int | ValueType::Float | ValueType::Duration) => t,
                _ => ValueType::Invalid,
            },
            _ => ValueType::Invalid,
        },
        Node::Binary {
            operator,
            left,
            right,
        } => {
            if operator.is_comparison() || operator.is_logical() {
                ValueType::Bool
            } else {
                table::binary_return_type(
                    *operator,
                    constant_node_type(left),
                    constant_node_type(right),
                )
            }
        }
        Node::Reference(_) | Node::Function { .. } | Node::List(_) | Node::Star => {
            ValueType::Invalid
        }
    }
}

/// Evaluate a node whose type is not known to the caller: probe its current
/// type with a throwaway state, then dispatch to the matching typed method
/// with the real state. Used for function arguments and the generic
/// expression entry point.
pub(crate) fn eval_dynamic(
    node: &dyn NodeEvaluator,
    scope: &Scope,
    state: &mut ExecutionState,
) -> Result<Value, EvalError> {
    let typ = node.node_type(scope, &mut ExecutionState::new())?;
    match typ {
        ValueType::Bool => node.eval_bool(scope, state).map(Value::Bool),
        ValueType::Int => node.eval_int(scope, state).map(Value::Int),
        ValueType::Float => node.eval_float(scope, state).map(Value::Float),
        ValueType::String => node.eval_string(scope, state).map(Value::String),
        ValueType::Duration => node.eval_duration(scope, state).map(Value::Duration),
        ValueType::Time => node.eval_time(scope, state).map(Value::Time),
        ValueType::Regex => node.eval_regex(scope, state).map(Value::Regex),
        ValueType::Missing => Ok(Value::Missing),
        ValueType::Numeric | ValueType::Invalid => Err(EvalError::UnexpectedReturnType(typ)),
    }
}
