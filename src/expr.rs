//! The compiled-expression façade.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use regex::Regex;
use tracing::debug;

use crate::ast::Node;
use crate::eval::error::EvalError;
use crate::eval::{Compiler, ExecutionState, NodeEvaluator};
use crate::scope::Scope;
use crate::types::ValueType;
use crate::values::Value;

/// A compiled expression: an immutable, shareable evaluator tree plus this
/// expression's private mutable state.
///
/// Compile once, then evaluate against a fresh [`Scope`] per point. Stateful
/// functions accumulate in the state between evaluations; [`reset`] clears
/// them and [`copy_reset`] hands the shared tree to another worker with a
/// state of its own.
///
/// [`reset`]: Expression::reset
/// [`copy_reset`]: Expression::copy_reset
pub struct Expression {
    root: Arc<dyn NodeEvaluator>,
    state: ExecutionState,
}

impl Expression {
    /// Compile a syntax tree, validating operators and statically known
    /// operand types up front.
    pub fn compile(node: &Node) -> Result<Expression, EvalError> {
        let mut compiler = Compiler::new();
        let root: Arc<dyn NodeEvaluator> = Arc::from(compiler.compile(node)?);
        debug!(dynamic = root.is_dynamic(), "compiled expression");
        Ok(Expression {
            root,
            state: ExecutionState::new(),
        })
    }

    /// Clear all accumulated function and lambda state.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// A new expression sharing this one's evaluator tree but starting from
    /// pristine state. Cheap; the tree is reference-counted, not cloned.
    pub fn copy_reset(&self) -> Expression {
        Expression {
            root: Arc::clone(&self.root),
            state: ExecutionState::new(),
        }
    }

    pub fn eval_bool(&mut self, scope: &Scope) -> Result<bool, EvalError> {
        self.root.eval_bool(scope, &mut self.state)
    }

    pub fn eval_int(&mut self, scope: &Scope) -> Result<i64, EvalError> {
        self.root.eval_int(scope, &mut self.state)
    }

    pub fn eval_float(&mut self, scope: &Scope) -> Result<f64, EvalError> {
        self.root.eval_float(scope, &mut self.state)
    }

    pub fn eval_string(&mut self, scope: &Scope) -> Result<EcoString, EvalError> {
        self.root.eval_string(scope, &mut self.state)
    }

    pub fn eval_duration(&mut self, scope: &Scope) -> Result<TimeDelta, EvalError> {
        self.root.eval_duration(scope, &mut self.state)
    }

    pub fn eval_time(&mut self, scope: &Scope) -> Result<DateTime<Utc>, EvalError> {
        self.root.eval_time(scope, &mut self.state)
    }

    pub fn eval_regex(&mut self, scope: &Scope) -> Result<Arc<Regex>, EvalError> {
        self.root.eval_regex(scope, &mut self.state)
    }

    /// Evaluate without knowing the produced type in advance: probe the
    /// root's current type, then dispatch to the matching typed method.
    pub fn eval(&mut self, scope: &Scope) -> Result<Value, EvalError> {
        let typ = self.root.node_type(scope, &mut ExecutionState::new())?;
        match typ {
            ValueType::Bool => self.eval_bool(scope).map(Value::Bool),
            ValueType::Int => self.eval_int(scope).map(Value::Int),
            ValueType::Float => self.eval_float(scope).map(Value::Float),
            ValueType::String => self.eval_string(scope).map(Value::String),
            ValueType::Duration => self.eval_duration(scope).map(Value::Duration),
            ValueType::Time => self.eval_time(scope).map(Value::Time),
            ValueType::Regex => self.eval_regex(scope).map(Value::Regex),
            t => Err(EvalError::UnexpectedReturnType(t)),
        }
    }
}

/// Every variable name an expression references, deduplicated and sorted.
/// Feed the result to [`ScopePool::new`](crate::scope::ScopePool::new).
pub fn find_reference_variables(node: &Node) -> Vec<String> {
    let mut names = Vec::new();
    collect_references(node, &mut names);
    names.sort_unstable();
    names.dedup();
    names
}

fn collect_references(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Reference(name) => out.push(name.clone()),
        Node::Unary { node, .. } => collect_references(node, out),
        Node::Binary { left, right, .. } => {
            collect_references(left, out);
            collect_references(right, out);
        }
        Node::Function { args, .. } => {
            for arg in args {
                collect_references(arg, out);
            }
        }
        Node::Lambda(body) => collect_references(body, out),
        Node::List(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Node::Bool(_)
        | Node::Number(_)
        | Node::String(_)
        | Node::Regex(_)
        | Node::Duration(_)
        | Node::Star => {}
    }
}
