//! Inbound expression syntax.
//!
//! [`Node`] is the untyped tree handed to
//! [`Expression::compile`](crate::expr::Expression::compile) by whatever
//! front end produced it. Compilation validates operators and statically
//! known operand types; the tree itself carries no evaluation state.

use core::fmt;
use std::sync::Arc;

use chrono::TimeDelta;
use regex::Regex;

/// Binary and unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    RegexEqual,
    RegexNotEqual,
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Not,
}

impl Operator {
    pub fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::Less
                | Operator::LessEqual
                | Operator::Greater
                | Operator::GreaterEqual
                | Operator::RegexEqual
                | Operator::RegexNotEqual
        )
    }

    pub fn is_math(self) -> bool {
        matches!(
            self,
            Operator::Plus | Operator::Minus | Operator::Mult | Operator::Div | Operator::Mod
        )
    }

    /// Whether the operator may appear in a binary expression.
    pub fn is_expr_operator(self) -> bool {
        self.is_logical() || self.is_comparison() || self.is_math()
    }

    /// Coarse grouping used in error messages.
    pub(crate) fn kind(self) -> &'static str {
        if self.is_logical() {
            "logical"
        } else if self.is_comparison() {
            "comparison"
        } else if self.is_math() {
            "math"
        } else {
            "unary"
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::RegexEqual => "=~",
            Operator::RegexNotEqual => "!~",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Mult => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Not => "!",
        };
        f.write_str(text)
    }
}

/// Numeric literal, preserving the int/float distinction of the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// An untyped expression tree node.
///
/// `List` and `Star` are carried by the surrounding scripting language but
/// are not evaluation nodes; compiling them fails.
#[derive(Debug, Clone)]
pub enum Node {
    Bool(bool),
    Number(Number),
    String(String),
    Regex(Arc<Regex>),
    Duration(TimeDelta),
    Reference(String),
    Unary {
        operator: Operator,
        node: Box<Node>,
    },
    Binary {
        operator: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Function {
        name: String,
        args: Vec<Node>,
    },
    Lambda(Box<Node>),
    List(Vec<Node>),
    Star,
}

impl Node {
    /// Short node-kind name for construction-time errors.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Regex(_) => "regex",
            Node::Duration(_) => "duration",
            Node::Reference(_) => "reference",
            Node::Unary { .. } => "unary",
            Node::Binary { .. } => "binary",
            Node::Function { .. } => "function",
            Node::Lambda(_) => "lambda",
            Node::List(_) => "list",
            Node::Star => "star",
        }
    }
}
