//! Unit tests for compiled-expression evaluation.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use pretty_assertions::assert_eq;
use regex::Regex;

use super::binary::EvalBinaryNode;
use super::leaf::EvalIntNode;
use super::{EvalError, ExecutionState, NodeEvaluator};
use crate::ast::{Node, Number, Operator};
use crate::expr::{Expression, find_reference_variables};
use crate::scope::Scope;
use crate::test_utils;
use crate::types::ValueType;
use crate::values::{Value, parse_duration};

fn int(i: i64) -> Node {
    Node::Number(Number::Int(i))
}

fn float(x: f64) -> Node {
    Node::Number(Number::Float(x))
}

fn boolean(b: bool) -> Node {
    Node::Bool(b)
}

fn string(s: &str) -> Node {
    Node::String(s.to_string())
}

fn regex(pattern: &str) -> Node {
    Node::Regex(Arc::new(Regex::new(pattern).unwrap()))
}

fn duration(text: &str) -> Node {
    Node::Duration(parse_duration(text).unwrap())
}

fn reference(name: &str) -> Node {
    Node::Reference(name.to_string())
}

fn binary(operator: Operator, left: Node, right: Node) -> Node {
    Node::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unary(operator: Operator, node: Node) -> Node {
    Node::Unary {
        operator,
        node: Box::new(node),
    }
}

fn call(name: &str, args: Vec<Node>) -> Node {
    Node::Function {
        name: name.to_string(),
        args,
    }
}

fn lambda(body: Node) -> Node {
    Node::Lambda(Box::new(body))
}

fn eval(node: &Node, scope: &Scope) -> Value {
    Expression::compile(node)
        .expect("compilation failed")
        .eval(scope)
        .expect("evaluation failed")
}

// ============================================================================
// Specialized binary operations
// ============================================================================

#[test]
fn test_binary_operations_over_literals() {
    test_utils::init_test_logging();
    let dur = |text| Value::Duration(parse_duration(text).unwrap());
    let cases: Vec<(Node, Value)> = vec![
        // logical
        (binary(Operator::And, boolean(true), boolean(true)), Value::Bool(true)),
        (binary(Operator::And, boolean(true), boolean(false)), Value::Bool(false)),
        (binary(Operator::Or, boolean(false), boolean(true)), Value::Bool(true)),
        (binary(Operator::Or, boolean(false), boolean(false)), Value::Bool(false)),
        (binary(Operator::Equal, boolean(true), boolean(false)), Value::Bool(false)),
        (binary(Operator::NotEqual, boolean(true), boolean(false)), Value::Bool(true)),
        // int comparisons
        (binary(Operator::Less, int(1), int(2)), Value::Bool(true)),
        (binary(Operator::LessEqual, int(2), int(2)), Value::Bool(true)),
        (binary(Operator::Greater, int(1), int(2)), Value::Bool(false)),
        (binary(Operator::GreaterEqual, int(2), int(2)), Value::Bool(true)),
        (binary(Operator::Equal, int(7), int(7)), Value::Bool(true)),
        (binary(Operator::NotEqual, int(7), int(8)), Value::Bool(true)),
        // float comparisons
        (binary(Operator::Less, float(1.5), float(2.5)), Value::Bool(true)),
        (binary(Operator::Equal, float(2.5), float(2.5)), Value::Bool(true)),
        // mixed int/float comparisons exist even though mixed math does not
        (binary(Operator::Less, int(1), float(1.5)), Value::Bool(true)),
        (binary(Operator::Greater, float(2.5), int(2)), Value::Bool(true)),
        (binary(Operator::Equal, int(2), float(2.0)), Value::Bool(true)),
        (binary(Operator::NotEqual, float(2.5), int(2)), Value::Bool(true)),
        // string comparisons and concatenation
        (binary(Operator::Less, string("abc"), string("abd")), Value::Bool(true)),
        (binary(Operator::Equal, string("abc"), string("abc")), Value::Bool(true)),
        (binary(Operator::Plus, string("ab"), string("cd")), Value::String("abcd".into())),
        // regex match
        (binary(Operator::RegexEqual, string("cpu-total"), regex("^cpu")), Value::Bool(true)),
        (binary(Operator::RegexNotEqual, string("mem"), regex("^cpu")), Value::Bool(true)),
        // int arithmetic
        (binary(Operator::Plus, int(7), int(3)), Value::Int(10)),
        (binary(Operator::Minus, int(7), int(3)), Value::Int(4)),
        (binary(Operator::Mult, int(7), int(3)), Value::Int(21)),
        (binary(Operator::Div, int(7), int(2)), Value::Int(3)),
        (binary(Operator::Mod, int(7), int(3)), Value::Int(1)),
        // float arithmetic
        (binary(Operator::Plus, float(1.5), float(2.25)), Value::Float(3.75)),
        (binary(Operator::Minus, float(1.5), float(2.25)), Value::Float(-0.75)),
        (binary(Operator::Mult, float(1.5), float(2.0)), Value::Float(3.0)),
        (binary(Operator::Div, float(1.5), float(0.5)), Value::Float(3.0)),
        // duration comparisons and arithmetic
        (binary(Operator::Less, duration("1m"), duration("2m")), Value::Bool(true)),
        (binary(Operator::Equal, duration("60s"), duration("1m")), Value::Bool(true)),
        (binary(Operator::Plus, duration("1m"), duration("30s")), dur("90s")),
        (binary(Operator::Minus, duration("2m"), duration("30s")), dur("90s")),
        (binary(Operator::Mult, duration("2m"), int(3)), dur("6m")),
        (binary(Operator::Mult, int(3), duration("2m")), dur("6m")),
        (binary(Operator::Mult, duration("2m"), float(1.5)), dur("3m")),
        (binary(Operator::Mult, float(1.5), duration("2m")), dur("3m")),
        (binary(Operator::Div, duration("3m"), int(3)), dur("1m")),
        (binary(Operator::Div, duration("3m"), float(2.0)), dur("90s")),
        (binary(Operator::Div, duration("3m"), duration("1m")), Value::Int(3)),
    ];
    for (node, expected) in cases {
        let got = eval(&node, &Scope::new());
        assert_eq!(got, expected, "expression: {node:?}");
    }
}

#[test]
fn test_unary_operations() {
    let scope = Scope::new();
    assert_eq!(eval(&unary(Operator::Not, boolean(true)), &scope), Value::Bool(false));
    assert_eq!(eval(&unary(Operator::Minus, int(42)), &scope), Value::Int(-42));
    assert_eq!(eval(&unary(Operator::Minus, float(1.5)), &scope), Value::Float(-1.5));
    assert_eq!(
        eval(&unary(Operator::Minus, duration("1m")), &scope),
        Value::Duration(parse_duration("-1m").unwrap()),
    );

    // Dynamic operand: the operand type is resolved per evaluation.
    let node = unary(Operator::Minus, reference("value"));
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();
    scope.set("value", Value::Int(7));
    assert_eq!(expr.eval(&scope).unwrap(), Value::Int(-7));
    scope.set("value", Value::Float(2.5));
    assert_eq!(expr.eval(&scope).unwrap(), Value::Float(-2.5));
}

#[test]
fn test_nested_expression() {
    // ("usage" + 2.0) * 3.0 > "limit" AND "usage" < 100.0
    let node = binary(
        Operator::And,
        binary(
            Operator::Greater,
            binary(
                Operator::Mult,
                binary(Operator::Plus, reference("usage"), float(2.0)),
                float(3.0),
            ),
            reference("limit"),
        ),
        binary(Operator::Less, reference("usage"), float(100.0)),
    );
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();
    scope.set("usage", Value::Float(10.0));
    scope.set("limit", Value::Float(30.0));
    assert!(expr.eval_bool(&scope).unwrap());
    scope.set("limit", Value::Float(40.0));
    assert!(!expr.eval_bool(&scope).unwrap());
}

#[test]
fn test_division_by_zero_is_an_error() {
    let scope = Scope::new();
    let cases = [
        binary(Operator::Div, int(1), int(0)),
        binary(Operator::Mod, int(1), int(0)),
        binary(Operator::Div, duration("1m"), int(0)),
        binary(Operator::Div, duration("1m"), duration("0s")),
    ];
    for node in cases {
        let err = Expression::compile(&node)
            .unwrap()
            .eval(&scope)
            .unwrap_err();
        assert_eq!(err.to_string(), "division by zero", "expression: {node:?}");
    }
    // Float division follows IEEE semantics instead.
    assert_eq!(
        eval(&binary(Operator::Div, float(1.0), float(0.0)), &scope),
        Value::Float(f64::INFINITY),
    );
}

// ============================================================================
// Dynamic operands and re-specialization
// ============================================================================

#[test]
fn test_reference_operand_changes_type_between_evaluations() {
    test_utils::init_test_logging();
    let node = binary(Operator::Less, reference("value"), int(10));
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();

    scope.set("value", Value::Int(5));
    assert!(expr.eval_bool(&scope).unwrap());

    // Same compiled expression, same operator, new operand type.
    scope.set("value", Value::Float(11.0));
    assert!(!expr.eval_bool(&scope).unwrap());

    scope.set("value", Value::Int(5));
    assert!(expr.eval_bool(&scope).unwrap());
}

#[test]
fn test_dynamic_type_mismatch_reports_operator_error() {
    let node = binary(Operator::Plus, reference("a"), reference("b"));
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();
    scope.set("a", Value::Int(1));
    scope.set("b", Value::Float(2.0));
    let err = expr.eval(&scope).unwrap_err();
    assert_eq!(
        err.to_string(),
        "mismatched type to binary operator. got int + float. \
         see bool(), int(), float(), string(), duration()",
    );

    // The same pairing works again once the types line up.
    scope.set("b", Value::Int(2));
    assert_eq!(expr.eval(&scope).unwrap(), Value::Int(3));
}

#[test]
fn test_short_circuit_does_not_advance_stateful_functions() {
    // "cond" AND count() >= 2
    let node = binary(
        Operator::And,
        reference("cond"),
        binary(Operator::GreaterEqual, call("count", vec![]), int(2)),
    );
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();

    scope.set("cond", Value::Bool(true));
    assert!(!expr.eval_bool(&scope).unwrap()); // count = 1
    assert!(expr.eval_bool(&scope).unwrap()); // count = 2

    // A false left side short-circuits; count must not advance.
    scope.set("cond", Value::Bool(false));
    assert!(!expr.eval_bool(&scope).unwrap());

    scope.set("cond", Value::Bool(true));
    assert!(expr.eval_bool(&scope).unwrap()); // count = 3, not 4
}

#[test]
fn test_decided_logical_result_skips_erroring_right_operand() {
    // A false left side decides AND; the unbound reference on the right must
    // never be touched, not even to resolve its type.
    let node = binary(Operator::And, reference("cond"), reference("unbound"));
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();
    scope.set("cond", Value::Bool(false));
    assert!(!expr.eval_bool(&scope).unwrap());

    // Same for a true left side of OR.
    let node = binary(Operator::Or, reference("cond"), reference("unbound"));
    let mut expr = Expression::compile(&node).unwrap();
    scope.set("cond", Value::Bool(true));
    assert!(expr.eval_bool(&scope).unwrap());

    // An undecided left side still surfaces the right side's error.
    scope.set("cond", Value::Bool(false));
    let err = expr.eval_bool(&scope).unwrap_err();
    assert_eq!(
        err.to_string(),
        "name \"unbound\" is undefined. Names in scope: cond",
    );
}

#[test]
fn test_string_concat_with_reference() {
    let node = binary(Operator::Plus, string("host="), reference("host"));
    let mut expr = Expression::compile(&node).unwrap();
    let mut scope = Scope::new();
    scope.set("host", Value::String("serverA".into()));
    assert_eq!(expr.eval_string(&scope).unwrap(), "host=serverA");
}

// ============================================================================
// Re-specialization after a tripped type guard
// ============================================================================

/// Reports `int` from type queries but produces a float when evaluated, the
/// way a stateful function can produce a different type in the real state
/// than a throwaway state saw.
struct FlappingNode {
    value: f64,
}

impl FlappingNode {
    fn type_guard(requested: ValueType) -> EvalError {
        EvalError::TypeGuard {
            requested,
            actual: ValueType::Float,
        }
    }
}

impl NodeEvaluator for FlappingNode {
    fn eval_bool(&self, _: &Scope, _: &mut ExecutionState) -> Result<bool, EvalError> {
        Err(Self::type_guard(ValueType::Bool))
    }

    fn eval_int(&self, _: &Scope, _: &mut ExecutionState) -> Result<i64, EvalError> {
        Err(Self::type_guard(ValueType::Int))
    }

    fn eval_float(&self, _: &Scope, _: &mut ExecutionState) -> Result<f64, EvalError> {
        Ok(self.value)
    }

    fn eval_string(&self, _: &Scope, _: &mut ExecutionState) -> Result<EcoString, EvalError> {
        Err(Self::type_guard(ValueType::String))
    }

    fn eval_duration(&self, _: &Scope, _: &mut ExecutionState) -> Result<TimeDelta, EvalError> {
        Err(Self::type_guard(ValueType::Duration))
    }

    fn eval_time(&self, _: &Scope, _: &mut ExecutionState) -> Result<DateTime<Utc>, EvalError> {
        Err(Self::type_guard(ValueType::Time))
    }

    fn eval_regex(&self, _: &Scope, _: &mut ExecutionState) -> Result<Arc<Regex>, EvalError> {
        Err(Self::type_guard(ValueType::Regex))
    }

    fn node_type(&self, _: &Scope, _: &mut ExecutionState) -> Result<ValueType, EvalError> {
        Ok(ValueType::Int)
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}

#[test]
fn test_type_guard_retry_resolves_the_tagged_side() {
    // The operand resolves as int, so the operation runs as int < int; its
    // type guard trips naming float, the left type is corrected, and the
    // retried float < int comparison succeeds.
    let node = EvalBinaryNode::with_operands(
        Operator::Less,
        Box::new(FlappingNode { value: 2.5 }),
        Box::new(EvalIntNode::new(10)),
    );
    let mut state = ExecutionState::new();
    assert!(node.eval_bool(&Scope::new(), &mut state).unwrap());
}

#[test]
fn test_type_guard_retry_lookup_failure_reports_operator_error() {
    // After the left type is corrected to float the retry looks up
    // float + int, which has no operation; the descriptive error propagates
    // instead of the raw type guard.
    let node = EvalBinaryNode::with_operands(
        Operator::Plus,
        Box::new(FlappingNode { value: 2.5 }),
        Box::new(EvalIntNode::new(10)),
    );
    let mut state = ExecutionState::new();
    let err = node.eval_float(&Scope::new(), &mut state).unwrap_err();
    assert_eq!(
        err.to_string(),
        "mismatched type to binary operator. got float + int. \
         see bool(), int(), float(), string(), duration()",
    );
}

// ============================================================================
// Typed evaluation and type guards
// ============================================================================

#[test]
fn test_typed_eval_methods() {
    let mut scope = Scope::new();
    scope.set("t", Value::Time(chrono::DateTime::UNIX_EPOCH));

    assert!(Expression::compile(&boolean(true)).unwrap().eval_bool(&scope).unwrap());
    assert_eq!(Expression::compile(&int(42)).unwrap().eval_int(&scope).unwrap(), 42);
    assert_eq!(Expression::compile(&float(2.5)).unwrap().eval_float(&scope).unwrap(), 2.5);
    assert_eq!(
        Expression::compile(&string("x")).unwrap().eval_string(&scope).unwrap(),
        "x",
    );
    assert_eq!(
        Expression::compile(&duration("90m")).unwrap().eval_duration(&scope).unwrap(),
        parse_duration("90m").unwrap(),
    );
    assert_eq!(
        Expression::compile(&reference("t")).unwrap().eval_time(&scope).unwrap(),
        chrono::DateTime::UNIX_EPOCH,
    );
    assert_eq!(
        Expression::compile(&regex("^cpu")).unwrap().eval_regex(&scope).unwrap().as_str(),
        "^cpu",
    );
}

#[test]
fn test_type_guard_failure_names_both_types() {
    let err = Expression::compile(&boolean(true))
        .unwrap()
        .eval_int(&Scope::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeGuard: expression returned unexpected type boolean, expected int",
    );
}

#[test]
fn test_generic_eval_rejects_missing_root() {
    let mut scope = Scope::new();
    scope.set("value", Value::Missing);
    let err = Expression::compile(&reference("value"))
        .unwrap()
        .eval(&scope)
        .unwrap_err();
    assert_eq!(err.to_string(), "expression returned unexpected type missing");
}

#[test]
fn test_undefined_reference_lists_bound_names() {
    let mut scope = Scope::new();
    scope.set("alpha", Value::Int(1));
    scope.set("beta", Value::Int(2));
    let err = Expression::compile(&reference("gamma"))
        .unwrap()
        .eval(&scope)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "name \"gamma\" is undefined. Names in scope: alpha,beta",
    );
}

// ============================================================================
// Construction-time validation
// ============================================================================

#[test]
fn test_construction_errors() {
    let cases: Vec<(Node, &str)> = vec![
        (
            binary(Operator::Plus, int(1), float(2.0)),
            "mismatched type to binary operator. got int + float. \
             see bool(), int(), float(), string(), duration()",
        ),
        (
            binary(Operator::Minus, string("a"), string("b")),
            "invalid math operator - for type string",
        ),
        (
            binary(Operator::Less, boolean(true), boolean(false)),
            "invalid comparison operator < for type boolean",
        ),
        (
            binary(Operator::Not, boolean(true), boolean(false)),
            "unknown binary operator !",
        ),
        (
            unary(Operator::Plus, int(1)),
            "invalid unary operator +",
        ),
        (
            unary(Operator::Minus, string("a")),
            "invalid unary operator - for type string",
        ),
        (
            unary(Operator::Not, int(1)),
            "invalid unary operator ! for type int",
        ),
        (
            Node::List(vec![int(1)]),
            "node type is not a valid evaluation node: list",
        ),
        (
            Node::Star,
            "node type is not a valid evaluation node: star",
        ),
    ];
    for (node, expected) in cases {
        let Err(err) = Expression::compile(&node) else {
            panic!("compilation succeeded: {node:?}");
        };
        assert_eq!(err.to_string(), expected, "node: {node:?}");
    }
}

#[test]
fn test_undefined_function() {
    let node = call("noSuchFunction", vec![int(1)]);
    let err = Expression::compile(&node)
        .unwrap()
        .eval(&Scope::new())
        .unwrap_err();
    assert_eq!(err.to_string(), "undefined function: \"noSuchFunction\"");
}

#[test]
fn test_function_errors_name_the_function() {
    let node = call("sigma", vec![]);
    let err = Expression::compile(&node)
        .unwrap()
        .eval(&Scope::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "error calling \"sigma\": sigma expects 1 arguments, got 0",
    );
}

// ============================================================================
// Stateful evaluation: reset, copy_reset, lambda isolation
// ============================================================================

#[test]
fn test_reset_replays_the_stream() {
    let node = call("count", vec![]);
    let mut expr = Expression::compile(&node).unwrap();
    let scope = Scope::new();
    assert_eq!(expr.eval_int(&scope).unwrap(), 1);
    assert_eq!(expr.eval_int(&scope).unwrap(), 2);
    assert_eq!(expr.eval_int(&scope).unwrap(), 3);
    expr.reset();
    assert_eq!(expr.eval_int(&scope).unwrap(), 1);
}

#[test]
fn test_copy_reset_isolates_state() {
    let node = call("count", vec![]);
    let mut expr = Expression::compile(&node).unwrap();
    let scope = Scope::new();
    assert_eq!(expr.eval_int(&scope).unwrap(), 1);
    assert_eq!(expr.eval_int(&scope).unwrap(), 2);

    let mut copy = expr.copy_reset();
    assert_eq!(copy.eval_int(&scope).unwrap(), 1);
    // The original keeps its own counter.
    assert_eq!(expr.eval_int(&scope).unwrap(), 3);
    assert_eq!(copy.eval_int(&scope).unwrap(), 2);
}

#[test]
fn test_lambdas_do_not_share_function_state() {
    // lambda(count() >= 1) AND lambda(count() >= 2): if both lambdas shared
    // one counter the right side would see 2 on the first evaluation.
    let node = binary(
        Operator::And,
        lambda(binary(Operator::GreaterEqual, call("count", vec![]), int(1))),
        lambda(binary(Operator::GreaterEqual, call("count", vec![]), int(2))),
    );
    let mut expr = Expression::compile(&node).unwrap();
    let scope = Scope::new();
    assert!(!expr.eval_bool(&scope).unwrap());
    assert!(expr.eval_bool(&scope).unwrap());
    assert!(expr.eval_bool(&scope).unwrap());

    // reset clears nested lambda states too.
    expr.reset();
    assert!(!expr.eval_bool(&scope).unwrap());
}

#[test]
fn test_copy_reset_isolates_lambda_state() {
    let node = lambda(call("count", vec![]));
    let mut expr = Expression::compile(&node).unwrap();
    let scope = Scope::new();
    assert_eq!(expr.eval_int(&scope).unwrap(), 1);
    assert_eq!(expr.eval_int(&scope).unwrap(), 2);
    let mut copy = expr.copy_reset();
    assert_eq!(copy.eval_int(&scope).unwrap(), 1);
    assert_eq!(expr.eval_int(&scope).unwrap(), 3);
}

// ============================================================================
// Reference-variable discovery
// ============================================================================

#[test]
fn test_find_reference_variables() {
    let node = binary(
        Operator::And,
        binary(Operator::Greater, reference("usage"), reference("limit")),
        call("isPresent", vec![reference("usage")]),
    );
    assert_eq!(
        find_reference_variables(&node),
        vec!["limit".to_string(), "usage".to_string()],
    );
    assert!(find_reference_variables(&int(1)).is_empty());
}

// ============================================================================
// Thread-safety contracts
// ============================================================================

#[test]
fn test_expression_moves_across_threads() {
    let node = binary(Operator::Less, reference("value"), float(10.0));
    let expr = Expression::compile(&node).unwrap();
    let mut worker = expr.copy_reset();
    let handle = std::thread::spawn(move || {
        let mut scope = Scope::new();
        scope.set("value", Value::Float(5.0));
        worker.eval_bool(&scope).unwrap()
    });
    assert!(handle.join().unwrap());
}
