//! Per-point variable bindings and scope recycling.

use std::sync::Mutex;

use hashbrown::HashMap;

use crate::eval::error::EvalError;
use crate::values::Value;

/// A set of name → value bindings for one evaluation.
///
/// A name can be *declared but unset*: the pool pre-declares every reference
/// variable of an expression so recycled scopes keep their capacity, and
/// `reset` unsets values without forgetting names. Reading an unset or
/// undeclared name is an error that lists the names currently bound.
#[derive(Debug, Default)]
pub struct Scope {
    variables: HashMap<String, Option<Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            variables: HashMap::new(),
        }
    }

    /// Bind a value to a name, declaring the name if needed.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), Some(value));
    }

    /// Look up a bound value.
    pub fn get(&self, name: &str) -> Result<&Value, EvalError> {
        match self.variables.get(name) {
            Some(Some(value)) => Ok(value),
            _ => Err(EvalError::UndefinedReference {
                name: name.to_string(),
                names_in_scope: self.bound_names(),
            }),
        }
    }

    /// Whether the name is currently bound to a value.
    pub fn has(&self, name: &str) -> bool {
        matches!(self.variables.get(name), Some(Some(_)))
    }

    /// Unset every binding, keeping the declared names.
    pub fn reset(&mut self) {
        for value in self.variables.values_mut() {
            *value = None;
        }
    }

    pub(crate) fn declare(&mut self, name: &str) {
        self.variables.entry(name.to_string()).or_insert(None);
    }

    fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .variables
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Recycles [`Scope`]s for one expression's reference variables.
///
/// `get` yields a scope with every tracked name declared but unset; `put`
/// resets it and returns it to the free list. The free list is shared across
/// workers; each yielded scope belongs to a single worker at a time.
pub struct ScopePool {
    reference_variables: Vec<String>,
    free: Mutex<Vec<Scope>>,
}

impl ScopePool {
    /// A pool tracking the given reference variables, typically the result
    /// of [`find_reference_variables`](crate::expr::find_reference_variables).
    pub fn new(reference_variables: Vec<String>) -> Self {
        ScopePool {
            reference_variables,
            free: Mutex::new(Vec::new()),
        }
    }

    /// The variable names scopes from this pool declare.
    pub fn reference_variables(&self) -> &[String] {
        &self.reference_variables
    }

    /// Take a scope from the free list, or build a fresh one.
    pub fn get(&self) -> Scope {
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        match recycled {
            Some(scope) => scope,
            None => {
                let mut scope = Scope::new();
                for name in &self.reference_variables {
                    scope.declare(name);
                }
                scope
            }
        }
    }

    /// Reset a scope and return it to the free list.
    pub fn put(&self, mut scope: Scope) {
        scope.reset();
        self.free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(scope);
    }
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod scope_test;
