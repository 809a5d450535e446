//! Per-expression mutable evaluation state.

use hashbrown::HashMap;

use crate::functions::{Funcs, new_functions};

/// The mutable side of a compiled expression.
///
/// The evaluator tree itself is immutable and shared; everything that
/// accumulates across evaluations lives here: the expression's private
/// function instances (so `count()` in one expression never sees another
/// expression's stream) and one nested state per lambda node, keyed by the
/// slot id assigned at compile time.
pub struct ExecutionState {
    pub funcs: Funcs,
    lambda_states: HashMap<usize, ExecutionState>,
}

impl ExecutionState {
    pub fn new() -> Self {
        ExecutionState {
            funcs: new_functions(),
            lambda_states: HashMap::new(),
        }
    }

    /// Reset all stateful functions and drop nested lambda states.
    pub fn reset(&mut self) {
        for func in self.funcs.values_mut() {
            func.reset();
        }
        self.lambda_states.clear();
    }

    /// Detach the nested state for a lambda slot, creating it on first use.
    /// The caller must hand it back with [`restore_lambda_state`] after the
    /// lambda body runs.
    ///
    /// [`restore_lambda_state`]: ExecutionState::restore_lambda_state
    pub(crate) fn take_lambda_state(&mut self, slot: usize) -> ExecutionState {
        self.lambda_states
            .remove(&slot)
            .unwrap_or_else(ExecutionState::new)
    }

    pub(crate) fn restore_lambda_state(&mut self, slot: usize, state: ExecutionState) {
        self.lambda_states.insert(slot, state);
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        ExecutionState::new()
    }
}
