//! Lexically nested name -> value bindings; the only runtime-mutable shared
//! state in the interpreter. Only the top scope is ever written to; lookup
//! walks from the top down and returns the first match.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, Value>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        let mut stack = Self { scopes: Vec::new() };
        stack.scopes.push(HashMap::new());
        stack
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Restore the stack to `depth`, dropping every scope above it. Called on
    /// both normal block exit and early exit via break/continue/return, which
    /// is what keeps the scope-depth invariant intact across unwinding.
    pub fn truncate_to(&mut self, depth: usize) {
        self.scopes.truncate(depth);
    }

    /// Insert into the top scope. Returns `false` if `name` is already bound
    /// in that scope (the caller should raise `SymbolRedefinition`).
    pub fn define(&mut self, name: &str, value: Value) -> bool {
        let top = self.scopes.last_mut().expect("scope stack is never empty");
        if top.contains_key(name) {
            return false;
        }
        top.insert(name.to_string(), value);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}
