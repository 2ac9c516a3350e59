//! Per-compilation variable table.
//!
//! One table is owned by each compiler invocation and frozen into the
//! compiled [`Program`](crate::script::command::Program); nothing is
//! shared between compilation passes. Keys are whatever text stood to the
//! left of `=` after trimming; last assignment wins.

use std::collections::HashMap;

use crate::script::value::Value;

/// Identifier → value store built during compilation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VarTable {
    vars: HashMap<String, Value>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Get the value of a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Returns `true` if the variable is set.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// All non-empty variable names (the set the print renderer
    /// substitutes bare occurrences of).
    pub fn names(&self) -> Vec<&str> {
        self.vars
            .keys()
            .filter(|k| !k.is_empty())
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Render the table as a JSON-like object with sorted keys, for the
    /// debug view.
    pub fn dump(&self) -> String {
        let mut entries: Vec<(&String, &Value)> = self.vars.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        let body: Vec<String> = entries
            .iter()
            .map(|(k, v)| format!("{k:?}: {}", v.quoted()))
            .collect();
        format!("{{{}}}", body.join(", "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
