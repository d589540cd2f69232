//! Per-identifier usage table built by the discovery pass.
//!
//! Keys are `(identifier name, scope path of the declaration)`. Both recording
//! and lookup fall back outward: when no entry exists for the exact scope
//! path, frames are trimmed from the tail one at a time until an entry is
//! found or the path is exhausted. This emulates enclosing-scope resolution
//! without shadowing semantics — identically-named identifiers in unrelated
//! sibling scopes can alias to an enclosing record, an inherited limitation.

use std::collections::{BTreeMap, BTreeSet};

use crate::scope::ScopePath;

/// Members of the source type observed as accessed through one identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentifierUsage {
    fields: BTreeSet<String>,
    methods: BTreeSet<String>,
}

impl IdentifierUsage {
    pub fn add_field(&mut self, name: &str) {
        self.fields.insert(name.to_string());
    }

    pub fn add_method(&mut self, name: &str) {
        self.methods.insert(name.to_string());
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    /// True when any used member appears in the given moved-member sets.
    pub fn intersects(&self, moved_fields: &BTreeSet<String>, moved_methods: &BTreeSet<String>) -> bool {
        self.fields.intersection(moved_fields).next().is_some()
            || self.methods.intersection(moved_methods).next().is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct UsageTable {
    entries: BTreeMap<(String, ScopePath), IdentifierUsage>,
}

impl UsageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty usage record for a declaration. A redeclaration in
    /// the same scope replaces the record, as the last declaration is the one
    /// later accesses resolve to under this model.
    pub fn declare(&mut self, name: &str, scope: &ScopePath) {
        self.entries
            .insert((name.to_string(), scope.clone()), IdentifierUsage::default());
    }

    pub fn record_field(&mut self, name: &str, scope: &ScopePath, field: &str) {
        if let Some(usage) = self.resolve_mut(name, scope) {
            usage.add_field(field);
        }
    }

    pub fn record_method(&mut self, name: &str, scope: &ScopePath, method: &str) {
        if let Some(usage) = self.resolve_mut(name, scope) {
            usage.add_method(method);
        }
    }

    /// Outward-fallback lookup: exact scope first, then the path trimmed one
    /// frame at a time from the tail.
    pub fn lookup(&self, name: &str, scope: &ScopePath) -> Option<&IdentifierUsage> {
        let mut path = scope.clone();
        loop {
            if let Some(usage) = self.entries.get(&(name.to_string(), path.clone())) {
                return Some(usage);
            }
            if !path.pop_tail() {
                return None;
            }
        }
    }

    fn resolve_mut(&mut self, name: &str, scope: &ScopePath) -> Option<&mut IdentifierUsage> {
        let mut path = scope.clone();
        loop {
            let key = (name.to_string(), path.clone());
            if self.entries.contains_key(&key) {
                return self.entries.get_mut(&key);
            }
            if !path.pop_tail() {
                return None;
            }
        }
    }

    /// True when any recorded usage anywhere in the table touches the moved
    /// member sets. Drives the usage-gated signature retyping policy.
    pub fn any_intersects(
        &self,
        moved_fields: &BTreeSet<String>,
        moved_methods: &BTreeSet<String>,
    ) -> bool {
        self.entries
            .values()
            .any(|usage| usage.intersects(moved_fields, moved_methods))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{ScopeFrame, ScopePath};

    fn path(frames: &[&str]) -> ScopePath {
        ScopePath(
            frames
                .iter()
                .map(|f| {
                    let (kind, name) = f.split_once(':').unwrap();
                    match kind {
                        "class" => ScopeFrame::Class(name.to_string()),
                        "method" => ScopeFrame::Method(name.to_string()),
                        other => panic!("bad frame kind {other}"),
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn exact_scope_recording() {
        let mut table = UsageTable::new();
        let scope = path(&["class:A", "method:m"]);
        table.declare("obj", &scope);
        table.record_method("obj", &scope, "method1");
        table.record_field("obj", &scope, "field1");

        let usage = table.lookup("obj", &scope).unwrap();
        assert!(usage.methods().contains("method1"));
        assert!(usage.fields().contains("field1"));
    }

    #[test]
    fn access_in_nested_scope_falls_back_outward() {
        let mut table = UsageTable::new();
        let decl_scope = path(&["class:A"]);
        let inner_scope = path(&["class:A", "method:m"]);
        table.declare("obj", &decl_scope);
        // Accessed inside a method, declared on the class.
        table.record_method("obj", &inner_scope, "method1");

        let usage = table.lookup("obj", &inner_scope).unwrap();
        assert!(usage.methods().contains("method1"));
        // The record landed on the declaring scope's entry.
        assert_eq!(table.lookup("obj", &decl_scope).unwrap(), usage);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_identifier_is_dropped() {
        let mut table = UsageTable::new();
        let scope = path(&["class:A", "method:m"]);
        table.record_method("ghost", &scope, "method1");
        assert!(table.is_empty());
        assert!(table.lookup("ghost", &scope).is_none());
    }

    #[test]
    fn intersection_with_moved_sets() {
        let mut table = UsageTable::new();
        let scope = path(&["class:A"]);
        table.declare("obj", &scope);
        table.record_method("obj", &scope, "unrelated");

        let moved_fields = BTreeSet::new();
        let mut moved_methods = BTreeSet::new();
        moved_methods.insert("method1".to_string());
        assert!(!table.any_intersects(&moved_fields, &moved_methods));

        table.record_method("obj", &scope, "method1");
        assert!(table.any_intersects(&moved_fields, &moved_methods));
    }
}
