//! Lexical scope tracking for the usage passes.
//!
//! A scope path is an ordered list of `class:<name>` / `method:<name>` frames
//! identifying a position in the tree. It is deliberately weaker than true
//! lexical scoping: it knows nesting, not shadowing.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeFrame {
    Class(String),
    Method(String),
}

impl fmt::Display for ScopeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeFrame::Class(name) => write!(f, "class:{name}"),
            ScopeFrame::Method(name) => write!(f, "method:{name}"),
        }
    }
}

/// An ordered scope path, outermost frame first.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopePath(pub Vec<ScopeFrame>);

impl ScopePath {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops the innermost frame; returns false when already empty.
    pub fn pop_tail(&mut self) -> bool {
        self.0.pop().is_some()
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for frame in &self.0 {
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{frame}")?;
            first = false;
        }
        Ok(())
    }
}

/// Stack of scope frames maintained during a walk.
///
/// Well-formedness: every push is matched by a pop, so the stack is empty at
/// the end of a walk.
#[derive(Clone, Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_class(&mut self, name: &str) {
        self.frames.push(ScopeFrame::Class(name.to_string()));
    }

    pub fn push_method(&mut self, name: &str) {
        self.frames.push(ScopeFrame::Method(name.to_string()));
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        self.frames.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Current path, outermost frame first.
    pub fn path(&self) -> ScopePath {
        ScopePath(self.frames.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let mut stack = ScopeStack::new();
        stack.push_class("Foo");
        stack.push_method("bar");
        assert_eq!(
            stack.path(),
            ScopePath(vec![
                ScopeFrame::Class("Foo".to_string()),
                ScopeFrame::Method("bar".to_string()),
            ])
        );
        assert_eq!(stack.pop(), Some(ScopeFrame::Method("bar".to_string())));
        assert_eq!(stack.pop(), Some(ScopeFrame::Class("Foo".to_string())));
        assert!(stack.is_empty());
    }

    #[test]
    fn path_display() {
        let mut stack = ScopeStack::new();
        stack.push_class("Foo");
        stack.push_method("bar");
        assert_eq!(stack.path().to_string(), "class:Foo/method:bar");
    }
}
