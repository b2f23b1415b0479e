//! Scoped local-variable environment shared by the auditors and the calculator.
//!
//! Every binder (quantifier, comprehension, recursion, function definition)
//! pushes a scope, declares its locals, and pops the scope when done. Each
//! local remembers where it was declared and whether it has been read, so
//! that closing a scope can report unused locals.
//!
//! # Examples
//!
//! ```rust
//! use rslang::scope::{Declared, LocalContext};
//! use rslang::span::Span;
//!
//! let mut locals = LocalContext::<i64>::new();
//! locals.push_scope();
//! assert_eq!(locals.declare("a", 1, Span::new(0, 1)), Declared::Fresh);
//!
//! locals.push_scope();
//! // `a` is still live in the enclosing scope
//! assert_eq!(locals.declare("a", 2, Span::new(5, 6)), Declared::Shadowing);
//! locals.pop_scope();
//!
//! assert_eq!(locals.get("a"), Some(&1));
//! assert!(locals.pop_scope().is_empty());
//!
//! // `a` was read, its scope is closed now
//! locals.push_scope();
//! assert_eq!(locals.declare("a", 3, Span::new(9, 10)), Declared::Reused);
//! ```

use std::collections::HashSet;

use crate::span::Span;

#[derive(Debug, Clone)]
pub struct LocalVar<T> {
    pub name: String,
    pub data: T,
    pub position: Span,
    pub used: bool,
}

/// Outcome of declaring a local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    Fresh,
    /// The name belonged to a scope that has already closed.
    Reused,
    /// The name is live in an enclosing scope.
    Shadowing,
    /// The name is already declared in the current scope.
    DoubleDeclare,
}

#[derive(Debug, Clone)]
pub struct LocalContext<T> {
    scopes: Vec<Vec<LocalVar<T>>>,
    closed: HashSet<String>,
}

impl<T> LocalContext<T> {
    pub fn new() -> Self {
        Self { scopes: Vec::new(), closed: HashSet::new() }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Close the innermost scope, returning the locals that were never read.
    pub fn pop_scope(&mut self) -> Vec<LocalVar<T>> {
        let Some(scope) = self.scopes.pop() else {
            return Vec::new();
        };
        let mut unused = Vec::new();
        for var in scope {
            self.closed.insert(var.name.clone());
            if !var.used {
                unused.push(var);
            }
        }
        unused
    }

    /// Declare `name` in the innermost scope.
    ///
    /// A shadowing or double declaration is reported but the binding still
    /// takes effect so that analysis can continue.
    pub fn declare(&mut self, name: &str, data: T, position: Span) -> Declared {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        let depth = self.scopes.len() - 1;
        let outcome = if self.scopes[depth].iter().any(|v| v.name == name) {
            Declared::DoubleDeclare
        } else if self.scopes[..depth].iter().flatten().any(|v| v.name == name) {
            Declared::Shadowing
        } else if self.closed.contains(name) {
            Declared::Reused
        } else {
            Declared::Fresh
        };
        self.scopes[depth].push(LocalVar { name: name.to_string(), data, position, used: false });
        outcome
    }

    /// Read a local, marking it used.
    pub fn get(&mut self, name: &str) -> Option<&T> {
        let var = self.find_mut(name)?;
        var.used = true;
        Some(&var.data)
    }

    /// Read a local without touching its used flag.
    pub fn peek(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().flat_map(|s| s.iter().rev()).find(|v| v.name == name).map(|v| &v.data)
    }

    /// Rebind an existing local in place.
    pub fn assign(&mut self, name: &str, data: T) -> bool {
        match self.find_mut(name) {
            Some(var) => {
                var.data = data;
                true
            }
            None => false,
        }
    }

    /// True if `name` was declared in a scope that has since closed.
    pub fn is_closed(&self, name: &str) -> bool {
        self.closed.contains(name)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Drop every scope and forget closed names.
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.closed.clear();
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut LocalVar<T>> {
        self.scopes.iter_mut().rev().flat_map(|s| s.iter_mut().rev()).find(|v| v.name == name)
    }
}

impl<T> Default for LocalContext<T> {
    fn default() -> Self {
        Self::new()
    }
}
