//! Compilation context threaded through every front-end phase
//!
//! Holds the class registry, the side tables that decorate the immutable AST,
//! and the accumulated scope and type errors.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::error::{ScopeError, TypeError};
use super::symbols::{ClassRegistry, SymbolEntry};
use crate::ast::NodeId;
use crate::types::{SubtypingContext, Type};

/// A use-site resolved to its declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Entry of the referenced declaration
    pub entry: SymbolEntry,
    /// Nesting level of the use-site
    pub use_level: u32,
}

impl Resolution {
    /// Number of access-link hops from the use-site frame to the declaring frame
    pub fn hops(&self) -> u32 {
        self.use_level.saturating_sub(self.entry.nesting_level)
    }
}

/// Per-compilation state shared by resolver, type checker, and code generator
#[derive(Debug, Default)]
pub struct CompilationContext {
    /// Declared classes, their virtual tables, and the superclass map
    pub classes: ClassRegistry,
    resolutions: FxHashMap<NodeId, Resolution>,
    members: FxHashMap<NodeId, SymbolEntry>,
    layouts: FxHashMap<NodeId, SymbolEntry>,
    expr_types: FxHashMap<NodeId, Type>,
    scope_errors: Vec<ScopeError>,
    type_errors: Vec<TypeError>,
}

impl CompilationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Subtyping relation over this compilation's classes
    pub fn subtyping(&self) -> SubtypingContext<'_, ClassRegistry> {
        SubtypingContext::new(&self.classes)
    }

    // ===== Side tables =====

    /// Declaration targeted by an identifier, call, `new`, or the receiver of
    /// a member access
    pub fn resolution(&self, node: NodeId) -> Option<&Resolution> {
        self.resolutions.get(&node)
    }

    /// Class member targeted by a field access or method call
    pub fn member(&self, node: NodeId) -> Option<&SymbolEntry> {
        self.members.get(&node)
    }

    /// Layout assigned to a declaration node
    pub fn layout(&self, node: NodeId) -> Option<&SymbolEntry> {
        self.layouts.get(&node)
    }

    /// Type computed for an expression node
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.expr_types.get(&node)
    }

    pub(crate) fn record_resolution(&mut self, node: NodeId, resolution: Resolution) {
        self.resolutions.insert(node, resolution);
    }

    pub(crate) fn record_member(&mut self, node: NodeId, entry: SymbolEntry) {
        self.members.insert(node, entry);
    }

    pub(crate) fn record_layout(&mut self, node: NodeId, entry: SymbolEntry) {
        self.layouts.insert(node, entry);
    }

    /// Fill the type slot of an expression; the first value written wins
    pub(crate) fn record_type(&mut self, node: NodeId, ty: Type) {
        self.expr_types.entry(node).or_insert(ty);
    }

    // ===== Errors =====

    pub(crate) fn report_scope_error(&mut self, error: ScopeError) {
        debug!(%error, "scope error");
        self.scope_errors.push(error);
    }

    pub(crate) fn report_type_error(&mut self, error: TypeError) {
        debug!(%error, "type error");
        self.type_errors.push(error);
    }

    /// Scope errors in the order they were found
    pub fn scope_errors(&self) -> &[ScopeError] {
        &self.scope_errors
    }

    /// Type errors in the order they were found
    pub fn type_errors(&self) -> &[TypeError] {
        &self.type_errors
    }

    /// Error counts of this compilation, with no external front-end errors
    pub fn error_counts(&self) -> ErrorCounts {
        ErrorCounts {
            scope: self.scope_errors.len(),
            types: self.type_errors.len(),
            ..ErrorCounts::default()
        }
    }
}

/// Error counts of every front-end phase
///
/// Lexical and syntax counts come from the external parser; scope and type
/// counts from this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    /// Lexical errors reported by the external lexer
    pub lexical: usize,
    /// Syntax errors reported by the external parser
    pub syntax: usize,
    /// Scope resolution errors
    pub scope: usize,
    /// Type errors
    pub types: usize,
}

impl ErrorCounts {
    /// Combined error count; code generation requires zero
    pub fn total(&self) -> usize {
        self.lexical + self.syntax + self.scope + self.types
    }

    /// Whether no phase reported an error
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for ErrorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} front-end errors ({} lexical, {} syntax, {} scope, {} type)",
            self.total(),
            self.lexical,
            self.syntax,
            self.scope,
            self.types
        )
    }
}
