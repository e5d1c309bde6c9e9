//! Symbol table structures for scope and layout resolution
//!
//! Provides resolved declaration records, lexical scope frames, per-class
//! virtual tables, and the global class registry.

use rustc_hash::FxHashMap;

use crate::types::{ClassHierarchy, ClassType, Type};

/// Resolved declaration record
///
/// Produced once per declaration and referenced by every use-site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Lexical nesting level of the declaring scope (0 = global)
    pub nesting_level: u32,
    /// Declared type
    pub ty: Type,
    /// Offset from the frame pointer (locals and params), from the object
    /// pointer (fields), or into the dispatch table (methods)
    pub offset: i32,
}

impl SymbolEntry {
    /// Create a new entry
    pub fn new(nesting_level: u32, ty: Type, offset: i32) -> Self {
        SymbolEntry {
            nesting_level,
            ty,
            offset,
        }
    }
}

/// Mapping from name to entry for one lexically active scope
pub type ScopeFrame = FxHashMap<String, SymbolEntry>;

/// Mapping from member name to entry for one class, inherited members included
pub type VirtualTable = FxHashMap<String, SymbolEntry>;

/// Stack of scope frames; the frame at index `n` belongs to nesting level `n`
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    /// Create an empty stack (no scope is active)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a new scope
    pub fn push(&mut self, frame: ScopeFrame) {
        self.frames.push(frame);
    }

    /// Leave the innermost scope
    pub fn pop(&mut self) -> Option<ScopeFrame> {
        self.frames.pop()
    }

    /// Nesting level of the innermost scope (0 when at most the global scope is active)
    pub fn nesting_level(&self) -> u32 {
        self.frames.len().saturating_sub(1) as u32
    }

    /// Look a name up from the innermost scope outward
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Look a name up in the global scope only
    pub fn lookup_global(&self, name: &str) -> Option<&SymbolEntry> {
        self.frames.first().and_then(|frame| frame.get(name))
    }

    /// Declare a name in the innermost scope
    ///
    /// Returns `false` (keeping the existing entry) when the name is already
    /// declared in that scope, or when no scope is active.
    pub fn declare(&mut self, name: &str, entry: SymbolEntry) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_string(), entry);
        true
    }
}

/// Global registry of declared classes
///
/// Write-once per class: registration of an already-known name is refused.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    virtual_tables: FxHashMap<String, VirtualTable>,
    class_types: FxHashMap<String, ClassType>,
    superclasses: FxHashMap<String, String>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class; returns `false` if the name was already registered
    pub fn register(&mut self, name: &str, table: VirtualTable, ty: ClassType) -> bool {
        if self.virtual_tables.contains_key(name) {
            return false;
        }
        self.virtual_tables.insert(name.to_string(), table);
        self.class_types.insert(name.to_string(), ty);
        true
    }

    /// Record the declared superclass of a registered class
    pub fn set_superclass(&mut self, class: &str, superclass: &str) {
        self.superclasses
            .entry(class.to_string())
            .or_insert_with(|| superclass.to_string());
    }

    /// Whether a class with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.virtual_tables.contains_key(name)
    }

    /// Virtual table of a class
    pub fn virtual_table(&self, name: &str) -> Option<&VirtualTable> {
        self.virtual_tables.get(name)
    }

    /// Full (inherited + own) shape of a class
    pub fn class_type(&self, name: &str) -> Option<&ClassType> {
        self.class_types.get(name)
    }

    /// Look up a member of a class, inherited members included
    pub fn member(&self, class: &str, member: &str) -> Option<&SymbolEntry> {
        self.virtual_tables.get(class)?.get(member)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.virtual_tables.len()
    }

    /// Whether no class is registered
    pub fn is_empty(&self) -> bool {
        self.virtual_tables.is_empty()
    }
}

impl ClassHierarchy for ClassRegistry {
    fn superclass(&self, class: &str) -> Option<&str> {
        self.superclasses.get(class).map(String::as_str)
    }
}
