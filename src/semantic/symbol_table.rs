//! Scope-structured symbol table.
//!
//! Scopes form an explicit tree: every scope owns a parent handle and its own
//! name→entry map, and lookup walks parent links. Path strings like
//! `programa.funcao` exist only as rendered output for diagnostics.

use std::collections::HashMap;

use super::types::Type;

/// Handle of a scope inside the table's arena.
pub type ScopeId = usize;

/// What a name stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Constant,
    TypeAlias,
    Variable,
    Parameter,
    Function,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Classification::Constant => "constant",
            Classification::TypeAlias => "type",
            Classification::Variable => "variable",
            Classification::Parameter => "parameter",
            Classification::Function => "function",
        };
        f.write_str(text)
    }
}

/// One declared parameter of a function, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Option<Type>,
}

/// A declared symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub classification: Classification,
    pub ty: Option<Type>,
    pub scope: ScopeId,
    pub order: usize,
    /// Ordered parameter list; populated for functions only.
    pub params: Vec<ParamInfo>,
}

#[derive(Debug)]
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    entries: HashMap<String, Entry>,
}

const GLOBAL: ScopeId = 0;

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                name: "global".to_string(),
                parent: None,
                entries: HashMap::new(),
            }],
            stack: vec![GLOBAL],
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        *self.stack.last().unwrap_or(&GLOBAL)
    }

    pub fn parent_of(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes.get(scope).and_then(|s| s.parent)
    }

    /// Push a child of the current scope. Entering and leaving are strictly
    /// nested, following the AST recursion.
    pub fn enter_scope(&mut self, name: &str) -> ScopeId {
        let parent = self.current_scope();
        let id = self.scopes.len();
        self.scopes.push(Scope {
            name: name.to_string(),
            parent: Some(parent),
            entries: HashMap::new(),
        });
        self.stack.push(id);
        id
    }

    pub fn leave_scope(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Dotted path of a scope for diagnostics: `global`, `prog`, `prog.f`.
    /// The root is excluded from its children's paths.
    pub fn scope_path(&self, scope: ScopeId) -> String {
        if scope == GLOBAL {
            return "global".to_string();
        }
        let mut parts = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == GLOBAL {
                break;
            }
            if let Some(s) = self.scopes.get(id) {
                parts.push(s.name.clone());
                current = s.parent;
            } else {
                break;
            }
        }
        parts.reverse();
        parts.join(".")
    }

    /// Whether `name` is declared directly in the current scope.
    pub fn declared_here(&self, name: &str) -> bool {
        self.scopes[self.current_scope()].entries.contains_key(name)
    }

    /// Insert into the current scope; declaration order is the insertion
    /// position. Refuses a duplicate, keeping the original entry.
    pub fn insert(
        &mut self,
        name: &str,
        classification: Classification,
        ty: Option<Type>,
    ) -> bool {
        let scope = self.current_scope();
        let entries = &mut self.scopes[scope].entries;
        if entries.contains_key(name) {
            return false;
        }
        let order = entries.len() + 1;
        entries.insert(
            name.to_string(),
            Entry {
                name: name.to_string(),
                classification,
                ty,
                scope,
                order,
                params: Vec::new(),
            },
        );
        true
    }

    /// Lookup from the current scope, walking parent links up to the root.
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.lookup_from(self.current_scope(), name)
    }

    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<&Entry> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if let Some(entry) = s.entries.get(name) {
                return Some(entry);
            }
            current = s.parent;
        }
        None
    }

    pub fn entry_mut_from(&mut self, scope: ScopeId, name: &str) -> Option<&mut Entry> {
        let mut current = Some(scope);
        let mut found = None;
        while let Some(id) = current {
            if self.scopes[id].entries.contains_key(name) {
                found = Some(id);
                break;
            }
            current = self.scopes[id].parent;
        }
        found.and_then(move |id| self.scopes[id].entries.get_mut(name))
    }

    /// Entries of one scope in declaration order.
    pub fn entries_in(&self, scope: ScopeId) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.scopes[scope].entries.values().collect();
        entries.sort_by_key(|entry| entry.order);
        entries
    }

    /// Scope handles in creation order, the root first.
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        0..self.scopes.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
