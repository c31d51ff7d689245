//! Lexical scopes and the scope manager
//!
//! This module provides:
//! - [`Scope`]: One lexical environment (global, function, or block)
//! - [`Binding`]: A variable with its declaration kind and initialization state
//! - [`ScopeManager`]: The current position in the scope chain plus the
//!   declaration, lookup and assignment rules
//!
//! # Scope Chain
//!
//! Scopes link to their parent through `Rc`, so a closure keeps every
//! ancestor of its defining scope alive after the defining call returns.
//! A closure's call scope is parented to the closure's *captured* scope,
//! never to the caller's scope.
//!
//! # Temporal Dead Zone
//!
//! `let` and `const` bindings are created uninitialized when their block is
//! entered and become readable only once their declaration executes. `var`
//! bindings are hoisted to the nearest function (or global) scope and start
//! out as `undefined`.

use super::value::{Closure, Value};
use crate::parser::ast::{DeclKind, FunctionNode};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// A single variable
#[derive(Debug, Clone)]
pub struct Binding {
    pub kind: DeclKind,
    pub value: Value,
    pub initialized: bool,
}

/// One lexical environment
pub struct Scope {
    pub id: usize,
    pub kind: ScopeKind,
    pub parent: Option<ScopeRef>,
    pub bindings: FxHashMap<String, Binding>,
    /// `this` for function scopes entered through a non-arrow call
    pub this_binding: Option<Value>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.bindings.keys().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("bindings", &names)
            .finish()
    }
}

impl Scope {
    fn new(id: usize, kind: ScopeKind, parent: Option<ScopeRef>, this_binding: Option<Value>) -> Self {
        Scope {
            id,
            kind,
            parent,
            bindings: FxHashMap::default(),
            this_binding,
        }
    }
}

/// Errors raised by declaration, lookup and assignment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("{0} is not defined")]
    UndeclaredVariable(String),
    #[error("Cannot access '{0}' before initialization")]
    TemporalDeadZoneAccess(String),
    #[error("Assignment to constant variable '{0}'")]
    ConstReassignment(String),
    #[error("Identifier '{0}' has already been declared")]
    DuplicateDeclaration(String),
}

/// Tracks the global scope and the scope currently executing
pub struct ScopeManager {
    global: ScopeRef,
    current: ScopeRef,
    next_id: usize,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    pub fn new() -> Self {
        let global = Rc::new(RefCell::new(Scope::new(0, ScopeKind::Global, None, None)));
        ScopeManager {
            current: global.clone(),
            global,
            next_id: 1,
        }
    }

    pub fn current(&self) -> ScopeRef {
        self.current.clone()
    }

    /// The root scope, where `var` declarations and implicit globals live
    pub fn global(&self) -> ScopeRef {
        self.global.clone()
    }

    fn fresh_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a child of the current scope and make it current
    pub fn enter_scope(&mut self, kind: ScopeKind, this_binding: Option<Value>) -> ScopeRef {
        let id = self.fresh_id();
        let scope = Rc::new(RefCell::new(Scope::new(
            id,
            kind,
            Some(self.current.clone()),
            this_binding,
        )));
        self.current = scope.clone();
        scope
    }

    /// Pop to the parent scope (no-op at the root)
    pub fn exit_scope(&mut self) {
        let parent = self.current.borrow().parent.clone();
        if let Some(parent) = parent {
            self.current = parent;
        }
    }

    /// Make `scope` current, returning the scope that was current before.
    /// Calls and continuations use this to jump into an unrelated chain.
    pub fn switch_to(&mut self, scope: ScopeRef) -> ScopeRef {
        std::mem::replace(&mut self.current, scope)
    }

    /// Enter a function scope whose parent is the closure's captured scope.
    /// Returns the caller's scope so it can be restored with [`switch_to`](Self::switch_to).
    pub fn enter_closure_scope(&mut self, closure: &Closure, this_binding: Option<Value>) -> ScopeRef {
        let id = self.fresh_id();
        let scope = Rc::new(RefCell::new(Scope::new(
            id,
            ScopeKind::Function,
            Some(closure.scope.clone()),
            this_binding,
        )));
        self.switch_to(scope)
    }

    /// Replace the current scope with a copy of itself (same parent, cloned
    /// bindings). Used between iterations of `for (let ...)` loops so each
    /// iteration's closures keep their own binding.
    pub fn copy_current(&mut self) -> ScopeRef {
        let id = self.fresh_id();
        let copy = {
            let current = self.current.borrow();
            Scope {
                id,
                kind: current.kind,
                parent: current.parent.clone(),
                bindings: current.bindings.clone(),
                this_binding: current.this_binding.clone(),
            }
        };
        let copy = Rc::new(RefCell::new(copy));
        self.current = copy.clone();
        copy
    }

    /// Nearest function or global scope, where `var` declarations live
    fn variable_scope(&self) -> ScopeRef {
        let mut scope = self.current.clone();
        loop {
            let parent = {
                let borrowed = scope.borrow();
                if borrowed.kind != ScopeKind::Block {
                    return scope.clone();
                }
                borrowed.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return scope,
            }
        }
    }

    /// Declare a binding. `var` hoists to the nearest function scope and is
    /// immediately `undefined`; `let`/`const` are created uninitialized in the
    /// current scope.
    pub fn declare_variable(&mut self, name: &str, kind: DeclKind) -> Result<(), ScopeError> {
        let target = match kind {
            DeclKind::Var => self.variable_scope(),
            DeclKind::Let | DeclKind::Const => self.current.clone(),
        };
        let mut scope = target.borrow_mut();

        if let Some(existing) = scope.bindings.get(name) {
            if kind == DeclKind::Var && existing.kind == DeclKind::Var {
                return Ok(());
            }
            return Err(ScopeError::DuplicateDeclaration(name.to_string()));
        }

        let initialized = kind == DeclKind::Var;
        scope.bindings.insert(
            name.to_string(),
            Binding {
                kind,
                value: Value::Undefined,
                initialized,
            },
        );
        Ok(())
    }

    /// Declare and initialize a function binding in the current scope.
    /// Function declarations may be redeclared; the last one wins.
    pub fn declare_function(&mut self, name: &str, value: Value) {
        self.current.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                kind: DeclKind::Var,
                value,
                initialized: true,
            },
        );
    }

    /// Find the scope in the chain that holds `name`
    fn resolve(&self, name: &str) -> Option<ScopeRef> {
        let mut scope = Some(self.current.clone());
        while let Some(candidate) = scope {
            if candidate.borrow().bindings.contains_key(name) {
                return Some(candidate);
            }
            scope = candidate.borrow().parent.clone();
        }
        None
    }

    /// Set a declared binding's value and mark it initialized
    pub fn initialize_variable(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        let scope = self
            .resolve(name)
            .ok_or_else(|| ScopeError::UndeclaredVariable(name.to_string()))?;
        let mut scope = scope.borrow_mut();
        if let Some(binding) = scope.bindings.get_mut(name) {
            binding.value = value;
            binding.initialized = true;
        }
        Ok(())
    }

    /// Assign to an existing binding. Unresolved names become implicit
    /// globals.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), ScopeError> {
        let Some(scope) = self.resolve(name) else {
            self.global.borrow_mut().bindings.insert(
                name.to_string(),
                Binding {
                    kind: DeclKind::Var,
                    value,
                    initialized: true,
                },
            );
            return Ok(());
        };

        let mut scope = scope.borrow_mut();
        if let Some(binding) = scope.bindings.get_mut(name) {
            if !binding.initialized {
                return Err(ScopeError::TemporalDeadZoneAccess(name.to_string()));
            }
            if binding.kind == DeclKind::Const {
                return Err(ScopeError::ConstReassignment(name.to_string()));
            }
            binding.value = value;
        }
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> Result<Value, ScopeError> {
        let scope = self
            .resolve(name)
            .ok_or_else(|| ScopeError::UndeclaredVariable(name.to_string()))?;
        let scope = scope.borrow();
        match scope.bindings.get(name) {
            Some(binding) if !binding.initialized && binding.kind != DeclKind::Var => {
                Err(ScopeError::TemporalDeadZoneAccess(name.to_string()))
            }
            Some(binding) => Ok(binding.value.clone()),
            None => Err(ScopeError::UndeclaredVariable(name.to_string())),
        }
    }

    /// Whether `name` resolves anywhere in the chain (used by `typeof`)
    pub fn is_declared(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// `this` of the nearest scope that binds it; arrow scopes bind none
    pub fn lookup_this(&self) -> Value {
        let mut scope = Some(self.current.clone());
        while let Some(candidate) = scope {
            if let Some(this) = &candidate.borrow().this_binding {
                return this.clone();
            }
            scope = candidate.borrow().parent.clone();
        }
        Value::Undefined
    }

    /// Capture the current scope by reference
    pub fn create_closure(&self, node: Rc<FunctionNode>, name: Option<String>, is_async: bool) -> Closure {
        Closure {
            node,
            scope: self.current.clone(),
            name,
            is_async,
        }
    }

    /// Number of scopes between the current scope and the root, inclusive
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = Some(self.current.clone());
        while let Some(candidate) = scope {
            depth += 1;
            scope = candidate.borrow().parent.clone();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{FunctionBody, FunctionNode, SourceLocation};

    fn node() -> Rc<FunctionNode> {
        Rc::new(FunctionNode {
            name: None,
            params: Vec::new(),
            body: FunctionBody::Block(Vec::new().into()),
            is_async: false,
            is_arrow: false,
            is_generator: false,
            location: SourceLocation::default(),
        })
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let mut scopes = ScopeManager::new();
        let function = scopes.enter_scope(ScopeKind::Function, None);
        scopes.enter_scope(ScopeKind::Block, None);

        scopes.declare_variable("x", DeclKind::Var).unwrap();

        assert!(function.borrow().bindings.contains_key("x"));
        assert!(matches!(scopes.get_variable("x"), Ok(Value::Undefined)));
    }

    #[test]
    fn test_duplicate_let_in_same_scope() {
        let mut scopes = ScopeManager::new();
        scopes.declare_variable("a", DeclKind::Let).unwrap();

        assert_eq!(
            scopes.declare_variable("a", DeclKind::Let),
            Err(ScopeError::DuplicateDeclaration("a".to_string()))
        );

        // Shadowing in a child block is fine
        scopes.enter_scope(ScopeKind::Block, None);
        assert!(scopes.declare_variable("a", DeclKind::Let).is_ok());
    }

    #[test]
    fn test_temporal_dead_zone() {
        let mut scopes = ScopeManager::new();
        scopes.declare_variable("t", DeclKind::Let).unwrap();

        assert_eq!(
            scopes.get_variable("t").unwrap_err(),
            ScopeError::TemporalDeadZoneAccess("t".to_string())
        );

        scopes.initialize_variable("t", Value::Number(1.0)).unwrap();
        assert!(matches!(scopes.get_variable("t"), Ok(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn test_const_reassignment() {
        let mut scopes = ScopeManager::new();
        scopes.declare_variable("c", DeclKind::Const).unwrap();
        scopes.initialize_variable("c", Value::Number(1.0)).unwrap();

        assert_eq!(
            scopes.set_variable("c", Value::Number(2.0)),
            Err(ScopeError::ConstReassignment("c".to_string()))
        );
    }

    #[test]
    fn test_unresolved_assignment_creates_global() {
        let mut scopes = ScopeManager::new();
        scopes.enter_scope(ScopeKind::Function, None);
        scopes.enter_scope(ScopeKind::Block, None);

        scopes.set_variable("leak", Value::Boolean(true)).unwrap();

        assert!(scopes.global().borrow().bindings.contains_key("leak"));
    }

    #[test]
    fn test_undeclared_read() {
        let scopes = ScopeManager::new();
        assert_eq!(
            scopes.get_variable("nope").unwrap_err(),
            ScopeError::UndeclaredVariable("nope".to_string())
        );
    }

    #[test]
    fn test_closure_scope_parent_is_captured_scope() {
        let mut scopes = ScopeManager::new();
        let defining = scopes.enter_scope(ScopeKind::Function, None);
        scopes.declare_variable("captured", DeclKind::Let).unwrap();
        scopes.initialize_variable("captured", Value::string("yes")).unwrap();
        let closure = scopes.create_closure(node(), Some("inner".to_string()), false);
        scopes.exit_scope();

        // Call from an unrelated scope
        scopes.enter_scope(ScopeKind::Function, None);
        scopes.declare_variable("captured", DeclKind::Let).unwrap();
        scopes.initialize_variable("captured", Value::string("no")).unwrap();

        let caller = scopes.enter_closure_scope(&closure, None);
        let parent = scopes.current().borrow().parent.clone().unwrap();
        assert!(Rc::ptr_eq(&parent, &defining));
        assert!(matches!(scopes.get_variable("captured"), Ok(Value::String(s)) if s == "yes"));

        scopes.switch_to(caller);
        assert!(matches!(scopes.get_variable("captured"), Ok(Value::String(s)) if s == "no"));
    }

    #[test]
    fn test_copy_current_detaches_bindings() {
        let mut scopes = ScopeManager::new();
        let first = scopes.enter_scope(ScopeKind::Block, None);
        scopes.declare_variable("i", DeclKind::Let).unwrap();
        scopes.initialize_variable("i", Value::Number(0.0)).unwrap();

        scopes.copy_current();
        scopes.set_variable("i", Value::Number(1.0)).unwrap();

        let old = first.borrow().bindings.get("i").map(|b| b.value.clone());
        assert!(matches!(old, Some(Value::Number(n)) if n == 0.0));
        assert!(matches!(scopes.get_variable("i"), Ok(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn test_exit_scope_at_root_is_noop() {
        let mut scopes = ScopeManager::new();
        scopes.exit_scope();
        assert_eq!(scopes.depth(), 1);
    }
}
