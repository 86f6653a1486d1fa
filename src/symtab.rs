//! Scoped symbol table.
//!
//! A lexical scope maps a name to the declaration node that introduced it,
//! plus a parent pointer (`spec.md` §3 "Symbol Table"). Scopes form a tree;
//! declaration nodes are owned by the AST and merely referenced here by
//! cloning the small `Symbol` summary each scope needs, so the table never
//! competes with the AST for ownership.

use crate::types::Type;
use std::collections::HashMap;
use std::rc::Rc;

/// What kind of declaration a name is bound to. Distinguishing `Func` from
/// the rest is what lets `VarLocation` resolution decide mutability
/// (`spec.md` §4.3: "mutable iff the referent is not a FuncDecl").
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Var,
    Array,
    Func { params: Vec<Type>, ret: Box<Type> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    pub line: usize,
}

impl Symbol {
    pub fn is_mutable_location(&self) -> bool {
        !matches!(self.kind, SymbolKind::Func { .. })
    }
}

/// A single lexical scope. `name` is used only for diagnostics ("global",
/// "block", a function's name, "for_loop").
pub struct Scope {
    pub name: String,
    parent: Option<Rc<Scope>>,
    table: std::cell::RefCell<HashMap<String, Symbol>>,
    /// Set on the scope that is a function body: the function's own return
    /// type, so `ReturnStmt` checking doesn't have to walk back up through
    /// intervening block scopes.
    pub func_return_type: Option<Type>,
    /// Set (to `true`, at any depth) inside a loop body, so `break`/`continue`
    /// style checks (not part of this language, but kept for parity with
    /// the reserved `$loop` key in `spec.md` §3) and diagnostics about
    /// "return outside function" can tell loop scopes from plain blocks.
    pub is_loop: bool,
}

impl Scope {
    pub fn root(name: impl Into<String>) -> Rc<Scope> {
        Rc::new(Scope {
            name: name.into(),
            parent: None,
            table: std::cell::RefCell::new(HashMap::new()),
            func_return_type: None,
            is_loop: false,
        })
    }

    pub fn child(parent: &Rc<Scope>, name: impl Into<String>) -> Rc<Scope> {
        Rc::new(Scope {
            name: name.into(),
            parent: Some(Rc::clone(parent)),
            table: std::cell::RefCell::new(HashMap::new()),
            func_return_type: parent.func_return_type.clone(),
            is_loop: false,
        })
    }

    pub fn child_function(parent: &Rc<Scope>, name: impl Into<String>, ret: Type) -> Rc<Scope> {
        Rc::new(Scope {
            name: name.into(),
            parent: Some(Rc::clone(parent)),
            table: std::cell::RefCell::new(HashMap::new()),
            func_return_type: Some(ret),
            is_loop: false,
        })
    }

    pub fn child_loop(parent: &Rc<Scope>, name: impl Into<String>) -> Rc<Scope> {
        Rc::new(Scope {
            name: name.into(),
            parent: Some(Rc::clone(parent)),
            table: std::cell::RefCell::new(HashMap::new()),
            func_return_type: parent.func_return_type.clone(),
            is_loop: true,
        })
    }

    /// Declare `symbol` in this scope. `Err` if the name is already bound
    /// *in this scope* (nested scopes may shadow freely, `spec.md` §3
    /// invariant 1).
    pub fn declare(&self, symbol: Symbol) -> Result<(), ()> {
        let mut table = self.table.borrow_mut();
        if table.contains_key(&symbol.name) {
            return Err(());
        }
        table.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Walk the scope chain looking for `name`. Miss at the root yields
    /// `None` ("undefined name", `spec.md` §3 invariant 2).
    pub fn lookup(self: &Rc<Self>, name: &str) -> Option<Symbol> {
        if let Some(sym) = self.table.borrow().get(name) {
            return Some(sym.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Whether a return statement reached at this scope is inside some
    /// enclosing function.
    pub fn enclosing_function_return_type(&self) -> Option<&Type> {
        self.func_return_type.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: Type) -> Symbol {
        Symbol {
            name: name.to_string(),
            ty,
            kind: SymbolKind::Var,
            line: 1,
        }
    }

    #[test]
    fn redeclaration_in_same_scope_errors() {
        let global = Scope::root("global");
        assert!(global.declare(var("x", Type::Integer)).is_ok());
        assert!(global.declare(var("x", Type::Float)).is_err());
    }

    #[test]
    fn nested_scope_shadows_freely() {
        let global = Scope::root("global");
        global.declare(var("x", Type::Integer)).unwrap();
        let block = Scope::child(&global, "block");
        assert!(block.declare(var("x", Type::Float)).is_ok());
        assert_eq!(block.lookup("x").unwrap().ty, Type::Float);
        assert_eq!(global.lookup("x").unwrap().ty, Type::Integer);
    }

    #[test]
    fn lookup_walks_to_root_and_misses_cleanly() {
        let global = Scope::root("global");
        global.declare(var("x", Type::Integer)).unwrap();
        let block = Scope::child(&global, "block");
        let inner = Scope::child(&block, "block");
        assert!(inner.lookup("x").is_some());
        assert!(inner.lookup("nope").is_none());
    }

    #[test]
    fn function_symbol_is_not_mutable() {
        let f = Symbol {
            name: "f".into(),
            ty: Type::Integer,
            kind: SymbolKind::Func {
                params: vec![],
                ret: Box::new(Type::Integer),
            },
            line: 1,
        };
        assert!(!f.is_mutable_location());
        assert!(var("x", Type::Integer).is_mutable_location());
    }
}
