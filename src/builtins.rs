//! Built-in function prototypes injected into the global scope.
//!
//! `spec.md` §4.3 lists six built-ins; `length` is widened here per the
//! resolution recorded in `SPEC_FULL.md` §3.3 to accept either a string or
//! an array of any element type.

use crate::symtab::{Scope, Symbol, SymbolKind};
use crate::types::Type;
use std::rc::Rc;

struct Builtin {
    name: &'static str,
    params: Vec<Type>,
    ret: Type,
}

fn table() -> Vec<Builtin> {
    vec![
        Builtin {
            name: "read_integer",
            params: vec![],
            ret: Type::Integer,
        },
        Builtin {
            name: "read_string",
            params: vec![],
            ret: Type::String,
        },
        Builtin {
            name: "sqrt",
            params: vec![Type::Float],
            ret: Type::Float,
        },
        Builtin {
            name: "abs",
            params: vec![Type::Float],
            ret: Type::Float,
        },
        Builtin {
            name: "max",
            params: vec![Type::Float, Type::Float],
            ret: Type::Float,
        },
        Builtin {
            name: "min",
            params: vec![Type::Float, Type::Float],
            ret: Type::Float,
        },
        // `length` is polymorphic: the checker special-cases its single
        // argument to accept string or any array type (see `check_call` in
        // `semantic.rs`); the entry here is only for name resolution / arity.
        Builtin {
            name: "length",
            params: vec![Type::array(Type::Integer, None)],
            ret: Type::Integer,
        },
    ]
}

/// Populate `scope` (expected to be the global scope) with every built-in
/// prototype, `spec.md` §3 invariant 3.
pub fn install(scope: &Rc<Scope>) {
    for b in table() {
        let sym = Symbol {
            name: b.name.to_string(),
            ty: b.ret.clone(),
            kind: SymbolKind::Func {
                params: b.params,
                ret: Box::new(b.ret),
            },
            line: 0,
        };
        scope
            .declare(sym)
            .expect("builtin names must not collide with each other");
    }
}

/// Names that are special-cased to be polymorphic at call-checking time
/// rather than having a single fixed parameter type.
pub fn is_polymorphic_length(name: &str) -> bool {
    name == "length"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_all_six_builtins() {
        let global = Scope::root("global");
        install(&global);
        for name in ["read_integer", "read_string", "sqrt", "abs", "max", "min", "length"] {
            assert!(global.lookup(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn builtins_are_not_mutable_locations() {
        let global = Scope::root("global");
        install(&global);
        let sqrt_sym = global.lookup("sqrt").unwrap();
        assert!(!sqrt_sym.is_mutable_location());
    }
}
