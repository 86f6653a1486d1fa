//! Tree-walking interpreter, the supplemental feature recorded in
//! `SPEC_FULL.md` §2. Grounded on `interp.py`'s `Interpreter` visitor: a
//! parent-linked environment chain, `main`-seeking top-level execution, and
//! the same arithmetic/short-circuit/print semantics.
//!
//! The AST's top level is declarations only (`ast::Program`), matching the
//! grammar this interpreter is ported from (`programa : lista_declaraciones`,
//! with no bare-statement alternative) — so a program's executable behavior
//! comes entirely from running its global declarations in order and then
//! calling `main` if one was declared. Programs that declare no `main`
//! still observably run: global variable/array initializers execute as
//! part of declaration, matching `interp.py`'s `Program` visitor.

use crate::ast::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A runtime value. Arrays are reference-counted and interior-mutable so
/// that aliasing a subscript assignment through a parameter behaves like
/// the original's Python list references.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Char(char),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Void,
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            other => unreachable!("non-boolean value used as a condition: {other:?}"),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Value::Integer(n) => *n as f64,
            Value::Float(f) => *f,
            other => unreachable!("non-numeric value in arithmetic: {other:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(_) => write!(f, "<array>"),
            Value::Void => write!(f, ""),
        }
    }
}

/// Runtime error: anything `spec.md` §7 classifies as an "interpreter
/// runtime error" rather than a diagnostic produced by an earlier stage
/// (division by zero, out-of-range index, unbound name). Programs that
/// reach the interpreter have already passed semantic analysis, so these
/// are the remaining failures that can only be detected at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError(pub String);

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RuntimeError {}

type EResult<T> = Result<T, RuntimeError>;

fn err<T>(msg: impl Into<String>) -> EResult<T> {
    Err(RuntimeError(msg.into()))
}

/// A single scope's bindings, chained to its parent like `symtab::Scope`
/// but holding `Value`s rather than `Symbol`s.
struct Env {
    parent: Option<Rc<Env>>,
    vars: RefCell<HashMap<String, Value>>,
}

impl Env {
    fn root() -> Rc<Env> {
        Rc::new(Env {
            parent: None,
            vars: RefCell::new(HashMap::new()),
        })
    }

    fn child(parent: &Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            parent: Some(Rc::clone(parent)),
            vars: RefCell::new(HashMap::new()),
        })
    }

    fn define(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Write to the nearest enclosing scope that already binds `name`,
    /// `interp.py`'s `Assignment` visitor walking `self.env.maps`.
    fn assign(&self, name: &str, value: Value) -> bool {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(p) => p.assign(name, value),
            None => false,
        }
    }
}

#[derive(Clone)]
struct Function {
    decl: Rc<FuncDecl>,
    closure: Rc<Env>,
}

/// Non-local control transfer out of a function body. Mirrors
/// `interp.py`'s `ReturnException` but as an ordinary `Result` variant
/// instead of unwinding — there is no `break`/`continue` to model
/// alongside it since B-Minor's grammar has no such statements.
enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<Env>,
    functions: HashMap<String, Function>,
    out: String,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter {
            globals: Env::root(),
            functions: HashMap::new(),
            out: String::new(),
        }
    }

    /// Run a fully-checked program: execute global declarations in source
    /// order, then call `main` if it was declared. Returns everything
    /// written by `print` statements.
    pub fn run(&mut self, program: &Program) -> EResult<String> {
        for decl in &program.decls {
            self.exec_decl(decl, &Rc::clone(&self.globals))?;
        }
        if let Some(main) = self.functions.get("main").cloned() {
            self.call_function(&main, Vec::new())?;
        }
        Ok(std::mem::take(&mut self.out))
    }

    fn exec_decl(&mut self, decl: &Decl, env: &Rc<Env>) -> EResult<()> {
        match decl {
            Decl::Var(v) => {
                let value = match &v.value {
                    Some(e) => self.eval(e, env)?,
                    None => default_value(&v.sym_type.borrow()),
                };
                env.define(&v.name, value);
                Ok(())
            }
            Decl::Array(a) => {
                let values = match &a.value {
                    Some(exprs) => exprs
                        .iter()
                        .map(|e| self.eval(e, env))
                        .collect::<EResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                env.define(&a.name, Value::Array(Rc::new(RefCell::new(values))));
                Ok(())
            }
            Decl::Func(f) => {
                if f.body.is_some() {
                    self.functions.insert(
                        f.name.clone(),
                        Function {
                            decl: Rc::new(f.clone()),
                            closure: Rc::clone(&self.globals),
                        },
                    );
                }
                Ok(())
            }
        }
    }

    fn call_function(&mut self, func: &Function, args: Vec<Value>) -> EResult<Value> {
        let body = func
            .decl
            .body
            .as_ref()
            .expect("only defined functions are ever registered");
        let call_env = Env::child(&func.closure);
        for (param, arg) in func.decl.params.iter().zip(args) {
            call_env.define(&param.name, arg);
        }
        match self.exec_block(body, &call_env)? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Void),
        }
    }

    fn exec_block(&mut self, block: &Block, parent: &Rc<Env>) -> EResult<Flow> {
        let env = Env::child(parent);
        for stmt in &block.statements {
            match self.exec_stmt(stmt, &env)? {
                Flow::Normal => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> EResult<Flow> {
        match stmt {
            Stmt::Block(b) => self.exec_block(b, env),
            Stmt::VarDecl(v) => {
                let value = match &v.value {
                    Some(e) => self.eval(e, env)?,
                    None => default_value(&v.sym_type.borrow()),
                };
                env.define(&v.name, value);
                Ok(Flow::Normal)
            }
            Stmt::ArrayDecl(a) => {
                let values = match &a.value {
                    Some(exprs) => exprs
                        .iter()
                        .map(|e| self.eval(e, env))
                        .collect::<EResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                env.define(&a.name, Value::Array(Rc::new(RefCell::new(values))));
                Ok(Flow::Normal)
            }
            Stmt::Expr(e) => {
                self.eval(e, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { args, .. } => {
                for arg in args {
                    let v = self.eval(arg, env)?;
                    self.out.push_str(&v.to_string());
                }
                self.out.push('\n');
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval(e, env)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(v))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval(cond, env)?.is_truthy() {
                    self.exec_block(then_branch, env)
                } else if let Some(else_b) = else_branch {
                    self.exec_block(else_b, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.eval(cond, env)?.is_truthy() {
                    match self.exec_block(body, env)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, cond, .. } => loop {
                match self.exec_block(body, env)? {
                    Flow::Normal => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
                if !self.eval(cond, env)?.is_truthy() {
                    return Ok(Flow::Normal);
                }
            },
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                let loop_env = Env::child(env);
                match init {
                    Some(ForInit::Decl(v)) => {
                        let value = match &v.value {
                            Some(e) => self.eval(e, &loop_env)?,
                            None => default_value(&v.sym_type.borrow()),
                        };
                        loop_env.define(&v.name, value);
                    }
                    Some(ForInit::Expr(e)) => {
                        self.eval(e, &loop_env)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(c) = cond {
                        if !self.eval(c, &loop_env)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec_block(body, &loop_env)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    if let Some(u) = update {
                        self.eval(u, &loop_env)?;
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    fn eval(&mut self, expr: &Expr, env: &Rc<Env>) -> EResult<Value> {
        match &expr.kind {
            ExprKind::Integer(n) => Ok(Value::Integer(*n)),
            ExprKind::Float(x) => Ok(Value::Float(*x)),
            ExprKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExprKind::Char(c) => Ok(Value::Char(*c)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Var(name) => env
                .get(name)
                .ok_or_else(|| RuntimeError(format!("undefined variable '{name}'"))),
            ExprKind::ArraySubscript { base, index } => {
                let arr = self.eval_array(base, env)?;
                let idx = self.eval_index(index, env)?;
                let arr = arr.borrow();
                arr.get(idx)
                    .cloned()
                    .ok_or_else(|| RuntimeError(format!("index out of range: {idx}")))
            }
            ExprKind::Assignment { location, value } => {
                let v = self.eval(value, env)?;
                self.assign(location, v.clone(), env)?;
                Ok(v)
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, env),
            ExprKind::Unary { op, expr } => {
                let v = self.eval(expr, env)?;
                match op {
                    UnaryOp::Neg => Ok(negate(&v)),
                    UnaryOp::Plus => Ok(v),
                    UnaryOp::Not => Ok(Value::Boolean(!v.is_truthy())),
                }
            }
            ExprKind::PreInc(target) => self.inc_dec(target, 1, false, env),
            ExprKind::PreDec(target) => self.inc_dec(target, -1, false, env),
            ExprKind::PostInc(target) => self.inc_dec(target, 1, true, env),
            ExprKind::PostDec(target) => self.inc_dec(target, -1, true, env),
            ExprKind::Call { name, args } => self.call(name, args, env),
        }
    }

    /// Resolve the array a subscript or array-subscript-assignment refers
    /// to. Only `VarLocation`-rooted and nested-subscript reads are
    /// supported for *reading*; `interp.py` additionally forbids nested
    /// subscripts as *assignment* targets (`assign` below enforces that
    /// narrower rule separately).
    fn eval_array(&mut self, expr: &Expr, env: &Rc<Env>) -> EResult<Rc<RefCell<Vec<Value>>>> {
        match self.eval(expr, env)? {
            Value::Array(a) => Ok(a),
            other => err(format!("not an array: {other}")),
        }
    }

    fn eval_index(&mut self, expr: &Expr, env: &Rc<Env>) -> EResult<usize> {
        match self.eval(expr, env)? {
            Value::Integer(n) if n >= 0 => Ok(n as usize),
            Value::Integer(n) => err(format!("negative array index: {n}")),
            other => err(format!("array index is not an integer: {other}")),
        }
    }

    /// `interp.py`'s `Assignment` visitor: only a bare name or a single
    /// level of subscript rooted at a bare name is a valid assignment
    /// target. `ast::Expr`'s `ArraySubscript { base, .. }` mirrors the
    /// original's `ArraySubscript.location`, so the same restriction is
    /// enforced here by matching on `base.kind`.
    fn assign(&mut self, location: &Expr, value: Value, env: &Rc<Env>) -> EResult<()> {
        match &location.kind {
            ExprKind::Var(name) => {
                if !env.assign(name, value) {
                    return err(format!("undefined variable '{name}'"));
                }
                Ok(())
            }
            ExprKind::ArraySubscript { base, index } => match &base.kind {
                ExprKind::Var(_) => {
                    let arr = self.eval_array(base, env)?;
                    let idx = self.eval_index(index, env)?;
                    let mut arr = arr.borrow_mut();
                    if idx >= arr.len() {
                        return err(format!("index out of range: {idx}"));
                    }
                    arr[idx] = value;
                    Ok(())
                }
                _ => err("assignment to a nested array subscript is not supported"),
            },
            _ => err("invalid assignment target"),
        }
    }

    fn inc_dec(&mut self, target: &Expr, delta: i64, post: bool, env: &Rc<Env>) -> EResult<Value> {
        let original = self.eval(target, env)?;
        let updated = match &original {
            Value::Integer(n) => Value::Integer(n + delta),
            Value::Float(x) => Value::Float(x + delta as f64),
            other => return err(format!("increment/decrement of non-numeric value: {other}")),
        };
        self.assign(target, updated.clone(), env)?;
        Ok(if post { original } else { updated })
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, env: &Rc<Env>) -> EResult<Value> {
        // `&&`/`||` short-circuit and, for a failing left operand, return
        // that operand's own value without evaluating the right side at
        // all, matching `interp.py`'s `BinOper` visitor.
        if op == BinOp::And {
            let l = self.eval(left, env)?;
            return if !l.is_truthy() { Ok(l) } else { self.eval(right, env) };
        }
        if op == BinOp::Or {
            let l = self.eval(left, env)?;
            return if l.is_truthy() { Ok(l) } else { self.eval(right, env) };
        }

        let l = self.eval(left, env)?;
        let r = self.eval(right, env)?;
        match op {
            BinOp::Add => match (&l, &r) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                _ => numeric_binop(&l, &r, |a, b| a + b, |a, b| a + b),
            },
            BinOp::Sub => numeric_binop(&l, &r, |a, b| a - b, |a, b| a - b),
            BinOp::Mul => numeric_binop(&l, &r, |a, b| a * b, |a, b| a * b),
            BinOp::Div => match (&l, &r) {
                (Value::Integer(_), Value::Integer(0)) => err("division by zero"),
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.div_euclid(*b))),
                _ => numeric_binop(&l, &r, |a, b| a / b, |a, b| a / b),
            },
            BinOp::Mod => match (&l, &r) {
                (Value::Integer(_), Value::Integer(0)) => err("division by zero"),
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.rem_euclid(*b))),
                _ => numeric_binop(&l, &r, |a, b| a % b, |a, b| a % b),
            },
            BinOp::Pow => Ok(Value::Float(l.as_f64().powf(r.as_f64()))),
            BinOp::Lt => Ok(Value::Boolean(l.as_f64() < r.as_f64())),
            BinOp::Le => Ok(Value::Boolean(l.as_f64() <= r.as_f64())),
            BinOp::Gt => Ok(Value::Boolean(l.as_f64() > r.as_f64())),
            BinOp::Ge => Ok(Value::Boolean(l.as_f64() >= r.as_f64())),
            BinOp::Eq => Ok(Value::Boolean(values_equal(&l, &r))),
            BinOp::Ne => Ok(Value::Boolean(!values_equal(&l, &r))),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn call(&mut self, name: &str, args: &[Expr], env: &Rc<Env>) -> EResult<Value> {
        let values = args
            .iter()
            .map(|a| self.eval(a, env))
            .collect::<EResult<Vec<_>>>()?;
        if let Some(func) = self.functions.get(name).cloned() {
            return self.call_function(&func, values);
        }
        call_builtin(name, values)
    }
}

/// Runtime implementations for the six built-ins `builtins.rs` declares to
/// the type checker. Ported from `builtins.py`: `read_integer`/`read_string`
/// consume a line of stdin, `sqrt`/`abs`/`max`/`min` operate on numbers
/// widened to `f64`, and `length` accepts a string or an array.
fn call_builtin(name: &str, args: Vec<Value>) -> EResult<Value> {
    match name {
        "read_integer" => {
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .map_err(|e| RuntimeError(format!("read_integer: {e}")))?;
            line.trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| RuntimeError(format!("'{}' is not a valid integer", line.trim())))
        }
        "read_string" => {
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .map_err(|e| RuntimeError(format!("read_string: {e}")))?;
            Ok(Value::Str(line.trim_end_matches('\n').to_string()))
        }
        "sqrt" => {
            let v = args[0].as_f64();
            if v < 0.0 {
                return err("sqrt() of a negative number");
            }
            Ok(Value::Float(v.sqrt()))
        }
        "abs" => {
            let v = &args[0];
            Ok(match v {
                Value::Integer(n) => Value::Integer(n.abs()),
                _ => Value::Float(v.as_f64().abs()),
            })
        }
        "max" => Ok(args
            .into_iter()
            .reduce(|a, b| if a.as_f64() >= b.as_f64() { a } else { b })
            .expect("checked arity is at least 1")),
        "min" => Ok(args
            .into_iter()
            .reduce(|a, b| if a.as_f64() <= b.as_f64() { a } else { b })
            .expect("checked arity is at least 1")),
        "length" => match &args[0] {
            Value::Array(a) => Ok(Value::Integer(a.borrow().len() as i64)),
            Value::Str(s) => Ok(Value::Integer(s.chars().count() as i64)),
            other => err(format!("length() requires a string or array, got {other}")),
        },
        other => err(format!("undefined function '{other}'")),
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn default_value(ty: &crate::types::Type) -> Value {
    use crate::types::Type;
    match ty {
        Type::Integer => Value::Integer(0),
        Type::Float => Value::Float(0.0),
        Type::Boolean => Value::Boolean(false),
        Type::Char => Value::Char('\0'),
        Type::String => Value::Str(String::new()),
        Type::Array { size, element } => {
            let n = size.unwrap_or(0).max(0) as usize;
            Value::Array(Rc::new(RefCell::new(vec![default_value(element); n])))
        }
        _ => Value::Void,
    }
}

fn negate(v: &Value) -> Value {
    match v {
        Value::Integer(n) => Value::Integer(-n),
        Value::Float(x) => Value::Float(-x),
        other => unreachable!("negation of non-numeric value: {other:?}"),
    }
}

fn numeric_binop(
    l: &Value,
    r: &Value,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> EResult<Value> {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(int_op(*a, *b))),
        _ => Ok(Value::Float(float_op(l.as_f64(), r.as_f64()))),
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => *a as f64 == *b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Char(a), Value::Char(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::semantic;

    fn run(src: &str) -> String {
        let (program, diags) = Parser::new(src).parse();
        let sem_diags = semantic::analyze(&program);
        assert!(!diags.had_errors(), "{diags}");
        assert!(!sem_diags.had_errors(), "{sem_diags}");
        let mut interp = Interpreter::new();
        interp.run(&program).expect("runtime error")
    }

    #[test]
    fn arithmetic_and_print_match_expected_output() {
        assert_eq!(run("x: int = 10; y: int = 20; print x + y * 2;"), "50\n");
    }

    #[test]
    fn integer_division_is_floor_division() {
        assert_eq!(run("print 7 / 2;"), "3\n");
    }

    #[test]
    fn float_division_stays_float() {
        assert_eq!(run("print 7.0 / 2.0;"), "3.5\n");
    }

    #[test]
    fn recursive_function_via_main_is_invoked() {
        let src = "
            fact: function int(n: int) = {
                if (n < 2) { return 1; }
                return n * fact(n - 1);
            }
            main: function void() = {
                print fact(5);
            }
        ";
        assert_eq!(run(src), "120\n");
    }

    #[test]
    fn array_subscript_assignment_mutates_in_place() {
        let src = "
            main: function void() = {
                a: array[3] int = {1, 2, 3};
                a[1] = 99;
                print a[1];
            }
        ";
        assert_eq!(run(src), "99\n");
    }

    #[test]
    fn short_circuit_and_skips_right_operand_side_effects() {
        let src = "
            calls: int = 0;
            side: function boolean() = {
                calls = calls + 1;
                return true;
            }
            main: function void() = {
                print false && side();
                print calls;
            }
        ";
        assert_eq!(run(src), "false\n0\n");
    }

    #[test]
    fn string_concatenation_uses_plus() {
        assert_eq!(run(r#"print "a" + "b";"#), "ab\n");
    }

    #[test]
    fn program_without_main_still_runs_global_initializers() {
        // No `main`, no statements ever execute, but the program is valid
        // and simply produces no output.
        assert_eq!(run("x: int = 10;"), "");
    }
}
