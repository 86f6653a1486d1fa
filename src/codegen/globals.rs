//! Global variable/array lowering, `spec.md` §4.4 storage model plus the
//! open-question resolution in `SPEC_FULL.md` §3.2: a global initializer
//! must be a literal (or a brace-list of literals for an array); anything
//! else is a hard `CodeGenError` at lowering time rather than a silent
//! best-effort attempt, matching `original_source/codegen.py`'s
//! `_procesar_variable_global` / `_procesar_array_global`.

use std::fmt::Write as _;

use crate::ast::{ArrayDecl, Expr, ExprKind, VarDecl};
use crate::types::Type;

use super::error::CodeGenError;
use super::state::CodeGen;
use super::types::{llvm_type, zero_literal};

/// Render a literal expression as an LLVM constant of the given type, or
/// fail if `expr` isn't a literal — the only shape `spec.md` allows for a
/// global initializer.
fn literal_constant(expr: &Expr, ty: &Type) -> Result<String, CodeGenError> {
    match (&expr.kind, ty) {
        (ExprKind::Integer(n), Type::Integer) => Ok(n.to_string()),
        (ExprKind::Integer(n), Type::Float) => Ok(format!("{:?}", *n as f64)),
        (ExprKind::Float(x), Type::Float) => Ok(format!("{x:?}")),
        (ExprKind::Boolean(b), Type::Boolean) => Ok(if *b { "1".to_string() } else { "0".to_string() }),
        (ExprKind::Char(c), Type::Char) => Ok((*c as u32).to_string()),
        (ExprKind::Str(_), Type::String) => {
            Err(CodeGenError::Logic("string globals are lowered via a separate constant, not inline".into()))
        }
        _ => Err(CodeGenError::Logic(format!(
            "global initializer at line {} must be a literal expression",
            expr.line
        ))),
    }
}

pub fn emit_global_var(gen: &mut CodeGen, decl: &VarDecl) -> Result<(), CodeGenError> {
    let ty = decl.sym_type.borrow().clone();
    let llty = llvm_type(&ty);
    match (&decl.value, &ty) {
        (Some(init), Type::String) => {
            let ExprKind::Str(s) = &init.kind else {
                return Err(CodeGenError::Logic(format!(
                    "global string initializer at line {} must be a string literal",
                    init.line
                )));
            };
            let strname = gen.intern_string(s);
            writeln!(
                gen.ir,
                "@{} = global ptr {}",
                decl.name, strname
            )?;
        }
        (Some(init), _) => {
            let value = literal_constant(init, &ty)?;
            writeln!(gen.ir, "@{} = global {} {}", decl.name, llty, value)?;
        }
        (None, _) => {
            writeln!(gen.ir, "@{} = global {} {}", decl.name, llty, zero_literal(&ty))?;
        }
    }
    gen.declare_global(&decl.name, ty);
    Ok(())
}

pub fn emit_global_array(gen: &mut CodeGen, decl: &ArrayDecl) -> Result<(), CodeGenError> {
    let ty = decl.sym_type.borrow().clone();
    let element = ty
        .element_type()
        .cloned()
        .unwrap_or(Type::Error);
    let elllty = llvm_type(&element);
    let len = decl.value.as_ref().map_or(0, |v| v.len());

    let values = decl
        .value
        .as_ref()
        .map(|exprs| {
            exprs
                .iter()
                .map(|e| literal_constant(e, &element))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    write!(gen.ir, "@{} = global [{} x {}] [", decl.name, len, elllty)?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(gen.ir, ", ")?;
        }
        write!(gen.ir, "{elllty} {v}")?;
    }
    writeln!(gen.ir, "]")?;

    gen.declare_global(&decl.name, ty);
    Ok(())
}

pub fn emit_string_constants(gen: &mut CodeGen) -> Result<(), CodeGenError> {
    for (name, value) in gen.strings.clone() {
        let escaped = escape_llvm_string(&value);
        let len = value.as_bytes().len() + 1;
        writeln!(
            gen.ir,
            "{name} = private unnamed_addr constant [{len} x i8] c\"{escaped}\\00\""
        )?;
    }
    Ok(())
}

/// Escape a Rust string for an LLVM `c"..."` string constant body: every
/// byte outside printable ASCII (and `"`/`\`) becomes `\XX`.
fn escape_llvm_string(s: &str) -> String {
    let mut out = String::new();
    for byte in s.bytes() {
        match byte {
            b'"' | b'\\' => {
                out.push('\\');
                out.push_str(&format!("{byte:02X}"));
            }
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newline_and_quote() {
        assert_eq!(escape_llvm_string("a\nb\"c"), "a\\0Ab\\22c");
    }
}
