//! Top-level entry point: lower a whole, semantically-checked `Program`
//! into the textual module described in `spec.md` §6 — a target-triple
//! header, the runtime ABI declarations, global storage, and every
//! function, in the two-pass order `spec.md` §4.4 requires (prototypes
//! before bodies, so a body's calls resolve regardless of source order).

use std::fmt::Write as _;

use crate::ast::{Decl, FuncDecl, Program};

use super::control_flow::emit_implicit_return;
use super::error::CodeGenError;
use super::globals::{emit_global_array, emit_global_var, emit_string_constants};
use super::runtime::emit_runtime_declarations;
use super::state::CodeGen;
use super::statements::lower_block;
use super::types::llvm_type;

pub fn generate(program: &Program) -> Result<String, CodeGenError> {
    let mut gen = CodeGen::new();

    writeln!(gen.ir, "target triple = \"x86_64-unknown-linux-gnu\"")?;
    writeln!(gen.ir)?;
    emit_runtime_declarations(&mut gen.ir)?;

    for decl in &program.decls {
        match decl {
            Decl::Var(v) => emit_global_var(&mut gen, v)?,
            Decl::Array(a) => emit_global_array(&mut gen, a)?,
            Decl::Func(_) => {}
        }
    }
    writeln!(gen.ir)?;

    // Pass 1: declare prototype-only functions (no body).
    for decl in &program.decls {
        if let Decl::Func(f) = decl {
            if f.body.is_none() {
                emit_prototype(&mut gen, f)?;
            }
        }
    }

    // Pass 2: define every function with a body.
    for decl in &program.decls {
        if let Decl::Func(f) = decl {
            if f.body.is_some() {
                emit_function(&mut gen, f)?;
            }
        }
    }

    emit_string_constants(&mut gen)?;
    Ok(gen.ir)
}

fn emit_prototype(gen: &mut CodeGen, f: &FuncDecl) -> Result<(), CodeGenError> {
    let ret = llvm_type(&f.sym_type.borrow());
    let params = f
        .params
        .iter()
        .map(|p| llvm_type(&p.type_expr.to_type()))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(gen.ir, "declare {ret} @{}({params})", f.name)?;
    Ok(())
}

fn emit_function(gen: &mut CodeGen, f: &FuncDecl) -> Result<(), CodeGenError> {
    let body = f
        .body
        .as_ref()
        .expect("only functions with a body reach emit_function");
    let ret_ty = f.sym_type.borrow().clone();
    gen.reset_function_counters();
    gen.current_return_type = ret_ty.clone();

    let params_sig = f
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} %arg{i}", llvm_type(&p.type_expr.to_type())))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(gen.ir, "define {} @{}({params_sig}) {{", llvm_type(&ret_ty), f.name)?;
    gen.emit_label("entry")?;

    gen.push_scope();
    for (i, p) in f.params.iter().enumerate() {
        let ty = p.type_expr.to_type();
        let ptr = gen.fresh_reg();
        writeln!(gen.ir, "  {ptr} = alloca {}", llvm_type(&ty))?;
        writeln!(gen.ir, "  store {} %arg{i}, ptr {ptr}", llvm_type(&ty))?;
        gen.declare_local(&p.name, ptr, ty);
    }
    lower_block(gen, body)?;
    emit_implicit_return(gen)?;
    gen.pop_scope();

    writeln!(gen.ir, "}}")?;
    writeln!(gen.ir)?;
    Ok(())
}
