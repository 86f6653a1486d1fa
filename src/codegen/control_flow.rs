//! Control-flow statement lowering into the canonical named basic blocks
//! of `spec.md` §4.4's table. Each helper emits its own labels via
//! `CodeGen::emit_label` and lets `emit_br_if_live` suppress the
//! fall-through branch when a branch's body already ended in `return`.

use crate::ast::{Block, Expr, ForInit};

use super::error::CodeGenError;
use super::expr::lower_expr;
use super::state::CodeGen;
use super::statements::lower_block;
use super::types::{llvm_type, zero_literal};

pub fn lower_if(
    gen: &mut CodeGen,
    cond: &Expr,
    then_branch: &Block,
    else_branch: &Option<Block>,
    _line: usize,
) -> Result<(), CodeGenError> {
    let cond_val = lower_expr(gen, cond)?;
    let then_label = gen.fresh_label("if.then");
    let end_label = gen.fresh_label("if.end");

    if let Some(else_b) = else_branch {
        let else_label = gen.fresh_label("if.else");
        gen.emit_cbranch(&cond_val, &then_label, &else_label)?;
        gen.emit_label(&then_label)?;
        lower_block(gen, then_branch)?;
        gen.emit_br_if_live(&end_label)?;
        gen.emit_label(&else_label)?;
        lower_block(gen, else_b)?;
        gen.emit_br_if_live(&end_label)?;
    } else {
        gen.emit_cbranch(&cond_val, &then_label, &end_label)?;
        gen.emit_label(&then_label)?;
        lower_block(gen, then_branch)?;
        gen.emit_br_if_live(&end_label)?;
    }
    gen.emit_label(&end_label)?;
    Ok(())
}

pub fn lower_while(gen: &mut CodeGen, cond: &Expr, body: &Block, _line: usize) -> Result<(), CodeGenError> {
    let cond_label = gen.fresh_label("while.cond");
    let body_label = gen.fresh_label("while.body");
    let end_label = gen.fresh_label("while.end");

    gen.emit_br_if_live(&cond_label)?;
    gen.emit_label(&cond_label)?;
    let cond_val = lower_expr(gen, cond)?;
    gen.emit_cbranch(&cond_val, &body_label, &end_label)?;
    gen.emit_label(&body_label)?;
    lower_block(gen, body)?;
    gen.emit_br_if_live(&cond_label)?;
    gen.emit_label(&end_label)?;
    Ok(())
}

pub fn lower_do_while(gen: &mut CodeGen, body: &Block, cond: &Expr, _line: usize) -> Result<(), CodeGenError> {
    let body_label = gen.fresh_label("do.body");
    let cond_label = gen.fresh_label("do.cond");
    let end_label = gen.fresh_label("do.end");

    gen.emit_br_if_live(&body_label)?;
    gen.emit_label(&body_label)?;
    lower_block(gen, body)?;
    gen.emit_br_if_live(&cond_label)?;
    gen.emit_label(&cond_label)?;
    let cond_val = lower_expr(gen, cond)?;
    gen.emit_cbranch(&cond_val, &body_label, &end_label)?;
    gen.emit_label(&end_label)?;
    Ok(())
}

pub fn lower_for(
    gen: &mut CodeGen,
    init: &Option<ForInit>,
    cond: &Option<Expr>,
    update: &Option<Expr>,
    body: &Block,
    _line: usize,
) -> Result<(), CodeGenError> {
    // init is emitted in the predecessor block, spec.md §4.4's for-loop row,
    // in its own scope so a declared loop variable doesn't leak past the
    // statement but stays visible to cond/update/body.
    gen.push_scope();
    match init {
        Some(ForInit::Decl(v)) => super::statements::lower_local_var_decl(gen, v)?,
        Some(ForInit::Expr(e)) => {
            lower_expr(gen, e)?;
        }
        None => {}
    }

    let cond_label = gen.fresh_label("for.cond");
    let body_label = gen.fresh_label("for.body");
    let update_label = gen.fresh_label("for.update");
    let end_label = gen.fresh_label("for.end");

    gen.emit_br_if_live(&cond_label)?;
    gen.emit_label(&cond_label)?;
    match cond {
        Some(c) => {
            let cond_val = lower_expr(gen, c)?;
            gen.emit_cbranch(&cond_val, &body_label, &end_label)?;
        }
        None => gen.emit_br_if_live(&body_label)?,
    }
    gen.emit_label(&body_label)?;
    lower_block(gen, body)?;
    gen.emit_br_if_live(&update_label)?;
    gen.emit_label(&update_label)?;
    if let Some(u) = update {
        lower_expr(gen, u)?;
    }
    gen.emit_br_if_live(&cond_label)?;
    gen.emit_label(&end_label)?;
    gen.pop_scope();
    Ok(())
}

/// Used by `program.rs` when a function body falls off the end without a
/// `return`: emit a type-appropriate zero return (or `ret void`).
pub fn emit_implicit_return(gen: &mut CodeGen) -> Result<(), CodeGenError> {
    if gen.is_block_terminated() {
        return Ok(());
    }
    let ret_ty = gen.current_return_type.clone();
    if ret_ty == crate::types::Type::Void {
        gen.emit_ret_void()
    } else {
        let zero = zero_literal(&ret_ty);
        gen.emit_ret(&llvm_type(&ret_ty), &zero)
    }
}
