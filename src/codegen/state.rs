//! Mutable state threaded through code generation: the growing IR text,
//! name/counter generators for SSA registers and basic block labels, the
//! variable environment (distinguishing globals, addressed by `@name`,
//! from locals, addressed by a per-declaration `alloca` register), and the
//! table of deduplicated string-literal constants.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::types::Type;

use super::error::CodeGenError;

#[derive(Clone)]
pub enum VarSlot {
    /// A global: storage is `@name`, typed `ty`.
    Global(Type),
    /// A local: storage is the `alloca` result register in `reg`.
    Local { reg: String, ty: Type },
}

pub struct CodeGen {
    pub ir: String,
    temp_counter: usize,
    block_counter: usize,
    string_counter: usize,
    pub strings: Vec<(String, String)>,
    scopes: Vec<HashMap<String, VarSlot>>,
    pub current_return_type: Type,
    /// Whether the block currently being written already ended in a
    /// terminator (`ret`/`br`). `spec.md` §4.4: "After any block that
    /// already has a terminator, code generation must not emit a
    /// fall-through branch" — every control-flow helper consults this
    /// before appending its own closing branch.
    terminated: bool,
}

impl CodeGen {
    pub fn new() -> CodeGen {
        CodeGen {
            ir: String::new(),
            temp_counter: 0,
            block_counter: 0,
            string_counter: 0,
            strings: Vec::new(),
            scopes: vec![HashMap::new()],
            current_return_type: Type::Void,
            terminated: false,
        }
    }

    /// Start a new labeled block; a fresh block never starts terminated.
    pub fn emit_label(&mut self, label: &str) -> Result<(), CodeGenError> {
        writeln!(self.ir, "{label}:")?;
        self.terminated = false;
        Ok(())
    }

    /// Branch to `target`, unless the current block already has a
    /// terminator (e.g. its last statement was `return`).
    pub fn emit_br_if_live(&mut self, target: &str) -> Result<(), CodeGenError> {
        if !self.terminated {
            writeln!(self.ir, "  br label %{target}")?;
            self.terminated = true;
        }
        Ok(())
    }

    pub fn emit_cbranch(&mut self, cond: &str, then_label: &str, else_label: &str) -> Result<(), CodeGenError> {
        writeln!(self.ir, "  br i1 {cond}, label %{then_label}, label %{else_label}")?;
        self.terminated = true;
        Ok(())
    }

    pub fn emit_ret_void(&mut self) -> Result<(), CodeGenError> {
        writeln!(self.ir, "  ret void")?;
        self.terminated = true;
        Ok(())
    }

    pub fn emit_ret(&mut self, ty: &str, value: &str) -> Result<(), CodeGenError> {
        writeln!(self.ir, "  ret {ty} {value}")?;
        self.terminated = true;
        Ok(())
    }

    pub fn is_block_terminated(&self) -> bool {
        self.terminated
    }

    /// A fresh SSA register name, `%t<n>`.
    pub fn fresh_reg(&mut self) -> String {
        let name = format!("%t{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// A fresh label built from `shape` (one of `spec.md` §4.4's canonical
    /// block-shape names, e.g. `"if.then"`), suffixed to stay unique
    /// across the whole function — two `if` statements in the same
    /// function must not collide on `if.then`.
    pub fn fresh_label(&mut self, shape: &str) -> String {
        let label = format!("{shape}{}", self.block_counter);
        self.block_counter += 1;
        label
    }

    pub fn reset_function_counters(&mut self) {
        self.temp_counter = 0;
        self.block_counter = 0;
    }

    /// Intern a string literal, returning its global constant name
    /// (`@.str.<n>`). Identical literal text reuses the same constant,
    /// `spec.md` §4.4 "one internal constant per distinct literal".
    pub fn intern_string(&mut self, value: &str) -> String {
        if let Some((name, _)) = self.strings.iter().find(|(_, v)| v == value) {
            return name.clone();
        }
        let name = format!("@.str.{}", self.string_counter);
        self.string_counter += 1;
        self.strings.push((name.clone(), value.to_string()));
        name
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        debug_assert!(!self.scopes.is_empty(), "the global scope must never be popped");
    }

    pub fn declare_local(&mut self, name: &str, reg: String, ty: Type) {
        self.scopes
            .last_mut()
            .expect("at least the global scope is always present")
            .insert(name.to_string(), VarSlot::Local { reg, ty });
    }

    pub fn declare_global(&mut self, name: &str, ty: Type) {
        self.scopes[0].insert(name.to_string(), VarSlot::Global(ty));
    }

    pub fn lookup(&self, name: &str) -> Option<&VarSlot> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}
