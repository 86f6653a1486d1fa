//! B-Minor front end: lexer, parser, semantic analyzer, and LLVM-compatible
//! IR generator, plus a tree-walking interpreter for direct execution.
//!
//! ```no_run
//! let src = "x: int = 10; print x;";
//! let (diagnostics, output) = bminorc::run_source(src).expect("runtime error");
//! assert!(!diagnostics.had_errors());
//! assert_eq!(output, "10\n");
//! ```

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod diagnostics;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod symtab;
pub mod types;

pub use ast::Program;
pub use codegen::CodeGenError;
pub use diagnostics::Diagnostics;
pub use interpreter::{Interpreter, RuntimeError};
pub use lexer::Token;

/// Stage 1 only: tokenize `src`, discarding the parser built on top of it.
pub fn tokenize(src: &str) -> (Vec<Token>, Diagnostics) {
    lexer::tokenize(src)
}

/// Stages 1-2: parse `src` into a `Program`, whether or not it parses
/// cleanly — the returned `Diagnostics` records any lexical/syntactic
/// errors recovered along the way.
pub fn parse(src: &str) -> (Program, Diagnostics) {
    parser::Parser::new(src).parse()
}

/// Stages 1-3: parse then semantically check `src`. Per `spec.md` §7,
/// semantic analysis is skipped if parsing already produced errors.
pub fn check(src: &str) -> (Program, Diagnostics) {
    let (program, mut diagnostics) = parse(src);
    if !diagnostics.had_errors() {
        diagnostics.extend(semantic::analyze(&program));
    }
    (program, diagnostics)
}

/// Stages 1-4: check `src`, then lower it to textual IR. Codegen is
/// skipped (an empty string returned) if any earlier stage recorded an
/// error, matching the "downstream stages are skipped" propagation policy.
pub fn emit_ir(src: &str) -> Result<(String, Diagnostics), CodeGenError> {
    let (program, diagnostics) = check(src);
    if diagnostics.had_errors() {
        return Ok((String::new(), diagnostics));
    }
    let ir = codegen::generate(&program)?;
    Ok((ir, diagnostics))
}

/// Stages 1-3 plus the interpreter: check `src`, then execute it directly,
/// returning everything written by `print` statements. Interpretation is
/// skipped if any earlier stage recorded an error.
pub fn run_source(src: &str) -> Result<(Diagnostics, String), RuntimeError> {
    let (program, diagnostics) = check(src);
    if diagnostics.had_errors() {
        return Ok((diagnostics, String::new()));
    }
    let mut interp = Interpreter::new();
    let output = interp.run(&program)?;
    Ok((diagnostics, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_skips_semantic_analysis_after_a_parse_error() {
        let (_, diagnostics) = check("x: int = ;");
        assert!(diagnostics.had_errors());
    }

    #[test]
    fn emit_ir_reports_diagnostics_without_panicking_on_a_bad_program() {
        let (ir, diagnostics) = emit_ir("x: int = true;").unwrap();
        assert!(diagnostics.had_errors());
        assert!(ir.is_empty());
    }

    #[test]
    fn run_source_executes_a_well_typed_program() {
        let (diagnostics, output) = run_source("x: int = 10; print x;").unwrap();
        assert!(!diagnostics.had_errors());
        assert_eq!(output, "10\n");
    }
}
