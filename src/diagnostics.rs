//! Shared diagnostic channel.
//!
//! Every stage of the pipeline (lexer, parser, semantic analyzer, IR
//! generator) appends to the same `Diagnostics` bag instead of raising an
//! exception for recoverable errors. Severity is a single level: all
//! diagnostics here are errors. A stage that finds the bag already
//! non-empty when it starts should not run (see `Diagnostics::had_errors`).

use std::fmt;

/// Which stage produced a diagnostic, for user-facing grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexical,
    Syntactic,
    Semantic,
    IrGen,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Lexical => "lexical",
            Stage::Syntactic => "syntax",
            Stage::Semantic => "semantic",
            Stage::IrGen => "codegen",
        };
        write!(f, "{s}")
    }
}

/// A single diagnostic: source line, originating stage, and message.
/// Column is optional — the lexer always has one, later stages usually don't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub line: usize,
    pub column: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(
                f,
                "{}:{}: {} error: {}",
                self.line, col, self.stage, self.message
            ),
            None => write!(f, "{}: {} error: {}", self.line, self.stage, self.message),
        }
    }
}

/// Accumulates diagnostics for one compilation run. Cleared at the start
/// of each top-level run (`Diagnostics::new`); nothing persists across runs.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn error(&mut self, stage: Stage, line: usize, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            stage,
            line,
            column: None,
            message: message.into(),
        });
    }

    pub fn error_at(
        &mut self,
        stage: Stage,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            stage,
            line,
            column: Some(column),
            message: message.into(),
        });
    }

    pub fn had_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Append diagnostics produced by a sub-pass without losing ordering.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.entries {
            writeln!(f, "{d}")?;
        }
        let n = self.entries.len();
        write!(f, "{n} error{}", if n == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bag_has_no_errors() {
        let diags = Diagnostics::new();
        assert!(!diags.had_errors());
        assert_eq!(diags.count(), 0);
    }

    #[test]
    fn display_includes_summary_line() {
        let mut diags = Diagnostics::new();
        diags.error(Stage::Semantic, 3, "undefined name 'x'");
        let text = diags.to_string();
        assert!(text.contains("undefined name 'x'"));
        assert!(text.ends_with("1 error"));
    }

    #[test]
    fn extend_preserves_order() {
        let mut a = Diagnostics::new();
        a.error(Stage::Lexical, 1, "first");
        let mut b = Diagnostics::new();
        b.error(Stage::Lexical, 2, "second");
        a.extend(b);
        assert_eq!(a.entries()[0].message, "first");
        assert_eq!(a.entries()[1].message, "second");
    }
}
