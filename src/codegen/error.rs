//! Error type for code generation operations, the teacher's style: a small
//! enum carrying either a logical IR-generation error or a formatting
//! failure from the `write!`/`writeln!` calls that build the IR text, with
//! a `From<std::fmt::Error>` so both compose behind `?`.

#[derive(Debug)]
pub enum CodeGenError {
    /// `spec.md` §7's "IR-generation" taxonomy entry: an operator
    /// combination or construct that reached codegen despite passing
    /// semantic analysis (a non-literal global initializer, for instance).
    Logic(String),
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Logic(s) => write!(f, "{s}"),
            CodeGenError::Format(e) => write!(f, "IR generation error: {e}"),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}
