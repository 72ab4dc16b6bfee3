//! Error types for the format-to-reader compiler

use thiserror::Error;

/// Result type for compilation operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexical error at line {line}, column {column}: unexpected character {character:?}")]
    Lexical {
        line: usize,
        column: usize,
        character: char,
    },

    #[error("Syntax error: {message}")]
    Syntax { message: String },

    #[error("Match error: {message}")]
    Match { message: String },

    #[error("Typing error: {message}")]
    Typing { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CompileError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        CompileError::Syntax { message: msg.into() }
    }

    pub fn match_error(msg: impl Into<String>) -> Self {
        CompileError::Match { message: msg.into() }
    }

    pub fn typing(msg: impl Into<String>) -> Self {
        CompileError::Typing { message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CompileError::Config { message: msg.into() }
    }

    /// True for the kind the type inferencer may recover from with the
    /// loop-collapse retry.
    pub fn is_match_error(&self) -> bool {
        matches!(self, CompileError::Match { .. })
    }
}
