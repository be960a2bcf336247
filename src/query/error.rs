//! Query pipeline error types
//!
//! One error enum per stage: lexing, parsing and compiling. Execution errors
//! live with the executor.

use crate::query::token::Token;
use thiserror::Error;

/// Errors raised while tokenizing query text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at {line}:{column}")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },

    /// Position is that of the opening quote
    #[error("Unterminated string starting at {line}:{column}")]
    UnterminatedString { line: usize, column: usize },
}

/// Errors raised while building the AST
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got {got}")]
    UnexpectedToken { expected: String, got: Token },

    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),
}

/// Errors raised while lowering the AST to IR
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
}

pub type LexResult<T> = Result<T, LexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type CompileResult<T> = Result<T, CompileError>;
