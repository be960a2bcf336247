//! HealthQL query language
//!
//! Text goes through three stages, each with its own error type:
//!
//! - **Lexer**: source text → tokens (`LexError`)
//! - **Parser**: tokens → `SelectStatement` AST (`ParseError`)
//! - **Compiler**: AST → `HealthQuery` IR (`CompileError`)
//!
//! # Query Language
//!
//! ```text
//! SELECT <selection, ...> FROM <table>
//! [WHERE <expr>]
//! [GROUP BY hour|day|week|month|year]
//! [ORDER BY <field> [ASC|DESC], ...]
//! [LIMIT <n>]
//! ```
//!
//! Date helpers `today()`, `start_of_week()`, `start_of_month()`,
//! `start_of_year()`; duration literals `<n>h|d|w|mo|y`.
//!
//! # Examples
//!
//! ```rust,ignore
//! use healthql::query::{tokenize, parse, Compiler};
//!
//! let tokens = tokenize("SELECT sum(count) FROM steps WHERE date > today() - 7d GROUP BY day")?;
//! let stmt = parse(tokens)?;
//! let query = Compiler::new().compile(&stmt)?;
//! ```

pub mod ast;
mod compiler;
mod error;
mod lexer;
mod parser;
mod token;

pub use ast::SelectStatement;
pub use compiler::{resolve_field, Compiler};
pub use error::{CompileError, CompileResult, LexError, LexResult, ParseError, ParseResult};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, Parser};
pub use token::{Token, TokenKind};
