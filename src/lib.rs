//! # HealthQL
//!
//! A SQL-like query language over personal health records. Query text is
//! compiled to a typed intermediate representation (`HealthQuery`) and executed
//! against a `HealthStore`.
//!
//! ## Modules
//!
//! - [`query`]: lexer, parser and compiler from text to IR
//! - [`ir`]: the `HealthQuery` IR, record-kind schema and a builder DSL
//! - [`executor`]: validation, per-source handlers and the result model
//! - [`store`]: the store capability, an in-memory store and an Apple Health export store
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use healthql::executor::HealthQueryExecutor;
//! use healthql::store::ExportStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(ExportStore::open("export.zip")?);
//!     let executor = HealthQueryExecutor::new(store);
//!
//!     let result = healthql::run_query(
//!         &executor,
//!         "SELECT sum(count) FROM steps WHERE date > today() - 7d GROUP BY day",
//!     )
//!     .await?;
//!
//!     for row in &result {
//!         println!("{:?} {:?}", row.date("date"), row.double("sum_value"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod executor;
pub mod ir;
pub mod query;
pub mod store;

use thiserror::Error;

pub use config::{Config, ConfigError, OutputFormat};
pub use executor::{
    ExecutorOptions, HealthQueryExecutor, QueryError, QueryResult, ResultRow, ResultValue,
};
pub use ir::{Clock, Health, HealthQuery, HealthSource};
pub use query::{CompileError, LexError, ParseError};
pub use store::{ExportStore, HealthStore, MemoryStore, StoreError};

/// Any failure between query text and results, tagged by stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HealthQlError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

/// Compile query text to IR, resolving dates against the system clock
pub fn parse_to_ir(text: &str) -> Result<HealthQuery, HealthQlError> {
    parse_to_ir_with_clock(text, Clock::System)
}

/// Compile query text to IR, resolving dates against `clock`
pub fn parse_to_ir_with_clock(text: &str, clock: Clock) -> Result<HealthQuery, HealthQlError> {
    let tokens = query::tokenize(text)?;
    let stmt = query::parse(tokens)?;
    let compiled = query::Compiler::with_clock(clock).compile(&stmt)?;
    tracing::trace!(source = %compiled.source, selections = compiled.selections.len(), "Compiled query");
    Ok(compiled)
}

/// Execute an already compiled query
pub async fn execute_ir(
    executor: &HealthQueryExecutor,
    query: &HealthQuery,
) -> Result<QueryResult, HealthQlError> {
    Ok(executor.execute(query).await?)
}

/// Compile and execute query text, resolving dates against the executor's clock
pub async fn run_query(
    executor: &HealthQueryExecutor,
    text: &str,
) -> Result<QueryResult, HealthQlError> {
    let compiled = parse_to_ir_with_clock(text, executor.clock())?;
    execute_ir(executor, &compiled).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Aggregate, Field, QuantityType, Selection};

    #[test]
    fn test_errors_keep_stage() {
        assert!(matches!(parse_to_ir("SELECT 'oops FROM steps"), Err(HealthQlError::Lex(_))));
        assert!(matches!(parse_to_ir("SELECT FROM steps"), Err(HealthQlError::Parse(_))));
        assert!(matches!(
            parse_to_ir("SELECT * FROM unknown_table"),
            Err(HealthQlError::Compile(CompileError::UnknownTable(ref t))) if t == "unknown_table"
        ));
    }

    #[test]
    fn test_parse_to_ir() {
        let query = parse_to_ir("SELECT sum(count) FROM steps").unwrap();
        assert_eq!(query.source, HealthSource::Quantity(QuantityType::Steps));
        assert_eq!(
            query.selections,
            vec![Selection::Aggregate(Aggregate::Sum, Field::Value)]
        );
    }
}
