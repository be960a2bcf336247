//! Query intermediate representation
//!
//! - **Schema**: record kinds and their fields
//! - **Types**: `HealthQuery` and its parts
//! - **Builder**: a DSL producing `HealthQuery` without going through text
//! - **Calendar**: clock and local calendar arithmetic

pub mod calendar;
mod builder;
pub mod schema;
mod types;

pub use builder::{DateReference, FilterValue, Health, QueryBuilder};
pub use calendar::{Clock, Timestamp};
pub use schema::{CategoryType, QuantityType, Severity, SleepStage, WorkoutType};
pub use types::{
    Aggregate, Field, GroupBy, HealthQuery, HealthSource, OrderBy, OrderDirection, Operator,
    Predicate, PredicateValue, Selection,
};
