//! Programmatic query construction
//!
//! Builds the same `HealthQuery` the compiler produces from text.
//!
//! ```rust,ignore
//! use healthql::ir::{Aggregate, DateReference, Field, GroupBy, Health, Operator, QuantityType};
//!
//! let query = Health::select_aggregate(QuantityType::Steps, Aggregate::Sum)
//!     .filter(Field::Date, Operator::GreaterThan, DateReference::DaysAgo(7))
//!     .group_by(GroupBy::Day)
//!     .build();
//! ```

use crate::ir::calendar::{self, Clock, Timestamp};
use crate::ir::schema::QuantityType;
use crate::ir::types::*;

/// A date expressed relative to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateReference {
    Today,
    StartOfWeek,
    StartOfMonth,
    StartOfYear,
    /// `n` hours before now
    HoursAgo(i64),
    /// `n` days before local midnight today
    DaysAgo(i64),
    WeeksAgo(i64),
    MonthsAgo(i64),
    Exact(Timestamp),
}

impl DateReference {
    /// Resolve against `clock`
    pub fn resolve(&self, clock: &Clock) -> Timestamp {
        let today = clock.today();
        match *self {
            Self::Today => today,
            Self::StartOfWeek => calendar::start_of_week(today),
            Self::StartOfMonth => calendar::start_of_month(today),
            Self::StartOfYear => calendar::start_of_year(today),
            Self::HoursAgo(n) => calendar::shift(clock.now(), GroupBy::Hour, -n),
            Self::DaysAgo(n) => calendar::shift(today, GroupBy::Day, -n),
            Self::WeeksAgo(n) => calendar::shift(today, GroupBy::Week, -n),
            Self::MonthsAgo(n) => calendar::shift(today, GroupBy::Month, -n),
            Self::Exact(instant) => instant,
        }
    }
}

/// Values accepted by `QueryBuilder::filter`
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Date(DateReference),
    Value(PredicateValue),
}

impl From<DateReference> for FilterValue {
    fn from(date: DateReference) -> Self {
        Self::Date(date)
    }
}

impl From<PredicateValue> for FilterValue {
    fn from(value: PredicateValue) -> Self {
        Self::Value(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Value(PredicateValue::Double(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Value(PredicateValue::Int(value))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Value(PredicateValue::String(value.to_string()))
    }
}

/// Entry points of the query DSL
pub struct Health;

impl Health {
    /// Select the raw `value` of a quantity kind
    pub fn select(kind: QuantityType) -> QueryBuilder {
        QueryBuilder::new(
            HealthSource::Quantity(kind),
            vec![Selection::Field(Field::Value)],
        )
    }

    /// Select one aggregate of a quantity kind's `value`
    pub fn select_aggregate(kind: QuantityType, aggregate: Aggregate) -> QueryBuilder {
        Self::select_aggregates(kind, &[aggregate])
    }

    /// Select several aggregates of a quantity kind's `value`
    pub fn select_aggregates(kind: QuantityType, aggregates: &[Aggregate]) -> QueryBuilder {
        QueryBuilder::new(
            HealthSource::Quantity(kind),
            aggregates
                .iter()
                .map(|aggregate| Selection::Aggregate(*aggregate, Field::Value))
                .collect(),
        )
    }

    /// Start from any source with explicit selections
    pub fn from(source: HealthSource, selections: Vec<Selection>) -> QueryBuilder {
        QueryBuilder::new(source, selections)
    }
}

/// Builder for `HealthQuery`
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: HealthQuery,
    clock: Clock,
}

impl QueryBuilder {
    pub fn new(source: HealthSource, selections: Vec<Selection>) -> Self {
        Self {
            query: HealthQuery::new(source, selections),
            clock: Clock::System,
        }
    }

    /// Resolve date references against `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Add a predicate; date references are resolved immediately
    pub fn filter(mut self, field: Field, operator: Operator, value: impl Into<FilterValue>) -> Self {
        let value = match value.into() {
            FilterValue::Date(date) => PredicateValue::Date(date.resolve(&self.clock)),
            FilterValue::Value(value) => value,
        };
        self.query.predicates.push(Predicate::new(field, operator, value));
        self
    }

    /// Add a BETWEEN predicate over two date references
    pub fn between(mut self, field: Field, start: DateReference, end: DateReference) -> Self {
        let value = PredicateValue::DateRange {
            start: start.resolve(&self.clock),
            end: end.resolve(&self.clock),
        };
        self.query
            .predicates
            .push(Predicate::new(field, Operator::Between, value));
        self
    }

    pub fn group_by(mut self, period: GroupBy) -> Self {
        self.query.grouping = Some(period);
        self
    }

    /// Append a sort key
    pub fn order_by(mut self, field: Field, direction: OrderDirection) -> Self {
        self.query
            .ordering
            .get_or_insert_with(Vec::new)
            .push(OrderBy::new(field, direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    pub fn build(self) -> HealthQuery {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_clock() -> Clock {
        let naive = NaiveDate::from_ymd_opt(2026, 2, 5)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap();
        Clock::Fixed(calendar::resolve_local(naive).unwrap())
    }

    #[test]
    fn test_select_builds_value_selection() {
        let query = Health::select(QuantityType::HeartRate).build();
        assert_eq!(query.source, HealthSource::Quantity(QuantityType::HeartRate));
        assert_eq!(query.selections, vec![Selection::Field(Field::Value)]);
        assert!(query.predicates.is_empty());
        assert!(query.ordering.is_none());
    }

    #[test]
    fn test_aggregate_builder_full() {
        let clock = fixed_clock();
        let query = Health::select_aggregates(QuantityType::Steps, &[Aggregate::Sum, Aggregate::Avg])
            .with_clock(clock)
            .filter(Field::Date, Operator::GreaterThan, DateReference::DaysAgo(7))
            .group_by(GroupBy::Day)
            .order_by(Field::Date, OrderDirection::Descending)
            .limit(7)
            .build();

        assert_eq!(query.selections.len(), 2);
        assert_eq!(query.grouping, Some(GroupBy::Day));
        assert_eq!(query.limit, Some(7));
        assert_eq!(
            query.ordering,
            Some(vec![OrderBy::new(Field::Date, OrderDirection::Descending)])
        );

        let expected = calendar::shift(clock.today(), GroupBy::Day, -7);
        assert_eq!(query.predicates[0].value, PredicateValue::Date(expected));
    }

    #[test]
    fn test_date_references() {
        let clock = fixed_clock();
        let today = clock.today();

        assert_eq!(DateReference::Today.resolve(&clock), today);
        assert_eq!(
            DateReference::HoursAgo(2).resolve(&clock),
            clock.now() - chrono::Duration::hours(2)
        );
        assert_eq!(
            DateReference::StartOfMonth.resolve(&clock).date_naive(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert_eq!(
            DateReference::MonthsAgo(1).resolve(&clock).date_naive(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
        assert_eq!(
            DateReference::WeeksAgo(1).resolve(&clock).date_naive(),
            NaiveDate::from_ymd_opt(2026, 1, 29).unwrap()
        );
    }

    #[test]
    fn test_plain_value_filters() {
        let query = Health::select(QuantityType::Steps)
            .filter(Field::Value, Operator::GreaterThan, 10000.0)
            .filter(Field::Source, Operator::Equal, "iPhone")
            .build();

        assert_eq!(query.predicates[0].value, PredicateValue::Double(10000.0));
        assert_eq!(
            query.predicates[1].value,
            PredicateValue::String("iPhone".to_string())
        );
    }
}
