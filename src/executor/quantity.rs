//! Quantity sources: raw samples, or bucketed statistics under GROUP BY

use crate::executor::result::{ResultRow, ResultValue};
use crate::executor::translator::{sample_sort_key, sort_descriptors, PredicateTranslator};
use crate::executor::{common_column, fetch_samples, fetch_statistics, selected_fields, AuthorizationCache};
use crate::ir::calendar::shift;
use crate::ir::{
    Aggregate, Clock, Field, GroupBy, HealthQuery, Predicate, QuantityType, Selection, Timestamp,
};
use crate::store::{
    HealthStore, NativeQuery, RecordKind, Sample, SampleQuery, Statistics, StatisticsOptions,
    StatisticsQuery, StoreResult,
};
use std::sync::Arc;
use uuid::Uuid;

/// Runs queries against quantity kinds
pub struct QuantityHandler {
    store: Arc<dyn HealthStore>,
    authorization: AuthorizationCache,
    translator: PredicateTranslator,
    clock: Clock,
    lookback_days: i64,
}

impl QuantityHandler {
    pub fn new(store: Arc<dyn HealthStore>, clock: Clock, lookback_days: i64) -> Self {
        Self {
            store,
            authorization: AuthorizationCache::new(),
            translator: PredicateTranslator::new(),
            clock,
            lookback_days,
        }
    }

    pub async fn execute(&self, query: &HealthQuery, kind: QuantityType) -> StoreResult<Vec<ResultRow>> {
        self.authorization
            .ensure(self.store.as_ref(), RecordKind::Quantity(kind))
            .await?;

        match query.grouping {
            Some(interval) => self.execute_statistics(query, kind, interval).await,
            None => self.execute_samples(query, kind).await,
        }
    }

    async fn execute_samples(&self, query: &HealthQuery, kind: QuantityType) -> StoreResult<Vec<ResultRow>> {
        let native = SampleQuery::new(RecordKind::Quantity(kind))
            .with_filter(self.translator.translate(&query.predicates))
            .with_limit(query.limit)
            .with_sort(sort_descriptors(query.ordering.as_deref(), sample_sort_key));

        let samples = fetch_samples(self.store.as_ref(), native).await?;
        Ok(samples.iter().map(|s| sample_row(s, query)).collect())
    }

    async fn execute_statistics(
        &self,
        query: &HealthQuery,
        kind: QuantityType,
        interval: GroupBy,
    ) -> StoreResult<Vec<ResultRow>> {
        let now = self.clock.now();
        let start = window_start(&query.predicates)
            .unwrap_or_else(|| shift(now, GroupBy::Day, -self.lookback_days));

        let native = NativeQuery::Statistics(StatisticsQuery {
            id: Uuid::new_v4(),
            kind,
            filter: self.translator.translate(&query.predicates),
            options: statistics_options(&query.selections),
            anchor: self.clock.today(),
            interval,
            start,
            end: now,
        });

        let buckets = fetch_statistics(self.store.as_ref(), &native).await;
        let stopped = self.store.stop_query(&native).await;
        let buckets = buckets?;
        stopped?;

        let aggregates = query.aggregates();
        Ok(buckets
            .iter()
            .map(|bucket| statistics_row(bucket, &aggregates))
            .collect())
    }
}

/// Start of the statistics window: the first date bound on the `date` field
fn window_start(predicates: &[Predicate]) -> Option<Timestamp> {
    predicates
        .iter()
        .filter(|p| p.field == Field::Date)
        .find_map(|p| p.value.start_date())
}

/// Native statistics for the requested aggregates; `count` reads the sum
fn statistics_options(selections: &[Selection]) -> StatisticsOptions {
    let mut options = StatisticsOptions::default();
    for aggregate in selections.iter().filter_map(Selection::aggregate) {
        match aggregate {
            Aggregate::Sum | Aggregate::Count => options.cumulative_sum = true,
            Aggregate::Avg => options.discrete_average = true,
            Aggregate::Min => options.discrete_min = true,
            Aggregate::Max => options.discrete_max = true,
        }
    }
    if options.is_empty() {
        options.cumulative_sum = true;
    }
    options
}

fn statistics_row(bucket: &Statistics, aggregates: &[Aggregate]) -> ResultRow {
    let mut row = ResultRow::new();
    row.insert(Field::Date.column_name(), bucket.start);
    for aggregate in aggregates {
        let value = match aggregate {
            Aggregate::Sum | Aggregate::Count => bucket.sum,
            Aggregate::Avg => bucket.average,
            Aggregate::Min => bucket.minimum,
            Aggregate::Max => bucket.maximum,
        };
        if let Some(value) = value {
            row.insert(aggregate.column_name(), value);
        }
    }
    row
}

fn sample_row(sample: &Sample, query: &HealthQuery) -> ResultRow {
    let mut row = ResultRow::new();
    for field in selected_fields(query) {
        let value: Option<ResultValue> = match field {
            Field::Value => sample.quantity_value().map(Into::into),
            _ => common_column(field, sample),
        };
        if let Some(value) = value {
            row.insert(field.column_name(), value);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::calendar::resolve_local;
    use crate::ir::{Operator, OrderBy, OrderDirection, PredicateValue};
    use crate::store::{MemoryStore, NativeFilter, SortDescriptor, SortKey};
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> Timestamp {
        let naive = NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        resolve_local(naive).unwrap()
    }

    fn clock() -> Clock {
        Clock::Fixed(at(11, 15))
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_samples(vec![
            Sample::quantity(QuantityType::Steps, 1000.0, at(9, 8), at(9, 9)).with_source("iPhone"),
            Sample::quantity(QuantityType::Steps, 500.0, at(9, 20), at(9, 21)),
            Sample::quantity(QuantityType::Steps, 250.0, at(11, 9), at(11, 10))
                .with_device("Apple Watch"),
        ]))
    }

    fn steps_query(selections: Vec<Selection>) -> HealthQuery {
        HealthQuery::new(
            crate::ir::HealthSource::Quantity(QuantityType::Steps),
            selections,
        )
    }

    #[tokio::test]
    async fn test_samples_default_newest_first() {
        let store = store();
        let handler = QuantityHandler::new(store.clone(), clock(), 30);
        let query = steps_query(vec![
            Selection::Field(Field::Value),
            Selection::Field(Field::Source),
            Selection::Field(Field::Device),
        ]);

        let rows = handler.execute(&query, QuantityType::Steps).await.unwrap();
        let values: Vec<f64> = rows.iter().filter_map(|r| r.double("value")).collect();
        assert_eq!(values, vec![250.0, 500.0, 1000.0]);

        assert_eq!(rows[0].string("device"), Some("Apple Watch"));
        assert_eq!(rows[1].get("device"), Some(&ResultValue::Null));
        assert_eq!(rows[2].string("source"), Some("iPhone"));
        // unselected columns are absent
        assert!(!rows[0].contains("date"));

        let NativeQuery::Samples(native) = &store.executed_queries()[0] else {
            panic!("expected sample query");
        };
        assert_eq!(native.sort, vec![SortDescriptor::new(SortKey::StartDate, false)]);
        assert_eq!(native.limit, None);
    }

    #[tokio::test]
    async fn test_samples_ordering_and_limit() {
        let store = store();
        let handler = QuantityHandler::new(store.clone(), clock(), 30);
        let mut query = steps_query(vec![Selection::Field(Field::Value)]);
        query.ordering = Some(vec![OrderBy::new(Field::Date, OrderDirection::Ascending)]);
        query.limit = Some(2);

        let rows = handler.execute(&query, QuantityType::Steps).await.unwrap();
        let values: Vec<f64> = rows.iter().filter_map(|r| r.double("value")).collect();
        assert_eq!(values, vec![1000.0, 500.0]);
    }

    #[tokio::test]
    async fn test_authorizes_once() {
        let store = store();
        let handler = QuantityHandler::new(store.clone(), clock(), 30);
        let query = steps_query(vec![Selection::Field(Field::Value)]);

        handler.execute(&query, QuantityType::Steps).await.unwrap();
        handler.execute(&query, QuantityType::Steps).await.unwrap();
        handler.execute(&query, QuantityType::HeartRate).await.unwrap();

        assert_eq!(store.authorization_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_statistics_by_day() {
        let store = store();
        let handler = QuantityHandler::new(store.clone(), clock(), 30);
        let mut query = steps_query(vec![
            Selection::Aggregate(Aggregate::Sum, Field::Value),
            Selection::Aggregate(Aggregate::Max, Field::Value),
        ]);
        query.predicates = vec![Predicate::new(
            Field::Date,
            Operator::GreaterThanOrEqual,
            PredicateValue::Date(at(9, 0)),
        )];
        query.grouping = Some(GroupBy::Day);

        let rows = handler.execute(&query, QuantityType::Steps).await.unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].date("date"), Some(at(9, 0)));
        assert_eq!(rows[0].double("sum_value"), Some(1500.0));
        assert_eq!(rows[0].double("max_value"), Some(1000.0));
        // empty bucket keeps its date only
        assert_eq!(rows[1].date("date"), Some(at(10, 0)));
        assert!(!rows[1].contains("sum_value"));
        assert_eq!(rows[2].double("sum_value"), Some(250.0));

        let executed = store.executed_queries();
        let NativeQuery::Statistics(native) = &executed[0] else {
            panic!("expected statistics query");
        };
        assert_eq!(native.anchor, at(11, 0));
        assert_eq!(native.start, at(9, 0));
        assert_eq!(native.end, at(11, 15));
        assert!(native.options.cumulative_sum && native.options.discrete_max);
        assert!(matches!(native.filter, Some(NativeFilter::Window(_))));
        assert_eq!(store.stopped_queries(), vec![native.id]);
    }

    #[tokio::test]
    async fn test_statistics_default_lookback() {
        let store = store();
        let handler = QuantityHandler::new(store.clone(), clock(), 3);
        let mut query = steps_query(vec![Selection::Aggregate(Aggregate::Count, Field::Value)]);
        query.grouping = Some(GroupBy::Day);

        let rows = handler.execute(&query, QuantityType::Steps).await.unwrap();
        // 8th 15:00 .. 11th 15:00 spans four day buckets
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date("date"), Some(at(8, 0)));
        assert_eq!(rows[1].double("count_value"), Some(1500.0));

        let NativeQuery::Statistics(native) = &store.executed_queries()[0] else {
            panic!("expected statistics query");
        };
        assert_eq!(native.start, at(8, 15));
    }

    #[test]
    fn test_statistics_options() {
        let options = statistics_options(&[
            Selection::Aggregate(Aggregate::Avg, Field::Value),
            Selection::Aggregate(Aggregate::Min, Field::Value),
        ]);
        assert!(options.discrete_average && options.discrete_min);
        assert!(!options.cumulative_sum);

        let options = statistics_options(&[Selection::Field(Field::Value)]);
        assert!(options.cumulative_sum);
    }

    #[test]
    fn test_window_start_uses_first_date_bound() {
        let predicates = vec![
            Predicate::new(Field::Value, Operator::GreaterThan, PredicateValue::Double(1.0)),
            Predicate::new(
                Field::Date,
                Operator::Between,
                PredicateValue::DateRange {
                    start: at(5, 0),
                    end: at(6, 0),
                },
            ),
            Predicate::new(Field::Date, Operator::GreaterThan, PredicateValue::Date(at(7, 0))),
        ];
        assert_eq!(window_start(&predicates), Some(at(5, 0)));
        assert_eq!(window_start(&[]), None);
    }

    #[tokio::test]
    async fn test_statistics_fetch_error_wins_over_stop_error() {
        let store = Arc::new(
            MemoryStore::new()
                .failing_queries("fetch failed")
                .failing_stop("stop failed"),
        );
        let handler = QuantityHandler::new(store.clone(), clock(), 30);
        let mut query = steps_query(vec![Selection::Aggregate(Aggregate::Sum, Field::Value)]);
        query.grouping = Some(GroupBy::Day);

        let err = handler.execute(&query, QuantityType::Steps).await.unwrap_err();
        assert_eq!(err.to_string(), "Query failed: fetch failed");
        // the query is released even though the fetch failed
        assert_eq!(store.stopped_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_statistics_stop_error_surfaces() {
        let store = Arc::new(
            MemoryStore::with_samples(vec![Sample::quantity(
                QuantityType::Steps,
                10.0,
                at(10, 8),
                at(10, 9),
            )])
            .failing_stop("stop failed"),
        );
        let handler = QuantityHandler::new(store, clock(), 30);
        let mut query = steps_query(vec![Selection::Aggregate(Aggregate::Sum, Field::Value)]);
        query.grouping = Some(GroupBy::Day);

        let err = handler.execute(&query, QuantityType::Steps).await.unwrap_err();
        assert_eq!(err.to_string(), "Query failed: stop failed");
    }
}
