//! Workout source

use crate::executor::result::{ResultRow, ResultValue};
use crate::executor::translator::{sample_sort_key, sort_descriptors, PredicateTranslator};
use crate::executor::{common_column, fetch_samples, selected_fields, AuthorizationCache};
use crate::ir::{Field, HealthQuery};
use crate::store::{HealthStore, RecordKind, Sample, SampleQuery, SortKey, StoreResult};
use std::sync::Arc;

/// Activity name for workouts of a kind the schema does not list
const UNKNOWN_ACTIVITY: &str = "unknown";

/// Runs queries against the workouts table. Grouping is ignored.
pub struct WorkoutHandler {
    store: Arc<dyn HealthStore>,
    authorization: AuthorizationCache,
    translator: PredicateTranslator,
}

impl WorkoutHandler {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self {
            store,
            authorization: AuthorizationCache::new(),
            translator: PredicateTranslator::new(),
        }
    }

    pub async fn execute(&self, query: &HealthQuery) -> StoreResult<Vec<ResultRow>> {
        self.authorization
            .ensure(self.store.as_ref(), RecordKind::Workout)
            .await?;

        let native = SampleQuery::new(RecordKind::Workout)
            .with_filter(self.translator.translate(&query.predicates))
            .with_limit(query.limit)
            .with_sort(sort_descriptors(query.ordering.as_deref(), workout_sort_key));

        let samples = fetch_samples(self.store.as_ref(), native).await?;
        Ok(samples.iter().map(|s| workout_row(s, query)).collect())
    }
}

fn workout_sort_key(field: Field) -> SortKey {
    match field {
        Field::Duration => SortKey::Duration,
        Field::TotalCalories => SortKey::TotalEnergy,
        other => sample_sort_key(other),
    }
}

fn workout_row(sample: &Sample, query: &HealthQuery) -> ResultRow {
    let details = sample.workout_details();
    let mut row = ResultRow::new();

    for field in selected_fields(query) {
        let value: Option<ResultValue> = match field {
            Field::ActivityType => Some(
                details
                    .and_then(|w| w.activity)
                    .map_or(UNKNOWN_ACTIVITY, |activity| activity.display_name())
                    .into(),
            ),
            Field::Duration => Some(
                details
                    .map_or_else(|| sample.elapsed_secs(), |w| w.duration)
                    .into(),
            ),
            Field::TotalCalories => Some(ResultValue::from(details.and_then(|w| w.total_energy))),
            Field::Distance => Some(ResultValue::from(details.and_then(|w| w.distance))),
            _ => common_column(field, sample),
        };
        if let Some(value) = value {
            row.insert(field.column_name(), value);
        }
    }
    row
}
