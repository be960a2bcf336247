//! Category sources (sleep analysis, symptoms)

use crate::executor::result::{ResultRow, ResultValue};
use crate::executor::translator::{sample_sort_key, sort_descriptors, PredicateTranslator};
use crate::executor::{common_column, fetch_samples, selected_fields, AuthorizationCache};
use crate::ir::{CategoryType, Field, HealthQuery, Severity, SleepStage};
use crate::store::{HealthStore, RecordKind, Sample, SampleQuery, StoreResult};
use std::sync::Arc;

/// Runs queries against category kinds. Grouping is ignored.
pub struct CategoryHandler {
    store: Arc<dyn HealthStore>,
    authorization: AuthorizationCache,
    translator: PredicateTranslator,
}

impl CategoryHandler {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self {
            store,
            authorization: AuthorizationCache::new(),
            translator: PredicateTranslator::new(),
        }
    }

    pub async fn execute(&self, query: &HealthQuery, kind: CategoryType) -> StoreResult<Vec<ResultRow>> {
        let record_kind = RecordKind::Category(kind);
        self.authorization
            .ensure(self.store.as_ref(), record_kind)
            .await?;

        let native = SampleQuery::new(record_kind)
            .with_filter(self.translator.translate(&query.predicates))
            .with_limit(query.limit)
            .with_sort(sort_descriptors(query.ordering.as_deref(), sample_sort_key));

        let samples = fetch_samples(self.store.as_ref(), native).await?;
        Ok(samples.iter().map(|s| sample_row(s, kind, query)).collect())
    }
}

fn sample_row(sample: &Sample, kind: CategoryType, query: &HealthQuery) -> ResultRow {
    let code = sample.category_code();
    let mut row = ResultRow::new();

    for field in selected_fields(query) {
        let value: Option<ResultValue> = match field {
            Field::Value => code.map(ResultValue::Int),
            // stage names only exist for sleep analysis
            Field::Stage if kind == CategoryType::SleepAnalysis => code
                .and_then(SleepStage::from_code)
                .map(|stage| stage.display_name().into()),
            Field::Stage => None,
            Field::Severity => code
                .and_then(Severity::from_code)
                .map(|severity| severity.display_name().into()),
            Field::Duration => Some(sample.elapsed_secs().into()),
            _ => common_column(field, sample),
        };
        if let Some(value) = value {
            row.insert(field.column_name(), value);
        }
    }
    row
}
