//! Nightly sleep sessions
//!
//! Stage-tagged `sleep_analysis` records are folded into one session per night.
//! A record starting before noon belongs to the previous day's night; one
//! starting at or after noon belongs to the same day's night. Total sleep is
//! REM + core + deep + unspecified asleep; in-bed and awake time are reported
//! separately and never counted as sleep.

use crate::executor::result::ResultRow;
use crate::executor::translator::PredicateTranslator;
use crate::executor::{fetch_samples, selected_fields, AuthorizationCache};
use crate::ir::calendar::{shift, start_of_day};
use crate::ir::{CategoryType, Field, GroupBy, HealthQuery, SleepStage, Timestamp};
use crate::store::{HealthStore, RecordKind, Sample, SampleQuery, SortDescriptor, SortKey, StoreResult};
use chrono::Timelike;
use std::collections::BTreeMap;
use std::sync::Arc;

const NOON: u32 = 12;

/// Runs queries against the `sleep` table
pub struct SleepSessionHandler {
    store: Arc<dyn HealthStore>,
    authorization: AuthorizationCache,
    translator: PredicateTranslator,
}

impl SleepSessionHandler {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self {
            store,
            authorization: AuthorizationCache::new(),
            translator: PredicateTranslator::new(),
        }
    }

    pub async fn execute(&self, query: &HealthQuery) -> StoreResult<Vec<ResultRow>> {
        let kind = RecordKind::Category(CategoryType::SleepAnalysis);
        self.authorization.ensure(self.store.as_ref(), kind).await?;

        // Every record is needed to build a night, so no limit here
        let native = SampleQuery::new(kind)
            .with_filter(self.translator.translate(&query.predicates))
            .with_sort(vec![SortDescriptor::new(SortKey::StartDate, true)]);
        let samples = fetch_samples(self.store.as_ref(), native).await?;

        let sessions = group_into_sessions(&samples);
        tracing::trace!(records = samples.len(), nights = sessions.len(), "Grouped sleep records");

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(sessions
            .iter()
            .take(limit)
            .map(|session| session_row(session, query))
            .collect())
    }
}

/// Night a record belongs to, as local midnight of that evening's day
pub fn night_of(start: Timestamp) -> Timestamp {
    let day = start_of_day(start);
    if start.hour() < NOON {
        start_of_day(shift(day, GroupBy::Day, -1))
    } else {
        day
    }
}

/// One night of sleep records
#[derive(Debug, Clone, PartialEq)]
pub struct SleepSession {
    pub night: Timestamp,
    /// End of the last record, in fetch order
    pub end: Option<Timestamp>,
    stages: BTreeMap<i64, f64>,
}

impl SleepSession {
    fn new(night: Timestamp) -> Self {
        Self {
            night,
            end: None,
            stages: BTreeMap::new(),
        }
    }

    fn add(&mut self, sample: &Sample) {
        if let Some(code) = sample.category_code() {
            *self.stages.entry(code).or_insert(0.0) += sample.elapsed_secs();
        }
        self.end = Some(sample.end);
    }

    /// Seconds spent in `stage`
    pub fn duration_of(&self, stage: SleepStage) -> f64 {
        self.stages.get(&stage.code()).copied().unwrap_or(0.0)
    }

    /// Seconds asleep, excluding in-bed and awake time
    pub fn total_sleep(&self) -> f64 {
        self.duration_of(SleepStage::AsleepRem)
            + self.duration_of(SleepStage::AsleepCore)
            + self.duration_of(SleepStage::AsleepDeep)
            + self.duration_of(SleepStage::AsleepUnspecified)
    }
}

/// Group records into sessions, sorted by night ascending
pub fn group_into_sessions(samples: &[Sample]) -> Vec<SleepSession> {
    let mut nights: BTreeMap<Timestamp, SleepSession> = BTreeMap::new();
    for sample in samples {
        let night = night_of(sample.start);
        nights
            .entry(night)
            .or_insert_with(|| SleepSession::new(night))
            .add(sample);
    }
    nights.into_values().collect()
}

fn session_row(session: &SleepSession, query: &HealthQuery) -> ResultRow {
    let mut row = ResultRow::new();
    for field in selected_fields(query) {
        match field {
            Field::Date => row.insert(field.column_name(), session.night),
            Field::EndDate => {
                if let Some(end) = session.end {
                    row.insert(field.column_name(), end);
                }
            }
            Field::Duration => row.insert(field.column_name(), session.total_sleep()),
            Field::InBedDuration => {
                row.insert(field.column_name(), session.duration_of(SleepStage::InBed))
            }
            Field::Rem => row.insert(field.column_name(), session.duration_of(SleepStage::AsleepRem)),
            Field::Core => {
                row.insert(field.column_name(), session.duration_of(SleepStage::AsleepCore))
            }
            Field::Deep => {
                row.insert(field.column_name(), session.duration_of(SleepStage::AsleepDeep))
            }
            Field::Awake => row.insert(field.column_name(), session.duration_of(SleepStage::Awake)),
            _ => {}
        }
    }
    row
}
