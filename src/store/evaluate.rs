//! In-process evaluation of native queries over a set of samples

use crate::store::statistics;
use crate::store::types::{
    NativeQuery, QueryOutput, RecordKind, Sample, SampleQuery, Statistics, StatisticsQuery,
};

/// Samples held in memory, answerable with any `NativeQuery`
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Answer a query
    pub fn execute(&self, query: &NativeQuery) -> QueryOutput {
        match query {
            NativeQuery::Samples(q) => QueryOutput::Samples(self.samples(q)),
            NativeQuery::Statistics(q) => QueryOutput::Statistics(self.statistics(q)),
        }
    }

    fn samples(&self, query: &SampleQuery) -> Vec<Sample> {
        let mut matched: Vec<Sample> = self
            .samples
            .iter()
            .filter(|s| s.kind == query.kind)
            .filter(|s| query.filter.as_ref().map_or(true, |f| f.matches(s)))
            .cloned()
            .collect();

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|descriptor| descriptor.compare(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        matched
    }

    fn statistics(&self, query: &StatisticsQuery) -> Vec<Statistics> {
        let kind = RecordKind::Quantity(query.kind);
        let points = self
            .samples
            .iter()
            .filter(|s| s.kind == kind)
            .filter(|s| query.filter.as_ref().map_or(true, |f| f.matches(s)))
            .filter_map(|s| s.quantity_value().map(|v| (s.start, v)));

        statistics::compute(
            points,
            query.anchor,
            query.interval,
            query.start,
            query.end,
            query.options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::calendar::resolve_local;
    use crate::ir::{GroupBy, QuantityType, Timestamp};
    use crate::store::types::{
        DateWindow, NativeFilter, SortDescriptor, SortKey, StatisticsOptions,
    };
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn at(d: u32, h: u32) -> Timestamp {
        let naive = NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        resolve_local(naive).unwrap()
    }

    fn set() -> SampleSet {
        SampleSet::new(vec![
            Sample::quantity(QuantityType::Steps, 100.0, at(1, 8), at(1, 9)),
            Sample::quantity(QuantityType::Steps, 300.0, at(3, 8), at(3, 9)),
            Sample::quantity(QuantityType::Steps, 200.0, at(2, 8), at(2, 9)),
            Sample::quantity(QuantityType::HeartRate, 70.0, at(2, 8), at(2, 8)),
        ])
    }

    #[test]
    fn test_samples_filter_sort_limit() {
        let query = SampleQuery::new(RecordKind::Quantity(QuantityType::Steps))
            .with_filter(Some(NativeFilter::Window(
                DateWindow::new(Some(at(2, 0)), None).strict_start(),
            )))
            .with_sort(vec![SortDescriptor::new(SortKey::StartDate, false)])
            .with_limit(Some(1));

        let QueryOutput::Samples(samples) = set().execute(&NativeQuery::Samples(query)) else {
            panic!("expected samples");
        };
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].quantity_value(), Some(300.0));
    }

    #[test]
    fn test_samples_without_sort_keep_store_order() {
        let query = SampleQuery::new(RecordKind::Quantity(QuantityType::Steps));
        let QueryOutput::Samples(samples) = set().execute(&NativeQuery::Samples(query)) else {
            panic!("expected samples");
        };
        let values: Vec<f64> = samples.iter().filter_map(Sample::quantity_value).collect();
        assert_eq!(values, vec![100.0, 300.0, 200.0]);
    }

    #[test]
    fn test_statistics_by_day() {
        let query = StatisticsQuery {
            id: Uuid::new_v4(),
            kind: QuantityType::Steps,
            filter: None,
            options: StatisticsOptions {
                cumulative_sum: true,
                ..Default::default()
            },
            anchor: at(4, 0),
            interval: GroupBy::Day,
            start: at(1, 0),
            end: at(4, 0),
        };
        let QueryOutput::Statistics(stats) = set().execute(&NativeQuery::Statistics(query)) else {
            panic!("expected statistics");
        };
        let sums: Vec<Option<f64>> = stats.iter().map(|s| s.sum).collect();
        assert_eq!(sums, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }
}
