//! Native query model
//!
//! Records held by a store and the query objects the handlers build for it.
//! Handlers never look inside these after construction; they hand them to a
//! `HealthStore` and read back a `QueryOutput`.

use crate::ir::{CategoryType, GroupBy, QuantityType, Timestamp, WorkoutType};
use std::cmp::Ordering;
use uuid::Uuid;

/// Source name used when a record does not carry one
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Record type a store holds and authorizes reads for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Quantity(QuantityType),
    Category(CategoryType),
    Workout,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quantity(q) => write!(f, "quantity:{}", q.display_name()),
            Self::Category(c) => write!(f, "category:{}", c.display_name()),
            Self::Workout => write!(f, "workout"),
        }
    }
}

/// Workout-specific payload
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDetails {
    pub activity: Option<WorkoutType>,
    /// Seconds
    pub duration: f64,
    /// Kilocalories
    pub total_energy: Option<f64>,
    /// Metres
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    /// Value in the kind's canonical unit
    Quantity(f64),
    Category(i64),
    Workout(WorkoutDetails),
}

/// One stored record
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: RecordKind,
    pub start: Timestamp,
    pub end: Timestamp,
    pub value: SampleValue,
    pub source: String,
    pub device: Option<String>,
}

impl Sample {
    fn new(kind: RecordKind, value: SampleValue, start: Timestamp, end: Timestamp) -> Self {
        Self {
            kind,
            start,
            end,
            value,
            source: UNKNOWN_SOURCE.to_string(),
            device: None,
        }
    }

    pub fn quantity(kind: QuantityType, value: f64, start: Timestamp, end: Timestamp) -> Self {
        Self::new(RecordKind::Quantity(kind), SampleValue::Quantity(value), start, end)
    }

    pub fn category(kind: CategoryType, code: i64, start: Timestamp, end: Timestamp) -> Self {
        Self::new(RecordKind::Category(kind), SampleValue::Category(code), start, end)
    }

    pub fn workout(details: WorkoutDetails, start: Timestamp, end: Timestamp) -> Self {
        Self::new(RecordKind::Workout, SampleValue::Workout(details), start, end)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// `end - start` in seconds
    pub fn elapsed_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    pub fn quantity_value(&self) -> Option<f64> {
        match self.value {
            SampleValue::Quantity(v) => Some(v),
            _ => None,
        }
    }

    pub fn category_code(&self) -> Option<i64> {
        match self.value {
            SampleValue::Category(code) => Some(code),
            _ => None,
        }
    }

    pub fn workout_details(&self) -> Option<&WorkoutDetails> {
        match &self.value {
            SampleValue::Workout(details) => Some(details),
            _ => None,
        }
    }
}

/// Date bounds on a sample.
///
/// A non-strict start keeps samples ending at or after `start`; a strict start
/// keeps only samples starting at or after it. A non-strict end keeps samples
/// starting at or before `end`; a strict end keeps only samples ending at or
/// before it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DateWindow {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub strict_start: bool,
    pub strict_end: bool,
}

impl DateWindow {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    pub fn strict_start(mut self) -> Self {
        self.strict_start = true;
        self
    }

    pub fn strict_end(mut self) -> Self {
        self.strict_end = true;
        self
    }

    fn matches(&self, sample: &Sample) -> bool {
        let after_start = match self.start {
            None => true,
            Some(start) if self.strict_start => sample.start >= start,
            Some(start) => sample.end >= start,
        };
        let before_end = match self.end {
            None => true,
            Some(end) if self.strict_end => sample.end <= end,
            Some(end) => sample.start <= end,
        };
        after_start && before_end
    }
}

/// Filter a store applies while fetching
#[derive(Debug, Clone, PartialEq)]
pub enum NativeFilter {
    Window(DateWindow),
    And(Vec<NativeFilter>),
}

impl NativeFilter {
    pub fn matches(&self, sample: &Sample) -> bool {
        match self {
            Self::Window(window) => window.matches(sample),
            Self::And(filters) => filters.iter().all(|f| f.matches(sample)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    StartDate,
    EndDate,
    /// Workout duration, or elapsed time for other records
    Duration,
    TotalEnergy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn new(key: SortKey, ascending: bool) -> Self {
        Self { key, ascending }
    }

    /// Compare two samples on this key, honouring direction
    pub fn compare(&self, a: &Sample, b: &Sample) -> Ordering {
        let ordering = match self.key {
            SortKey::StartDate => a.start.cmp(&b.start),
            SortKey::EndDate => a.end.cmp(&b.end),
            SortKey::Duration => duration_of(a).total_cmp(&duration_of(b)),
            SortKey::TotalEnergy => energy_of(a).total_cmp(&energy_of(b)),
        };
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

fn duration_of(sample: &Sample) -> f64 {
    sample
        .workout_details()
        .map(|w| w.duration)
        .unwrap_or_else(|| sample.elapsed_secs())
}

// Missing energy sorts before any value
fn energy_of(sample: &Sample) -> f64 {
    sample
        .workout_details()
        .and_then(|w| w.total_energy)
        .unwrap_or(f64::NEG_INFINITY)
}

/// Which statistics to compute per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatisticsOptions {
    pub cumulative_sum: bool,
    pub discrete_average: bool,
    pub discrete_min: bool,
    pub discrete_max: bool,
}

impl StatisticsOptions {
    pub fn is_empty(&self) -> bool {
        !(self.cumulative_sum || self.discrete_average || self.discrete_min || self.discrete_max)
    }
}

/// Fetch raw samples
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuery {
    pub id: Uuid,
    pub kind: RecordKind,
    pub filter: Option<NativeFilter>,
    /// `None` fetches everything
    pub limit: Option<usize>,
    /// Applied in order; empty leaves store order
    pub sort: Vec<SortDescriptor>,
}

impl SampleQuery {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            filter: None,
            limit: None,
            sort: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Option<NativeFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortDescriptor>) -> Self {
        self.sort = sort;
        self
    }
}

/// Bucketed statistics over a quantity kind.
///
/// Buckets are `anchor + k * interval` for integer `k`; the result covers
/// every bucket overlapping `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsQuery {
    pub id: Uuid,
    pub kind: QuantityType,
    pub filter: Option<NativeFilter>,
    pub options: StatisticsOptions,
    pub anchor: Timestamp,
    pub interval: GroupBy,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// A query handed to a store
#[derive(Debug, Clone, PartialEq)]
pub enum NativeQuery {
    Samples(SampleQuery),
    Statistics(StatisticsQuery),
}

impl NativeQuery {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Samples(q) => q.id,
            Self::Statistics(q) => q.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Samples(q) => q.kind,
            Self::Statistics(q) => RecordKind::Quantity(q.kind),
        }
    }
}

/// Statistics for one bucket; values are `None` when the bucket is empty
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub start: Timestamp,
    pub end: Timestamp,
    pub sum: Option<f64>,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

/// What a store returns for a `NativeQuery`
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Samples(Vec<Sample>),
    Statistics(Vec<Statistics>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::calendar::resolve_local;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> Timestamp {
        let naive = NaiveDate::from_ymd_opt(2026, 2, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        resolve_local(naive).unwrap()
    }

    fn sample(start: Timestamp, end: Timestamp) -> Sample {
        Sample::quantity(QuantityType::Steps, 1.0, start, end)
    }

    #[test]
    fn test_window_non_strict_overlaps() {
        let filter = NativeFilter::Window(DateWindow::new(Some(at(10, 0)), Some(at(11, 0))));
        // ends inside the window
        assert!(filter.matches(&sample(at(9, 50), at(10, 10))));
        // starts inside the window
        assert!(filter.matches(&sample(at(10, 55), at(11, 30))));
        assert!(!filter.matches(&sample(at(9, 0), at(9, 30))));
        assert!(!filter.matches(&sample(at(11, 30), at(11, 40))));
    }

    #[test]
    fn test_window_strict_bounds() {
        let start_only = NativeFilter::Window(DateWindow::new(Some(at(10, 0)), None).strict_start());
        assert!(!start_only.matches(&sample(at(9, 50), at(10, 10))));
        assert!(start_only.matches(&sample(at(10, 0), at(10, 10))));

        let end_only = NativeFilter::Window(DateWindow::new(None, Some(at(11, 0))).strict_end());
        assert!(!end_only.matches(&sample(at(10, 55), at(11, 30))));
        assert!(end_only.matches(&sample(at(10, 0), at(11, 0))));
    }

    #[test]
    fn test_and_filter() {
        let filter = NativeFilter::And(vec![
            NativeFilter::Window(DateWindow::new(Some(at(10, 0)), None).strict_start()),
            NativeFilter::Window(DateWindow::new(None, Some(at(12, 0))).strict_end()),
        ]);
        assert!(filter.matches(&sample(at(10, 30), at(11, 0))));
        assert!(!filter.matches(&sample(at(11, 30), at(12, 30))));
    }

    #[test]
    fn test_sort_descriptor() {
        let a = sample(at(8, 0), at(9, 0));
        let b = sample(at(10, 0), at(10, 5));
        let desc = SortDescriptor::new(SortKey::StartDate, false);
        assert_eq!(desc.compare(&a, &b), Ordering::Greater);
        let by_duration = SortDescriptor::new(SortKey::Duration, true);
        assert_eq!(by_duration.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_sample_accessors() {
        let s = Sample::category(CategoryType::Headache, 2, at(8, 0), at(8, 30))
            .with_source("iPhone")
            .with_device("iPhone 15");
        assert_eq!(s.category_code(), Some(2));
        assert_eq!(s.quantity_value(), None);
        assert_eq!(s.elapsed_secs(), 1800.0);
        assert_eq!(s.source, "iPhone");
        assert_eq!(s.device.as_deref(), Some("iPhone 15"));
        assert_eq!(
            Sample::quantity(QuantityType::Steps, 1.0, at(8, 0), at(8, 1)).source,
            UNKNOWN_SOURCE
        );
    }

    #[test]
    fn test_statistics_options_empty() {
        assert!(StatisticsOptions::default().is_empty());
        let options = StatisticsOptions {
            discrete_max: true,
            ..Default::default()
        };
        assert!(!options.is_empty());
    }
}
