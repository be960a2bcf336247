//! Anchored statistics buckets
//!
//! Bucket `k` spans `[shift(anchor, k), shift(anchor, k + 1))`, where `shift`
//! moves by whole calendar periods. Each bucket boundary is computed from the
//! anchor directly so month clamping never accumulates.

use crate::ir::calendar::{shift, Timestamp};
use crate::ir::GroupBy;
use crate::store::types::{Statistics, StatisticsOptions};
use std::collections::BTreeMap;

/// Rough period length, used only to seed the bucket search
fn approx_secs(period: GroupBy) -> i64 {
    match period {
        GroupBy::Hour => 3_600,
        GroupBy::Day => 86_400,
        GroupBy::Week => 604_800,
        GroupBy::Month => 2_629_746,
        GroupBy::Year => 31_556_952,
    }
}

// Enough to correct any DST or month-length error in the seed
const MAX_ADJUST_STEPS: usize = 64;

/// Index of the bucket containing `instant`
pub fn bucket_index(anchor: Timestamp, interval: GroupBy, instant: Timestamp) -> i64 {
    let mut k = (instant - anchor).num_seconds().div_euclid(approx_secs(interval));

    for _ in 0..MAX_ADJUST_STEPS {
        if shift(anchor, interval, k) > instant {
            k -= 1;
        } else if shift(anchor, interval, k + 1) <= instant {
            k += 1;
        } else {
            break;
        }
    }
    k
}

/// Bounds of bucket `k`
pub fn bucket_bounds(anchor: Timestamp, interval: GroupBy, k: i64) -> (Timestamp, Timestamp) {
    (shift(anchor, interval, k), shift(anchor, interval, k + 1))
}

/// Indices of every bucket overlapping `[start, end)`
pub fn bucket_range(
    anchor: Timestamp,
    interval: GroupBy,
    start: Timestamp,
    end: Timestamp,
) -> std::ops::RangeInclusive<i64> {
    let first = bucket_index(anchor, interval, start);
    let mut last = bucket_index(anchor, interval, end);
    if shift(anchor, interval, last) >= end {
        last -= 1;
    }
    first..=last
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }
}

/// Compute per-bucket statistics for `(start, value)` points.
///
/// Each point lands in the bucket containing its start. Every bucket in the
/// window is returned, in time order; empty buckets carry no values.
pub fn compute(
    points: impl IntoIterator<Item = (Timestamp, f64)>,
    anchor: Timestamp,
    interval: GroupBy,
    start: Timestamp,
    end: Timestamp,
    options: StatisticsOptions,
) -> Vec<Statistics> {
    let range = bucket_range(anchor, interval, start, end);

    let mut buckets: BTreeMap<i64, Accumulator> = BTreeMap::new();
    for (at, value) in points {
        let k = bucket_index(anchor, interval, at);
        if range.contains(&k) {
            buckets.entry(k).or_default().add(value);
        }
    }

    range
        .map(|k| {
            let (bucket_start, bucket_end) = bucket_bounds(anchor, interval, k);
            let acc = buckets.get(&k).filter(|acc| acc.count > 0);
            let pick = |wanted: bool, f: fn(&Accumulator) -> f64| {
                if wanted {
                    acc.map(f)
                } else {
                    None
                }
            };
            Statistics {
                start: bucket_start,
                end: bucket_end,
                sum: pick(options.cumulative_sum, |a| a.sum),
                average: pick(options.discrete_average, |a| a.sum / a.count as f64),
                minimum: pick(options.discrete_min, |a| a.min),
                maximum: pick(options.discrete_max, |a| a.max),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::calendar::resolve_local;
    use chrono::NaiveDate;

    fn local(m: u32, d: u32, h: u32) -> Timestamp {
        let naive = NaiveDate::from_ymd_opt(2026, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        resolve_local(naive).unwrap()
    }

    #[test]
    fn test_bucket_index_days() {
        let anchor = local(2, 11, 0);
        assert_eq!(bucket_index(anchor, GroupBy::Day, local(2, 11, 0)), 0);
        assert_eq!(bucket_index(anchor, GroupBy::Day, local(2, 11, 23)), 0);
        assert_eq!(bucket_index(anchor, GroupBy::Day, local(2, 10, 23)), -1);
        assert_eq!(bucket_index(anchor, GroupBy::Day, local(2, 4, 12)), -7);
    }

    #[test]
    fn test_bucket_index_months() {
        let anchor = local(2, 11, 0);
        assert_eq!(bucket_index(anchor, GroupBy::Month, local(2, 10, 0)), -1);
        assert_eq!(bucket_index(anchor, GroupBy::Month, local(1, 11, 0)), -1);
        assert_eq!(bucket_index(anchor, GroupBy::Month, local(1, 10, 23)), -2);
        assert_eq!(bucket_index(anchor, GroupBy::Month, local(3, 11, 0)), 1);
    }

    #[test]
    fn test_bucket_range_covers_partial_buckets() {
        let anchor = local(2, 11, 0);
        // starts mid-bucket, ends mid-bucket
        let range = bucket_range(anchor, GroupBy::Day, local(2, 8, 12), local(2, 11, 15));
        assert_eq!(range, -3..=0);
        // ends exactly on a boundary: that bucket is excluded
        let range = bucket_range(anchor, GroupBy::Day, local(2, 8, 0), local(2, 11, 0));
        assert_eq!(range, -3..=-1);
    }

    #[test]
    fn test_compute_includes_empty_buckets() {
        let anchor = local(2, 11, 0);
        let points = vec![
            (local(2, 9, 8), 1000.0),
            (local(2, 9, 20), 500.0),
            (local(2, 11, 9), 250.0),
            // outside the window
            (local(1, 1, 9), 99.0),
        ];
        let options = StatisticsOptions {
            cumulative_sum: true,
            discrete_max: true,
            ..Default::default()
        };
        let stats = compute(points, anchor, GroupBy::Day, local(2, 9, 0), local(2, 11, 12), options);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].start, local(2, 9, 0));
        assert_eq!(stats[0].sum, Some(1500.0));
        assert_eq!(stats[0].maximum, Some(1000.0));
        assert_eq!(stats[0].average, None);
        assert_eq!(stats[1].sum, None);
        assert_eq!(stats[1].end, local(2, 11, 0));
        assert_eq!(stats[2].sum, Some(250.0));
    }

    #[test]
    fn test_compute_average_and_min() {
        let anchor = local(2, 11, 0);
        let points = vec![(local(2, 11, 1), 60.0), (local(2, 11, 2), 80.0)];
        let options = StatisticsOptions {
            discrete_average: true,
            discrete_min: true,
            ..Default::default()
        };
        let stats = compute(points, anchor, GroupBy::Hour, local(2, 11, 0), local(2, 11, 3), options);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].average, None);
        assert_eq!(stats[1].average, Some(60.0));
        assert_eq!(stats[1].minimum, Some(60.0));
        assert_eq!(stats[2].minimum, Some(80.0));
    }
}
