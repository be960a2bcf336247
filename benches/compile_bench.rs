//! Benchmarks for HealthQL compilation and in-memory evaluation
//!
//! Run with: cargo bench

use chrono::{Duration, Local, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use healthql::ir::{Clock, GroupBy, QuantityType};
use healthql::query::{parse, tokenize, Compiler};
use healthql::store::{
    NativeQuery, RecordKind, Sample, SampleQuery, SampleSet, SortDescriptor, SortKey,
    StatisticsOptions, StatisticsQuery,
};
use uuid::Uuid;

const QUERIES: &[(&str, &str)] = &[
    ("simple", "SELECT * FROM steps"),
    (
        "grouped",
        "SELECT sum(count), avg(count) FROM steps WHERE date > today() - 7d GROUP BY day",
    ),
    (
        "ordered",
        "SELECT duration, total_calories FROM workouts WHERE date BETWEEN '2026-01-01' AND '2026-02-01' ORDER BY duration DESC LIMIT 10",
    ),
];

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let clock = Clock::System;

    for (name, text) in QUERIES {
        group.bench_function(format!("tokenize_{}", name), |b| {
            b.iter(|| tokenize(black_box(text)).unwrap())
        });

        let tokens = tokenize(text).unwrap();
        group.bench_function(format!("parse_{}", name), |b| {
            b.iter(|| parse(black_box(tokens.clone())).unwrap())
        });

        let stmt = parse(tokens).unwrap();
        group.bench_function(format!("compile_{}", name), |b| {
            b.iter(|| Compiler::with_clock(clock).compile(black_box(&stmt)).unwrap())
        });
    }

    group.finish();
}

fn create_samples(count: usize) -> SampleSet {
    let origin = Local.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    SampleSet::new(
        (0..count)
            .map(|i| {
                let start = origin + Duration::minutes(i as i64 * 10);
                Sample::quantity(QuantityType::Steps, (i % 500) as f64, start, start + Duration::minutes(5))
            })
            .collect(),
    )
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for size in [1_000, 10_000, 100_000] {
        let set = create_samples(size);
        group.throughput(Throughput::Elements(size as u64));

        let samples = NativeQuery::Samples(
            SampleQuery::new(RecordKind::Quantity(QuantityType::Steps))
                .with_sort(vec![SortDescriptor::new(SortKey::StartDate, false)])
                .with_limit(Some(100)),
        );
        group.bench_function(format!("samples_{}", size), |b| {
            b.iter(|| set.execute(black_box(&samples)))
        });

        let anchor = Local.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let statistics = NativeQuery::Statistics(StatisticsQuery {
            id: Uuid::new_v4(),
            kind: QuantityType::Steps,
            filter: None,
            options: StatisticsOptions {
                cumulative_sum: true,
                discrete_average: true,
                ..Default::default()
            },
            anchor,
            interval: GroupBy::Day,
            start: anchor,
            end: anchor + Duration::days(365),
        });
        group.bench_function(format!("statistics_by_day_{}", size), |b| {
            b.iter(|| set.execute(black_box(&statistics)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
