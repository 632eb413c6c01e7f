//! Diff mapping benchmarks.
//!
//! These benchmarks measure the performance of:
//! - Scanning a preview diff (scan)
//! - Resolving one comment position (resolve) and a batch of them (resolve_many)
//! - Per-file stat aggregation (aggregate_file_stats)

mod common;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use common::{generate_comment_lines, generate_preview_diff};
use launchpad_mp::{aggregate_file_stats, resolve, resolve_many, scan};

/// (files, hunks per file, hunk length)
const SIZES: [(usize, usize, usize); 3] = [(5, 4, 25), (20, 5, 40), (80, 6, 50)];

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_parsing/scan");

    for (files, hunks, len) in SIZES {
        let diff = generate_preview_diff(files, hunks, len);
        let line_count = diff.split('\n').count();

        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(line_count), &diff, |b, diff| {
            b.iter(|| {
                for line in scan(black_box(diff)) {
                    let _ = black_box(line);
                }
            });
        });
    }

    group.finish();
}

/// Single lookups at the start, middle and end of the diff.
///
/// A lookup scans up to the target line, so cost grows with the position.
fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_parsing/resolve");

    let diff = generate_preview_diff(20, 5, 40);
    let line_count = diff.split('\n').count();

    for (position_name, position) in [
        ("start", 10_usize),
        ("middle", line_count / 2),
        ("end", line_count.saturating_sub(5)),
    ] {
        group.bench_with_input(
            BenchmarkId::new(position_name, position),
            &position,
            |b, &pos| {
                b.iter(|| black_box(resolve(black_box(&diff), black_box(pos))));
            },
        );
    }

    group.finish();
}

/// Batch resolution vs one `resolve` call per comment.
fn bench_resolve_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_parsing/resolve_batch");

    let diff = generate_preview_diff(20, 5, 40);
    let comments = generate_comment_lines(diff.split('\n').count(), 0.05);
    group.throughput(Throughput::Elements(comments.len() as u64));

    group.bench_with_input(BenchmarkId::from_parameter("batch"), &comments, |b, lines| {
        b.iter(|| black_box(resolve_many(black_box(&diff), black_box(lines))));
    });

    group.bench_with_input(BenchmarkId::from_parameter("one_by_one"), &comments, |b, lines| {
        b.iter(|| {
            for &line in lines {
                let _ = black_box(resolve(black_box(&diff), line));
            }
        });
    });

    group.finish();
}

fn bench_aggregate_file_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_parsing/aggregate_file_stats");

    for (files, hunks, len) in SIZES {
        let diff = generate_preview_diff(files, hunks, len);

        group.bench_with_input(BenchmarkId::from_parameter(files), &diff, |b, diff| {
            b.iter(|| black_box(aggregate_file_stats(black_box(diff))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scan,
    bench_resolve,
    bench_resolve_batch,
    bench_aggregate_file_stats,
);
criterion_main!(benches);
