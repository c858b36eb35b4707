use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sltag_core::SltagAnalyzer;
use sltag_core::config::SltagConfig;
use sltag_core::oracle::{AlignmentBlocks, AllMatch, BlockPair};
use std::time::Duration;

/// Sized for parses of milliseconds up to about a second.
fn chart_criterion() -> Criterion {
    Criterion::default()
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(1))
        .sample_size(20)
        .noise_threshold(0.05)
}

/// `unit` repeated on both sides of `spacer`.
fn direct_repeat(unit: &str, spacer: &str) -> String {
    format!("{unit}{spacer}{unit}")
}

/// Oracle pairing the two copies of a direct repeat position by position.
fn repeat_blocks(unit_len: usize, spacer_len: usize) -> AlignmentBlocks {
    let second = unit_len + spacer_len + 1;
    AlignmentBlocks::new([BlockPair::new(
        (1, unit_len),
        (second, second + unit_len - 1),
    )])
}

fn benchmark_sequence_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_repeat_length");
    let analyzer = SltagAnalyzer::new(SltagConfig::default());

    for unit_len in [8usize, 16, 32] {
        let unit: String = "gattaca".chars().cycle().take(unit_len).collect();
        let spacer = "tttt";
        let sequence = direct_repeat(&unit, spacer);
        let oracle = repeat_blocks(unit_len, spacer.len());

        group.throughput(Throughput::Bytes(sequence.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("alignment_blocks", sequence.len()),
            &sequence,
            |b, sequence| {
                b.iter(|| {
                    analyzer
                        .analyze_sequence(black_box(sequence), None, &oracle)
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

fn benchmark_exhaustive_oracle(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_match");
    let sequence = direct_repeat("acgtac", "gg");

    for threads in [1usize, 4] {
        let analyzer = SltagAnalyzer::new(SltagConfig {
            num_threads: Some(threads),
            ..Default::default()
        });
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, _| {
            b.iter(|| {
                analyzer
                    .analyze_sequence(black_box(&sequence), None, &AllMatch)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = chart_criterion();
    targets = benchmark_sequence_length,
    benchmark_exhaustive_oracle
);
criterion_main!(benches);
