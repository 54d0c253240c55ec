use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::fs;

use pfparse::dict::ShardedDict;
use pfparse::krhash::{KrWindow, kr_hash};
use pfparse::parse::{ParseConfig, process_file};

/// Text over the valid byte range with enough repetition for a small dictionary.
fn make_test_data(size: usize) -> Vec<u8> {
    let mut seed = 0x9E37_79B9_7F4A_7C15u64;
    let block: Vec<u8> = (0..64 * 1024)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 26) as u8 + b'a'
        })
        .collect();
    block.iter().copied().cycle().take(size).collect()
}

fn bench_rolling_window(c: &mut Criterion) {
    let data = make_test_data(1024 * 1024);
    let mut group = c.benchmark_group("kr_window");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for w in [10usize, 32] {
        group.bench_with_input(BenchmarkId::new("add_byte", w), &data, |b, data| {
            b.iter(|| {
                let mut krw = KrWindow::new(w);
                data.iter().fold(0u64, |acc, &c| acc ^ krw.add_byte(c))
            });
        });
    }
    group.bench_with_input(BenchmarkId::new("kr_hash", "1MB"), &data, |b, data| {
        b.iter(|| kr_hash(data));
    });
    group.finish();
}

fn bench_process_file(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bench.txt");
    let data = make_test_data(16 * 1024 * 1024);
    fs::write(&input, &data).unwrap();

    let mut group = c.benchmark_group("process_file");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(data.len() as u64));
    for threads in [1usize, 2, 4, 8] {
        let config = ParseConfig {
            threads,
            ..ParseConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("16MB", threads), &config, |b, config| {
            b.iter(|| {
                let dict = ShardedDict::new(config.shard_count(), config.max_occurrences);
                process_file(&input, &input, config, &dict).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rolling_window, bench_process_file);
criterion_main!(benches);
