//! Benchmarks comparing the CLAHE run strategies
//!
//! Run with: cargo bench -p altalux-core

use std::hint::black_box;

use altalux_core::{AltaLuxFilter, Strategy};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random interleaved buffer, same seed for every strategy
fn random_buffer(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0x5555);
    let mut buffer = vec![0u8; len];
    rng.fill(buffer.as_mut_slice());
    buffer
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies_rgb32");

    for &(width, height) in &[(640u32, 480u32), (1024, 768), (2048, 1536)] {
        let pixel_count = width as u64 * height as u64;
        let input = random_buffer(pixel_count as usize * 4);
        group.throughput(Throughput::Elements(pixel_count));

        for strategy in Strategy::ALL {
            let mut filter = AltaLuxFilter::with_strategy(strategy, width, height, 8, 8);
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), format!("{width}x{height}")),
                &input,
                |b, input| {
                    let mut buffer = input.clone();
                    b.iter(|| {
                        buffer.copy_from_slice(input);
                        filter.process_rgb32(black_box(&mut buffer)).ok();
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_grid_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_sizes_gray");
    let (width, height) = (1024u32, 768u32);
    let input = random_buffer((width * height) as usize);

    for regions in [2u32, 4, 8, 16] {
        let mut filter = AltaLuxFilter::with_slices(width, height, regions, regions);
        group.bench_with_input(
            BenchmarkId::new("split_loop", format!("{regions}x{regions}")),
            &input,
            |b, input| {
                let mut buffer = input.clone();
                b.iter(|| {
                    buffer.copy_from_slice(input);
                    filter.process_gray(black_box(&mut buffer)).ok();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_grid_sizes);
criterion_main!(benches);
