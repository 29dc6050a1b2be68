use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use image::{ImageFormat, Rgb, RgbImage};
use mediatwin::{BatchOptions, MediaTwin, MediaTwinConfig, RawMediaInput, SearchOptions};

fn png(seed: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(128, 128, |x, y| {
        Rgb([
            ((x * 2 + seed) % 256) as u8,
            ((y * 3 + seed * 7) % 256) as u8,
            ((x ^ y ^ seed) % 256) as u8,
        ])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn connected(config: MediaTwinConfig) -> MediaTwin {
    let mut twin = MediaTwin::in_memory(config).unwrap();
    twin.connect().unwrap();
    twin
}

fn bench_compute(c: &mut Criterion) {
    let twin = connected(MediaTwinConfig::default());
    let bytes = png(1);

    c.bench_function("compute_fingerprints_128px", |b| {
        b.iter(|| black_box(twin.compute_fingerprints(black_box(&bytes)).unwrap()))
    });
}

fn bench_add(c: &mut Criterion) {
    let mut config = MediaTwinConfig::default();
    config.auto_persist = false;
    let inputs: Vec<Vec<u8>> = (0..32).map(png).collect();

    let mut group = c.benchmark_group("add");
    group.throughput(Throughput::Elements(inputs.len() as u64));
    group.bench_function("sequential_32", |b| {
        b.iter_batched(
            || connected(config.clone()),
            |mut twin| {
                for (i, bytes) in inputs.iter().enumerate() {
                    twin.add(RawMediaInput::new(bytes.clone()).with_id(format!("m{i}")))
                        .unwrap();
                }
                twin
            },
            BatchSize::PerIteration,
        )
    });
    group.bench_function("batch_32", |b| {
        b.iter_batched(
            || connected(config.clone()),
            |mut twin| {
                let batch = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, bytes)| RawMediaInput::new(bytes.clone()).with_id(format!("m{i}")))
                    .collect();
                twin.add_batch(batch, &BatchOptions::default().with_chunk_size(8), |_, _| {})
                    .unwrap();
                twin
            },
            BatchSize::PerIteration,
        )
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut config = MediaTwinConfig::default();
    config.auto_persist = false;
    let mut twin = connected(config);
    for i in 0..200 {
        twin.add(RawMediaInput::new(png(i)).with_id(format!("m{i}")))
            .unwrap();
    }
    let query = png(17);

    c.bench_function("search_200_records", |b| {
        b.iter(|| {
            let hits = twin
                .search(RawMediaInput::new(query.clone()), &SearchOptions::default())
                .unwrap();
            black_box(hits)
        })
    });
}

criterion_group!(benches, bench_compute, bench_add, bench_search);
criterion_main!(benches);
