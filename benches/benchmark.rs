// Fit and query benchmarks for the blending model
use blendx_core::{
    bpm_penalty, camelot_distance, compute_blending_score, to_camelot, FeatureSchema,
    FeatureTable, IndexParams, ModelBundle, TrackFeatures,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

const KEYS: [&str; 8] = [
    "C_major", "A_minor", "G_major", "E_minor", "F#_major", "D#_minor", "Bb_major", "unknown",
];

fn generate_library(size: usize, mfcc: usize) -> FeatureTable {
    let mut rng = rand::rng();
    let rows = (0..size)
        .map(|i| TrackFeatures {
            filename: format!("track{:06}.mp3", i),
            bpm: rng.random_range(80.0..180.0),
            key: KEYS[rng.random_range(0..KEYS.len())].to_string(),
            energy: rng.random_range(0.0..1.0),
            mfcc: (0..mfcc).map(|_| rng.random_range(-400.0..200.0)).collect(),
        })
        .collect();
    FeatureTable::new(FeatureSchema::with_mfcc(mfcc), rows).unwrap()
}

fn benchmark_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");

    for size in [100, 1000, 10000].iter() {
        let table = generate_library(*size, 13);
        group.bench_with_input(BenchmarkId::new("bundle", size), &table, |b, table| {
            b.iter(|| ModelBundle::fit(black_box(table.clone()), &IndexParams::default()).unwrap());
        });
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");

    for size in [100, 1000, 10000].iter() {
        let bundle = ModelBundle::fit(generate_library(*size, 13), &IndexParams::default()).unwrap();
        let names: Vec<String> = bundle.table().rows().iter().map(|r| r.filename.clone()).collect();
        let mut rng = rand::rng();

        group.bench_with_input(BenchmarkId::new("top5", size), &bundle, |b, bundle| {
            b.iter(|| {
                let name = &names[rng.random_range(0..names.len())];
                bundle.recommend(black_box(name), 5).unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_scoring(c: &mut Criterion) {
    let a = to_camelot("C_major");
    let b = to_camelot("A_minor");

    c.bench_function("blending_score", |bench| {
        bench.iter(|| {
            let cp = camelot_distance(black_box(a), black_box(b));
            let bp = bpm_penalty(black_box(120.0), black_box(124.0));
            compute_blending_score(black_box(0.8), cp, bp)
        });
    });
}

criterion_group!(benches, benchmark_fit, benchmark_recommend, benchmark_scoring);
criterion_main!(benches);
