//! Criterion microbenches for network description parsing and prototxt generation.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use maccnet::compiler::{compile, compile_pair, Variant};
use maccnet::config::parse_config;
use maccnet::{BbType, CompileOptions};

// Include test fixtures at compile time (no file I/O during benchmark)
const SAMPLE_NET: &str = include_str!("../tests/fixtures/sample_net.txt");

fn bench_parse_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_parse");
    group.throughput(Throughput::Bytes(SAMPLE_NET.len() as u64));

    group.bench_function("parse_config", |b| {
        b.iter(|| {
            let config = parse_config(black_box(SAMPLE_NET)).unwrap();
            black_box(config)
        })
    });

    group.finish();
}

/// Compilation alone; the config is parsed outside the timed region.
fn bench_compile(c: &mut Criterion) {
    let config = parse_config(SAMPLE_NET).expect("Failed to parse sample network");
    let opts = CompileOptions::new(BbType::Bb3txt);

    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Elements(config.lines.len() as u64));

    group.bench_function("compile_deploy", |b| {
        b.iter(|| {
            let compiled = compile(black_box(&config), &opts, Variant::Deploy).unwrap();
            black_box(compiled)
        })
    });

    group.bench_function("compile_pair", |b| {
        b.iter(|| {
            let pair = compile_pair(black_box(&config), &opts).unwrap();
            black_box(pair)
        })
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let config = parse_config(SAMPLE_NET).expect("Failed to parse sample network");
    let compiled = compile(
        &config,
        &CompileOptions::new(BbType::Bb3txt),
        Variant::TrainVal,
    )
    .expect("Failed to compile sample network");

    let mut group = c.benchmark_group("render");
    group.bench_function("train_val_to_string", |b| {
        b.iter(|| {
            let text = black_box(&compiled.document).to_string();
            black_box(text)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse_config, bench_compile, bench_render);
criterion_main!(benches);
