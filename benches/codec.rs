//! Base62 codec 性能基准测试

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use seqlink::blacklist::BlacklistFilter;
use seqlink::codec::Codec;
use seqlink::dedup::Fingerprint;
use std::hint::black_box;

fn bench_encode(c: &mut Criterion) {
    let codec = Codec::default();
    let mut group = c.benchmark_group("codec/encode");

    for id in [1u64, 6347, 56_800_235_583, u64::MAX] {
        group.bench_with_input(BenchmarkId::from_parameter(id), &id, |b, &id| {
            b.iter(|| codec.encode(black_box(id)));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let codec = Codec::default();
    let mut group = c.benchmark_group("codec/decode");

    for id in [1u64, 6347, 56_800_235_583, u64::MAX] {
        let token = codec.encode(id);
        group.bench_with_input(BenchmarkId::from_parameter(&token), &token, |b, token| {
            b.iter(|| codec.decode(black_box(token)).unwrap());
        });
    }
    group.finish();
}

fn bench_decode_invalid(c: &mut Criterion) {
    let codec = Codec::default();
    c.bench_function("codec/decode_invalid", |b| {
        b.iter(|| codec.decode(black_box("favicon.ico")).is_err());
    });
}

fn bench_blacklisted_allocation(c: &mut Criterion) {
    let codec = Codec::default();
    let blacklist = BlacklistFilter::new(["api", "admin", "health", "version", "login", "static"]);

    let mut group = c.benchmark_group("codec/encode_and_filter");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("1000_ids", |b| {
        b.iter(|| {
            (1..=1000u64)
                .map(|id| codec.encode(id))
                .filter(|token| !blacklist.contains(token))
                .count()
        });
    });
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup/fingerprint");
    for len in [32usize, 256, 2048] {
        let url = format!("https://example.com/{}", "a".repeat(len));
        group.throughput(Throughput::Bytes(url.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &url, |b, url| {
            b.iter(|| Fingerprint::of(black_box(url)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_decode_invalid,
    bench_blacklisted_allocation,
    bench_fingerprint
);
criterion_main!(benches);
