use std::hint::black_box;

use clap::ValueEnum;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use image::{DynamicImage, RgbImage};
use imcheck::HashAlg;
use imcheck::hamming::{hamming, hamming_naive};
use rand::prelude::*;

fn random_image(width: u32, height: u32) -> DynamicImage {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; (width * height * 3) as usize];
    rng.fill_bytes(&mut buf);
    DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, buf).unwrap())
}

fn bench_hamming(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hamming");
    let mut rng = rand::rng();
    let mut src = vec![0u8; 32];
    let mut dst = vec![0u8; 8 << 20];
    rng.fill_bytes(&mut src);
    rng.fill_bytes(&mut dst);

    group.throughput(Throughput::Bytes(dst.len() as u64));
    group.bench_function("hamming_32_naive", |b| {
        b.iter(|| {
            dst.chunks_exact(black_box(32)).map(|chunk| hamming_naive(&src, chunk)).sum::<u32>()
        });
    });
    group.bench_function("hamming_32_u64", |b| {
        b.iter(|| dst.chunks_exact(black_box(32)).map(|chunk| hamming(&src, chunk)).sum::<u32>());
    });
    group.finish();
}

fn bench_hash(c: &mut Criterion) {
    let img = random_image(1920, 1080);

    let mut group = c.benchmark_group("感知哈希");
    group.throughput(Throughput::Elements(1));
    for alg in HashAlg::value_variants() {
        let name = format!("{:?}", alg).to_lowercase();
        group.bench_function(name, |b| b.iter(|| alg.hash_image(black_box(&img), 8)));
    }
    group.finish();
}

criterion_group!(benches, bench_hamming, bench_hash);
criterion_main!(benches);
