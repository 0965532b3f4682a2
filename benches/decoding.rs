use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

fn read_fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_decode_plain(c: &mut Criterion) {
    let raw = read_fixture("plain.eml");
    c.bench_function("decode_plain", |b| b.iter(|| mail2issue::decode(&raw)));
}

fn bench_decode_nested(c: &mut Criterion) {
    let raw = read_fixture("gmail_nested.eml");
    c.bench_function("decode_nested_multipart", |b| {
        b.iter(|| mail2issue::decode(&raw))
    });
}

fn bench_decode_inline_images(c: &mut Criterion) {
    let raw = read_fixture("inline_image.eml");
    c.bench_function("decode_inline_images", |b| {
        b.iter(|| mail2issue::decode(&raw))
    });
}

criterion_group!(
    benches,
    bench_decode_plain,
    bench_decode_nested,
    bench_decode_inline_images
);
criterion_main!(benches);
