//! IOC extraction benchmark
//!
//! Target: <1ms per finding at typical report sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vigil_common::config::ExtractorConfig;
use vigil_extract::IocExtractor;

const REPORT: &str = "Ransomware group leaked database dump at 203.0.113.5, \
    C2 at hxxps://evil-domain[.]xyz/gate.php, contact breach@evil.com, \
    payload d41d8cd98f00b204e9800998ecf8427e exploits CVE-2021-44228, \
    wallet 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa, persists via \
    HKLM\\Software\\Microsoft\\Windows\\CurrentVersion\\Run";

fn extraction_benchmark(c: &mut Criterion) {
    let extractor = IocExtractor::new(&ExtractorConfig::default());

    let mut group = c.benchmark_group("extraction");

    group.bench_function("refang", |b| {
        b.iter(|| extractor.refang(black_box(REPORT)))
    });

    group.bench_function("extract", |b| {
        b.iter(|| extractor.extract(black_box(REPORT)))
    });

    group.finish();
}

fn extraction_scaling_benchmark(c: &mut Criterion) {
    let extractor = IocExtractor::new(&ExtractorConfig::default());

    let mut group = c.benchmark_group("extraction_scaling");

    for repeats in [1, 10, 100].iter() {
        let text = REPORT.repeat(*repeats);
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &text, |b, text| {
            b.iter(|| extractor.extract(black_box(text)))
        });
    }

    group.finish();
}

criterion_group!(benches, extraction_benchmark, extraction_scaling_benchmark);
criterion_main!(benches);
