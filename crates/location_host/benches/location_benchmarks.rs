//! Location benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use browser_security::Origin;
use location_host::{BrowserConfig, Page};
use web_apis::{JsValue, PropertyKey};

/// Benchmark attribute reads through the location object.
fn bench_getters(c: &mut Criterion) {
    let page = Page::open(BrowserConfig::default(), "https://example.com:8080/a/b/c?query=value#hash").unwrap();
    let caller = page.origin();
    let location = page.location();

    let mut group = c.benchmark_group("getters");

    for name in ["href", "host", "pathname", "search"] {
        let key = PropertyKey::from(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &key, |b, key| {
            b.iter(|| black_box(location.get(&caller, key).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark setter navigations, including the commit.
fn bench_setters(c: &mut Criterion) {
    let mut group = c.benchmark_group("setters");

    let cases = [
        ("hash", "section"),
        ("search", "q=rust"),
        ("pathname", "/x/y"),
        ("href", "https://other.example/"),
    ];

    for (name, value) in cases {
        let page = Page::open(BrowserConfig::default(), "https://example.com/start").unwrap();
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                let caller = page.origin();
                page.location()
                    .set(&caller, PropertyKey::from(name), JsValue::from(value))
                    .unwrap();
                black_box(page.process_navigations())
            })
        });
    }

    group.finish();
}

/// Benchmark the cross-origin checks.
fn bench_cross_origin(c: &mut Criterion) {
    let page = Page::open(BrowserConfig::default(), "https://example.com/").unwrap();
    let location = page.location();
    let foreign = Origin::parse("https://other.example").unwrap();

    let mut group = c.benchmark_group("cross_origin");

    group.bench_function("own_keys", |b| {
        b.iter(|| black_box(location.own_property_keys(&foreign)))
    });

    group.bench_function("blocked_get", |b| {
        let key = PropertyKey::from("hash");
        b.iter(|| black_box(location.get(&foreign, &key).is_err()))
    });

    group.bench_function("replace_descriptor", |b| {
        let key = PropertyKey::from("replace");
        b.iter(|| black_box(location.get_own_property(&foreign, &key).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_getters, bench_setters, bench_cross_origin);
criterion_main!(benches);
