//! Refresh cycle benchmarks for gv-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gv_core::{EngineOptions, FormatterRegistry, MemoryStateStore, Schema, TreeEngine};
use serde_json::{json, Value};

const SCHEMA: &str = r#"
    [[levels]]
    children = ["project"]

    [[levels]]
    parent = "project"
    children = [{ property = "number", format = "${number}: ${subject}", tracks_changes = true }]

    [[levels]]
    parent = "number"
    children = [{ property = "approvals.value", formatter = "score", tooltip = "${approvals.by}" }]
"#;

fn engine() -> TreeEngine {
    let schema: Schema = toml::from_str(SCHEMA).expect("schema");
    let compiled = schema
        .compile(&FormatterRegistry::with_builtins())
        .expect("compile");
    let options = EngineOptions {
        key_field: Some("number".to_string()),
        ..EngineOptions::default()
    };
    TreeEngine::new(compiled, options, Box::new(MemoryStateStore::new())).expect("engine")
}

fn batch(size: usize, revision: usize) -> Vec<Value> {
    (0..size)
        .map(|i| {
            json!({
                "number": i,
                "project": format!("project-{}", i % 20),
                "subject": format!("change {i} rev {}", if i % 10 == 0 { revision } else { 0 }),
                "approvals": [
                    {"value": "1", "by": "alice"},
                    {"value": "-1", "by": "bob"}
                ]
            })
        })
        .collect()
}

fn bench_first_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_population");
    for size in [100, 1_000] {
        let records = batch(size, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                let mut engine = engine();
                black_box(engine.refresh(records))
            });
        });
    }
    group.finish();
}

fn bench_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_state");
    for size in [100, 1_000] {
        let mut engine = engine();
        engine.refresh(&batch(size, 0));
        let revisions = [batch(size, 1), batch(size, 2)];
        let mut turn = 0;
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                turn ^= 1;
                black_box(engine.refresh(&revisions[turn]))
            });
        });
    }
    group.finish();
}

fn bench_filtering(c: &mut Criterion) {
    let mut engine = engine();
    engine.refresh(&batch(1_000, 0));

    c.bench_function("filter_add_clear", |b| {
        b.iter(|| {
            engine.add_filter("project", "^project-1[0-9]$").expect("filter");
            engine.clear_filters();
        });
    });
}

criterion_group!(benches, bench_first_population, bench_steady_state, bench_filtering);
criterion_main!(benches);
