//! Benchmarks for pipeline operations
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vispipe::config::PersistenceConfig;
use vispipe::dataset::{AttributeKind, AttributeRole, MemoryDataset, MemoryDatasetReader};
use vispipe::persistence::RestoreContext;
use vispipe::pipeline::{ComponentFactory, NodeId, OpaqueComponent, Pipeline};

fn grid(arrays: usize, tuples: usize) -> MemoryDataset {
    let mut ds = MemoryDataset::new("UnstructuredGrid");
    for i in 0..arrays {
        let components = [1, 3, 9][i % 3];
        let values = (0..tuples * components).map(|v| v as f64 * 0.5).collect();
        ds = ds.with_array(AttributeRole::Point, format!("array_{i}"), components, values);
    }
    ds
}

/// Scene -> data source -> `width` filters, each with one module.
fn build_tree(width: usize) -> (Pipeline, NodeId, NodeId) {
    let mut p = Pipeline::new();
    let scene = p.create_scene("scene");
    let ds = p.create_data_source(Some(Box::new(grid(12, 64)))).unwrap();
    p.add_child(scene, ds).unwrap();
    for i in 0..width {
        let f = p.create_filter(format!("f{i}"), Box::new(OpaqueComponent::new("Filter", serde_json::Value::Null)));
        p.add_child(ds, f).unwrap();
        let m = p.create_module(format!("m{i}"), Box::new(OpaqueComponent::new("Module", serde_json::Value::Null)));
        p.add_child(f, m).unwrap();
    }
    (p, scene, ds)
}

fn bench_start_stop(c: &mut Criterion) {
    let mut group = c.benchmark_group("start_stop");

    for width in [4, 32, 256].iter() {
        let (mut p, scene, _) = build_tree(*width);
        group.throughput(Throughput::Elements(p.len() as u64));
        group.bench_with_input(BenchmarkId::new("cycle", width), width, |b, _| {
            b.iter(|| {
                p.start(scene).unwrap();
                p.stop(scene).unwrap();
                black_box(p.get(scene).unwrap().is_running())
            });
        });
    }

    group.finish();
}

fn bench_data_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_refresh");

    for arrays in [3, 24, 96].iter() {
        group.bench_with_input(BenchmarkId::new("set_data", arrays), arrays, |b, &arrays| {
            let mut p = Pipeline::new();
            let ds = p.create_data_source(None).unwrap();
            b.iter(|| black_box(p.set_data(ds, Box::new(grid(arrays, 16))).unwrap()));
        });
    }

    let (mut p, _, ds) = build_tree(8);
    group.bench_function("update", |b| b.iter(|| p.update(ds).unwrap()));
    group.bench_function("set_selector", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let name = if flip { "array_3" } else { "array_0" };
            p.set_selector(ds, AttributeRole::Point, AttributeKind::Scalars, name)
                .unwrap()
        });
    });

    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    let reader = MemoryDatasetReader;
    let factory = ComponentFactory::new();

    for level in [1u32, 6, 9].iter() {
        let (p, scene, _) = build_tree(16);
        let config = PersistenceConfig {
            compression_level: *level,
            pretty_json: false,
        };
        group.bench_with_input(BenchmarkId::new("save", level), &config, |b, config| {
            b.iter(|| black_box(p.save_state(scene, config).unwrap()));
        });

        let saved = p.save_state(scene, &config).unwrap();
        group.bench_with_input(BenchmarkId::new("restore", level), &saved, |b, saved| {
            b.iter(|| {
                let mut fresh = Pipeline::new();
                black_box(
                    fresh
                        .restore(saved, &RestoreContext::new(&reader, &factory))
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_start_stop, bench_data_refresh, bench_persistence);

criterion_main!(benches);
