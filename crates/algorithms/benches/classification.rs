//! Benchmarks for classification algorithms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridclass_algorithms::classification::{isodata_classify, ClassifyParams, Isodata, StorageWidth};
use gridclass_core::{GeoTransform, Raster};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_isodata_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/isodata_engine");
    for n in [10_000usize, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut engine = Isodata::new(3, StorageWidth::F32).unwrap();
                engine.set_min_samples(10).unwrap();
                for i in 0..n {
                    let v = ((i * 7919) % 1000) as f64;
                    engine.add_sample(&[v, v * 0.5, 1000.0 - v]).unwrap();
                }
                engine.run().unwrap();
                black_box(engine.cluster_count())
            })
        });
    }
    group.finish();
}

fn bench_isodata_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/isodata_raster");
    for size in [256, 512, 1024] {
        let b1 = create_band(size, 100.0);
        let b2 = create_band(size, 300.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                isodata_classify(black_box(&[&b1, &b2]), &ClassifyParams::default()).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_isodata_engine, bench_isodata_classify);
criterion_main!(benches);
