//! Benchmarks for flood simulation and exposure

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jolchobi_algorithms::exposure::build_flood_polygons;
use jolchobi_algorithms::flood::{bathtub, drainage_proxy, DrainageProxyParams};
use jolchobi_core::{GeoTransform, Raster, CRS};

/// Floodplain: a meandering channel cut into a gently rising valley, 30 m cells in UTM 45N
fn create_floodplain_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size)
        .with_transform(GeoTransform::new(800_000.0, 2_800_000.0, 30.0, -30.0))
        .with_crs(CRS::from_epsg(32645));
    let center = size as f64 / 2.0;
    for row in 0..size {
        let channel = center + (row as f64 / 25.0).sin() * size as f64 / 8.0;
        for col in 0..size {
            let dist = (col as f64 - channel).abs();
            let noise = ((row * 7 + col * 13) % 17) as f64 * 0.05;
            dem.set(row, col, 3.0 + dist * 0.02 + noise).unwrap();
        }
    }
    dem
}

fn bench_bathtub(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood/bathtub");
    for size in [256, 512, 1024] {
        let dem = create_floodplain_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| bathtub(black_box(&dem), 5.0).unwrap())
        });
    }
    group.finish();
}

fn bench_drainage_proxy(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood/drainage_proxy");
    for size in [256, 512, 1024] {
        let dem = create_floodplain_dem(size);
        let params = DrainageProxyParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| drainage_proxy(black_box(&dem), 150.0, &params).unwrap())
        });
    }
    group.finish();
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("exposure/build_flood_polygons");
    group.sample_size(20);
    for size in [256, 512] {
        let dem = create_floodplain_dem(size);
        let flood = bathtub(&dem, 5.0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| build_flood_polygons(black_box(&flood.mask)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bathtub, bench_drainage_proxy, bench_polygonize);
criterion_main!(benches);
