use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array3;

use geoshift::crs::Crs;
use geoshift::geodesy::datum::GeodeticDatum;
use geoshift::grid::{codec, Grid};
use geoshift::op::CoordinateOperation;
use geoshift::pipeline::Pipeline;

fn points(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            vec![-4.0 + t * 12.0, 42.0 + t * 9.0]
        })
        .collect()
}

fn geoid(rows: usize, cols: usize) -> Grid {
    let values = Array3::from_shape_fn((rows, cols, 1), |(j, i, _)| {
        45.0 + (i as f64 * 0.07).sin() * 3.0 + (j as f64 * 0.05).cos() * 2.0
    });
    Grid::new("geoid", -5.5, 41.0, 0.1, 0.1, values).unwrap()
}

fn bench_projection_throughput(c: &mut Criterion) {
    let n = 100_000_usize;
    let coords = points(n);

    let lambert = Pipeline::new(&Crs::wgs84(), &Crs::lambert93().unwrap()).unwrap();
    c.bench_function("wgs84_to_lambert93_100k", |b| {
        b.iter(|| lambert.transform_all(black_box(&coords)).unwrap());
    });

    let ntf = Crs::geographic(
        "NTF",
        GeodeticDatum::ntf(),
        Crs::wgs84().cs().clone(),
    )
    .unwrap();
    let shift = Pipeline::new(&Crs::wgs84(), &ntf).unwrap();
    c.bench_function("wgs84_to_ntf_bursa_wolf_100k", |b| {
        b.iter(|| shift.transform_all(black_box(&coords)).unwrap());
    });
}

#[cfg(feature = "parallel")]
fn bench_parallel_batch(c: &mut Criterion) {
    let coords = points(1_000_000);
    let lambert = Pipeline::new(&Crs::wgs84(), &Crs::lambert93().unwrap()).unwrap();
    c.bench_function("wgs84_to_lambert93_parallel_1M", |b| {
        b.iter(|| geoshift::op::par_transform(&lambert, black_box(&coords)).unwrap());
    });
}

#[cfg(not(feature = "parallel"))]
fn bench_parallel_batch(_c: &mut Criterion) {}

fn bench_grid_interpolation(c: &mut Criterion) {
    let grid = Arc::new(geoid(111, 161));
    let coords = points(100_000);
    c.bench_function("geoid_interpolate_100k", |b| {
        b.iter(|| {
            let mut out = [0.0];
            for p in &coords {
                grid.interpolate_into(p[1], p[0], &mut out).unwrap();
                black_box(out[0]);
            }
        });
    });
}

fn bench_codec(c: &mut Criterion) {
    let grid = geoid(111, 161).with_scale(1000.0).unwrap();
    for group in [8_usize, 16, 32] {
        let bytes = codec::encode_grid(&grid, group).unwrap();
        c.bench_function(&format!("blegg_encode_group{group}"), |b| {
            b.iter(|| codec::encode_grid(black_box(&grid), group).unwrap());
        });
        c.bench_function(&format!("blegg_decode_group{group}"), |b| {
            b.iter(|| codec::decode_grid("geoid", black_box(&bytes)).unwrap());
        });
    }
}

criterion_group!(
    benches,
    bench_projection_throughput,
    bench_parallel_batch,
    bench_grid_interpolation,
    bench_codec
);
criterion_main!(benches);
