// Benchmark suite for geometry slicing.
//
// Uses synthetic geometries that span a growing share of the tile pyramid:
// a many-vertex ring sliced as a polygon (fill detection on) and as a
// polyline (fill detection off).
//
// Run with: cargo bench --package tile-slicer-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::LineString;
use tile_slicer_core::{RingGroup, TileExtents, TiledGeometry};

const RING_POINTS: usize = 512;
const BUFFER: f64 = 8.0 / 256.0;

/// A closed ring approximating a circle in world tile coordinates.
fn circle(cx: f64, cy: f64, r: f64) -> LineString<f64> {
    let mut coords: Vec<(f64, f64)> = (0..RING_POINTS)
        .map(|i| {
            let angle = i as f64 / RING_POINTS as f64 * std::f64::consts::TAU;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect();
    coords.push(coords[0]);
    LineString::from(coords)
}

fn bench_polygon(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_polygon");
    group.throughput(Throughput::Elements(RING_POINTS as u64));

    for z in [2u8, 4, 6, 8] {
        let world = (1u32 << z) as f64;
        let ring = circle(world / 2.0, world / 2.0, world / 3.0);
        let groups = vec![RingGroup::polygon(ring, vec![])];
        group.bench_with_input(BenchmarkId::new("z", z), &z, |b, &z| {
            b.iter(|| {
                let sliced = TiledGeometry::slice_shapes(
                    TileExtents::full_at_zoom(z),
                    BUFFER,
                    true,
                    z,
                    black_box(&groups),
                );
                black_box(sliced.tile_data().count() + sliced.filled_tiles().count())
            })
        });
    }

    group.finish();
}

fn bench_polyline(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_polyline");
    group.throughput(Throughput::Elements(RING_POINTS as u64));

    for z in [2u8, 4, 6, 8] {
        let world = (1u32 << z) as f64;
        let line = circle(world / 2.0, world / 2.0, world / 3.0);
        let groups = vec![RingGroup::line(line)];
        group.bench_with_input(BenchmarkId::new("z", z), &z, |b, &z| {
            b.iter(|| {
                let sliced = TiledGeometry::slice_shapes(
                    TileExtents::full_at_zoom(z),
                    BUFFER,
                    false,
                    z,
                    black_box(&groups),
                );
                black_box(sliced.tile_data().count())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_polygon, bench_polyline);
criterion_main!(benches);
