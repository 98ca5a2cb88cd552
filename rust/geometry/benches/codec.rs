// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Encode/decode throughput for slab-like outlines with many holes.
//!
//! Run with: cargo bench -p bimsync-geometry --bench codec

use bimsync_geometry::{decode, encode, ElementShape, MemoSlot, Point3D, Polyline};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Rectangular outline with a grid of square holes.
fn perforated_outline(holes_per_side: usize) -> ElementShape {
    let size = holes_per_side as f64 * 2.0 + 1.0;
    let contour = Polyline::closed_from_points(&[
        Point3D::new(0.0, 0.0, 0.0),
        Point3D::new(size, 0.0, 0.0),
        Point3D::new(size, size, 0.0),
        Point3D::new(0.0, size, 0.0),
    ]);
    let mut holes = Vec::with_capacity(holes_per_side * holes_per_side);
    for i in 0..holes_per_side {
        for j in 0..holes_per_side {
            let (x, y) = (1.0 + i as f64 * 2.0, 1.0 + j as f64 * 2.0);
            holes.push(Polyline::closed_from_points(&[
                Point3D::new(x, y, 0.0),
                Point3D::new(x + 1.0, y, 0.0),
                Point3D::new(x + 1.0, y + 1.0, 0.0),
                Point3D::new(x, y + 1.0, 0.0),
            ]));
        }
    }
    ElementShape::new(contour).with_holes(holes)
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    for side in [2usize, 8, 16] {
        let shape = perforated_outline(side);
        group.throughput(Throughput::Elements(shape.vertex_count() as u64));

        group.bench_with_input(BenchmarkId::new("encode", side), &shape, |b, shape| {
            b.iter(|| encode(black_box(shape), MemoSlot::Main))
        });

        let encoded = encode(&shape, MemoSlot::Main).expect("benchmark shape encodes");
        group.bench_with_input(BenchmarkId::new("decode", side), &encoded, |b, poly| {
            b.iter(|| decode(black_box(poly), MemoSlot::Main, 0.0))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
