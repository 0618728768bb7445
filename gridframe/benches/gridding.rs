use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridframe::dted::{GapFiller, TileBuffer};
use gridframe::msg::codec::{pack_samples, unpack_samples};
use gridframe::msg::{DecodedStrip, FrameAssembler, FrameGeometry, GeoTransform, ScanDirection};
use gridframe::{DtedLevel, PointStream};
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Points on a regular lattice across one level 0 cell and its neighbours.
fn lattice(n: usize) -> Vec<(f64, f64, f64)> {
    (0..n)
        .map(|i| {
            let frac = i as f64 / n as f64;
            (9.9 + frac * 1.2, 44.9 + ((i * 7919) % n) as f64 / n as f64 * 1.2, (i % 4000) as f64)
        })
        .collect()
}

fn bench_write_points(c: &mut Criterion) {
    let points = lattice(10_000);

    c.bench_function("write_10000_points_level0", |b| {
        b.iter(|| {
            let tmp = TempDir::new().unwrap();
            let mut stream = PointStream::create(tmp.path(), DtedLevel::Level0).unwrap();
            for &(lon, lat, elevation) in &points {
                stream.write_point(lon, lat, elevation).unwrap();
            }
            black_box(stream.tile_count());
        });
    });
}

fn bench_fill_gaps(c: &mut Criterion) {
    // Level 1 cell with every 4th post known
    let mut buffer = TileBuffer::new(1201, 1201);
    for col in (0..1201).step_by(4) {
        for row in (0..1201).step_by(4) {
            buffer.set(col, row, ((col + row) % 3000) as i16);
        }
    }
    let filler = GapFiller::new(2);

    c.bench_function("fill_level1_radius2", |b| {
        b.iter(|| black_box(filler.fill(black_box(&buffer))));
    });
}

fn bench_unpack_strip(c: &mut Criterion) {
    // One VIS/IR strip: 3712 x 464 samples at 10 bits
    let samples: Vec<u16> = (0..3712 * 464).map(|i| (i % 1024) as u16).collect();
    let payload = pack_samples(&samples, 10);

    c.bench_function("unpack_visir_strip", |b| {
        b.iter(|| black_box(unpack_samples(black_box(&payload), samples.len(), 10).unwrap()));
    });
}

fn bench_assemble_block(c: &mut Criterion) {
    let geometry = FrameGeometry {
        width: 3712,
        height: 3712,
        strip_height: 464,
        strip_count: 8,
        scan: ScanDirection::North,
        hrv: None,
        transform: GeoTransform {
            origin_x: 0.0,
            pixel_width: 3000.0,
            origin_y: 0.0,
            pixel_height: -3000.0,
        },
    };
    let assembler = FrameAssembler::new(geometry);
    let mut source = BTreeMap::new();
    source.insert(
        8,
        Arc::new(DecodedStrip {
            columns: 3712,
            rows: 464,
            scan: ScanDirection::North,
            samples: vec![512; 3712 * 464],
        }),
    );

    c.bench_function("assemble_north_block", |b| {
        b.iter(|| black_box(assembler.assemble_block(&mut source, 0).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_write_points,
    bench_fill_gaps,
    bench_unpack_strip,
    bench_assemble_block,
);
criterion_main!(benches);
