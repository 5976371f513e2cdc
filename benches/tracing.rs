use criterion::{criterion_group, criterion_main, Criterion, black_box};

use roomcull::math::{Aabb, Frustum};
use roomcull::rooms::{InstanceHandle, RoomGraph, RoomGraphBuilder, RoomId};
use roomcull::tracer::{PortalTracer, TraceResult};

use glam::Vec3;

/// `size` x `size` grid of 10m rooms on the xz plane, doorways between
/// neighbours, a few statics per room
fn build_grid(size: u32) -> RoomGraph {
    let mut builder = RoomGraphBuilder::new();
    let mut ids = Vec::new();
    for z in 0..size {
        for x in 0..size {
            let min = Vec3::new(x as f32 * 10.0, 0.0, -(z as f32 + 1.0) * 10.0);
            let bounds = Aabb::new(min, min + Vec3::new(10.0, 4.0, 10.0));
            let room = builder.add_room(format!("room_{}_{}", x, z), Some(bounds));
            for i in 0..4 {
                let offset = Vec3::new(2.0 + (i % 2) as f32 * 5.0, 0.0, 2.0 + (i / 2) as f32 * 5.0);
                let aabb = Aabb::from_center_half_extent(min + offset, Vec3::splat(0.5));
                builder
                    .add_static(room, aabb, InstanceHandle(room.0 * 4 + i))
                    .expect("room exists");
            }
            ids.push(room);
        }
    }

    for z in 0..size {
        for x in 0..size {
            let room = ids[(z * size + x) as usize];
            let x0 = x as f32 * 10.0;
            let z0 = -(z as f32) * 10.0;
            if x + 1 < size {
                let wall = x0 + 10.0;
                let door = vec![
                    Vec3::new(wall, 0.0, z0 - 4.0),
                    Vec3::new(wall, 3.0, z0 - 4.0),
                    Vec3::new(wall, 3.0, z0 - 6.0),
                    Vec3::new(wall, 0.0, z0 - 6.0),
                ];
                builder
                    .add_portal(room, ids[(z * size + x + 1) as usize], door, 0.0)
                    .expect("valid doorway");
            }
            if z + 1 < size {
                let wall = z0 - 10.0;
                let door = vec![
                    Vec3::new(x0 + 4.0, 0.0, wall),
                    Vec3::new(x0 + 4.0, 3.0, wall),
                    Vec3::new(x0 + 6.0, 3.0, wall),
                    Vec3::new(x0 + 6.0, 0.0, wall),
                ];
                builder
                    .add_portal(room, ids[((z + 1) * size + x) as usize], door, 0.0)
                    .expect("valid doorway");
            }
        }
    }
    builder.build_with_pvs(8)
}

fn bench_trace_grid(c: &mut Criterion, size: u32, name: &str) {
    let graph = build_grid(size);
    let origin = Vec3::new(5.0, 1.5, -5.0);
    let forward = Vec3::new(1.0, 0.0, -1.0).normalize();
    let frustum = Frustum::from_camera(origin, forward, Vec3::Y, 1.4, 16.0 / 9.0, 0.1, 500.0);
    let mut tracer = PortalTracer::default();
    let mut result = TraceResult::new(graph.num_statics());

    c.bench_function(name, |b| {
        b.iter(|| {
            result.clear();
            tracer.trace(
                black_box(&graph),
                black_box(origin),
                None,
                frustum.as_slice(),
                RoomId(0),
                &mut result,
            );
            result.visible_static_ids.len()
        });
    });
}

fn bench_trace_grid_8(c: &mut Criterion) {
    bench_trace_grid(c, 8, "portal_trace_grid_8");
}

fn bench_trace_grid_16(c: &mut Criterion) {
    bench_trace_grid(c, 16, "portal_trace_grid_16");
}

fn bench_trace_pvs(c: &mut Criterion) {
    let graph = build_grid(16);
    let origin = Vec3::new(5.0, 1.5, -5.0);
    let frustum = Frustum::from_camera(origin, Vec3::NEG_Z, Vec3::Y, 1.4, 16.0 / 9.0, 0.1, 500.0);
    let mut tracer = PortalTracer::default();
    let mut result = TraceResult::new(graph.num_statics());

    c.bench_function("pvs_trace_grid_16", |b| {
        b.iter(|| {
            result.clear();
            tracer.trace_pvs(black_box(&graph), frustum.as_slice(), RoomId(0), &mut result);
            result.visible_static_ids.len()
        });
    });
}

fn bench_pvs_build(c: &mut Criterion) {
    let graph = build_grid(16);

    c.bench_function("pvs_build_grid_16", |b| {
        b.iter(|| roomcull::rooms::Pvs::build(black_box(&graph), 8));
    });
}

criterion_group!(
    benches,
    bench_trace_grid_8,
    bench_trace_grid_16,
    bench_trace_pvs,
    bench_pvs_build,
);
criterion_main!(benches);
