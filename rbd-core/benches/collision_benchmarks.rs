//! Benchmarks for the collision kernels.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rbd_core::broad_phase::{BoundingSphere, BoundingVolumeTree};
use rbd_core::{BodyArena, ContactGenerator, Primitive, RigidBody, Shape};
use rbd_types::{inertia, BodyId, ContactParams};

fn bench_box_box_sat(c: &mut Criterion) {
    let mut arena = BodyArena::new();
    let a = arena.add(
        RigidBody::new(
            1.0,
            inertia::inv_solid_cuboid(1.0, Vector3::new(1.0, 1.0, 1.0)).unwrap(),
            Point3::origin(),
        )
        .unwrap(),
    );
    let b = arena.add(
        RigidBody::new(
            1.0,
            inertia::inv_solid_cuboid(1.0, Vector3::new(1.0, 1.0, 1.0)).unwrap(),
            Point3::new(1.7, 0.3, 0.1),
        )
        .unwrap()
        .with_orientation(UnitQuaternion::from_euler_angles(0.3, 0.5, 0.1)),
    );

    let shape = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap();
    let pa = Primitive::new(a, shape);
    let pb = Primitive::new(b, shape);
    let generator = ContactGenerator::new(ContactParams::default()).unwrap();

    c.bench_function("box_box_sat", |bencher| {
        bencher.iter(|| {
            let contacts = generator
                .generate(black_box(&pa), black_box(&pb), &arena)
                .unwrap();
            black_box(contacts)
        });
    });
}

fn bench_tree_query(c: &mut Criterion) {
    let mut tree = BoundingVolumeTree::new();
    // A loose grid of spheres with some local overlap.
    for i in 0..64u64 {
        let x = (i % 8) as f64 * 1.6;
        let z = (i / 8) as f64 * 1.6;
        tree.insert(
            BodyId::new(i),
            BoundingSphere::new(Point3::new(x, 0.0, z), 1.0).unwrap(),
        );
    }

    c.bench_function("tree_potential_contacts_64", |bencher| {
        bencher.iter(|| black_box(tree.potential_contacts(black_box(256))));
    });
}

criterion_group!(benches, bench_box_box_sat, bench_tree_query);
criterion_main!(benches);
