//! End-to-end collision scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use rbd_core::broad_phase::{BoundingSphere, BoundingVolumeTree};
use rbd_core::{CollisionSet, ContactSource, Gravity, Plane, Primitive, RigidBody, Shape, World};
use rbd_types::{inertia, BodyId, ContactParams};

fn unit_sphere_body(position: Point3<f64>) -> RigidBody {
    RigidBody::new(
        1.0,
        inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
        position,
    )
    .unwrap()
}

fn exact_params() -> ContactParams {
    // Zero offset so penetrations can be checked exactly.
    ContactParams::new(0.0, 1.0, 0.0).unwrap()
}

/// A unit sphere dropped from y = 5 onto the ground plane: once its
/// distance to the plane is within the radius, exactly one contact is
/// generated with normal +Y and penetration 1 − distance.
#[test]
fn falling_sphere_contacts_ground_plane() {
    let mut world = World::default();
    let ball = world.add_body(unit_sphere_body(Point3::new(0.0, 5.0, 0.0)));
    let gravity = Gravity::new(Gravity::earth(), vec![ball], world.bodies()).unwrap();
    world.add_force_generator(Box::new(gravity));

    // Fall freely until the sphere is within a radius of the plane.
    let mut guard = 0;
    while world.position(ball).unwrap().y > 1.0 && guard < 10_000 {
        world.step(1.0 / 120.0).unwrap();
        guard += 1;
    }
    let distance = world.position(ball).unwrap().y;
    assert!(distance <= 1.0, "sphere never reached the plane");

    let mut collisions = CollisionSet::new(exact_params()).unwrap();
    collisions
        .add_primitive(
            Primitive::new(ball, Shape::sphere(1.0).unwrap()),
            world.bodies(),
        )
        .unwrap();
    collisions.add_plane(Plane::new(Vector3::y(), 0.0).unwrap());

    let contacts = collisions.generate(world.bodies(), 16).unwrap();
    assert_eq!(contacts.len(), 1);
    let contact = &contacts[0];
    assert_relative_eq!(contact.normal(), Vector3::y(), epsilon = 1e-12);
    assert_relative_eq!(contact.penetration(), 1.0 - distance, epsilon = 1e-9);
}

/// Two unit spheres with centers 1.5 apart: penetration 2 − 1.5 = 0.5,
/// normal along the center line.
#[test]
fn overlapping_unit_spheres() {
    let mut world = World::default();
    let a = world.add_body(unit_sphere_body(Point3::new(0.0, 0.0, 0.0)));
    let b = world.add_body(unit_sphere_body(Point3::new(1.5, 0.0, 0.0)));

    let mut collisions = CollisionSet::new(exact_params()).unwrap();
    for &id in &[a, b] {
        collisions
            .add_primitive(Primitive::new(id, Shape::sphere(1.0).unwrap()), world.bodies())
            .unwrap();
    }

    let contacts = collisions.generate(world.bodies(), 16).unwrap();
    assert_eq!(contacts.len(), 1);
    let contact = &contacts[0];
    assert_relative_eq!(contact.penetration(), 0.5, epsilon = 1e-12);
    // Unit vector along the center line, pointing at the reference body.
    assert_relative_eq!(contact.normal().norm(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(contact.normal().x.abs(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(contact.point().x, 0.75, epsilon = 1e-12);
}

/// A unit-half-extent box with its center at y = 1 and no rotation rests
/// flush on the ground plane: exactly 4 of its 8 vertices are at zero
/// distance, each yielding a contact.
#[test]
fn box_resting_flush_on_plane() {
    let mut world = World::default();
    let cube = world.add_body(
        RigidBody::new(
            8.0,
            inertia::inv_solid_cuboid(8.0, Vector3::new(1.0, 1.0, 1.0)).unwrap(),
            Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap(),
    );

    let mut collisions = CollisionSet::new(exact_params()).unwrap();
    collisions
        .add_primitive(
            Primitive::new(cube, Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap()),
            world.bodies(),
        )
        .unwrap();
    collisions.add_plane(Plane::new(Vector3::y(), 0.0).unwrap());

    let contacts = collisions.generate(world.bodies(), 16).unwrap();
    assert_eq!(contacts.len(), 4);
    for contact in &contacts {
        assert_relative_eq!(contact.penetration(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(contact.point().y, 0.0, epsilon = 1e-12);
    }
}

/// Three bodies with widely separated bounding spheres produce no
/// potential contacts from the tree.
#[test]
fn disjoint_bodies_produce_no_candidates() {
    let mut tree = BoundingVolumeTree::new();
    for (i, x) in [0.0, 100.0, -100.0].iter().enumerate() {
        tree.insert(
            BodyId::new(i as u64),
            BoundingSphere::new(Point3::new(*x, 0.0, 0.0), 1.0).unwrap(),
        );
    }
    assert!(tree.potential_contacts(100).is_empty());
}

/// The whole pipeline: a dropped ball must neither tunnel through the
/// ground nor gain energy while coming to rest.
#[test]
fn dropped_ball_settles_without_gaining_energy() {
    let mut world = World::default();
    let ball = world.add_body(
        unit_sphere_body(Point3::new(0.0, 4.0, 0.0)).with_damping(0.99, 0.99),
    );
    let gravity = Gravity::new(Gravity::earth(), vec![ball], world.bodies()).unwrap();
    world.add_force_generator(Box::new(gravity));

    let mut collisions =
        CollisionSet::new(ContactParams::new(0.0, 0.2, 0.005).unwrap()).unwrap();
    collisions
        .add_primitive(
            Primitive::new(ball, Shape::sphere(1.0).unwrap()),
            world.bodies(),
        )
        .unwrap();
    collisions.add_plane(Plane::new(Vector3::y(), 0.0).unwrap());
    world.add_contact_source(Box::new(collisions));

    let mut max_speed_after_first_bounce = 0.0_f64;
    let mut bounced = false;
    for _ in 0..600 {
        let stats = world.step(1.0 / 120.0).unwrap();
        bounced |= stats.contacts > 0;
        if bounced {
            max_speed_after_first_bounce =
                max_speed_after_first_bounce.max(world.body(ball).unwrap().velocity().norm());
        }
        let y = world.position(ball).unwrap().y;
        assert!(y > 0.0, "ball tunnelled through the plane (y = {y})");
    }

    assert!(bounced);
    // Impact speed from 3 m of free fall is sqrt(2·g·3) ≈ 7.7 m/s; with
    // restitution 0.2 nothing afterward should come close.
    assert!(
        max_speed_after_first_bounce < 8.5,
        "energy was added: {max_speed_after_first_bounce} m/s"
    );

    let resting = world.position(ball).unwrap().y;
    assert!(
        resting > 0.5 && resting < 1.5,
        "unexpected resting height {resting}"
    );
}
