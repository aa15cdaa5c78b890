//! Sleep and wake behavior through the full pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use nalgebra::{Point3, Vector3};
use rbd_core::{CollisionSet, Primitive, RigidBody, Shape, World};
use rbd_types::{inertia, ContactParams};

fn sphere_body(position: Point3<f64>) -> RigidBody {
    RigidBody::new(
        1.0,
        inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
        position,
    )
    .unwrap()
}

/// A sleep-capable body with no external force and near-zero velocities
/// transitions to asleep over repeated frames, and its velocities zero.
#[test]
fn settled_body_falls_asleep() {
    let mut world = World::default();
    let ball = world.add_body(
        sphere_body(Point3::origin())
            .with_velocity(Vector3::new(0.005, 0.0, 0.0))
            .with_sleep(0.05),
    );

    let mut frames = 0;
    while world.body(ball).unwrap().is_awake() && frames < 2000 {
        world.step(1.0 / 60.0).unwrap();
        frames += 1;
    }

    let body = world.body(ball).unwrap();
    assert!(!body.is_awake(), "body never fell asleep");
    assert_eq!(body.velocity(), Vector3::zeros());
    assert_eq!(body.angular_velocity(), Vector3::zeros());

    // Once asleep, integration leaves it where it is.
    let position = body.position();
    world.step(1.0 / 60.0).unwrap();
    assert_eq!(world.body(ball).unwrap().position(), position);
}

/// A collision between an awake body and a sleeping one wakes the sleeper.
#[test]
fn collision_wakes_sleeping_body() {
    let mut world = World::default();
    let sleeper = world.add_body(sphere_body(Point3::origin()).with_sleep(0.05));
    let mover = world.add_body(
        sphere_body(Point3::new(1.8, 0.0, 0.0)).with_velocity(Vector3::new(-1.0, 0.0, 0.0)),
    );
    world.sleep_body(sleeper).unwrap();

    let mut collisions = CollisionSet::new(ContactParams::new(0.0, 0.5, 0.0).unwrap()).unwrap();
    for &id in &[sleeper, mover] {
        collisions
            .add_primitive(Primitive::new(id, Shape::sphere(1.0).unwrap()), world.bodies())
            .unwrap();
    }
    world.add_contact_source(Box::new(collisions));

    let mut woke = false;
    for _ in 0..120 {
        world.step(1.0 / 60.0).unwrap();
        if world.body(sleeper).unwrap().is_awake() {
            woke = true;
            break;
        }
    }
    assert!(woke, "the collision should have woken the sleeping body");
}

/// An explicit wake seeds the motion bias so the body is not immediately
/// put back to sleep by the next step.
#[test]
fn woken_body_stays_awake_for_a_while() {
    let mut world = World::default();
    let ball = world.add_body(sphere_body(Point3::origin()).with_sleep(0.05));
    world.sleep_body(ball).unwrap();

    world.wake_body(ball).unwrap();
    world.step(1.0 / 60.0).unwrap();
    assert!(world.body(ball).unwrap().is_awake());
}
