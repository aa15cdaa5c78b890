//! Property-based tests for the geometric kernels.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use rbd_core::broad_phase::BoundingSphere;
use rbd_core::{
    narrow, BodyArena, ContactGenerator, Primitive, RigidBody, Shape, WorldCuboid,
};
use rbd_types::{inertia, ContactParams};

fn finite_coord() -> impl Strategy<Value = f64> {
    -100.0..100.0f64
}

fn positive_radius() -> impl Strategy<Value = f64> {
    0.1..10.0f64
}

proptest! {
    /// `touches` is symmetric and agrees with the direct distance test.
    #[test]
    fn sphere_touches_symmetric_and_consistent(
        ax in finite_coord(), ay in finite_coord(), az in finite_coord(),
        bx in finite_coord(), by in finite_coord(), bz in finite_coord(),
        ra in positive_radius(), rb in positive_radius(),
    ) {
        let a = BoundingSphere::new(Point3::new(ax, ay, az), ra).unwrap();
        let b = BoundingSphere::new(Point3::new(bx, by, bz), rb).unwrap();

        prop_assert_eq!(a.touches(&b), b.touches(&a));

        let distance = (Point3::new(ax, ay, az) - Point3::new(bx, by, bz)).norm();
        prop_assert_eq!(a.touches(&b), distance <= ra + rb);
    }

    /// The enclosing sphere contains both inputs.
    #[test]
    fn enclosing_sphere_contains_both(
        ax in finite_coord(), bx in finite_coord(),
        ra in positive_radius(), rb in positive_radius(),
    ) {
        let a = BoundingSphere::new(Point3::new(ax, 0.0, 0.0), ra).unwrap();
        let b = BoundingSphere::new(Point3::new(bx, 0.0, 0.0), rb).unwrap();
        let enclosing = a.enclosing(&b);

        for (sphere, radius) in [(&a, ra), (&b, rb)] {
            let reach = (enclosing.center() - sphere.center()).norm() + radius;
            prop_assert!(reach <= enclosing.radius() + 1e-9);
        }
    }

    /// The orientation stays a unit quaternion through arbitrary spin.
    #[test]
    fn orientation_unit_after_integration(
        wx in -20.0..20.0f64, wy in -20.0..20.0f64, wz in -20.0..20.0f64,
        dt in 0.001..0.1f64,
        steps in 1..50usize,
    ) {
        let mut body = RigidBody::new(
            1.0,
            inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
            Point3::origin(),
        )
        .unwrap()
        .with_angular_velocity(Vector3::new(wx, wy, wz));

        for _ in 0..steps {
            body.integrate(dt);
            let norm = body.orientation().into_inner().norm();
            prop_assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    /// SAT soundness: boxes separated along a world axis show a negative
    /// overlap on that axis, and the generator reports no contact.
    #[test]
    fn separated_boxes_generate_no_contact(
        half in 0.1..2.0f64,
        gap in 0.01..5.0f64,
    ) {
        let mut arena = BodyArena::new();
        let distance = 2.0 * half + gap;
        let a = arena.add(
            RigidBody::new(1.0, inertia::inv_solid_sphere(1.0, 1.0).unwrap(), Point3::origin())
                .unwrap(),
        );
        let b = arena.add(
            RigidBody::new(
                1.0,
                inertia::inv_solid_sphere(1.0, 1.0).unwrap(),
                Point3::new(distance, 0.0, 0.0),
            )
            .unwrap(),
        );

        let shape = Shape::cuboid(Vector3::new(half, half, half)).unwrap();
        let pa = Primitive::new(a, shape);
        let pb = Primitive::new(b, shape);

        let one = WorldCuboid::from_primitive(&pa, &arena).unwrap();
        let two = WorldCuboid::from_primitive(&pb, &arena).unwrap();
        let to_center = two.center - one.center;
        prop_assert!(narrow::overlap_on_axis(&one, &two, &Vector3::x(), &to_center) < 0.0);

        let generator =
            ContactGenerator::new(ContactParams::new(0.0, 1.0, 0.0).unwrap()).unwrap();
        prop_assert!(generator.generate(&pa, &pb, &arena).unwrap().is_empty());
    }
}
