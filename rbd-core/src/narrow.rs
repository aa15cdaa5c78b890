//! Narrow-phase contact generation.
//!
//! Exact geometric tests between primitive pairs proposed by the broad
//! phase, producing zero or more [`Contact`]s per pair. Every generated
//! contact's penetration is reduced by the generator's pessimism offset,
//! so contacts appear slightly before true geometric overlap.
//!
//! Supported pairs: sphere–sphere, sphere–plane, box–plane, box–sphere,
//! and box–box via the separating-axis test over 15 candidate axes.

use nalgebra::{Isometry3, Point3, Vector3};
use rbd_types::{ContactParams, Result};

use crate::arena::BodyArena;
use crate::contact::Contact;
use crate::shapes::{Plane, Primitive, Shape};

/// Cross-product axes with squared length below this are skipped in the
/// box–box test: the edges are near-parallel and the face axes already
/// cover them.
const CROSS_AXIS_EPSILON: f64 = 1e-3;

/// Narrow-phase contact generator with fixed material parameters.
///
/// Each generator stamps its friction, restitution, and penetration offset
/// onto every contact it produces.
#[derive(Debug, Clone)]
pub struct ContactGenerator {
    params: ContactParams,
}

impl ContactGenerator {
    /// Create a generator, validating the parameters.
    pub fn new(params: ContactParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The generator's material parameters.
    #[must_use]
    pub fn params(&self) -> &ContactParams {
        &self.params
    }

    /// Generate contacts between two primitives, dispatching on their
    /// shapes.
    pub fn generate(
        &self,
        first: &Primitive,
        second: &Primitive,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        match (&first.shape, &second.shape) {
            (Shape::Sphere { .. }, Shape::Sphere { .. }) => {
                self.sphere_sphere(first, second, bodies)
            }
            (Shape::Cuboid { .. }, Shape::Cuboid { .. }) => self.box_box(first, second, bodies),
            (Shape::Cuboid { .. }, Shape::Sphere { .. }) => self.box_sphere(first, second, bodies),
            (Shape::Sphere { .. }, Shape::Cuboid { .. }) => self.box_sphere(second, first, bodies),
        }
    }

    /// Generate contacts between a primitive and scenery plane.
    pub fn against_plane(
        &self,
        primitive: &Primitive,
        plane: &Plane,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        match &primitive.shape {
            Shape::Sphere { .. } => self.sphere_plane(primitive, plane, bodies),
            Shape::Cuboid { .. } => self.box_plane(primitive, plane, bodies),
        }
    }

    /// Sphere–sphere: contact when the center distance does not exceed the
    /// radius sum; normal along the center line, point at the midpoint.
    fn sphere_sphere(
        &self,
        first: &Primitive,
        second: &Primitive,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        let (center_one, radius_one) = sphere_in_world(first, bodies)?;
        let (center_two, radius_two) = sphere_in_world(second, bodies)?;

        let span = center_one - center_two;
        let distance = span.norm();
        if distance > radius_one + radius_two || distance == 0.0 {
            // Coincident centers give the contact no normal direction.
            return Ok(Vec::new());
        }

        let normal = span / distance;
        let midpoint = center_one + (center_two - center_one) * 0.5;
        let penetration = radius_one + radius_two - distance;

        let contact = Contact::new(
            first.body,
            Some(second.body),
            midpoint,
            normal,
            penetration,
            &self.params,
            bodies,
        )?;
        Ok(vec![contact])
    }

    /// Sphere–plane: contact when the center is within a radius of the
    /// plane, on either side; the normal faces the sphere's side.
    fn sphere_plane(
        &self,
        sphere: &Primitive,
        plane: &Plane,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        let (center, radius) = sphere_in_world(sphere, bodies)?;

        let distance = plane.signed_distance(&center);
        if distance.abs() > radius {
            return Ok(Vec::new());
        }

        let normal = if distance < 0.0 {
            -plane.normal()
        } else {
            plane.normal()
        };
        let penetration = radius - distance.abs();
        let point = center - plane.normal() * distance;

        let contact = Contact::new(
            sphere.body,
            None,
            point,
            normal,
            penetration,
            &self.params,
            bodies,
        )?;
        Ok(vec![contact])
    }

    /// Box–plane: each of the 8 world-space vertices is tested
    /// independently, so a box resting flush yields up to 4 contacts.
    fn box_plane(
        &self,
        cuboid: &Primitive,
        plane: &Plane,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        let frame = WorldCuboid::from_primitive(cuboid, bodies)?;

        let mut contacts = Vec::new();
        for vertex in frame.vertices() {
            let distance = plane.signed_distance(&vertex);
            if distance <= 0.0 {
                let point = vertex - plane.normal() * distance;
                contacts.push(Contact::new(
                    cuboid.body,
                    None,
                    point,
                    plane.normal(),
                    -distance,
                    &self.params,
                    bodies,
                )?);
            }
        }
        Ok(contacts)
    }

    /// Box–sphere: clamp the sphere center, expressed in the box's local
    /// frame, to the half-extents; the clamped point is the closest point
    /// on the box surface.
    fn box_sphere(
        &self,
        cuboid: &Primitive,
        sphere: &Primitive,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        let half = cuboid_half_extents(cuboid);
        let transform = cuboid.world_transform(bodies.try_get(cuboid.body)?);
        let (center, radius) = sphere_in_world(sphere, bodies)?;

        let local_center = transform.inverse_transform_point(&center);

        // Cheap rejection before the clamp.
        if local_center.x.abs() - radius > half.x
            || local_center.y.abs() - radius > half.y
            || local_center.z.abs() - radius > half.z
        {
            return Ok(Vec::new());
        }

        let closest_local = Point3::new(
            local_center.x.clamp(-half.x, half.x),
            local_center.y.clamp(-half.y, half.y),
            local_center.z.clamp(-half.z, half.z),
        );
        let closest_world = transform.transform_point(&closest_local);

        let span = closest_world - center;
        let distance_squared = span.norm_squared();
        if distance_squared >= radius * radius || distance_squared == 0.0 {
            // A center exactly on the box surface gives no normal direction.
            return Ok(Vec::new());
        }

        let distance = distance_squared.sqrt();
        let contact = Contact::new(
            cuboid.body,
            Some(sphere.body),
            closest_world,
            span / distance,
            radius - distance,
            &self.params,
            bodies,
        )?;
        Ok(vec![contact])
    }

    /// Box–box separating-axis test over 15 candidate axes: the 6 face
    /// normals and the 9 edge cross products. Any negative overlap proves
    /// separation; otherwise the axis of least overlap determines whether
    /// the contact is vertex–face or edge–edge.
    fn box_box(
        &self,
        first: &Primitive,
        second: &Primitive,
        bodies: &BodyArena,
    ) -> Result<Vec<Contact>> {
        let one = WorldCuboid::from_primitive(first, bodies)?;
        let two = WorldCuboid::from_primitive(second, bodies)?;
        let to_center = two.center - one.center;

        let mut best_overlap = f64::INFINITY;
        let mut best_axis = Vector3::zeros();
        let mut best_case = BestAxis::FaceOfOne;

        for axis in &one.axes {
            let overlap = overlap_on_axis(&one, &two, axis, &to_center);
            if overlap < 0.0 {
                return Ok(Vec::new());
            }
            if overlap < best_overlap {
                best_overlap = overlap;
                best_axis = *axis;
                best_case = BestAxis::FaceOfOne;
            }
        }

        for axis in &two.axes {
            let overlap = overlap_on_axis(&one, &two, axis, &to_center);
            if overlap < 0.0 {
                return Ok(Vec::new());
            }
            if overlap < best_overlap {
                best_overlap = overlap;
                best_axis = *axis;
                best_case = BestAxis::FaceOfTwo;
            }
        }

        for (i, one_axis) in one.axes.iter().enumerate() {
            for (j, two_axis) in two.axes.iter().enumerate() {
                let axis = one_axis.cross(two_axis);
                // Near-parallel edges duplicate a face-axis test.
                if axis.norm_squared() < CROSS_AXIS_EPSILON {
                    continue;
                }
                let axis = axis.normalize();
                let overlap = overlap_on_axis(&one, &two, &axis, &to_center);
                if overlap < 0.0 {
                    return Ok(Vec::new());
                }
                if overlap < best_overlap {
                    best_overlap = overlap;
                    best_axis = axis;
                    best_case = BestAxis::EdgeEdge {
                        one_axis: i,
                        two_axis: j,
                    };
                }
            }
        }

        let contact = match best_case {
            BestAxis::FaceOfOne => self.vertex_face_contact(
                first, &one, second, &two, &best_axis, best_overlap, bodies,
            )?,
            BestAxis::FaceOfTwo => self.vertex_face_contact(
                second, &two, first, &one, &best_axis, best_overlap, bodies,
            )?,
            BestAxis::EdgeEdge { one_axis, two_axis } => self.edge_edge_contact(
                first, &one, one_axis, second, &two, two_axis, &best_axis, best_overlap, bodies,
            )?,
        };
        Ok(vec![contact])
    }

    /// Vertex–face contact: the face box supplies the normal (flipped to
    /// oppose the direction toward the vertex box), the vertex box supplies
    /// its deepest-penetrating corner.
    #[allow(clippy::too_many_arguments)]
    fn vertex_face_contact(
        &self,
        face: &Primitive,
        face_frame: &WorldCuboid,
        vertex: &Primitive,
        vertex_frame: &WorldCuboid,
        axis: &Vector3<f64>,
        penetration: f64,
        bodies: &BodyArena,
    ) -> Result<Contact> {
        let toward_vertex = vertex_frame.center - face_frame.center;
        let normal = if axis.dot(&toward_vertex) > 0.0 {
            -axis
        } else {
            *axis
        };

        // The deepest corner of the vertex box: each half-extent signed by
        // its axis's alignment with the contact normal.
        let mut corner = vertex_frame.half_extents;
        for i in 0..3 {
            if vertex_frame.axes[i].dot(&normal) < 0.0 {
                corner[i] = -corner[i];
            }
        }
        let corner_world = vertex_frame.transform * Point3::from(corner);

        Contact::new(
            face.body,
            Some(vertex.body),
            corner_world,
            normal,
            penetration,
            &self.params,
            bodies,
        )
    }

    /// Edge–edge contact: representative points on the two closest edges,
    /// then the nearest point between the two edge lines.
    #[allow(clippy::too_many_arguments)]
    fn edge_edge_contact(
        &self,
        first: &Primitive,
        one: &WorldCuboid,
        one_axis: usize,
        second: &Primitive,
        two: &WorldCuboid,
        two_axis: usize,
        axis: &Vector3<f64>,
        penetration: f64,
        bodies: &BodyArena,
    ) -> Result<Contact> {
        let toward_two = two.center - one.center;
        let normal = if axis.dot(&toward_two) > 0.0 {
            -axis
        } else {
            *axis
        };

        // A representative point on each box's contributing edge: the
        // midpoint coordinate along the edge direction, and the face the
        // contact axis points at on the other two.
        let mut point_one = one.half_extents;
        let mut point_two = two.half_extents;
        for i in 0..3 {
            if i == one_axis {
                point_one[i] = 0.0;
            } else if one.axes[i].dot(&normal) > 0.0 {
                point_one[i] = -point_one[i];
            }
            if i == two_axis {
                point_two[i] = 0.0;
            } else if two.axes[i].dot(&normal) < 0.0 {
                point_two[i] = -point_two[i];
            }
        }
        let point_one = one.transform * Point3::from(point_one);
        let point_two = two.transform * Point3::from(point_two);

        let point = closest_point_between_edges(
            &point_one,
            &one.axes[one_axis],
            &point_two,
            &two.axes[two_axis],
        );

        Contact::new(
            first.body,
            Some(second.body),
            point,
            normal,
            penetration,
            &self.params,
            bodies,
        )
    }
}

/// Which candidate axis family produced the least overlap.
#[derive(Debug, Clone, Copy)]
enum BestAxis {
    FaceOfOne,
    FaceOfTwo,
    EdgeEdge { one_axis: usize, two_axis: usize },
}

/// A box primitive resolved into world space: center, unit axes, and
/// half-extents, ready for projection tests.
#[derive(Debug, Clone)]
pub struct WorldCuboid {
    /// Full world transform of the box.
    pub transform: Isometry3<f64>,
    /// Box center in world coordinates.
    pub center: Point3<f64>,
    /// The box's three local axes as world unit vectors.
    pub axes: [Vector3<f64>; 3],
    /// Half-extents along the local axes.
    pub half_extents: Vector3<f64>,
}

impl WorldCuboid {
    /// Resolve a box primitive against its body's current pose.
    ///
    /// Fails on a stale body handle; sphere primitives yield an empty
    /// half-extent box and should not reach here (the dispatcher routes by
    /// shape).
    pub fn from_primitive(primitive: &Primitive, bodies: &BodyArena) -> Result<Self> {
        let body = bodies.try_get(primitive.body)?;
        let transform = primitive.world_transform(body);
        let rotation = transform.rotation.to_rotation_matrix().into_inner();
        Ok(Self {
            transform,
            center: transform * Point3::origin(),
            axes: [
                rotation.column(0).into_owned(),
                rotation.column(1).into_owned(),
                rotation.column(2).into_owned(),
            ],
            half_extents: cuboid_half_extents(primitive),
        })
    }

    /// Half-length of the box's projection onto an axis.
    #[must_use]
    pub fn project_onto(&self, axis: &Vector3<f64>) -> f64 {
        self.half_extents.x * axis.dot(&self.axes[0]).abs()
            + self.half_extents.y * axis.dot(&self.axes[1]).abs()
            + self.half_extents.z * axis.dot(&self.axes[2]).abs()
    }

    /// The 8 corners of the box in world coordinates.
    #[must_use]
    pub fn vertices(&self) -> [Point3<f64>; 8] {
        let mut corners = [Point3::origin(); 8];
        let mut index = 0;
        for &sx in &[-1.0, 1.0] {
            for &sy in &[-1.0, 1.0] {
                for &sz in &[-1.0, 1.0] {
                    let local = Point3::new(
                        sx * self.half_extents.x,
                        sy * self.half_extents.y,
                        sz * self.half_extents.z,
                    );
                    corners[index] = self.transform * local;
                    index += 1;
                }
            }
        }
        corners
    }
}

/// Overlap of two boxes projected onto an axis: the sum of both projection
/// half-lengths minus the projected center distance. Negative overlap
/// proves the boxes are separated along this axis.
#[must_use]
pub fn overlap_on_axis(
    one: &WorldCuboid,
    two: &WorldCuboid,
    axis: &Vector3<f64>,
    to_center: &Vector3<f64>,
) -> f64 {
    one.project_onto(axis) + two.project_onto(axis) - to_center.dot(axis).abs()
}

/// Nearest point between two edge lines, as the midpoint of the two
/// per-line closest points (standard two-line nearest-point formula).
fn closest_point_between_edges(
    point_one: &Point3<f64>,
    dir_one: &Vector3<f64>,
    point_two: &Point3<f64>,
    dir_two: &Vector3<f64>,
) -> Point3<f64> {
    let to_start = point_one - point_two;
    let along_one = dir_one.dot(&to_start);
    let along_two = dir_two.dot(&to_start);

    let square_one = dir_one.norm_squared();
    let square_two = dir_two.norm_squared();
    let cross_dot = dir_one.dot(dir_two);

    // Parallel lines are excluded upstream by the SAT degeneracy cutoff.
    let denominator = square_one * square_two - cross_dot * cross_dot;
    let t_one = (cross_dot * along_two - square_two * along_one) / denominator;
    let t_two = (square_one * along_two - cross_dot * along_one) / denominator;

    let nearest_one = point_one + dir_one * t_one;
    let nearest_two = point_two + dir_two * t_two;
    Point3::from((nearest_one.coords + nearest_two.coords) * 0.5)
}

fn sphere_in_world(primitive: &Primitive, bodies: &BodyArena) -> Result<(Point3<f64>, f64)> {
    let body = bodies.try_get(primitive.body)?;
    let radius = match primitive.shape {
        Shape::Sphere { radius } => radius,
        Shape::Cuboid { .. } => 0.0,
    };
    Ok((primitive.world_center(body), radius))
}

fn cuboid_half_extents(primitive: &Primitive) -> Vector3<f64> {
    match primitive.shape {
        Shape::Cuboid { half_extents } => half_extents,
        Shape::Sphere { .. } => Vector3::zeros(),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::body::RigidBody;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, UnitQuaternion};
    use rbd_types::BodyId;

    fn generator() -> ContactGenerator {
        ContactGenerator::new(ContactParams::new(0.0, 1.0, 0.0).unwrap()).unwrap()
    }

    fn add_body(arena: &mut BodyArena, x: f64, y: f64, z: f64) -> BodyId {
        arena.add(RigidBody::new(1.0, Matrix3::identity(), Point3::new(x, y, z)).unwrap())
    }

    #[test]
    fn test_sphere_sphere_overlapping() {
        let mut arena = BodyArena::new();
        let a = add_body(&mut arena, 0.0, 0.0, 0.0);
        let b = add_body(&mut arena, 1.5, 0.0, 0.0);
        let pa = Primitive::new(a, Shape::sphere(1.0).unwrap());
        let pb = Primitive::new(b, Shape::sphere(1.0).unwrap());

        let contacts = generator().generate(&pa, &pb, &arena).unwrap();
        assert_eq!(contacts.len(), 1);
        let contact = &contacts[0];

        assert_relative_eq!(contact.penetration(), 0.5, epsilon = 1e-12);
        // Normal points from the second body toward the first (reference).
        assert_relative_eq!(contact.normal().x, -1.0, epsilon = 1e-12);
        // Midpoint between centers.
        assert_relative_eq!(contact.point().x, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_sphere_separated() {
        let mut arena = BodyArena::new();
        let a = add_body(&mut arena, 0.0, 0.0, 0.0);
        let b = add_body(&mut arena, 3.0, 0.0, 0.0);
        let pa = Primitive::new(a, Shape::sphere(1.0).unwrap());
        let pb = Primitive::new(b, Shape::sphere(1.0).unwrap());

        assert!(generator().generate(&pa, &pb, &arena).unwrap().is_empty());
    }

    #[test]
    fn test_sphere_plane_both_sides() {
        let mut arena = BodyArena::new();
        let above = add_body(&mut arena, 0.0, 0.8, 0.0);
        let below = add_body(&mut arena, 0.0, -0.8, 0.0);
        let plane = Plane::new(Vector3::y(), 0.0).unwrap();
        let shape = Shape::sphere(1.0).unwrap();

        let contacts = generator()
            .against_plane(&Primitive::new(above, shape), &plane, &arena)
            .unwrap();
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal().y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].penetration(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].point().y, 0.0, epsilon = 1e-12);

        let contacts = generator()
            .against_plane(&Primitive::new(below, shape), &plane, &arena)
            .unwrap();
        assert_eq!(contacts.len(), 1);
        // Normal faces the side the sphere is on.
        assert_relative_eq!(contacts[0].normal().y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].penetration(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_box_plane_resting_flush() {
        let mut arena = BodyArena::new();
        let body = add_body(&mut arena, 0.0, 1.0, 0.0);
        let cuboid = Primitive::new(body, Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap());
        let plane = Plane::new(Vector3::y(), 0.0).unwrap();

        let contacts = generator().against_plane(&cuboid, &plane, &arena).unwrap();
        // The four bottom vertices sit exactly on the plane.
        assert_eq!(contacts.len(), 4);
        for contact in &contacts {
            assert_relative_eq!(contact.penetration(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(contact.normal().y, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_box_sphere_face_contact() {
        let mut arena = BodyArena::new();
        let box_body = add_body(&mut arena, 0.0, 0.0, 0.0);
        let sphere_body = add_body(&mut arena, 1.8, 0.0, 0.0);
        let cuboid = Primitive::new(box_body, Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap());
        let sphere = Primitive::new(sphere_body, Shape::sphere(1.0).unwrap());

        let contacts = generator().generate(&cuboid, &sphere, &arena).unwrap();
        assert_eq!(contacts.len(), 1);
        let contact = &contacts[0];

        // Closest point on the box face at x = 1, penetration 1 - 0.8.
        assert_relative_eq!(contact.point().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(contact.penetration(), 0.2, epsilon = 1e-12);
        // Normal from the sphere center toward the closest point.
        assert_relative_eq!(contact.normal().x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_sphere_z_clamp_uses_z_extent() {
        let mut arena = BodyArena::new();
        // A flat slab: tall in y, thin in z. The sphere approaches along z.
        let box_body = add_body(&mut arena, 0.0, 0.0, 0.0);
        let sphere_body = add_body(&mut arena, 0.0, 0.0, 1.2);
        let cuboid = Primitive::new(
            box_body,
            Shape::cuboid(Vector3::new(1.0, 5.0, 0.5)).unwrap(),
        );
        let sphere = Primitive::new(sphere_body, Shape::sphere(1.0).unwrap());

        let contacts = generator().generate(&cuboid, &sphere, &arena).unwrap();
        assert_eq!(contacts.len(), 1);
        // Clamped against the z half-extent (0.5), not the y half-extent.
        assert_relative_eq!(contacts[0].point().z, 0.5, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].penetration(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_box_box_separated_on_face_axis() {
        let mut arena = BodyArena::new();
        let a = add_body(&mut arena, 0.0, 0.0, 0.0);
        let b = add_body(&mut arena, 5.0, 0.0, 0.0);
        let shape = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let pa = Primitive::new(a, shape);
        let pb = Primitive::new(b, shape);

        // The x-axis projection shows the separation directly.
        let one = WorldCuboid::from_primitive(&pa, &arena).unwrap();
        let two = WorldCuboid::from_primitive(&pb, &arena).unwrap();
        let to_center = two.center - one.center;
        assert!(overlap_on_axis(&one, &two, &Vector3::x(), &to_center) < 0.0);

        assert!(generator().generate(&pa, &pb, &arena).unwrap().is_empty());
    }

    #[test]
    fn test_box_box_face_contact() {
        let mut arena = BodyArena::new();
        let a = add_body(&mut arena, 0.0, 0.0, 0.0);
        let b = add_body(&mut arena, 1.8, 0.0, 0.0);
        let shape = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let pa = Primitive::new(a, shape);
        let pb = Primitive::new(b, shape);

        let contacts = generator().generate(&pa, &pb, &arena).unwrap();
        assert_eq!(contacts.len(), 1);
        let contact = &contacts[0];
        assert_relative_eq!(contact.penetration(), 0.2, epsilon = 1e-12);
        // Normal opposes the direction from the face box to the other box.
        assert_relative_eq!(contact.normal().x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_box_rotated_overlap() {
        let mut arena = BodyArena::new();
        let a = add_body(&mut arena, 0.0, 0.0, 0.0);
        // Second box rotated 45° about x so its edge leads into the first
        // box's top face.
        let b = arena.add(
            RigidBody::new(1.0, Matrix3::identity(), Point3::new(0.0, 1.0, 1.9))
                .unwrap()
                .with_orientation(UnitQuaternion::from_euler_angles(
                    std::f64::consts::FRAC_PI_4,
                    0.0,
                    0.0,
                )),
        );
        let shape = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0)).unwrap();
        let pa = Primitive::new(a, shape);
        let pb = Primitive::new(b, shape);

        let contacts = generator().generate(&pa, &pb, &arena).unwrap();
        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].penetration() > 0.0);
        // Normal points from the first box toward the rotated one.
        assert!(contacts[0].normal().dot(&Vector3::new(0.0, 1.0, 1.9)) > 0.0);
    }

    #[test]
    fn test_closest_point_between_edges() {
        // Perpendicular lines: x-axis line through origin and z-axis-offset
        // line along y. Closest points are the origin and (0, 0, 1).
        let point = closest_point_between_edges(
            &Point3::origin(),
            &Vector3::x(),
            &Point3::new(0.0, 0.0, 1.0),
            &Vector3::y(),
        );
        assert_relative_eq!(point.coords, Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
    }
}
