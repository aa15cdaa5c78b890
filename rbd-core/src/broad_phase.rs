//! Broad-phase collision detection over a bounding-volume tree.
//!
//! The broad phase proposes candidate colliding pairs without exact
//! geometry. Bodies are wrapped in bounding spheres and organized in a
//! binary tree whose internal nodes enclose both children; the pair query
//! prunes whole subtrees whose volumes don't touch, which is the invariant
//! that makes it cheap: if two sibling volumes are disjoint, no descendant
//! of one can touch a descendant of the other.
//!
//! # Algorithm
//!
//! - **Insertion** descends from the root, at each internal node choosing
//!   the child whose volume needs the least growth to absorb the newcomer,
//!   and demotes the reached leaf into an internal node over the old
//!   occupant and the new body. Ancestor volumes above the insertion point
//!   are not eagerly re-tightened; re-tightening happens lazily at the next
//!   insertion through them.
//! - **Removal** promotes the sibling of the removed leaf into their shared
//!   parent.
//! - **Queries** walk the tree with a result budget and stop early once it
//!   is exhausted.

use nalgebra::Point3;
use rbd_types::{BodyId, PhysError, Result};

/// A sphere bounding a body for broad-phase culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    center: Point3<f64>,
    radius: f64,
}

impl BoundingSphere {
    /// Create a bounding sphere.
    ///
    /// Fails with [`PhysError::InvalidShape`] unless the radius is positive.
    pub fn new(center: Point3<f64>, radius: f64) -> Result<Self> {
        if radius <= 0.0 || !radius.is_finite() {
            return Err(PhysError::invalid_shape(format!(
                "bounding sphere radius must be positive, got {radius}"
            )));
        }
        Ok(Self { center, radius })
    }

    /// Center of the sphere.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    /// Radius of the sphere.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Whether this sphere touches another: center distance ≤ radius sum.
    #[must_use]
    pub fn touches(&self, other: &Self) -> bool {
        let distance = (self.center - other.center).norm();
        distance <= self.radius + other.radius
    }

    /// Radius increase needed for a sphere enclosing both `self` and
    /// `other`, relative to `self`. Smaller growth means a better home for
    /// an inserted volume.
    #[must_use]
    pub fn growth(&self, other: &Self) -> f64 {
        self.enclosing(other).radius - self.radius
    }

    /// The locally-smallest sphere enclosing both `self` and `other`.
    ///
    /// If one sphere already contains the other, that sphere is returned
    /// unchanged; otherwise the enclosing diameter spans both far sides and
    /// the center slides from `self` toward `other` proportionally.
    #[must_use]
    pub fn enclosing(&self, other: &Self) -> Self {
        let span = other.center - self.center;
        let distance_squared = span.norm_squared();
        let radius_difference = self.radius - other.radius;

        // Containment test on squared quantities avoids the square root.
        if radius_difference * radius_difference >= distance_squared {
            if self.radius >= other.radius {
                return *self;
            }
            return *other;
        }

        let distance = distance_squared.sqrt();
        let radius = 0.5 * (distance + self.radius + other.radius);
        let center = self.center + span * ((radius - self.radius) / distance);
        Self { center, radius }
    }
}

/// A candidate colliding pair proposed by the broad phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotentialContact {
    /// One body of the candidate pair.
    pub first: BodyId,
    /// The other body of the candidate pair.
    pub second: BodyId,
}

/// A node in the bounding-volume tree.
///
/// A leaf owns exactly one body; an internal node owns no body, exactly two
/// children, and a volume enclosing both children's volumes.
#[derive(Debug, Clone)]
struct Node {
    body: Option<BodyId>,
    volume: BoundingSphere,
    children: Option<(usize, usize)>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Binary bounding-volume tree over bodies.
///
/// # Example
///
/// ```
/// use rbd_core::broad_phase::{BoundingSphere, BoundingVolumeTree};
/// use rbd_types::{BodyId, Point3};
///
/// let mut tree = BoundingVolumeTree::new();
/// tree.insert(
///     BodyId::new(0),
///     BoundingSphere::new(Point3::origin(), 1.0).unwrap(),
/// );
/// tree.insert(
///     BodyId::new(1),
///     BoundingSphere::new(Point3::new(1.5, 0.0, 0.0), 1.0).unwrap(),
/// );
///
/// let pairs = tree.potential_contacts(10);
/// assert_eq!(pairs.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoundingVolumeTree {
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl BoundingVolumeTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tree holds no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of bodies (leaves) in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.body.is_some()).count()
    }

    /// Insert a body with its bounding volume.
    ///
    /// Descends choosing the child with the least volume growth; the
    /// reached leaf is demoted to an internal node over the old occupant
    /// and the newcomer, and its volume is recomputed. Volumes above the
    /// demoted leaf are deliberately not re-tightened here.
    pub fn insert(&mut self, body: BodyId, volume: BoundingSphere) {
        let Some(root) = self.root else {
            let leaf = self.push_leaf(body, volume);
            self.root = Some(leaf);
            return;
        };

        let mut current = root;
        while let Some((left, right)) = self.nodes[current].children {
            let left_growth = self.nodes[left].volume.growth(&volume);
            let right_growth = self.nodes[right].volume.growth(&volume);
            current = if left_growth > right_growth { right } else { left };
        }

        // Demote the leaf: its body and volume move into a new left child,
        // the newcomer becomes the right child.
        let occupant = self.nodes[current].body.take();
        let occupant_volume = self.nodes[current].volume;
        let left = self.push_node(occupant, occupant_volume);
        let right = self.push_leaf(body, volume);
        self.nodes[current].children = Some((left, right));
        self.nodes[current].volume = occupant_volume.enclosing(&volume);
    }

    /// Remove a body from the tree.
    ///
    /// Removing the sole occupant of the root empties the tree; otherwise
    /// the parent of the removed leaf is replaced in place by the leaf's
    /// sibling. Absent bodies are ignored.
    pub fn remove(&mut self, body: BodyId) {
        let Some(root) = self.root else {
            return;
        };
        if self.nodes[root].body == Some(body) {
            self.root = None;
            self.nodes.clear();
            return;
        }
        self.remove_below(root, body);
    }

    fn remove_below(&mut self, current: usize, body: BodyId) {
        let Some((left, right)) = self.nodes[current].children else {
            return;
        };

        if self.nodes[left].body == Some(body) || self.nodes[right].body == Some(body) {
            let sibling = if self.nodes[left].body == Some(body) {
                right
            } else {
                left
            };
            // Sibling promotion: the parent takes over the sibling's body,
            // volume, and children. The vacated slots stay allocated until
            // the tree empties.
            self.nodes[current].body = self.nodes[sibling].body;
            self.nodes[current].volume = self.nodes[sibling].volume;
            self.nodes[current].children = self.nodes[sibling].children;
        } else {
            self.remove_below(left, body);
            self.remove_below(right, body);
        }
    }

    /// Collect up to `limit` candidate pairs of possibly-touching bodies.
    #[must_use]
    pub fn potential_contacts(&self, limit: usize) -> Vec<PotentialContact> {
        match self.root {
            Some(root) => self.contacts_below(root, limit),
            None => Vec::new(),
        }
    }

    fn contacts_below(&self, current: usize, limit: usize) -> Vec<PotentialContact> {
        let Some((left, right)) = self.nodes[current].children else {
            return Vec::new();
        };
        if limit == 0 {
            return Vec::new();
        }

        // If the sibling volumes are disjoint, no descendant of one can
        // touch a descendant of the other.
        if !self.nodes[left].volume.touches(&self.nodes[right].volume) {
            return Vec::new();
        }

        let mut contacts = Vec::new();
        if self.nodes[left].is_leaf() && self.nodes[right].is_leaf() {
            if let (Some(first), Some(second)) = (self.nodes[left].body, self.nodes[right].body) {
                contacts.push(PotentialContact { first, second });
            }
        } else {
            let mut remaining = limit;
            if !self.nodes[left].is_leaf() {
                let found = self.contacts_below(left, remaining);
                remaining -= found.len();
                contacts.extend(found);
            }
            if remaining > 0 && !self.nodes[right].is_leaf() {
                contacts.extend(self.contacts_below(right, remaining));
            }
        }
        contacts
    }

    fn push_leaf(&mut self, body: BodyId, volume: BoundingSphere) -> usize {
        self.push_node(Some(body), volume)
    }

    fn push_node(&mut self, body: Option<BodyId>, volume: BoundingSphere) -> usize {
        self.nodes.push(Node {
            body,
            volume,
            children: None,
        });
        self.nodes.len() - 1
    }

    #[cfg(test)]
    fn left_child(&self, index: usize) -> Option<usize> {
        self.nodes[index].children.map(|(left, _)| left)
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
    use approx::assert_relative_eq;

    fn sphere(x: f64, radius: f64) -> BoundingSphere {
        BoundingSphere::new(Point3::new(x, 0.0, 0.0), radius).unwrap()
    }

    #[test]
    fn test_rejects_nonpositive_radius() {
        assert!(BoundingSphere::new(Point3::origin(), 0.0).is_err());
        assert!(BoundingSphere::new(Point3::origin(), -1.0).is_err());
    }

    #[test]
    fn test_touches_symmetric() {
        let a = sphere(0.0, 1.0);
        let b = sphere(1.5, 1.0);
        let c = sphere(5.0, 1.0);

        assert!(a.touches(&b));
        assert!(b.touches(&a));
        assert!(!a.touches(&c));
        assert!(!c.touches(&a));
    }

    #[test]
    fn test_touches_boundary_inclusive() {
        // Exactly touching: distance == radius sum.
        let a = sphere(0.0, 1.0);
        let b = sphere(2.0, 1.0);
        assert!(a.touches(&b));
    }

    #[test]
    fn test_enclosing_contained_sphere_unchanged() {
        let big = sphere(0.0, 5.0);
        let small = sphere(1.0, 1.0);
        assert_eq!(big.enclosing(&small), big);
        assert_eq!(small.enclosing(&big), big);
    }

    #[test]
    fn test_enclosing_disjoint_spheres() {
        let a = sphere(0.0, 1.0);
        let b = sphere(4.0, 1.0);
        let enclosing = a.enclosing(&b);

        // Diameter spans from -1 to 5.
        assert_relative_eq!(enclosing.radius(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(enclosing.center().x, 2.0, epsilon = 1e-12);
        // Both spheres are inside.
        assert!(enclosing.radius() >= (enclosing.center() - a.center()).norm() + a.radius() - 1e-12);
        assert!(enclosing.radius() >= (enclosing.center() - b.center()).norm() + b.radius() - 1e-12);
    }

    #[test]
    fn test_growth_prefers_nearer_sphere() {
        let near = sphere(1.0, 1.0);
        let far = sphere(10.0, 1.0);
        let candidate = sphere(0.0, 1.0);
        assert!(near.growth(&candidate) < far.growth(&candidate));
    }

    #[test]
    fn test_insert_and_query_overlapping_pair() {
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(0), sphere(0.0, 1.0));
        tree.insert(BodyId::new(1), sphere(1.5, 1.0));

        let pairs = tree.potential_contacts(10);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, BodyId::new(0));
        assert_eq!(pairs[0].second, BodyId::new(1));
    }

    #[test]
    fn test_disjoint_bodies_yield_no_pairs() {
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(0), sphere(0.0, 1.0));
        tree.insert(BodyId::new(1), sphere(100.0, 1.0));
        tree.insert(BodyId::new(2), sphere(-100.0, 1.0));

        assert!(tree.potential_contacts(10).is_empty());
    }

    #[test]
    fn test_query_respects_budget() {
        let mut tree = BoundingVolumeTree::new();
        // A tight cluster: every sibling pair the walk reaches touches.
        for i in 0..6 {
            tree.insert(BodyId::new(i), sphere(0.1 * i as f64, 1.0));
        }
        assert!(tree.potential_contacts(0).is_empty());
        assert!(tree.potential_contacts(1).len() <= 1);
    }

    #[test]
    fn test_left_child_is_left() {
        // The demoted leaf's old occupant becomes the left child.
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(7), sphere(0.0, 1.0));
        tree.insert(BodyId::new(8), sphere(1.0, 1.0));

        let root = tree.root.unwrap();
        let left = tree.left_child(root).unwrap();
        assert_eq!(tree.nodes[left].body, Some(BodyId::new(7)));
    }

    #[test]
    fn test_remove_root_empties_tree() {
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(0), sphere(0.0, 1.0));
        tree.remove(BodyId::new(0));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_remove_promotes_sibling() {
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(0), sphere(0.0, 1.0));
        tree.insert(BodyId::new(1), sphere(1.5, 1.0));
        tree.remove(BodyId::new(0));

        assert_eq!(tree.len(), 1);
        let root = tree.root.unwrap();
        assert_eq!(tree.nodes[root].body, Some(BodyId::new(1)));
        assert!(tree.potential_contacts(10).is_empty());
    }

    #[test]
    fn test_remove_absent_body_is_noop() {
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(0), sphere(0.0, 1.0));
        tree.remove(BodyId::new(42));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_demoted_leaf_volume_recomputed() {
        // After one insertion through a leaf, the demoted node's volume
        // encloses both children. (Ancestors further up are deliberately
        // not re-tightened on later insertions.)
        let mut tree = BoundingVolumeTree::new();
        tree.insert(BodyId::new(0), sphere(0.0, 1.0));
        tree.insert(BodyId::new(1), sphere(4.0, 1.0));

        let root = tree.root.unwrap();
        let (left, right) = tree.nodes[root].children.unwrap();
        let parent_volume = tree.nodes[root].volume;
        for child in [left, right] {
            let child_volume = &tree.nodes[child].volume;
            let reach =
                (parent_volume.center() - child_volume.center()).norm() + child_volume.radius();
            assert!(reach <= parent_volume.radius() + 1e-9);
        }
    }
}
