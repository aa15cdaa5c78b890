//! Body storage with stable handles.
//!
//! The arena replaces reference-identity lookups: every cross-reference in
//! the engine (force-generator targets, tree leaves, contacts) is a
//! [`BodyId`] resolved here. Ids are never reused, so a handle to a removed
//! body stays invalid forever instead of silently aliasing a newer body.

use rbd_types::{BodyId, PhysError, Result};

use crate::body::RigidBody;

/// Growable slot storage for the world's rigid bodies.
///
/// A body's id is its slot index; removal tombstones the slot.
#[derive(Debug, Default)]
pub struct BodyArena {
    slots: Vec<Option<RigidBody>>,
}

impl BodyArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body, returning its stable handle.
    pub fn add(&mut self, body: RigidBody) -> BodyId {
        let id = BodyId::new(self.slots.len() as u64);
        self.slots.push(Some(body));
        id
    }

    /// Remove a body by handle, returning it.
    pub fn remove(&mut self, id: BodyId) -> Result<RigidBody> {
        self.slot_mut(id)?
            .take()
            .ok_or(PhysError::InvalidBodyId(id.raw()))
    }

    /// Look up a body.
    #[must_use]
    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.slots.get(id.raw() as usize)?.as_ref()
    }

    /// Look up a body mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.slots.get_mut(id.raw() as usize)?.as_mut()
    }

    /// Look up a body, erring on a stale or unknown handle.
    pub fn try_get(&self, id: BodyId) -> Result<&RigidBody> {
        self.get(id).ok_or(PhysError::InvalidBodyId(id.raw()))
    }

    /// Look up a body mutably, erring on a stale or unknown handle.
    pub fn try_get_mut(&mut self, id: BodyId) -> Result<&mut RigidBody> {
        self.get_mut(id).ok_or(PhysError::InvalidBodyId(id.raw()))
    }

    /// Borrow two distinct bodies mutably at once.
    ///
    /// The pair is returned in argument order. Fails if the handles are
    /// equal or either is stale.
    pub fn get_pair_mut(
        &mut self,
        a: BodyId,
        b: BodyId,
    ) -> Result<(&mut RigidBody, &mut RigidBody)> {
        let (ia, ib) = (a.raw() as usize, b.raw() as usize);
        if ia == ib {
            return Err(PhysError::InvalidBodyId(a.raw()));
        }
        if ia >= self.slots.len() {
            return Err(PhysError::InvalidBodyId(a.raw()));
        }
        if ib >= self.slots.len() {
            return Err(PhysError::InvalidBodyId(b.raw()));
        }

        let (lo, hi, swapped) = if ia < ib { (ia, ib, false) } else { (ib, ia, true) };
        let (left, right) = self.slots.split_at_mut(hi);
        let first = left[lo].as_mut();
        let second = right[0].as_mut();
        match (first, second, swapped) {
            (Some(x), Some(y), false) => Ok((x, y)),
            (Some(x), Some(y), true) => Ok((y, x)),
            (None, _, false) | (_, None, true) => Err(PhysError::InvalidBodyId(a.raw())),
            _ => Err(PhysError::InvalidBodyId(b.raw())),
        }
    }

    /// Check whether a handle refers to a live body.
    #[must_use]
    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether the arena holds no live bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over live bodies with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|b| (BodyId::new(i as u64), b)))
    }

    /// Iterate mutably over live bodies with their handles.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut RigidBody)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|b| (BodyId::new(i as u64), b)))
    }

    fn slot_mut(&mut self, id: BodyId) -> Result<&mut Option<RigidBody>> {
        self.slots
            .get_mut(id.raw() as usize)
            .ok_or(PhysError::InvalidBodyId(id.raw()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Point3};

    fn make_body(x: f64) -> RigidBody {
        RigidBody::new(1.0, Matrix3::identity(), Point3::new(x, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let mut arena = BodyArena::new();
        let a = arena.add(make_body(1.0));
        let b = arena.add(make_body(2.0));

        assert_ne!(a, b);
        assert_eq!(arena.get(a).unwrap().position().x, 1.0);
        assert_eq!(arena.get(b).unwrap().position().x, 2.0);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_remove_tombstones_handle() {
        let mut arena = BodyArena::new();
        let a = arena.add(make_body(1.0));
        arena.remove(a).unwrap();

        assert!(!arena.contains(a));
        assert!(arena.try_get(a).is_err());

        // Ids are never reused: a new body gets a fresh handle.
        let b = arena.add(make_body(2.0));
        assert_ne!(a, b);
        assert!(arena.try_get(a).is_err());
    }

    #[test]
    fn test_get_pair_mut() {
        let mut arena = BodyArena::new();
        let a = arena.add(make_body(1.0));
        let b = arena.add(make_body(2.0));

        let (body_a, body_b) = arena.get_pair_mut(a, b).unwrap();
        assert_eq!(body_a.position().x, 1.0);
        assert_eq!(body_b.position().x, 2.0);

        // Reversed argument order returns the pair reversed.
        let (body_b, body_a) = arena.get_pair_mut(b, a).unwrap();
        assert_eq!(body_b.position().x, 2.0);
        assert_eq!(body_a.position().x, 1.0);

        assert!(arena.get_pair_mut(a, a).is_err());
    }

    #[test]
    fn test_iter_skips_removed() {
        let mut arena = BodyArena::new();
        let a = arena.add(make_body(1.0));
        let _b = arena.add(make_body(2.0));
        arena.remove(a).unwrap();

        let ids: Vec<_> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![BodyId::new(1)]);
    }
}
