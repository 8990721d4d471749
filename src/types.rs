//! Fundamental types: object identities, trackable objects, and the
//! per-frame object collection consumed by both tracking stages.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifier type — newtype wrapper so object ids are never confused with
// raw indices at compile time
// ---------------------------------------------------------------------------

/// Stable identity of a trackable object: its index in the owning
/// [`ObjectCollection`] arena. Orderable and hashable, which makes it usable
/// as the deterministic sort key for cost-matrix rows and columns.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Arena index of this object.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TrackObject
// ---------------------------------------------------------------------------

/// A detected object handed to the tracker by the detection/feature layer.
///
/// The tracker never mutates an object; it only reads its frame, position
/// and features to build linking costs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackObject {
    /// Frame (time point) the object was detected in.
    pub frame: i64,
    /// Spatial position in physical units.
    pub position: Point3<f64>,
    /// Detection radius in the same units as the position.
    pub radius: f64,
    /// Named feature values (intensity, quality, ...) used by
    /// feature-penalty cost functions. May be empty.
    pub features: HashMap<String, f64>,
}

impl TrackObject {
    /// A bare object with no features.
    pub fn new(frame: i64, x: f64, y: f64, z: f64, radius: f64) -> Self {
        Self {
            frame,
            position: Point3::new(x, y, z),
            radius,
            features: HashMap::new(),
        }
    }

    /// Squared Euclidean distance to another object.
    #[inline]
    pub fn squared_distance_to(&self, other: &TrackObject) -> f64 {
        (self.position - other.position).norm_squared()
    }

    /// Value of a named feature, if the object carries it.
    #[inline]
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

// ---------------------------------------------------------------------------
// ObjectCollection — arena of objects plus a frame index
// ---------------------------------------------------------------------------

/// Arena of all trackable objects of a run, with a frame → objects index.
///
/// Pushing an object assigns the next [`ObjectId`], so ids are dense arena
/// indices and per-frame lists are ordered and free of duplicates by
/// construction. Frames with zero objects are representable (and skipped by
/// the trackers, not treated as errors).
#[derive(Clone, Debug, Default)]
pub struct ObjectCollection {
    objects: Vec<TrackObject>,
    frames: BTreeMap<i64, Vec<ObjectId>>,
}

impl ObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning its identity.
    pub fn push(&mut self, object: TrackObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.frames.entry(object.frame).or_default().push(id);
        self.objects.push(object);
        id
    }

    /// Total number of objects across all frames.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The object with the given identity.
    #[inline]
    pub fn get(&self, id: ObjectId) -> &TrackObject {
        &self.objects[id.index()]
    }

    /// Frames that contain at least one object, ascending.
    pub fn non_empty_frames(&self) -> Vec<i64> {
        self.frames
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(&frame, _)| frame)
            .collect()
    }

    /// Objects detected in the given frame, in insertion order.
    pub fn frame_objects(&self, frame: i64) -> &[ObjectId] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over all `(id, object)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &TrackObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u32), o))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_assigns_dense_ids() {
        let mut coll = ObjectCollection::new();
        let a = coll.push(TrackObject::new(0, 0.0, 0.0, 0.0, 1.0));
        let b = coll.push(TrackObject::new(1, 1.0, 0.0, 0.0, 1.0));
        assert_eq!(a, ObjectId(0));
        assert_eq!(b, ObjectId(1));
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.get(b).frame, 1);
    }

    #[test]
    fn frame_index_is_sorted_and_skips_empty() {
        let mut coll = ObjectCollection::new();
        coll.push(TrackObject::new(5, 0.0, 0.0, 0.0, 1.0));
        coll.push(TrackObject::new(2, 0.0, 0.0, 0.0, 1.0));
        coll.push(TrackObject::new(5, 1.0, 0.0, 0.0, 1.0));
        assert_eq!(coll.non_empty_frames(), vec![2, 5]);
        assert_eq!(coll.frame_objects(5).len(), 2);
        assert!(coll.frame_objects(3).is_empty());
    }

    #[test]
    fn squared_distance() {
        let a = TrackObject::new(0, 0.0, 0.0, 0.0, 1.0);
        let b = TrackObject::new(0, 3.0, 4.0, 0.0, 1.0);
        assert_eq!(a.squared_distance_to(&b), 25.0);
    }
}
