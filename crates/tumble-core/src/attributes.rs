//! Heterogeneous named-value store used to configure scenes, objects and the
//! physics manager.
//!
//! Values live in five explicitly typed partitions. The same name may exist
//! in several partitions at once; [`AttributeStore::count`] reports how many.
//! The partition is picked at compile time through [`AttributeValue`], so a
//! read can never silently coerce between types.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;

use crate::error::AttributeError;

// ---------------------------------------------------------------------------
// Well-known keys
// ---------------------------------------------------------------------------

/// Attribute names shared by the object, scene and manager defaults.
pub mod keys {
    pub const MASS: &str = "mass";
    pub const MARGIN: &str = "margin";
    pub const SCALE: &str = "scale";
    pub const COM: &str = "COM";
    pub const INERTIA: &str = "inertia";
    pub const FRICTION: &str = "frictionCoefficient";
    pub const RESTITUTION: &str = "restitutionCoefficient";
    pub const LIN_DAMPING: &str = "linDamping";
    pub const ANG_DAMPING: &str = "angDamping";
    pub const ORIGIN_HANDLE: &str = "originHandle";
    pub const RENDER_MESH_HANDLE: &str = "renderMeshHandle";
    pub const COLLISION_MESH_HANDLE: &str = "collisionMeshHandle";
    pub const GRAVITY: &str = "gravity";
    pub const SIMULATOR: &str = "simulator";
    pub const TIMESTEP: &str = "timestep";
    pub const MAX_SUBSTEPS: &str = "maxSubsteps";
}

// ---------------------------------------------------------------------------
// AttributeKind / AttributeValue
// ---------------------------------------------------------------------------

/// Names one of the five partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Double,
    Int,
    String,
    Vec3,
    StringList,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Double => "double",
            Self::Int => "int",
            Self::String => "string",
            Self::Vec3 => "vec3",
            Self::StringList => "string list",
        })
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A type that has its own partition in an [`AttributeStore`].
///
/// Sealed: implemented for `f64`, `i32`, `String`, `Vec3` and `Vec<String>`.
pub trait AttributeValue: sealed::Sealed + Clone + Sized {
    const KIND: AttributeKind;

    #[doc(hidden)]
    fn partition(store: &AttributeStore) -> &BTreeMap<String, Self>;

    #[doc(hidden)]
    fn partition_mut(store: &mut AttributeStore) -> &mut BTreeMap<String, Self>;
}

macro_rules! attribute_value {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl sealed::Sealed for $ty {}

        impl AttributeValue for $ty {
            const KIND: AttributeKind = AttributeKind::$kind;

            fn partition(store: &AttributeStore) -> &BTreeMap<String, Self> {
                &store.$field
            }

            fn partition_mut(store: &mut AttributeStore) -> &mut BTreeMap<String, Self> {
                &mut store.$field
            }
        }
    };
}

attribute_value!(f64, Double, doubles);
attribute_value!(i32, Int, ints);
attribute_value!(String, String, strings);
attribute_value!(Vec3, Vec3, vec3s);
attribute_value!(Vec<String>, StringList, string_lists);

// ---------------------------------------------------------------------------
// AttributeStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    doubles: BTreeMap<String, f64>,
    ints: BTreeMap<String, i32>,
    strings: BTreeMap<String, String>,
    vec3s: BTreeMap<String, Vec3>,
    string_lists: BTreeMap<String, Vec<String>>,
}

impl AttributeStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for a dynamic object.
    #[must_use]
    pub fn object_defaults() -> Self {
        let mut store = Self::new();
        store.set(keys::MASS, 1.0_f64);
        store.set(keys::MARGIN, 0.01_f64);
        store.set(keys::SCALE, 1.0_f64);
        store.set(keys::COM, Vec3::ZERO);
        store.set(keys::INERTIA, Vec3::ZERO);
        store.set(keys::FRICTION, 0.5_f64);
        store.set(keys::RESTITUTION, 0.6_f64);
        store.set(keys::LIN_DAMPING, 0.2_f64);
        store.set(keys::ANG_DAMPING, 0.2_f64);
        store.set_string(keys::ORIGIN_HANDLE, "");
        store.set_string(keys::RENDER_MESH_HANDLE, "");
        store.set_string(keys::COLLISION_MESH_HANDLE, "");
        store
    }

    /// Defaults for the static scene.
    #[must_use]
    pub fn scene_defaults() -> Self {
        let mut store = Self::new();
        store.set(keys::GRAVITY, Vec3::new(0.0, -9.8, 0.0));
        store.set(keys::FRICTION, 0.4_f64);
        store.set(keys::RESTITUTION, 0.1_f64);
        store.set_string(keys::RENDER_MESH_HANDLE, "");
        store.set_string(keys::COLLISION_MESH_HANDLE, "");
        store
    }

    /// Defaults for the physics manager itself.
    #[must_use]
    pub fn manager_defaults() -> Self {
        let mut store = Self::new();
        store.set_string(keys::SIMULATOR, "none");
        store.set(keys::TIMESTEP, 0.01_f64);
        store.set(keys::MAX_SUBSTEPS, 10_i32);
        store
    }

    // -- Generic typed access --

    /// Insert or overwrite `key` in the `T` partition.
    pub fn set<T: AttributeValue>(&mut self, key: impl Into<String>, value: T) {
        T::partition_mut(self).insert(key.into(), value);
    }

    /// Read `key` from the `T` partition.
    pub fn get<T: AttributeValue>(&self, key: &str) -> Result<&T, AttributeError> {
        T::partition(self)
            .get(key)
            .ok_or_else(|| AttributeError::KeyNotFound {
                key: key.to_owned(),
                kind: T::KIND,
            })
    }

    /// True if any partition holds `key`.
    pub fn exists(&self, key: &str) -> bool {
        self.count(key) > 0
    }

    /// True only if the `T` partition holds `key`.
    pub fn exists_as<T: AttributeValue>(&self, key: &str) -> bool {
        T::partition(self).contains_key(key)
    }

    /// Number of partitions holding `key` (0..=5).
    pub fn count(&self, key: &str) -> usize {
        [
            self.doubles.contains_key(key),
            self.ints.contains_key(key),
            self.strings.contains_key(key),
            self.vec3s.contains_key(key),
            self.string_lists.contains_key(key),
        ]
        .into_iter()
        .filter(|&held| held)
        .count()
    }

    /// Remove `key` from every partition.
    pub fn erase_all(&mut self, key: &str) {
        self.doubles.remove(key);
        self.ints.remove(key);
        self.strings.remove(key);
        self.vec3s.remove(key);
        self.string_lists.remove(key);
    }

    /// Remove `key` from the `T` partition only. Returns whether it was there.
    pub fn erase_as<T: AttributeValue>(&mut self, key: &str) -> bool {
        T::partition_mut(self).remove(key).is_some()
    }

    /// Empty every partition.
    pub fn clear(&mut self) {
        self.doubles.clear();
        self.ints.clear();
        self.strings.clear();
        self.vec3s.clear();
        self.string_lists.clear();
    }

    /// Empty the `T` partition only.
    pub fn clear_as<T: AttributeValue>(&mut self) {
        T::partition_mut(self).clear();
    }

    /// Keys held by the `T` partition, in sorted order.
    pub fn keys_as<T: AttributeValue + 'static>(&self) -> impl Iterator<Item = &str> {
        T::partition(self).keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.doubles.is_empty()
            && self.ints.is_empty()
            && self.strings.is_empty()
            && self.vec3s.is_empty()
            && self.string_lists.is_empty()
    }

    // -- String lists --

    /// Push `item` onto the list at `key`, creating the list if absent.
    pub fn append(&mut self, key: impl Into<String>, item: impl Into<String>) {
        self.string_lists
            .entry(key.into())
            .or_default()
            .push(item.into());
    }

    /// Remove the first occurrence of `item` from the list at `key`.
    ///
    /// Later duplicates are kept. Returns `Ok(false)` if the list exists but
    /// does not contain `item`.
    pub fn remove_item(&mut self, key: &str, item: &str) -> Result<bool, AttributeError> {
        let list = self
            .string_lists
            .get_mut(key)
            .ok_or_else(|| AttributeError::KeyNotFound {
                key: key.to_owned(),
                kind: AttributeKind::StringList,
            })?;
        match list.iter().position(|s| s == item) {
            Some(i) => {
                list.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // -- Typed convenience accessors --

    pub fn double(&self, key: &str) -> Result<f64, AttributeError> {
        self.get::<f64>(key).copied()
    }

    pub fn int(&self, key: &str) -> Result<i32, AttributeError> {
        self.get::<i32>(key).copied()
    }

    pub fn string(&self, key: &str) -> Result<&str, AttributeError> {
        self.get::<String>(key).map(String::as_str)
    }

    pub fn vec3(&self, key: &str) -> Result<Vec3, AttributeError> {
        self.get::<Vec3>(key).copied()
    }

    pub fn strings(&self, key: &str) -> Result<&[String], AttributeError> {
        self.get::<Vec<String>>(key).map(Vec::as_slice)
    }

    pub fn set_double(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, value);
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.set(key, value);
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, value.into());
    }

    pub fn set_vec3(&mut self, key: impl Into<String>, value: Vec3) {
        self.set(key, value);
    }

    pub fn set_strings(&mut self, key: impl Into<String>, value: Vec<String>) {
        self.set(key, value);
    }
}

impl fmt::Display for AttributeStore {
    /// Debug listing of every partition, keys sorted. Not a stable format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "List of attributes:")?;
        writeln!(f, "----------------------------------------")?;

        writeln!(f, "\nDoubles:")?;
        for (k, v) in &self.doubles {
            writeln!(f, "{k} : {v:.6}")?;
        }

        writeln!(f, "\nInts:")?;
        for (k, v) in &self.ints {
            writeln!(f, "{k} : {v}")?;
        }

        writeln!(f, "\nStrings:")?;
        for (k, v) in &self.strings {
            writeln!(f, "{k} : {v}")?;
        }

        writeln!(f, "\nVector3s:")?;
        for (k, v) in &self.vec3s {
            writeln!(f, "{k} : [{:.6}, {:.6}, {:.6}]", v.x, v.y, v.z)?;
        }

        writeln!(f, "\nVectors of Strings:")?;
        for (k, v) in &self.string_lists {
            writeln!(f, "{k} : [{}]", v.join(", "))?;
        }

        writeln!(f, "\n----------------------------------------")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
