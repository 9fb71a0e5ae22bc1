//! Resource-provider seam.
//!
//! The physics manager resolves object templates and scene meshes through a
//! [`ResourceProvider`] it holds a shared handle to. Mesh parsing lives
//! behind the provider; [`ObjectLibrary`] is an in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::attributes::AttributeStore;
use crate::types::CollisionMeshData;

// ---------------------------------------------------------------------------
// ObjectKey
// ---------------------------------------------------------------------------

/// How a caller names an object template: by source name or library index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Name(String),
    Index(usize),
}

impl From<&str> for ObjectKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ObjectKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for ObjectKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "'{name}'"),
            Self::Index(i) => write!(f, "template #{i}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectTemplate
// ---------------------------------------------------------------------------

/// Everything needed to instantiate one dynamic object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTemplate {
    pub source_name: String,
    pub mesh_group: Vec<CollisionMeshData>,
    pub attributes: AttributeStore,
}

impl ObjectTemplate {
    /// Template with object-default attributes.
    pub fn new(source_name: impl Into<String>, mesh_group: Vec<CollisionMeshData>) -> Self {
        Self {
            source_name: source_name.into(),
            mesh_group,
            attributes: AttributeStore::object_defaults(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeStore) -> Self {
        self.attributes = attributes;
        self
    }
}

// ---------------------------------------------------------------------------
// ResourceProvider
// ---------------------------------------------------------------------------

/// Source of object templates and scene collision meshes.
pub trait ResourceProvider: Send + Sync {
    /// Resolve a template. `None` if nothing matches `key`.
    fn object_template(&self, key: &ObjectKey) -> Option<ObjectTemplate>;

    /// Whether an asset exists at `path`.
    fn asset_exists(&self, path: &Path) -> bool;

    /// Collision primitives of the asset at `path`, if it can be loaded.
    fn load_collision_mesh(&self, path: &Path) -> Option<Vec<CollisionMeshData>>;
}

/// Navigation-mesh companion of a scene asset: same stem, `.navmesh`
/// extension.
pub fn navmesh_path(asset: &Path) -> PathBuf {
    asset.with_extension("navmesh")
}

// ---------------------------------------------------------------------------
// ObjectLibrary
// ---------------------------------------------------------------------------

/// In-memory provider: templates addressable by name or insertion index, and
/// preloaded scene meshes keyed by path.
#[derive(Debug, Clone, Default)]
pub struct ObjectLibrary {
    templates: Vec<ObjectTemplate>,
    by_name: HashMap<String, usize>,
    assets: HashMap<PathBuf, Vec<CollisionMeshData>>,
}

impl ObjectLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template and return its index. A template with the same source
    /// name is replaced in place and keeps its index.
    pub fn insert(&mut self, template: ObjectTemplate) -> usize {
        if let Some(&i) = self.by_name.get(&template.source_name) {
            self.templates[i] = template;
            return i;
        }
        let i = self.templates.len();
        self.by_name.insert(template.source_name.clone(), i);
        self.templates.push(template);
        i
    }

    /// Register the collision mesh of a scene asset.
    pub fn insert_asset(&mut self, path: impl Into<PathBuf>, mesh_group: Vec<CollisionMeshData>) {
        self.assets.insert(path.into(), mesh_group);
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&ObjectTemplate> {
        match key {
            ObjectKey::Name(name) => self.by_name.get(name).map(|&i| &self.templates[i]),
            ObjectKey::Index(i) => self.templates.get(*i),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template names in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.source_name.as_str())
    }
}

impl ResourceProvider for ObjectLibrary {
    fn object_template(&self, key: &ObjectKey) -> Option<ObjectTemplate> {
        self.get(key).cloned()
    }

    fn asset_exists(&self, path: &Path) -> bool {
        self.assets.contains_key(path)
    }

    fn load_collision_mesh(&self, path: &Path) -> Option<Vec<CollisionMeshData>> {
        self.assets.get(path).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
