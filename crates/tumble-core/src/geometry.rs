//! Collision geometry validation.
//!
//! Only triangle lists can become collision shapes. Validation is
//! all-or-nothing over a mesh group and runs before any backend resource is
//! allocated, so a rejected group never leaves partial state behind.

use tracing::error;

use crate::error::GeometryError;
use crate::types::{CollisionMeshData, MeshPrimitive};

/// Check a single primitive's topology.
pub fn validate_primitive(index: usize, mesh: &CollisionMeshData) -> Result<(), GeometryError> {
    if mesh.primitive == MeshPrimitive::Triangles {
        return Ok(());
    }
    error!(
        "Invalid collision primitive {index}: {}; cannot build collision mesh",
        mesh.primitive
    );
    Err(GeometryError::UnsupportedTopology {
        index,
        topology: mesh.primitive,
    })
}

/// Check every primitive of a mesh group. The first unsupported primitive
/// fails the whole group.
pub fn validate_mesh_group(group: &[CollisionMeshData]) -> Result<(), GeometryError> {
    if group.is_empty() {
        error!("Collision mesh group is empty");
        return Err(GeometryError::EmptyMeshGroup);
    }
    group
        .iter()
        .enumerate()
        .try_for_each(|(i, mesh)| validate_primitive(i, mesh))
}

/// Default mass for an object whose template does not configure one:
/// proportional to the index count of its first primitive.
#[allow(clippy::cast_precision_loss)]
pub fn mass_from_complexity(group: &[CollisionMeshData]) -> f64 {
    group
        .first()
        .map_or(0.0, |mesh| mesh.indices.len() as f64 * 0.001)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
