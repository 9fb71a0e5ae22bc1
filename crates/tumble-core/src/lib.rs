// tumble-core: Attribute store, geometry validation, simulation clock, config,
// errors and the collaborator seams (scene graph, resource provider) for Tumble.

pub mod attributes;
pub mod config;
pub mod error;
pub mod geometry;
pub mod resources;
pub mod scene;
pub mod time;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        attributes::{AttributeKind, AttributeStore, AttributeValue},
        config::{ObjectTemplateConfig, PhysicsConfig},
        error::{
            AttributeError, ConfigError, GeometryError, RegistryError, SimError, TumbleError,
        },
        geometry::validate_mesh_group,
        resources::{ObjectKey, ObjectLibrary, ObjectTemplate, ResourceProvider, navmesh_path},
        scene::{NodeId, SceneGraph, SceneTree},
        time::{Clock, SimTime, SubstepAccumulator},
        types::{AssetInfo, AssetType, CollisionMeshData, MeshPrimitive, ObjectId, ObjectKind, Pose},
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    /// Verify the prelude re-exports compile and construct.
    #[test]
    fn prelude_exports() {
        let _store = AttributeStore::new();
        let _tree = SceneTree::new();
        let _lib = ObjectLibrary::new();
        let _clock = Clock::new(1.0 / 240.0);
        assert_eq!(ObjectId::new(3).get(), 3);
        assert_eq!(Pose::IDENTITY, Pose::default());
    }
}
