// tumble-physics: Object registry and fixed-step physics manager for Tumble.
//
// Provides a `PhysicsBackend` trait so the concrete engine can be swapped
// without changing the manager. The manager owns object identities, mesh
// validation and sub-step timing; `rapier` is the bundled rapier3d backend.

pub mod backend;
pub mod drawables;
pub mod manager;
pub mod profile;
pub mod rapier;
pub mod registry;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        backend::PhysicsBackend,
        drawables::DrawableSink,
        manager::{PhysicsManager, StepReport},
        profile::StepProfile,
        rapier::RapierBackend,
        registry::{Census, ObjectRecord, ObjectRegistry, SceneRecord},
    };
}

pub use manager::PhysicsManager;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the prelude re-exports compile.
    #[test]
    fn prelude_exports() {
        use prelude::*;

        fn _accepts_backend<B: PhysicsBackend>(_: &B) {}
        fn _accepts_sink(_: &dyn DrawableSink) {}

        let backend = RapierBackend::new();
        _accepts_backend(&backend);
        let _registry: ObjectRegistry<u32> = ObjectRegistry::new();
        assert_eq!(Census::default().total, 0);
        assert!(StepReport::skipped().skipped);
        assert_eq!(StepProfile::new().steps, 0);
    }
}
