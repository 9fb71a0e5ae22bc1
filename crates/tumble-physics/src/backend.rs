//! Engine-agnostic physics backend trait.
//!
//! Any rigid-body engine implements [`PhysicsBackend`] and is handed to
//! [`PhysicsManager::new`](crate::manager::PhysicsManager::new). The manager
//! owns identities, validation and fixed-step timing; the backend only
//! builds bodies and integrates them.

use std::fmt::Debug;

use glam::Vec3;
use tumble_core::attributes::AttributeStore;
use tumble_core::error::SimError;
use tumble_core::types::{CollisionMeshData, Pose};

/// Capabilities a concrete physics engine must provide.
///
/// Mesh groups passed to the body constructors have already been validated
/// as triangle lists. Methods taking a body handle ignore handles the
/// backend does not know.
pub trait PhysicsBackend {
    /// Engine-side body handle.
    type Body: Copy + Eq + Debug;

    /// Human-readable engine name (e.g., "rapier3d").
    fn name(&self) -> &str;

    /// Create the world. Called once, before any body is added.
    fn create_world(&mut self, gravity: Vec3);

    fn gravity(&self) -> Vec3;

    /// Change gravity; effective from the next sub-step.
    fn set_gravity(&mut self, gravity: Vec3);

    /// Build the static scene body from its collision mesh.
    fn add_static_body(
        &mut self,
        mesh_group: &[CollisionMeshData],
        attributes: &AttributeStore,
    ) -> Result<Self::Body, SimError>;

    /// Build a dynamic body at `pose`. `attributes` always carries a mass.
    fn add_dynamic_body(
        &mut self,
        mesh_group: &[CollisionMeshData],
        attributes: &AttributeStore,
        pose: Pose,
    ) -> Result<Self::Body, SimError>;

    fn remove_body(&mut self, body: Self::Body);

    /// Integrate one fixed sub-step of `dt` seconds.
    fn step(&mut self, dt: f32);

    /// Clear accumulated user forces on every body.
    fn clear_forces(&mut self);

    /// Whether `body` is awake.
    fn is_active(&self, body: Self::Body) -> bool;

    /// Accumulate `force` at `rel_pos` (world-oriented, relative to the
    /// center of mass) until the next [`clear_forces`](Self::clear_forces).
    fn apply_force(&mut self, body: Self::Body, force: Vec3, rel_pos: Vec3);

    /// Apply an instantaneous impulse at `rel_pos`.
    fn apply_impulse(&mut self, body: Self::Body, impulse: Vec3, rel_pos: Vec3);

    fn pose(&self, body: Self::Body) -> Option<Pose>;

    /// Teleport `body` to `pose`, bypassing the solver.
    fn set_pose(&mut self, body: Self::Body, pose: Pose);

    /// Mass, center of mass and diagonal inertia. A zero inertia lets the
    /// engine derive it from the collision shape.
    fn set_mass_properties(&mut self, body: Self::Body, mass: f64, com: Vec3, inertia: Vec3);

    fn set_friction(&mut self, body: Self::Body, friction: f64);

    fn set_restitution(&mut self, body: Self::Body, restitution: f64);

    fn set_damping(&mut self, body: Self::Body, linear: f64, angular: f64);

    /// Collision margin. Engines without one report 0.
    fn margin(&self, _body: Self::Body) -> f64 {
        0.0
    }

    /// Set the collision margin. Engines without one ignore it.
    fn set_margin(&mut self, _body: Self::Body, _margin: f64) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
