//! Test-double implementations of the physics seams.
//!
//! [`RecordingBackend`] integrates free fall with semi-implicit Euler (no
//! contacts) and records every call the manager makes, so tests can check
//! what reached the backend and in which order.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use tumble_core::attributes::{AttributeStore, keys};
use tumble_core::error::SimError;
use tumble_core::resources::ObjectTemplate;
use tumble_core::scene::NodeId;
use tumble_core::types::{CollisionMeshData, ObjectId, Pose};
use tumble_physics::backend::PhysicsBackend;
use tumble_physics::drawables::DrawableSink;

// ---------------------------------------------------------------------------
// RecordingBackend
// ---------------------------------------------------------------------------

/// State of one body in the recording backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MockBody {
    pub is_static: bool,
    pub pose: Pose,
    pub velocity: Vec3,
    pub force: Vec3,
    pub mass: f64,
    pub friction: f64,
    pub restitution: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
    pub margin: f64,
}

/// A load the manager handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordedLoad {
    Force { body: u32, force: Vec3, rel_pos: Vec3 },
    Impulse { body: u32, impulse: Vec3, rel_pos: Vec3 },
}

/// Recording physics backend with gravity-only dynamics.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    gravity: Vec3,
    worlds_created: usize,
    bodies: BTreeMap<u32, MockBody>,
    next: u32,
    asleep: BTreeSet<u32>,
    fail_construction: bool,
    /// Successful body constructions (static and dynamic).
    pub constructions: usize,
    /// Every `step` call's `dt`, in order.
    pub steps: Vec<f32>,
    /// Loads in the order they reached the backend.
    pub loads: Vec<RecordedLoad>,
    /// Number of `clear_forces` calls.
    pub force_clears: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent body construction fail.
    pub fn fail_construction(&mut self, fail: bool) {
        self.fail_construction = fail;
    }

    /// Force `body` asleep (inactive) or awake.
    pub fn set_asleep(&mut self, body: u32, asleep: bool) {
        if asleep {
            self.asleep.insert(body);
        } else {
            self.asleep.remove(&body);
        }
    }

    pub fn body(&self, body: u32) -> Option<&MockBody> {
        self.bodies.get(&body)
    }

    /// Live bodies, static ones included.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub const fn worlds_created(&self) -> usize {
        self.worlds_created
    }

    fn insert(&mut self, body: MockBody) -> Result<u32, SimError> {
        if self.fail_construction {
            return Err(SimError::BackendConstruction("construction disabled".into()));
        }
        self.next += 1;
        self.bodies.insert(self.next, body);
        self.constructions += 1;
        Ok(self.next)
    }

    fn with_body(&mut self, body: u32, f: impl FnOnce(&mut MockBody)) {
        if let Some(b) = self.bodies.get_mut(&body) {
            f(b);
        }
    }
}

fn read(attrs: &AttributeStore, key: &str, default: f64) -> f64 {
    attrs.double(key).unwrap_or(default)
}

impl PhysicsBackend for RecordingBackend {
    type Body = u32;

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "recording"
    }

    fn create_world(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        self.worlds_created += 1;
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn add_static_body(
        &mut self,
        _mesh_group: &[CollisionMeshData],
        attributes: &AttributeStore,
    ) -> Result<u32, SimError> {
        self.insert(MockBody {
            is_static: true,
            pose: Pose::IDENTITY,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass: 0.0,
            friction: read(attributes, keys::FRICTION, 0.0),
            restitution: read(attributes, keys::RESTITUTION, 0.0),
            linear_damping: 0.0,
            angular_damping: 0.0,
            margin: 0.0,
        })
    }

    fn add_dynamic_body(
        &mut self,
        _mesh_group: &[CollisionMeshData],
        attributes: &AttributeStore,
        pose: Pose,
    ) -> Result<u32, SimError> {
        self.insert(MockBody {
            is_static: false,
            pose,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass: read(attributes, keys::MASS, 1.0),
            friction: read(attributes, keys::FRICTION, 0.0),
            restitution: read(attributes, keys::RESTITUTION, 0.0),
            linear_damping: read(attributes, keys::LIN_DAMPING, 0.0),
            angular_damping: read(attributes, keys::ANG_DAMPING, 0.0),
            margin: read(attributes, keys::MARGIN, 0.0),
        })
    }

    fn remove_body(&mut self, body: u32) {
        self.bodies.remove(&body);
        self.asleep.remove(&body);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn step(&mut self, dt: f32) {
        self.steps.push(dt);
        for (handle, b) in &mut self.bodies {
            if b.is_static || self.asleep.contains(handle) || b.mass <= 0.0 {
                continue;
            }
            let accel = self.gravity + b.force / b.mass as f32;
            b.velocity += accel * dt;
            b.pose.translation += b.velocity * dt;
        }
    }

    fn clear_forces(&mut self) {
        self.force_clears += 1;
        for b in self.bodies.values_mut() {
            b.force = Vec3::ZERO;
        }
    }

    fn is_active(&self, body: u32) -> bool {
        self.bodies.get(&body).is_some_and(|b| !b.is_static) && !self.asleep.contains(&body)
    }

    fn apply_force(&mut self, body: u32, force: Vec3, rel_pos: Vec3) {
        self.loads.push(RecordedLoad::Force {
            body,
            force,
            rel_pos,
        });
        self.with_body(body, |b| b.force += force);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply_impulse(&mut self, body: u32, impulse: Vec3, rel_pos: Vec3) {
        self.loads.push(RecordedLoad::Impulse {
            body,
            impulse,
            rel_pos,
        });
        self.with_body(body, |b| {
            if b.mass > 0.0 {
                b.velocity += impulse / b.mass as f32;
            }
        });
    }

    fn pose(&self, body: u32) -> Option<Pose> {
        self.bodies.get(&body).map(|b| b.pose)
    }

    fn set_pose(&mut self, body: u32, pose: Pose) {
        self.with_body(body, |b| b.pose = pose);
    }

    fn set_mass_properties(&mut self, body: u32, mass: f64, _com: Vec3, _inertia: Vec3) {
        self.with_body(body, |b| b.mass = mass);
    }

    fn set_friction(&mut self, body: u32, friction: f64) {
        self.with_body(body, |b| b.friction = friction);
    }

    fn set_restitution(&mut self, body: u32, restitution: f64) {
        self.with_body(body, |b| b.restitution = restitution);
    }

    fn set_damping(&mut self, body: u32, linear: f64, angular: f64) {
        self.with_body(body, |b| {
            b.linear_damping = linear;
            b.angular_damping = angular;
        });
    }

    fn margin(&self, body: u32) -> f64 {
        self.bodies.get(&body).map_or(0.0, |b| b.margin)
    }

    fn set_margin(&mut self, body: u32, margin: f64) {
        self.with_body(body, |b| b.margin = margin);
    }
}

// ---------------------------------------------------------------------------
// RecordingDrawables
// ---------------------------------------------------------------------------

/// Drawable sink that records every attachment.
#[derive(Debug, Default)]
pub struct RecordingDrawables {
    pub attached: Vec<(ObjectId, NodeId, String)>,
}

impl DrawableSink for RecordingDrawables {
    fn attach(&mut self, id: ObjectId, node: NodeId, template: &ObjectTemplate) {
        self.attached.push((id, node, template.source_name.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshes::cube_mesh;

    fn falling_world() -> (RecordingBackend, u32) {
        let mut b = RecordingBackend::new();
        b.create_world(Vec3::new(0.0, -10.0, 0.0));
        let body = b
            .add_dynamic_body(
                &[cube_mesh(0.5)],
                &AttributeStore::object_defaults(),
                Pose::from_translation(Vec3::new(0.0, 5.0, 0.0)),
            )
            .unwrap();
        (b, body)
    }

    #[test]
    fn free_fall_integrates() {
        let (mut b, body) = falling_world();
        b.step(0.1);
        let body = b.body(body).unwrap();
        assert!((body.velocity.y + 1.0).abs() < 1e-5);
        assert!((body.pose.translation.y - 4.9).abs() < 1e-5);
    }

    #[test]
    fn static_and_sleeping_bodies_do_not_move() {
        let (mut b, body) = falling_world();
        let ground = b
            .add_static_body(&[cube_mesh(5.0)], &AttributeStore::scene_defaults())
            .unwrap();
        b.set_asleep(body, true);
        b.step(0.1);
        assert!((b.pose(body).unwrap().translation.y - 5.0).abs() < f32::EPSILON);
        assert_eq!(b.pose(ground).unwrap(), Pose::IDENTITY);
        assert!(!b.is_active(body));
        assert!(!b.is_active(ground));
    }

    #[test]
    fn forces_accumulate_until_cleared() {
        let (mut b, body) = falling_world();
        b.set_gravity(Vec3::ZERO);
        b.apply_force(body, Vec3::X, Vec3::ZERO);
        b.apply_force(body, Vec3::X, Vec3::ZERO);
        assert_eq!(b.body(body).unwrap().force, Vec3::new(2.0, 0.0, 0.0));
        b.clear_forces();
        assert_eq!(b.body(body).unwrap().force, Vec3::ZERO);
        assert_eq!(b.loads.len(), 2);
        assert_eq!(b.force_clears, 1);
    }

    #[test]
    fn impulse_changes_velocity_immediately() {
        let (mut b, body) = falling_world();
        b.apply_impulse(body, Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO);
        assert_eq!(b.body(body).unwrap().velocity, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn construction_failure_allocates_nothing() {
        let mut b = RecordingBackend::new();
        b.fail_construction(true);
        assert!(
            b.add_dynamic_body(&[cube_mesh(0.5)], &AttributeStore::object_defaults(), Pose::IDENTITY)
                .is_err()
        );
        assert_eq!(b.constructions, 0);
        assert_eq!(b.body_count(), 0);
    }

    #[test]
    fn margin_is_recorded() {
        let (mut b, body) = falling_world();
        assert!((b.margin(body) - 0.01).abs() < f64::EPSILON);
        b.set_margin(body, 0.2);
        assert!((b.margin(body) - 0.2).abs() < f64::EPSILON);
    }
}
