//! [`RapierBackend`]: concrete physics backend using raw `rapier3d`.

use glam::Vec3;
use rapier3d::prelude::{
    ColliderBuilder, ColliderHandle, MassProperties, RigidBodyBuilder, RigidBodyHandle,
};
use tracing::debug;

use tumble_core::attributes::{AttributeStore, keys};
use tumble_core::error::SimError;
use tumble_core::types::{CollisionMeshData, Pose};

use crate::backend::PhysicsBackend;

use super::bridge::{
    convex_hull_collider, from_isometry, from_vector, to_isometry, to_point, to_vector,
    trimesh_collider,
};
use super::context::RapierContext;

#[allow(clippy::cast_possible_truncation)]
fn attr_f32(attrs: &AttributeStore, key: &str, default: f32) -> f32 {
    attrs.double(key).map_or(default, |v| v as f32)
}

fn attr_vec3(attrs: &AttributeStore, key: &str) -> Vec3 {
    attrs.vec3(key).unwrap_or(Vec3::ZERO)
}

/// Attach mass to a collider. A zero inertia derives inertia and center of
/// mass from the shape; otherwise both are taken as given.
fn with_mass(builder: ColliderBuilder, mass: f32, com: Vec3, inertia: Vec3) -> ColliderBuilder {
    if inertia == Vec3::ZERO {
        builder.mass(mass)
    } else {
        builder.mass_properties(MassProperties::new(to_point(com), mass, to_vector(inertia)))
    }
}

/// Raw rapier3d physics backend.
///
/// The static scene becomes one fixed body with a triangle-mesh collider.
/// Dynamic objects become convex hulls of their collision vertices, with the
/// margin mapped onto the collider contact skin.
pub struct RapierBackend {
    context: RapierContext,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierBackend {
    pub fn new() -> Self {
        Self {
            context: RapierContext::new(Vec3::ZERO),
        }
    }

    pub const fn context(&self) -> &RapierContext {
        &self.context
    }

    fn colliders(&self, body: RigidBodyHandle) -> Vec<ColliderHandle> {
        self.context
            .rigid_body_set
            .get(body)
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default()
    }
}

impl PhysicsBackend for RapierBackend {
    type Body = RigidBodyHandle;

    fn name(&self) -> &str {
        "rapier3d"
    }

    fn create_world(&mut self, gravity: Vec3) {
        self.context = RapierContext::new(gravity);
    }

    fn gravity(&self) -> Vec3 {
        self.context.gravity
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.context.gravity = gravity;
    }

    fn add_static_body(
        &mut self,
        mesh_group: &[CollisionMeshData],
        attributes: &AttributeStore,
    ) -> Result<RigidBodyHandle, SimError> {
        let collider = trimesh_collider(mesh_group)?
            .friction(attr_f32(attributes, keys::FRICTION, 0.4))
            .restitution(attr_f32(attributes, keys::RESTITUTION, 0.1))
            .build();

        let ctx = &mut self.context;
        let handle = ctx.rigid_body_set.insert(RigidBodyBuilder::fixed().build());
        ctx.collider_set
            .insert_with_parent(collider, handle, &mut ctx.rigid_body_set);
        debug!("rapier: static body {handle:?}");
        Ok(handle)
    }

    fn add_dynamic_body(
        &mut self,
        mesh_group: &[CollisionMeshData],
        attributes: &AttributeStore,
        pose: Pose,
    ) -> Result<RigidBodyHandle, SimError> {
        let scale = attr_f32(attributes, keys::SCALE, 1.0);
        let collider = convex_hull_collider(mesh_group, scale)?
            .contact_skin(attr_f32(attributes, keys::MARGIN, 0.0))
            .friction(attr_f32(attributes, keys::FRICTION, 0.5))
            .restitution(attr_f32(attributes, keys::RESTITUTION, 0.6));
        let collider = with_mass(
            collider,
            attr_f32(attributes, keys::MASS, 1.0),
            attr_vec3(attributes, keys::COM),
            attr_vec3(attributes, keys::INERTIA),
        )
        .build();

        let body = RigidBodyBuilder::dynamic()
            .position(to_isometry(pose))
            .linear_damping(attr_f32(attributes, keys::LIN_DAMPING, 0.0))
            .angular_damping(attr_f32(attributes, keys::ANG_DAMPING, 0.0))
            .build();

        let ctx = &mut self.context;
        let handle = ctx.rigid_body_set.insert(body);
        ctx.collider_set
            .insert_with_parent(collider, handle, &mut ctx.rigid_body_set);
        Ok(handle)
    }

    fn remove_body(&mut self, body: RigidBodyHandle) {
        self.context.remove_body(body);
    }

    fn step(&mut self, dt: f32) {
        self.context.step(dt);
    }

    fn clear_forces(&mut self) {
        self.context.reset_forces();
    }

    fn is_active(&self, body: RigidBodyHandle) -> bool {
        self.context
            .rigid_body_set
            .get(body)
            .is_some_and(|b| !b.is_sleeping())
    }

    fn apply_force(&mut self, body: RigidBodyHandle, force: Vec3, rel_pos: Vec3) {
        if let Some(b) = self.context.rigid_body_set.get_mut(body) {
            let point = *b.center_of_mass() + to_vector(rel_pos);
            b.add_force_at_point(to_vector(force), point, true);
        }
    }

    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec3, rel_pos: Vec3) {
        if let Some(b) = self.context.rigid_body_set.get_mut(body) {
            let point = *b.center_of_mass() + to_vector(rel_pos);
            b.apply_impulse_at_point(to_vector(impulse), point, true);
        }
    }

    fn pose(&self, body: RigidBodyHandle) -> Option<Pose> {
        self.context
            .rigid_body_set
            .get(body)
            .map(|b| from_isometry(b.position()))
    }

    fn set_pose(&mut self, body: RigidBodyHandle, pose: Pose) {
        if let Some(b) = self.context.rigid_body_set.get_mut(body) {
            b.set_position(to_isometry(pose), true);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_mass_properties(&mut self, body: RigidBodyHandle, mass: f64, com: Vec3, inertia: Vec3) {
        let mass = mass as f32;
        for handle in self.colliders(body) {
            if let Some(c) = self.context.collider_set.get_mut(handle) {
                if inertia == Vec3::ZERO {
                    c.set_mass(mass);
                } else {
                    c.set_mass_properties(MassProperties::new(
                        to_point(com),
                        mass,
                        to_vector(inertia),
                    ));
                }
            }
        }
        if let Some(b) = self.context.rigid_body_set.get_mut(body) {
            b.wake_up(true);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_friction(&mut self, body: RigidBodyHandle, friction: f64) {
        for handle in self.colliders(body) {
            if let Some(c) = self.context.collider_set.get_mut(handle) {
                c.set_friction(friction as f32);
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_restitution(&mut self, body: RigidBodyHandle, restitution: f64) {
        for handle in self.colliders(body) {
            if let Some(c) = self.context.collider_set.get_mut(handle) {
                c.set_restitution(restitution as f32);
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_damping(&mut self, body: RigidBodyHandle, linear: f64, angular: f64) {
        if let Some(b) = self.context.rigid_body_set.get_mut(body) {
            b.set_linear_damping(linear as f32);
            b.set_angular_damping(angular as f32);
        }
    }

    fn margin(&self, body: RigidBodyHandle) -> f64 {
        self.colliders(body)
            .first()
            .and_then(|&h| self.context.collider_set.get(h))
            .map_or(0.0, |c| f64::from(c.contact_skin()))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_margin(&mut self, body: RigidBodyHandle, margin: f64) {
        for handle in self.colliders(body) {
            if let Some(c) = self.context.collider_set.get_mut(handle) {
                c.set_contact_skin(margin as f32);
            }
        }
    }
}

/// Linear velocity of `body`, for diagnostics and tests.
pub fn linear_velocity(backend: &RapierBackend, body: RigidBodyHandle) -> Option<Vec3> {
    backend
        .context
        .rigid_body_set
        .get(body)
        .map(|b| from_vector(b.linvel()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
