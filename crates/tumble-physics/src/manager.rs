//! The physics manager: identity-keyed facade over a [`PhysicsBackend`].
//!
//! ```ignore
//! let mut physics = PhysicsManager::new(RapierBackend::new(), library);
//! physics.initialize(physics_root, Vec3::new(0.0, -9.8, 0.0))?;
//! physics.add_scene(&info, AttributeStore::scene_defaults(), &scene_mesh)?;
//! let id = physics.add_object("crate", &mut graph, physics_root, None)?;
//! loop {
//!     physics.step_simulation(frame_dt)?;
//!     physics.sync_scene_graph(&mut graph);
//!     physics.advance_frame(&graph);
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use glam::{Quat, Vec3};
use tracing::{debug, error, info, warn};

use tumble_core::attributes::{AttributeStore, keys};
use tumble_core::config::PhysicsConfig;
use tumble_core::error::{AttributeError, RegistryError, SimError, TumbleError};
use tumble_core::geometry::{mass_from_complexity, validate_mesh_group};
use tumble_core::resources::{ObjectKey, ResourceProvider, navmesh_path};
use tumble_core::scene::{NodeId, SceneGraph};
use tumble_core::time::{Clock, SimTime};
use tumble_core::types::{AssetInfo, CollisionMeshData, ObjectId, Pose};

use crate::backend::PhysicsBackend;
use crate::drawables::DrawableSink;
use crate::profile::StepProfile;
use crate::registry::{Census, ObjectRegistry};

/// Fixed sub-step used when no configuration is given (240 Hz).
pub const DEFAULT_TIMESTEP: f64 = 1.0 / 240.0;

/// Sub-step cap used when no configuration is given.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 10;

// ---------------------------------------------------------------------------
// StepReport / Load
// ---------------------------------------------------------------------------

/// Outcome of one [`PhysicsManager::step_simulation`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Fixed sub-steps run by this call.
    pub substeps: u32,
    /// World time after the call.
    pub world_time: SimTime,
    /// True when the call was ignored because physics is not initialized.
    pub skipped: bool,
}

impl StepReport {
    pub const fn skipped() -> Self {
        Self {
            substeps: 0,
            world_time: SimTime::new(),
            skipped: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Load {
    Force { force: Vec3, rel_pos: Vec3 },
    Impulse { impulse: Vec3, rel_pos: Vec3 },
}

// ---------------------------------------------------------------------------
// PhysicsManager
// ---------------------------------------------------------------------------

/// Owns the registry, the clock and a backend; every object operation is
/// keyed by [`ObjectId`].
pub struct PhysicsManager<B: PhysicsBackend> {
    backend: B,
    resources: Arc<dyn ResourceProvider>,
    registry: ObjectRegistry<B::Body>,
    clock: Clock,
    attributes: AttributeStore,
    gravity: Vec3,
    /// Physics root node; `Some` once initialized.
    root: Option<NodeId>,
    pending: BTreeMap<ObjectId, Vec<Load>>,
    profile: Option<StepProfile>,
    last_census: Census,
}

impl<B: PhysicsBackend> PhysicsManager<B> {
    /// Manager with a 1/240 s fixed step and a cap of 10 sub-steps.
    pub fn new(backend: B, resources: Arc<dyn ResourceProvider>) -> Self {
        let mut attributes = AttributeStore::manager_defaults();
        attributes.set_string(keys::SIMULATOR, backend.name());
        attributes.set_double(keys::TIMESTEP, DEFAULT_TIMESTEP);
        Self {
            backend,
            resources,
            registry: ObjectRegistry::new(),
            clock: Clock::new(DEFAULT_TIMESTEP).with_max_substeps(DEFAULT_MAX_SUBSTEPS),
            attributes,
            gravity: Vec3::ZERO,
            root: None,
            pending: BTreeMap::new(),
            profile: None,
            last_census: Census::default(),
        }
    }

    /// Manager configured from a validated [`PhysicsConfig`]. Gravity is
    /// still given to [`initialize`](Self::initialize).
    pub fn from_config(
        backend: B,
        resources: Arc<dyn ResourceProvider>,
        config: &PhysicsConfig,
    ) -> Result<Self, TumbleError> {
        config.validate()?;
        let mut manager = Self::new(backend, resources);
        manager.clock =
            Clock::new(config.timestep).with_max_substeps(config.max_substeps_u32());
        manager.attributes = config.to_attributes();
        manager.set_profiling(config.profiling);
        Ok(manager)
    }

    /// Turn wall-clock step profiling on or off.
    pub fn set_profiling(&mut self, enabled: bool) {
        self.profile = enabled.then(StepProfile::new);
    }

    pub const fn profile(&self) -> Option<&StepProfile> {
        self.profile.as_ref()
    }

    // -- Lifecycle --

    /// Create the backend world under the physics root node. Succeeds once.
    pub fn initialize(&mut self, root: NodeId, gravity: Vec3) -> Result<(), SimError> {
        if self.root.is_some() {
            return Err(SimError::AlreadyInitialized);
        }
        self.backend.create_world(gravity);
        self.gravity = gravity;
        self.attributes.set_vec3(keys::GRAVITY, gravity);
        self.root = Some(root);
        info!(
            "Initialized {} physics: timestep {:.6}s, max substeps {}, gravity {gravity}",
            self.backend.name(),
            self.clock.timestep(),
            self.clock.max_substeps()
        );
        Ok(())
    }

    pub const fn is_initialized(&self) -> bool {
        self.root.is_some()
    }

    fn require_root(&self) -> Result<NodeId, SimError> {
        self.root.ok_or(SimError::NotInitialized)
    }

    /// Build the static scene body. Fails without side effects if physics is
    /// not initialized, a scene is already bound, or the mesh is invalid.
    pub fn add_scene(
        &mut self,
        info: &AssetInfo,
        attributes: AttributeStore,
        mesh_group: &[CollisionMeshData],
    ) -> Result<(), TumbleError> {
        let root = self.require_root()?;
        if self.registry.has_scene() {
            return Err(RegistryError::SceneAlreadyBound.into());
        }
        validate_mesh_group(mesh_group)?;

        let body = self.backend.add_static_body(mesh_group, &attributes)?;
        let source = info.filepath.display().to_string();
        self.registry.bind_scene(body, root, attributes, source.clone())?;
        info!(
            "Added scene {source} ({:?}) with {} collision primitives",
            info.asset_type,
            mesh_group.len()
        );

        let navmesh = navmesh_path(&info.filepath);
        if self.resources.asset_exists(&navmesh) {
            debug!("Found navigation mesh {}", navmesh.display());
        }
        Ok(())
    }

    /// Load the scene's collision mesh through the resource provider, then
    /// [`add_scene`](Self::add_scene).
    pub fn add_scene_from_asset(
        &mut self,
        info: &AssetInfo,
        attributes: AttributeStore,
    ) -> Result<(), TumbleError> {
        let mesh_group = self
            .resources
            .load_collision_mesh(&info.filepath)
            .ok_or_else(|| RegistryError::UnknownAsset(info.filepath.display().to_string()))?;
        self.add_scene(info, attributes, &mesh_group)
    }

    /// Instantiate a template as a new child node of `parent`, at the
    /// parent's current world pose.
    ///
    /// Nothing is created (no backend body, no node, no id) unless the
    /// template resolves, validates and the backend builds it.
    pub fn add_object(
        &mut self,
        key: impl Into<ObjectKey>,
        graph: &mut dyn SceneGraph,
        parent: NodeId,
        drawables: Option<&mut dyn DrawableSink>,
    ) -> Result<ObjectId, TumbleError> {
        self.require_root()?;
        let key = key.into();
        let template = self.resources.object_template(&key).ok_or_else(|| {
            error!("Object template {key} not found");
            RegistryError::UnknownTemplate(key.to_string())
        })?;
        validate_mesh_group(&template.mesh_group)?;

        let mut attributes = template.attributes.clone();
        if !attributes.exists_as::<f64>(keys::MASS) {
            attributes.set_double(keys::MASS, mass_from_complexity(&template.mesh_group));
        }

        let pose = graph.world_transform(parent).unwrap_or_default();
        let body = self
            .backend
            .add_dynamic_body(&template.mesh_group, &attributes, pose)?;
        let node = graph.create_child(parent);
        graph.set_world_transform(node, pose);
        let id = self
            .registry
            .register(body, node, attributes, template.source_name.clone());
        debug!("Added object {id} from {key}");

        if let Some(sink) = drawables {
            sink.attach(id, node, &template);
        }
        Ok(id)
    }

    /// Remove an object and its backend body. Returns the node it was bound
    /// to; the scene graph keeps the node.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<NodeId, TumbleError> {
        let record = self.registry.remove(id)?;
        self.backend.remove_body(record.body);
        self.pending.remove(&id);
        debug!("Removed object {id}");
        Ok(record.node)
    }

    // -- Stepping --

    /// Advance the simulation by a frame of `dt` seconds, in whole fixed
    /// sub-steps capped at the configured maximum.
    pub fn step_simulation(&mut self, dt: f64) -> Result<StepReport, SimError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimError::InvalidTimestep(dt));
        }
        if !self.is_initialized() {
            warn!("step_simulation called before physics was initialized; ignoring");
            return Ok(StepReport::skipped());
        }

        let substeps = self.clock.tick(dt);
        if substeps > 0 {
            let start = self.profile.is_some().then(Instant::now);
            self.flush_loads();
            #[allow(clippy::cast_possible_truncation)]
            let fixed = self.clock.timestep() as f32;
            for _ in 0..substeps {
                self.backend.step(fixed);
                self.clock.advance();
            }
            self.backend.clear_forces();
            if let (Some(profile), Some(start)) = (self.profile.as_mut(), start) {
                profile.record(start.elapsed(), substeps);
            }
        }

        Ok(StepReport {
            substeps,
            world_time: self.clock.time(),
            skipped: false,
        })
    }

    fn flush_loads(&mut self) {
        for (id, loads) in std::mem::take(&mut self.pending) {
            let Ok(record) = self.registry.get(id) else {
                continue;
            };
            let body = record.body;
            for load in loads {
                match load {
                    Load::Force { force, rel_pos } => self.backend.apply_force(body, force, rel_pos),
                    Load::Impulse { impulse, rel_pos } => {
                        self.backend.apply_impulse(body, impulse, rel_pos);
                    }
                }
            }
        }
    }

    /// Close the current frame: bump the frame counter and count awake
    /// bodies below the physics root.
    pub fn advance_frame(&mut self, graph: &dyn SceneGraph) -> Census {
        self.clock.next_frame();
        let Some(root) = self.root else {
            return Census::default();
        };
        let backend = &self.backend;
        let census = self
            .registry
            .census_from_graph(graph, root, |body| backend.is_active(body));
        if census != self.last_census {
            debug!(
                "Frame {}: {} of {} objects active",
                self.clock.frame(),
                census.active,
                census.total
            );
        }
        self.last_census = census;
        census
    }

    /// Count awake bodies directly from the registry.
    pub fn census(&self) -> Census {
        let backend = &self.backend;
        self.registry.census(|body| backend.is_active(body))
    }

    /// Census computed by the most recent [`advance_frame`](Self::advance_frame).
    pub const fn last_census(&self) -> Census {
        self.last_census
    }

    /// Write every object's simulated pose to its scene node.
    pub fn sync_scene_graph(&self, graph: &mut dyn SceneGraph) {
        for record in self.registry.iter() {
            if let Some(pose) = self.backend.pose(record.body) {
                graph.set_world_transform(record.node, pose);
            }
        }
    }

    pub const fn world_time(&self) -> SimTime {
        self.clock.time()
    }

    pub const fn frame(&self) -> u64 {
        self.clock.frame()
    }

    pub const fn timestep(&self) -> f64 {
        self.clock.timestep()
    }

    /// Change the fixed sub-step. Leftover accumulated time is discarded.
    pub fn set_timestep(&mut self, timestep: f64) -> Result<(), SimError> {
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(SimError::InvalidTimestep(timestep));
        }
        self.clock.set_timestep(timestep);
        self.attributes.set_double(keys::TIMESTEP, timestep);
        Ok(())
    }

    pub const fn max_substeps(&self) -> u32 {
        self.clock.max_substeps()
    }

    pub const fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Change gravity; effective from the next sub-step.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
        self.attributes.set_vec3(keys::GRAVITY, gravity);
        if self.is_initialized() {
            self.backend.set_gravity(gravity);
        }
    }

    // -- Introspection --

    pub const fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub const fn registry(&self) -> &ObjectRegistry<B::Body> {
        &self.registry
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.registry.ids().collect()
    }

    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    pub const fn has_scene(&self) -> bool {
        self.registry.has_scene()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.registry.contains(id)
    }

    pub fn node(&self, id: ObjectId) -> Result<NodeId, TumbleError> {
        Ok(self.registry.get(id)?.node)
    }

    pub fn is_active(&self, id: ObjectId) -> Result<bool, TumbleError> {
        Ok(self.backend.is_active(self.body(id)?))
    }

    fn body(&self, id: ObjectId) -> Result<B::Body, RegistryError> {
        self.registry.get(id).map(|r| r.body)
    }

    // -- Kinematics --

    fn update_pose(&mut self, id: ObjectId, f: impl FnOnce(Pose) -> Pose) -> Result<(), TumbleError> {
        let body = self.body(id)?;
        let current = self.backend.pose(body).unwrap_or_default();
        self.backend.set_pose(body, f(current));
        Ok(())
    }

    pub fn transformation(&self, id: ObjectId) -> Result<Pose, TumbleError> {
        let body = self.body(id)?;
        Ok(self.backend.pose(body).unwrap_or_default())
    }

    pub fn translation(&self, id: ObjectId) -> Result<Vec3, TumbleError> {
        Ok(self.transformation(id)?.translation)
    }

    pub fn rotation(&self, id: ObjectId) -> Result<Quat, TumbleError> {
        Ok(self.transformation(id)?.rotation)
    }

    pub fn set_transformation(&mut self, id: ObjectId, pose: Pose) -> Result<(), TumbleError> {
        self.update_pose(id, |_| pose)
    }

    pub fn set_translation(&mut self, id: ObjectId, translation: Vec3) -> Result<(), TumbleError> {
        self.update_pose(id, |p| Pose { translation, ..p })
    }

    pub fn set_rotation(&mut self, id: ObjectId, rotation: Quat) -> Result<(), TumbleError> {
        self.update_pose(id, |p| Pose {
            rotation: rotation.normalize(),
            ..p
        })
    }

    pub fn reset_transformation(&mut self, id: ObjectId) -> Result<(), TumbleError> {
        self.update_pose(id, |_| Pose::IDENTITY)
    }

    /// Translate in world space.
    pub fn translate(&mut self, id: ObjectId, offset: Vec3) -> Result<(), TumbleError> {
        self.update_pose(id, |p| p.translated(offset))
    }

    /// Translate along the object's own axes.
    pub fn translate_local(&mut self, id: ObjectId, offset: Vec3) -> Result<(), TumbleError> {
        self.update_pose(id, |p| p.translated_local(offset))
    }

    /// Rotate about a world axis through the origin (moves the translation
    /// too).
    pub fn rotate(&mut self, id: ObjectId, angle: f32, axis: Vec3) -> Result<(), TumbleError> {
        self.update_pose(id, |p| p.rotated(angle, axis))
    }

    /// Rotate about an axis of the object's own frame.
    pub fn rotate_local(&mut self, id: ObjectId, angle: f32, axis: Vec3) -> Result<(), TumbleError> {
        self.update_pose(id, |p| p.rotated_local(angle, axis))
    }

    pub fn rotate_x(&mut self, id: ObjectId, angle: f32) -> Result<(), TumbleError> {
        self.rotate(id, angle, Vec3::X)
    }

    pub fn rotate_y(&mut self, id: ObjectId, angle: f32) -> Result<(), TumbleError> {
        self.rotate(id, angle, Vec3::Y)
    }

    pub fn rotate_z(&mut self, id: ObjectId, angle: f32) -> Result<(), TumbleError> {
        self.rotate(id, angle, Vec3::Z)
    }

    pub fn rotate_x_local(&mut self, id: ObjectId, angle: f32) -> Result<(), TumbleError> {
        self.rotate_local(id, angle, Vec3::X)
    }

    pub fn rotate_y_local(&mut self, id: ObjectId, angle: f32) -> Result<(), TumbleError> {
        self.rotate_local(id, angle, Vec3::Y)
    }

    pub fn rotate_z_local(&mut self, id: ObjectId, angle: f32) -> Result<(), TumbleError> {
        self.rotate_local(id, angle, Vec3::Z)
    }

    // -- Dynamics --

    /// Queue a force at `rel_pos` for the next step that runs a sub-step.
    pub fn apply_force(&mut self, id: ObjectId, force: Vec3, rel_pos: Vec3) -> Result<(), TumbleError> {
        self.queue_load(id, Load::Force { force, rel_pos })
    }

    /// Queue an impulse at `rel_pos` for the next step that runs a sub-step.
    pub fn apply_impulse(
        &mut self,
        id: ObjectId,
        impulse: Vec3,
        rel_pos: Vec3,
    ) -> Result<(), TumbleError> {
        self.queue_load(id, Load::Impulse { impulse, rel_pos })
    }

    fn queue_load(&mut self, id: ObjectId, load: Load) -> Result<(), TumbleError> {
        self.body(id)?;
        self.pending.entry(id).or_default().push(load);
        Ok(())
    }

    /// Number of loads queued for `id` and not yet applied.
    pub fn pending_loads(&self, id: ObjectId) -> usize {
        self.pending.get(&id).map_or(0, Vec::len)
    }

    // -- Physical properties --

    fn object_attributes(&self, id: ObjectId) -> Result<&AttributeStore, TumbleError> {
        Ok(&self.registry.get(id)?.attributes)
    }

    fn double_attribute(&self, id: ObjectId, key: &str) -> Result<f64, TumbleError> {
        Ok(self.object_attributes(id)?.double(key)?)
    }

    fn vec3_attribute(&self, id: ObjectId, key: &str) -> Result<Vec3, TumbleError> {
        Ok(self.object_attributes(id)?.vec3(key)?)
    }

    /// Store a value in the object's attributes and return its body.
    fn store(&mut self, id: ObjectId, key: &str, value: impl StoreValue) -> Result<B::Body, TumbleError> {
        let record = self.registry.get_mut(id)?;
        value.store(&mut record.attributes, key);
        Ok(record.body)
    }

    fn push_mass_properties(&mut self, id: ObjectId) -> Result<(), TumbleError> {
        let attrs = self.object_attributes(id)?;
        let mass = attrs.double(keys::MASS)?;
        let com = vec3_or_zero(attrs, keys::COM)?;
        let inertia = vec3_or_zero(attrs, keys::INERTIA)?;
        let body = self.body(id)?;
        self.backend.set_mass_properties(body, mass, com, inertia);
        Ok(())
    }

    fn push_damping(&mut self, id: ObjectId) -> Result<(), TumbleError> {
        let attrs = self.object_attributes(id)?;
        let linear = attrs.double(keys::LIN_DAMPING)?;
        let angular = attrs.double(keys::ANG_DAMPING)?;
        let body = self.body(id)?;
        self.backend.set_damping(body, linear, angular);
        Ok(())
    }

    pub fn mass(&self, id: ObjectId) -> Result<f64, TumbleError> {
        self.double_attribute(id, keys::MASS)
    }

    pub fn set_mass(&mut self, id: ObjectId, mass: f64) -> Result<(), TumbleError> {
        self.store(id, keys::MASS, mass)?;
        self.push_mass_properties(id)
    }

    pub fn com(&self, id: ObjectId) -> Result<Vec3, TumbleError> {
        self.vec3_attribute(id, keys::COM)
    }

    pub fn set_com(&mut self, id: ObjectId, com: Vec3) -> Result<(), TumbleError> {
        self.store(id, keys::COM, com)?;
        self.push_mass_properties(id)
    }

    pub fn inertia(&self, id: ObjectId) -> Result<Vec3, TumbleError> {
        self.vec3_attribute(id, keys::INERTIA)
    }

    pub fn set_inertia(&mut self, id: ObjectId, inertia: Vec3) -> Result<(), TumbleError> {
        self.store(id, keys::INERTIA, inertia)?;
        self.push_mass_properties(id)
    }

    pub fn scale(&self, id: ObjectId) -> Result<f64, TumbleError> {
        self.double_attribute(id, keys::SCALE)
    }

    /// Recorded only; collision shapes are not rescaled after construction.
    pub fn set_scale(&mut self, id: ObjectId, scale: f64) -> Result<(), TumbleError> {
        self.store(id, keys::SCALE, scale).map(|_| ())
    }

    pub fn friction(&self, id: ObjectId) -> Result<f64, TumbleError> {
        self.double_attribute(id, keys::FRICTION)
    }

    pub fn set_friction(&mut self, id: ObjectId, friction: f64) -> Result<(), TumbleError> {
        let body = self.store(id, keys::FRICTION, friction)?;
        self.backend.set_friction(body, friction);
        Ok(())
    }

    pub fn restitution(&self, id: ObjectId) -> Result<f64, TumbleError> {
        self.double_attribute(id, keys::RESTITUTION)
    }

    pub fn set_restitution(&mut self, id: ObjectId, restitution: f64) -> Result<(), TumbleError> {
        let body = self.store(id, keys::RESTITUTION, restitution)?;
        self.backend.set_restitution(body, restitution);
        Ok(())
    }

    pub fn linear_damping(&self, id: ObjectId) -> Result<f64, TumbleError> {
        self.double_attribute(id, keys::LIN_DAMPING)
    }

    pub fn set_linear_damping(&mut self, id: ObjectId, damping: f64) -> Result<(), TumbleError> {
        self.store(id, keys::LIN_DAMPING, damping)?;
        self.push_damping(id)
    }

    pub fn angular_damping(&self, id: ObjectId) -> Result<f64, TumbleError> {
        self.double_attribute(id, keys::ANG_DAMPING)
    }

    pub fn set_angular_damping(&mut self, id: ObjectId, damping: f64) -> Result<(), TumbleError> {
        self.store(id, keys::ANG_DAMPING, damping)?;
        self.push_damping(id)
    }

    /// Collision margin as reported by the backend.
    pub fn margin(&self, id: ObjectId) -> Result<f64, TumbleError> {
        Ok(self.backend.margin(self.body(id)?))
    }

    pub fn set_margin(&mut self, id: ObjectId, margin: f64) -> Result<(), TumbleError> {
        let body = self.store(id, keys::MARGIN, margin)?;
        self.backend.set_margin(body, margin);
        Ok(())
    }

    // -- Scene material --

    fn scene_double(&self, key: &str) -> Result<f64, TumbleError> {
        let scene = self.registry.scene().ok_or(RegistryError::NoScene)?;
        Ok(scene.attributes.double(key)?)
    }

    fn store_scene(&mut self, key: &str, value: f64) -> Result<B::Body, TumbleError> {
        let scene = self.registry.scene_mut().ok_or(RegistryError::NoScene)?;
        scene.attributes.set_double(key, value);
        Ok(scene.body)
    }

    pub fn scene_friction(&self) -> Result<f64, TumbleError> {
        self.scene_double(keys::FRICTION)
    }

    pub fn set_scene_friction(&mut self, friction: f64) -> Result<(), TumbleError> {
        let body = self.store_scene(keys::FRICTION, friction)?;
        self.backend.set_friction(body, friction);
        Ok(())
    }

    pub fn scene_restitution(&self) -> Result<f64, TumbleError> {
        self.scene_double(keys::RESTITUTION)
    }

    pub fn set_scene_restitution(&mut self, restitution: f64) -> Result<(), TumbleError> {
        let body = self.store_scene(keys::RESTITUTION, restitution)?;
        self.backend.set_restitution(body, restitution);
        Ok(())
    }
}

/// Missing vectors read as zero so templates may omit COM and inertia.
fn vec3_or_zero(attrs: &AttributeStore, key: &str) -> Result<Vec3, AttributeError> {
    if attrs.exists_as::<Vec3>(key) {
        attrs.vec3(key)
    } else {
        Ok(Vec3::ZERO)
    }
}

/// Values the per-object setters write into an [`AttributeStore`].
trait StoreValue {
    fn store(self, attrs: &mut AttributeStore, key: &str);
}

impl StoreValue for f64 {
    fn store(self, attrs: &mut AttributeStore, key: &str) {
        attrs.set_double(key, self);
    }
}

impl StoreValue for Vec3 {
    fn store(self, attrs: &mut AttributeStore, key: &str) {
        attrs.set_vec3(key, self);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tumble_core::resources::{ObjectLibrary, ObjectTemplate};
    use tumble_core::scene::SceneTree;
    use tumble_core::types::MeshPrimitive;

    use super::*;

    /// Backend that stores poses and counts steps; nothing moves.
    #[derive(Default)]
    struct StubBackend {
        gravity: Vec3,
        poses: HashMap<u32, Pose>,
        next: u32,
        steps: u32,
        forces: Vec<(u32, Vec3)>,
        friction: HashMap<u32, f64>,
        mass: HashMap<u32, f64>,
    }

    impl PhysicsBackend for StubBackend {
        type Body = u32;

        fn name(&self) -> &str {
            "stub"
        }
        fn create_world(&mut self, gravity: Vec3) {
            self.gravity = gravity;
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
            self.next += 1;
            self.friction
                .insert(self.next, attributes.double(keys::FRICTION).unwrap_or(0.0));
            Ok(self.next)
        }
        fn add_dynamic_body(
            &mut self,
            _mesh_group: &[CollisionMeshData],
            attributes: &AttributeStore,
            pose: Pose,
        ) -> Result<u32, SimError> {
            self.next += 1;
            self.poses.insert(self.next, pose);
            self.mass
                .insert(self.next, attributes.double(keys::MASS).unwrap_or(0.0));
            Ok(self.next)
        }
        fn remove_body(&mut self, body: u32) {
            self.poses.remove(&body);
        }
        fn step(&mut self, _dt: f32) {
            self.steps += 1;
        }
        fn clear_forces(&mut self) {}
        fn is_active(&self, body: u32) -> bool {
            self.poses.contains_key(&body)
        }
        fn apply_force(&mut self, body: u32, force: Vec3, _rel_pos: Vec3) {
            self.forces.push((body, force));
        }
        fn apply_impulse(&mut self, _body: u32, _impulse: Vec3, _rel_pos: Vec3) {}
        fn pose(&self, body: u32) -> Option<Pose> {
            self.poses.get(&body).copied()
        }
        fn set_pose(&mut self, body: u32, pose: Pose) {
            if let Some(p) = self.poses.get_mut(&body) {
                *p = pose;
            }
        }
        fn set_mass_properties(&mut self, body: u32, mass: f64, _com: Vec3, _inertia: Vec3) {
            self.mass.insert(body, mass);
        }
        fn set_friction(&mut self, body: u32, friction: f64) {
            self.friction.insert(body, friction);
        }
        fn set_restitution(&mut self, _body: u32, _restitution: f64) {}
        fn set_damping(&mut self, _body: u32, _linear: f64, _angular: f64) {}
    }

    fn cube_template(name: &str) -> ObjectTemplate {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(0.0, -0.5, 0.5),
        ];
        let indices = vec![0, 1, 2, 0, 3, 1, 1, 3, 2, 2, 3, 0];
        ObjectTemplate::new(name, vec![CollisionMeshData::triangles(positions, indices)])
    }

    fn setup() -> (PhysicsManager<StubBackend>, SceneTree, NodeId) {
        let mut lib = ObjectLibrary::new();
        lib.insert(cube_template("cube"));
        let mut no_mass = cube_template("light");
        no_mass.attributes.erase_as::<f64>(keys::MASS);
        lib.insert(no_mass);
        lib.insert(ObjectTemplate::new(
            "wire",
            vec![CollisionMeshData::new(
                MeshPrimitive::LineStrip,
                vec![Vec3::ZERO, Vec3::X],
                vec![0, 1],
            )],
        ));

        let mut tree = SceneTree::new();
        let root = tree.create_child(tree.root());
        let mut physics = PhysicsManager::new(StubBackend::default(), Arc::new(lib));
        physics.initialize(root, Vec3::new(0.0, -9.8, 0.0)).unwrap();
        (physics, tree, root)
    }

    #[test]
    fn second_initialize_fails() {
        let (mut physics, _tree, root) = setup();
        assert_eq!(
            physics.initialize(root, Vec3::ZERO),
            Err(SimError::AlreadyInitialized)
        );
        assert_eq!(physics.gravity(), Vec3::new(0.0, -9.8, 0.0));
    }

    #[test]
    fn uninitialized_step_is_skipped() {
        let mut physics =
            PhysicsManager::new(StubBackend::default(), Arc::new(ObjectLibrary::new()));
        let report = physics.step_simulation(1.0).unwrap();
        assert!(report.skipped);
        assert_eq!(physics.backend().steps, 0);
        assert_eq!(physics.world_time(), SimTime::new());
    }

    #[test]
    fn uninitialized_add_object_fails() {
        let mut physics =
            PhysicsManager::new(StubBackend::default(), Arc::new(ObjectLibrary::new()));
        let mut tree = SceneTree::new();
        let root = tree.root();
        let err = physics.add_object("cube", &mut tree, root, None).unwrap_err();
        assert!(matches!(err, TumbleError::Simulation(SimError::NotInitialized)));
    }

    #[test]
    fn invalid_step_durations_are_rejected() {
        let (mut physics, _tree, _root) = setup();
        for dt in [-0.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                physics.step_simulation(dt),
                Err(SimError::InvalidTimestep(_))
            ));
        }
        assert_eq!(physics.backend().steps, 0);
    }

    #[test]
    fn step_runs_capped_substeps() {
        let (mut physics, _tree, _root) = setup();
        let report = physics.step_simulation(1.0).unwrap();
        assert_eq!(report.substeps, 10);
        assert_eq!(physics.backend().steps, 10);
        assert!((report.world_time.secs_f64() - 10.0 / 240.0).abs() < 1e-6);
    }

    #[test]
    fn add_object_creates_child_node_at_parent_pose() {
        let (mut physics, mut tree, root) = setup();
        tree.set_world_transform(root, Pose::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let id = physics.add_object("cube", &mut tree, root, None).unwrap();
        assert_eq!(id, ObjectId::new(0));
        let node = physics.node(id).unwrap();
        assert_eq!(tree.parent(node), Some(root));
        assert_eq!(physics.translation(id).unwrap(), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn add_object_by_index() {
        let (mut physics, mut tree, root) = setup();
        let id = physics.add_object(0_usize, &mut tree, root, None).unwrap();
        assert_eq!(physics.registry().get(id).unwrap().source_name, "cube");
    }

    #[test]
    fn missing_mass_is_derived_from_mesh() {
        let (mut physics, mut tree, root) = setup();
        let id = physics.add_object("light", &mut tree, root, None).unwrap();
        assert!((physics.mass(id).unwrap() - 0.012).abs() < 1e-12);
        let configured = physics.add_object("cube", &mut tree, root, None).unwrap();
        assert!((physics.mass(configured).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejected_template_allocates_nothing() {
        let (mut physics, mut tree, root) = setup();
        let nodes = tree.len();
        let err = physics.add_object("wire", &mut tree, root, None).unwrap_err();
        assert!(matches!(err, TumbleError::Geometry(_)));
        let err = physics.add_object("missing", &mut tree, root, None).unwrap_err();
        assert!(matches!(
            err,
            TumbleError::Registry(RegistryError::UnknownTemplate(_))
        ));
        assert_eq!(tree.len(), nodes);
        assert_eq!(physics.backend().next, 0);
        assert_eq!(physics.registry().next_id(), ObjectId::new(0));
    }

    #[test]
    fn drawables_are_notified() {
        struct Sink(Vec<ObjectId>);
        impl DrawableSink for Sink {
            fn attach(&mut self, id: ObjectId, _node: NodeId, template: &ObjectTemplate) {
                assert_eq!(template.source_name, "cube");
                self.0.push(id);
            }
        }
        let (mut physics, mut tree, root) = setup();
        let mut sink = Sink(Vec::new());
        let id = physics
            .add_object("cube", &mut tree, root, Some(&mut sink))
            .unwrap();
        assert_eq!(sink.0, vec![id]);
    }

    #[test]
    fn scene_binds_once() {
        let (mut physics, _tree, _root) = setup();
        let info = AssetInfo::new(Default::default(), "room.glb");
        let mesh = cube_template("room").mesh_group;
        physics
            .add_scene(&info, AttributeStore::scene_defaults(), &mesh)
            .unwrap();
        assert!(physics.has_scene());
        let err = physics
            .add_scene(&info, AttributeStore::scene_defaults(), &mesh)
            .unwrap_err();
        assert!(matches!(
            err,
            TumbleError::Registry(RegistryError::SceneAlreadyBound)
        ));
        assert_eq!(physics.backend().next, 1);
    }

    #[test]
    fn scene_from_unknown_asset_fails() {
        let (mut physics, _tree, _root) = setup();
        let info = AssetInfo::new(Default::default(), "missing.glb");
        let err = physics
            .add_scene_from_asset(&info, AttributeStore::scene_defaults())
            .unwrap_err();
        assert!(matches!(
            err,
            TumbleError::Registry(RegistryError::UnknownAsset(_))
        ));
        assert!(!physics.has_scene());
    }

    #[test]
    fn scene_material_round_trips() {
        let (mut physics, _tree, _root) = setup();
        assert!(matches!(
            physics.scene_friction(),
            Err(TumbleError::Registry(RegistryError::NoScene))
        ));
        let info = AssetInfo::new(Default::default(), "room.glb");
        physics
            .add_scene(&info, AttributeStore::scene_defaults(), &cube_template("room").mesh_group)
            .unwrap();
        assert!((physics.scene_friction().unwrap() - 0.4).abs() < f64::EPSILON);
        physics.set_scene_friction(0.9).unwrap();
        assert!((physics.scene_friction().unwrap() - 0.9).abs() < f64::EPSILON);
        let body = physics.registry().scene().unwrap().body;
        assert!((physics.backend().friction[&body] - 0.9).abs() < f64::EPSILON);
        physics.set_scene_restitution(0.3).unwrap();
        assert!((physics.scene_restitution().unwrap() - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn forces_wait_for_a_substep() {
        let (mut physics, mut tree, root) = setup();
        let id = physics.add_object("cube", &mut tree, root, None).unwrap();
        physics.apply_force(id, Vec3::X, Vec3::ZERO).unwrap();
        assert_eq!(physics.pending_loads(id), 1);

        // Too short for a sub-step: the force stays queued.
        physics.step_simulation(0.001).unwrap();
        assert!(physics.backend().forces.is_empty());

        physics.step_simulation(1.0 / 240.0).unwrap();
        assert_eq!(physics.backend().forces.len(), 1);
        assert_eq!(physics.pending_loads(id), 0);
    }

    #[test]
    fn loads_for_removed_objects_are_dropped() {
        let (mut physics, mut tree, root) = setup();
        let id = physics.add_object("cube", &mut tree, root, None).unwrap();
        physics.apply_impulse(id, Vec3::Y, Vec3::ZERO).unwrap();
        physics.remove_object(id).unwrap();
        assert_eq!(physics.pending_loads(id), 0);
        assert!(physics.apply_force(id, Vec3::X, Vec3::ZERO).is_err());
    }

    #[test]
    fn kinematic_setters() {
        let (mut physics, mut tree, root) = setup();
        let id = physics.add_object("cube", &mut tree, root, None).unwrap();

        physics.set_translation(id, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        physics.translate(id, Vec3::X).unwrap();
        assert_eq!(physics.translation(id).unwrap(), Vec3::new(2.0, 2.0, 3.0));

        physics.reset_transformation(id).unwrap();
        assert_eq!(physics.transformation(id).unwrap(), Pose::IDENTITY);

        physics.rotate_y_local(id, std::f32::consts::FRAC_PI_2).unwrap();
        physics.translate_local(id, Vec3::X).unwrap();
        let t = physics.translation(id).unwrap();
        assert!((t - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);

        // Global rotation moves the translation as well.
        physics.set_transformation(id, Pose::from_translation(Vec3::X)).unwrap();
        physics.rotate_z(id, std::f32::consts::FRAC_PI_2).unwrap();
        assert!((physics.translation(id).unwrap() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn physical_properties_route_through_attributes() {
        let (mut physics, mut tree, root) = setup();
        let id = physics.add_object("cube", &mut tree, root, None).unwrap();
        assert!((physics.friction(id).unwrap() - 0.5).abs() < f64::EPSILON);

        physics.set_mass(id, 3.0).unwrap();
        assert!((physics.mass(id).unwrap() - 3.0).abs() < f64::EPSILON);
        let body = physics.registry().get(id).unwrap().body;
        assert!((physics.backend().mass[&body] - 3.0).abs() < f64::EPSILON);

        physics.set_friction(id, 0.8).unwrap();
        assert!((physics.backend().friction[&body] - 0.8).abs() < f64::EPSILON);

        physics.set_com(id, Vec3::Y).unwrap();
        assert_eq!(physics.com(id).unwrap(), Vec3::Y);
        physics.set_scale(id, 2.0).unwrap();
        assert!((physics.scale(id).unwrap() - 2.0).abs() < f64::EPSILON);
        physics.set_linear_damping(id, 0.0).unwrap();
        assert!(physics.linear_damping(id).unwrap().abs() < f64::EPSILON);

        // The stub has no margin, so the default applies.
        physics.set_margin(id, 0.05).unwrap();
        assert!(physics.margin(id).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn timestep_can_change() {
        let (mut physics, _tree, _root) = setup();
        assert!((physics.timestep() - DEFAULT_TIMESTEP).abs() < f64::EPSILON);
        physics.set_timestep(0.01).unwrap();
        assert_eq!(physics.step_simulation(0.035).unwrap().substeps, 3);
        assert!(physics.set_timestep(0.0).is_err());
    }

    #[test]
    fn from_config_applies_timing() {
        let config = PhysicsConfig {
            timestep: 0.02,
            max_substeps: 2,
            profiling: true,
            ..PhysicsConfig::default()
        };
        let mut physics =
            PhysicsManager::from_config(StubBackend::default(), Arc::new(ObjectLibrary::new()), &config)
                .unwrap();
        physics.initialize(NodeId::new(0), Vec3::ZERO).unwrap();
        assert_eq!(physics.step_simulation(1.0).unwrap().substeps, 2);
        assert_eq!(physics.profile().unwrap().steps, 1);
        assert_eq!(physics.max_substeps(), 2);
    }

    #[test]
    fn advance_frame_counts_frames_and_census() {
        let (mut physics, mut tree, root) = setup();
        physics.add_object("cube", &mut tree, root, None).unwrap();
        physics.add_object("cube", &mut tree, root, None).unwrap();
        let census = physics.advance_frame(&tree);
        assert_eq!(census, Census { active: 2, total: 2 });
        assert_eq!(physics.frame(), 1);
        assert_eq!(physics.last_census(), census);
        assert_eq!(physics.census(), census);
    }

    #[test]
    fn set_gravity_reaches_backend() {
        let (mut physics, _tree, _root) = setup();
        physics.set_gravity(Vec3::ZERO);
        assert_eq!(physics.backend().gravity, Vec3::ZERO);
        assert_eq!(physics.attributes().vec3(keys::GRAVITY).unwrap(), Vec3::ZERO);
    }
}
