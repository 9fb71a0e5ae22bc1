//! Identity registry for the static scene and dynamic objects.
//!
//! Ids come from a monotonic counter and are never reused, so a stale id
//! can only miss; it can never alias a newer object.

use std::collections::{BTreeMap, HashMap};

use tumble_core::attributes::AttributeStore;
use tumble_core::error::RegistryError;
use tumble_core::scene::{NodeId, SceneGraph};
use tumble_core::types::{ObjectId, ObjectKind};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A dynamic object owned by the registry.
#[derive(Debug, Clone)]
pub struct ObjectRecord<B> {
    pub id: ObjectId,
    /// Always [`ObjectKind::Dynamic`].
    pub kind: ObjectKind,
    pub source_name: String,
    pub body: B,
    pub node: NodeId,
    pub attributes: AttributeStore,
}

/// The single static scene body. Held apart from the objects because it
/// never takes an [`ObjectId`].
#[derive(Debug, Clone)]
pub struct SceneRecord<B> {
    /// Always [`ObjectKind::Scene`].
    pub kind: ObjectKind,
    pub source_name: String,
    pub body: B,
    pub node: NodeId,
    pub attributes: AttributeStore,
}

/// Result of an active-body count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub active: usize,
    pub total: usize,
}

impl Census {
    pub const fn asleep(&self) -> usize {
        self.total - self.active
    }
}

// ---------------------------------------------------------------------------
// ObjectRegistry
// ---------------------------------------------------------------------------

/// Arena of object records keyed by [`ObjectId`], plus the scene binding.
#[derive(Debug, Clone)]
pub struct ObjectRegistry<B> {
    objects: BTreeMap<ObjectId, ObjectRecord<B>>,
    by_node: HashMap<NodeId, ObjectId>,
    scene: Option<SceneRecord<B>>,
    next_id: u32,
}

impl<B> Default for ObjectRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> ObjectRegistry<B> {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            by_node: HashMap::new(),
            scene: None,
            next_id: 0,
        }
    }

    /// Bind the static scene. Only one scene may ever be bound.
    pub fn bind_scene(
        &mut self,
        body: B,
        node: NodeId,
        attributes: AttributeStore,
        source_name: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if self.scene.is_some() {
            return Err(RegistryError::SceneAlreadyBound);
        }
        self.scene = Some(SceneRecord {
            kind: ObjectKind::Scene,
            source_name: source_name.into(),
            body,
            node,
            attributes,
        });
        Ok(())
    }

    /// Register a dynamic object under the next id.
    pub fn register(
        &mut self,
        body: B,
        node: NodeId,
        attributes: AttributeStore,
        source_name: impl Into<String>,
    ) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        self.by_node.insert(node, id);
        self.objects.insert(
            id,
            ObjectRecord {
                id,
                kind: ObjectKind::Dynamic,
                source_name: source_name.into(),
                body,
                node,
                attributes,
            },
        );
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Result<ObjectRecord<B>, RegistryError> {
        let record = self
            .objects
            .remove(&id)
            .ok_or(RegistryError::UnknownObjectId(id))?;
        self.by_node.remove(&record.node);
        Ok(record)
    }

    pub fn get(&self, id: ObjectId) -> Result<&ObjectRecord<B>, RegistryError> {
        self.objects
            .get(&id)
            .ok_or(RegistryError::UnknownObjectId(id))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut ObjectRecord<B>, RegistryError> {
        self.objects
            .get_mut(&id)
            .ok_or(RegistryError::UnknownObjectId(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of live dynamic objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn scene(&self) -> Option<&SceneRecord<B>> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut SceneRecord<B>> {
        self.scene.as_mut()
    }

    pub const fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectRecord<B>> {
        self.objects.values()
    }

    /// The id issued next. Never decreases.
    pub const fn next_id(&self) -> ObjectId {
        ObjectId::new(self.next_id)
    }

    pub fn object_for_node(&self, node: NodeId) -> Option<ObjectId> {
        self.by_node.get(&node).copied()
    }

    /// Whether `node` carries the scene or a dynamic object.
    pub fn classify(&self, node: NodeId) -> Option<ObjectKind> {
        if let Some(record) = self.by_node.get(&node).and_then(|id| self.objects.get(id)) {
            return Some(record.kind);
        }
        self.scene
            .as_ref()
            .filter(|scene| scene.node == node)
            .map(|scene| scene.kind)
    }
}

impl<B: Copy> ObjectRegistry<B> {
    /// Count owned dynamic bodies and how many `is_active` reports awake.
    pub fn census(&self, is_active: impl Fn(B) -> bool) -> Census {
        self.objects.values().fold(Census::default(), |mut c, r| {
            c.total += 1;
            if is_active(r.body) {
                c.active += 1;
            }
            c
        })
    }

    /// Same count, found by walking the scene graph below `root`. Nodes the
    /// registry does not own are traversed but not counted.
    pub fn census_from_graph(
        &self,
        graph: &dyn SceneGraph,
        root: NodeId,
        is_active: impl Fn(B) -> bool,
    ) -> Census {
        let mut census = Census::default();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Some(record) = self.object_for_node(node).and_then(|id| self.objects.get(&id)) {
                census.total += 1;
                if is_active(record.body) {
                    census.active += 1;
                }
            }
            stack.extend(graph.children(node).iter().rev());
        }
        census
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tumble_core::scene::SceneTree;

    use super::*;

    fn registry_with(n: u32) -> ObjectRegistry<u32> {
        let mut r = ObjectRegistry::new();
        for i in 0..n {
            r.register(i, NodeId::new(i + 1), AttributeStore::object_defaults(), "cube");
        }
        r
    }

    #[test]
    fn ids_start_at_zero_and_increase() {
        let mut r = ObjectRegistry::new();
        let a = r.register(10_u32, NodeId::new(1), AttributeStore::new(), "a");
        let b = r.register(11, NodeId::new(2), AttributeStore::new(), "b");
        assert_eq!(a, ObjectId::new(0));
        assert_eq!(b, ObjectId::new(1));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn scene_does_not_consume_an_id() {
        let mut r = ObjectRegistry::new();
        r.bind_scene(99_u32, NodeId::new(0), AttributeStore::scene_defaults(), "room")
            .unwrap();
        let id = r.register(0, NodeId::new(1), AttributeStore::new(), "cube");
        assert_eq!(id, ObjectId::new(0));
        assert!(r.has_scene());
        assert_eq!(r.scene().unwrap().source_name, "room");
    }

    #[test]
    fn records_carry_their_kind() {
        let mut r = ObjectRegistry::new();
        r.bind_scene(7_u32, NodeId::new(0), AttributeStore::scene_defaults(), "room")
            .unwrap();
        let id = r.register(8, NodeId::new(1), AttributeStore::new(), "cube");
        assert_eq!(r.scene().unwrap().kind, ObjectKind::Scene);
        assert_eq!(r.get(id).unwrap().kind, ObjectKind::Dynamic);
        assert!(r.iter().all(|rec| rec.kind == ObjectKind::Dynamic));
        assert_eq!(r.classify(NodeId::new(1)), Some(r.get(id).unwrap().kind));
    }

    #[test]
    fn second_scene_is_rejected() {
        let mut r = ObjectRegistry::new();
        r.bind_scene(1_u32, NodeId::new(0), AttributeStore::new(), "a")
            .unwrap();
        assert_eq!(
            r.bind_scene(2, NodeId::new(0), AttributeStore::new(), "b"),
            Err(RegistryError::SceneAlreadyBound)
        );
        assert_eq!(r.scene().unwrap().body, 1);
    }

    #[test]
    fn removed_ids_are_never_reused() {
        let mut r = registry_with(3);
        let removed = r.remove(ObjectId::new(2)).unwrap();
        assert_eq!(removed.body, 2);
        let id = r.register(7, NodeId::new(9), AttributeStore::new(), "late");
        assert_eq!(id, ObjectId::new(3));
        assert!(!r.contains(ObjectId::new(2)));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut r = registry_with(1);
        let ghost = ObjectId::new(5);
        assert_eq!(r.get(ghost).unwrap_err(), RegistryError::UnknownObjectId(ghost));
        assert!(r.get_mut(ghost).is_err());
        assert!(r.remove(ghost).is_err());
        r.remove(ObjectId::new(0)).unwrap();
        assert!(r.remove(ObjectId::new(0)).is_err());
        assert_eq!(r.next_id(), ObjectId::new(1));
    }

    #[test]
    fn node_index_tracks_registration_and_removal() {
        let mut r = registry_with(2);
        r.bind_scene(50, NodeId::new(0), AttributeStore::new(), "room")
            .unwrap();
        assert_eq!(r.object_for_node(NodeId::new(2)), Some(ObjectId::new(1)));
        assert_eq!(r.classify(NodeId::new(1)), Some(ObjectKind::Dynamic));
        assert_eq!(r.classify(NodeId::new(0)), Some(ObjectKind::Scene));
        assert_eq!(r.classify(NodeId::new(40)), None);
        r.remove(ObjectId::new(1)).unwrap();
        assert_eq!(r.object_for_node(NodeId::new(2)), None);
    }

    #[test]
    fn census_counts_awake_bodies() {
        let r = registry_with(4);
        let c = r.census(|body| body % 2 == 0);
        assert_eq!(c, Census { active: 2, total: 4 });
        assert_eq!(c.asleep(), 2);
    }

    #[test]
    fn graph_census_walks_descendants() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let physics_root = tree.create_child(root);
        let group = tree.create_child(physics_root);
        let a = tree.create_child(physics_root);
        let b = tree.create_child(group);
        let outside = tree.create_child(root);

        let mut r = ObjectRegistry::new();
        r.register(1_u32, a, AttributeStore::new(), "a");
        r.register(2, b, AttributeStore::new(), "b");
        r.register(3, outside, AttributeStore::new(), "outside");

        let c = r.census_from_graph(&tree, physics_root, |body| body != 2);
        assert_eq!(c, Census { active: 1, total: 2 });
    }
}
