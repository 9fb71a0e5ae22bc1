//! Scene-graph seam.
//!
//! The physics core never owns scene nodes. It holds [`NodeId`]s, reads and
//! writes world transforms through [`SceneGraph`], and walks children for the
//! active-body census. [`SceneTree`] is a minimal arena implementation used by
//! tests and the headless app; a renderer brings its own.

use crate::types::Pose;

/// Handle to a node owned by a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Capability surface the physics core needs from a scene graph.
pub trait SceneGraph {
    /// Create a new child of `parent` and return its handle.
    fn create_child(&mut self, parent: NodeId) -> NodeId;

    /// World transform of `node`, or `None` if the node does not exist.
    fn world_transform(&self, node: NodeId) -> Option<Pose>;

    /// Overwrite the world transform of `node`. Unknown nodes are ignored.
    fn set_world_transform(&mut self, node: NodeId, pose: Pose);

    /// Direct children of `node`, in creation order.
    fn children(&self, node: NodeId) -> &[NodeId];
}

// ---------------------------------------------------------------------------
// SceneTree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pose: Pose,
}

/// Arena scene graph storing world transforms directly.
#[derive(Debug, Clone)]
pub struct SceneTree {
    nodes: Vec<Node>,
}

impl SceneTree {
    /// Tree containing only a root node at the identity pose.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                pose: Pose::IDENTITY,
            }],
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index()).and_then(|n| n.parent)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph for SceneTree {
    #[allow(clippy::cast_possible_truncation)]
    fn create_child(&mut self, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let pose = self
            .nodes
            .get(parent.index())
            .map_or(Pose::IDENTITY, |p| p.pose);
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            pose,
        });
        if let Some(p) = self.nodes.get_mut(parent.index()) {
            p.children.push(id);
        }
        id
    }

    fn world_transform(&self, node: NodeId) -> Option<Pose> {
        self.nodes.get(node.index()).map(|n| n.pose)
    }

    fn set_world_transform(&mut self, node: NodeId, pose: Pose) {
        if let Some(n) = self.nodes.get_mut(node.index()) {
            n.pose = pose;
        }
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
