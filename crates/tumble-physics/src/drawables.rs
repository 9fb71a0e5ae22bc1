//! Optional render attachment hook for newly added objects.

use tumble_core::resources::ObjectTemplate;
use tumble_core::scene::NodeId;
use tumble_core::types::ObjectId;

/// Receives each successfully added object so a renderer can attach
/// drawables to its node. Never consulted by the simulation.
pub trait DrawableSink {
    fn attach(&mut self, id: ObjectId, node: NodeId, template: &ObjectTemplate);
}
