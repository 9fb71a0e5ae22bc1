//! Raw `rapier3d` physics backend.
//!
//! This module implements [`PhysicsBackend`](crate::backend::PhysicsBackend)
//! using the `rapier3d` crate directly. We own the
//! [`PhysicsPipeline`](rapier3d::pipeline::PhysicsPipeline) and call `step()`
//! ourselves, once per fixed sub-step handed down by the manager.

pub mod backend;
pub mod bridge;
pub mod context;

pub use backend::RapierBackend;
pub use context::RapierContext;
