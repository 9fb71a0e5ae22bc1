//! Shared test fixtures and utilities for Tumble crates.
//!
//! Provides a recording physics backend, mesh fixtures and deterministic RNG
//! setup.

pub mod meshes;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use meshes::{cube_mesh, cube_template, ground_plane, line_strip, test_library};
pub use mocks::{RecordingBackend, RecordingDrawables};
pub use rng::seeded_rng;
