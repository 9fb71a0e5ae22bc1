//! Collision mesh and template fixtures.

use glam::Vec3;
use tumble_core::resources::{ObjectLibrary, ObjectTemplate};
use tumble_core::types::{CollisionMeshData, MeshPrimitive};

/// Axis-aligned cube of half-extent `half` centered at the origin, as a
/// 12-triangle list (36 indices).
pub fn cube_mesh(half: f32) -> CollisionMeshData {
    let positions = vec![
        Vec3::new(-half, -half, -half),
        Vec3::new(half, -half, -half),
        Vec3::new(half, half, -half),
        Vec3::new(-half, half, -half),
        Vec3::new(-half, -half, half),
        Vec3::new(half, -half, half),
        Vec3::new(half, half, half),
        Vec3::new(-half, half, half),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // -z
        4, 5, 6, 4, 6, 7, // +z
        0, 1, 5, 0, 5, 4, // -y
        3, 6, 2, 3, 7, 6, // +y
        0, 4, 7, 0, 7, 3, // -x
        1, 2, 6, 1, 6, 5, // +x
    ];
    CollisionMeshData::triangles(positions, indices)
}

/// Square ground plane at y = 0 spanning `[-half, half]` in x and z.
pub fn ground_plane(half: f32) -> CollisionMeshData {
    CollisionMeshData::triangles(
        vec![
            Vec3::new(-half, 0.0, -half),
            Vec3::new(half, 0.0, -half),
            Vec3::new(half, 0.0, half),
            Vec3::new(-half, 0.0, half),
        ],
        vec![0, 2, 1, 0, 3, 2],
    )
}

/// A line strip, which can never become a collision shape.
pub fn line_strip() -> CollisionMeshData {
    CollisionMeshData::new(
        MeshPrimitive::LineStrip,
        vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0)],
        vec![0, 1, 2],
    )
}

/// Template for a unit-mass cube with object-default attributes.
pub fn cube_template(name: &str, half: f32) -> ObjectTemplate {
    ObjectTemplate::new(name, vec![cube_mesh(half)])
}

/// Library holding `"cube"` (index 0, mass 1.0) and `"wire"` (index 1, a
/// line strip that fails validation).
pub fn test_library() -> ObjectLibrary {
    let mut lib = ObjectLibrary::new();
    lib.insert(cube_template("cube", 0.5));
    lib.insert(ObjectTemplate::new("wire", vec![line_strip()]));
    lib
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
