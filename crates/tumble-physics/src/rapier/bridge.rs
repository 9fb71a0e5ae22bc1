//! glam <-> rapier math conversions and collision shape builders.

use glam::{Quat, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::parry::transformation::try_convex_hull;
use rapier3d::prelude::{ColliderBuilder, Point, Real, Vector};

use tumble_core::error::SimError;
use tumble_core::types::{CollisionMeshData, Pose};

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

pub fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_isometry(pose: Pose) -> Isometry3<Real> {
    let q = pose.rotation.normalize();
    Isometry3::from_parts(
        Translation3::new(pose.translation.x, pose.translation.y, pose.translation.z),
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

pub fn from_isometry(iso: &Isometry3<Real>) -> Pose {
    let c = iso.rotation.quaternion().coords;
    Pose::new(
        from_vector(&iso.translation.vector),
        Quat::from_xyzw(c.x, c.y, c.z, c.w),
    )
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Relative tolerance below which a point set counts as flat.
const DEGENERATE_EPS: f32 = 1e-6;

fn construction_error(message: String) -> SimError {
    SimError::BackendConstruction(message)
}

/// Every primitive merged into one static triangle mesh.
///
/// Out-of-range indices, non-finite vertices and groups without a single
/// complete triangle are rejected here; rapier would panic on them.
pub fn trimesh_collider(mesh_group: &[CollisionMeshData]) -> Result<ColliderBuilder, SimError> {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (i, mesh) in mesh_group.iter().enumerate() {
        if !mesh.positions.iter().all(|p| p.is_finite()) {
            return Err(construction_error(format!(
                "collision primitive {i} has non-finite vertices"
            )));
        }
        let count = mesh.positions.len();
        if let Some(&bad) = mesh.indices.iter().find(|&&idx| idx as usize >= count) {
            return Err(construction_error(format!(
                "collision primitive {i}: index {bad} out of range for {count} vertices"
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        let base = vertices.len() as u32;
        vertices.extend(mesh.positions.iter().map(|&p| to_point(p)));
        indices.extend(
            mesh.triangle_indices()
                .map(|[a, b, c]| [a + base, b + base, c + base]),
        );
    }
    if indices.is_empty() {
        return Err(construction_error(
            "triangle mesh has no complete triangle".into(),
        ));
    }
    Ok(ColliderBuilder::trimesh(vertices, indices))
}

/// The point maximizing `score`, with its score. Starts from `(origin, 0)`.
fn farthest(points: &[Vec3], origin: Vec3, score: impl Fn(Vec3) -> f32) -> (Vec3, f32) {
    points
        .iter()
        .map(|&p| (p, score(p)))
        .fold((origin, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
}

/// True when `points` span a volume: not all coincident, collinear or
/// coplanar, relative to their extent.
fn spans_volume(points: &[Vec3]) -> bool {
    let Some(&origin) = points.first() else {
        return false;
    };
    let (a, extent) = farthest(points, origin, |p: Vec3| (p - origin).length());
    if extent <= f32::EPSILON {
        return false;
    }
    let axis = (a - origin) / extent;
    let (b, area) = farthest(points, origin, |p: Vec3| (p - origin).cross(axis).length());
    if area <= DEGENERATE_EPS * extent {
        return false;
    }
    let normal = axis.cross(b - origin).normalize();
    let (_, height) = farthest(points, origin, |p: Vec3| (p - origin).dot(normal).abs());
    height > DEGENERATE_EPS * extent
}

/// Convex hull over every vertex of the group, uniformly scaled.
///
/// Point sets that cannot bound a volume fail with
/// [`SimError::BackendConstruction`] instead of reaching the hull builder.
pub fn convex_hull_collider(
    mesh_group: &[CollisionMeshData],
    scale: f32,
) -> Result<ColliderBuilder, SimError> {
    let scaled: Vec<Vec3> = mesh_group
        .iter()
        .flat_map(|mesh| mesh.positions.iter())
        .map(|&p| p * scale)
        .collect();
    if !scaled.iter().all(|p| p.is_finite()) {
        return Err(construction_error(format!(
            "non-finite hull vertices (scale {scale})"
        )));
    }
    if scaled.len() < 4 || !spans_volume(&scaled) {
        return Err(construction_error(format!(
            "degenerate convex hull over {} points",
            scaled.len()
        )));
    }

    let points: Vec<Point<Real>> = scaled.into_iter().map(to_point).collect();
    let (hull_vertices, hull_indices) = try_convex_hull(&points)
        .map_err(|e| construction_error(format!("convex hull failed: {e}")))?;
    ColliderBuilder::convex_mesh(hull_vertices, &hull_indices)
        .ok_or_else(|| construction_error("convex hull is not a closed polyhedron".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
