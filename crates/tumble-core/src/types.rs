use std::fmt;
use std::path::PathBuf;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Identity of one simulated dynamic body.
///
/// Allocated monotonically by the registry and never reused, so a stale id
/// held by a caller can never alias a newer object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId(u32);

impl ObjectId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// Whether a registered body is the static scene or a dynamic object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Scene,
    Dynamic,
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Rigid world transform: rotation followed by translation. Scale is kept as
/// an attribute, never baked into a pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// Decompose a homogeneous matrix, discarding any scale.
    #[must_use]
    pub fn from_mat4(matrix: &Mat4) -> Self {
        let (_scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation: rotation.normalize(),
        }
    }

    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Translate in world space.
    #[must_use]
    pub fn translated(self, offset: Vec3) -> Self {
        Self {
            translation: self.translation + offset,
            ..self
        }
    }

    /// Translate along the pose's own axes.
    #[must_use]
    pub fn translated_local(self, offset: Vec3) -> Self {
        Self {
            translation: self.translation + self.rotation * offset,
            ..self
        }
    }

    /// Rotate about an axis through the world origin. The translation is
    /// rotated too, matching a global pre-multiplied transform.
    #[must_use]
    pub fn rotated(self, angle: f32, axis: Vec3) -> Self {
        let q = Quat::from_axis_angle(axis.normalize(), angle);
        Self {
            translation: q * self.translation,
            rotation: (q * self.rotation).normalize(),
        }
    }

    /// Rotate about an axis through the pose's own origin, in its own frame.
    #[must_use]
    pub fn rotated_local(self, angle: f32, axis: Vec3) -> Self {
        let q = Quat::from_axis_angle(axis.normalize(), angle);
        Self {
            translation: self.translation,
            rotation: (self.rotation * q).normalize(),
        }
    }

    /// Map a point from the pose's local frame into world space.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * point
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Collision meshes
// ---------------------------------------------------------------------------

/// Topology tag of a mesh primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshPrimitive {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl fmt::Display for MeshPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineLoop => "line loop",
            Self::LineStrip => "line strip",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle strip",
            Self::TriangleFan => "triangle fan",
        };
        f.write_str(name)
    }
}

/// One collision primitive: a topology tag plus vertex and index buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionMeshData {
    pub primitive: MeshPrimitive,
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl CollisionMeshData {
    #[must_use]
    pub const fn new(primitive: MeshPrimitive, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            primitive,
            positions,
            indices,
        }
    }

    /// Triangle-list primitive.
    #[must_use]
    pub const fn triangles(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self::new(MeshPrimitive::Triangles, positions, indices)
    }

    /// Index buffer grouped into triangles. Trailing indices that do not form
    /// a full triangle are ignored.
    pub fn triangle_indices(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

// ---------------------------------------------------------------------------
// AssetInfo
// ---------------------------------------------------------------------------

/// Source format of a scene asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    #[default]
    Generic,
    InstanceMesh,
    FrlInstanceMesh,
}

/// Where a scene came from. Only used for diagnostics and path conventions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset_type: AssetType,
    pub filepath: PathBuf,
}

impl AssetInfo {
    pub fn new(asset_type: AssetType, filepath: impl Into<PathBuf>) -> Self {
        Self {
            asset_type,
            filepath: filepath.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
