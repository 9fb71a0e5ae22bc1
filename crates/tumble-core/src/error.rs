use thiserror::Error;

use crate::attributes::AttributeKind;
use crate::types::{MeshPrimitive, ObjectId};

/// Top-level error type for Tumble.
#[derive(Debug, Error)]
pub enum TumbleError {
    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TumbleError {
    /// Whether this error reports an id that was never issued or was removed.
    pub const fn is_unknown_object(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::UnknownObjectId(_)))
    }
}

/// Attribute store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("Attribute '{key}' not found in {kind} partition")]
    KeyNotFound { key: String, kind: AttributeKind },
}

/// Collision geometry validation errors.
///
/// Copy so they can be returned from the validator without allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Unsupported topology {topology} in mesh primitive {index}; only triangle lists can become collision shapes")]
    UnsupportedTopology { index: usize, topology: MeshPrimitive },

    #[error("Mesh group contains no primitives")]
    EmptyMeshGroup,
}

/// Object registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown object id {0}")]
    UnknownObjectId(ObjectId),

    #[error("A scene is already bound to this manager")]
    SceneAlreadyBound,

    #[error("No object template registered for {0}")]
    UnknownTemplate(String),

    #[error("No collision mesh available for asset {0}")]
    UnknownAsset(String),

    #[error("No scene is bound to this manager")]
    NoScene,
}

/// Simulation lifecycle and backend errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Physics is already initialized")]
    AlreadyInitialized,

    #[error("Physics is not initialized")]
    NotInitialized,

    #[error("Invalid step duration: {0} (must be finite and >= 0)")]
    InvalidTimestep(f64),

    #[error("Backend failed to construct body: {0}")]
    BackendConstruction(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid timestep: {0} (must be > 0)")]
    InvalidTimestep(f64),

    #[error("Invalid max_substeps: {0} (must be >= 1)")]
    InvalidMaxSubsteps(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tumble_error_from_attribute_error() {
        let err = AttributeError::KeyNotFound {
            key: "mass".into(),
            kind: AttributeKind::Double,
        };
        let top: TumbleError = err.into();
        assert!(matches!(top, TumbleError::Attribute(_)));
        assert!(top.to_string().contains("mass"));
    }

    #[test]
    fn tumble_error_from_geometry_error() {
        let err = GeometryError::UnsupportedTopology {
            index: 2,
            topology: MeshPrimitive::LineStrip,
        };
        let top: TumbleError = err.into();
        assert!(matches!(top, TumbleError::Geometry(_)));
        assert!(top.to_string().contains("line strip"));
    }

    #[test]
    fn tumble_error_from_registry_error() {
        let top: TumbleError = RegistryError::UnknownObjectId(ObjectId::new(7)).into();
        assert!(top.is_unknown_object());
        assert!(top.to_string().contains('7'));
    }

    #[test]
    fn tumble_error_from_sim_error() {
        let top: TumbleError = SimError::AlreadyInitialized.into();
        assert!(matches!(top, TumbleError::Simulation(_)));
        assert!(!top.is_unknown_object());
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn geometry_error_is_copy() {
        let err = GeometryError::EmptyMeshGroup;
        let err2 = err;
        assert_eq!(err, err2);
    }

    #[test]
    fn attribute_error_display() {
        assert_eq!(
            AttributeError::KeyNotFound {
                key: "COM".into(),
                kind: AttributeKind::Vec3
            }
            .to_string(),
            "Attribute 'COM' not found in vec3 partition"
        );
    }

    #[test]
    fn registry_error_display() {
        assert_eq!(
            RegistryError::UnknownObjectId(ObjectId::new(4)).to_string(),
            "Unknown object id 4"
        );
        assert_eq!(
            RegistryError::SceneAlreadyBound.to_string(),
            "A scene is already bound to this manager"
        );
        assert_eq!(
            RegistryError::UnknownTemplate("crate".into()).to_string(),
            "No object template registered for crate"
        );
    }

    #[test]
    fn sim_error_display() {
        assert_eq!(
            SimError::AlreadyInitialized.to_string(),
            "Physics is already initialized"
        );
        assert_eq!(
            SimError::InvalidTimestep(-0.5).to_string(),
            "Invalid step duration: -0.5 (must be finite and >= 0)"
        );
        assert_eq!(
            SimError::BackendConstruction("degenerate hull".into()).to_string(),
            "Backend failed to construct body: degenerate hull"
        );
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::InvalidTimestep(0.0).to_string(),
            "Invalid timestep: 0 (must be > 0)"
        );
        assert_eq!(
            ConfigError::InvalidMaxSubsteps(0).to_string(),
            "Invalid max_substeps: 0 (must be >= 1)"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TumbleError>();
        assert_send_sync::<ConfigError>();
    }
}
