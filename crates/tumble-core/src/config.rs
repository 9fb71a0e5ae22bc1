use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeStore, keys};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_simulator() -> String {
    "none".into()
}
const fn default_timestep() -> f64 {
    0.01
}
const fn default_max_substeps() -> i32 {
    10
}
const fn default_gravity() -> [f32; 3] {
    [0.0, -9.8, 0.0]
}
const fn default_margin() -> f64 {
    0.01
}
const fn default_one() -> f64 {
    1.0
}
const fn default_friction() -> f64 {
    0.5
}
const fn default_restitution() -> f64 {
    0.6
}
const fn default_damping() -> f64 {
    0.2
}

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Physics manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Backend name (default: "none").
    #[serde(default = "default_simulator")]
    pub simulator: String,

    /// Fixed sub-step duration in seconds (default: 0.01).
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// Cap on sub-steps per `step_simulation` call (default: 10).
    #[serde(default = "default_max_substeps")]
    pub max_substeps: i32,

    /// Gravity vector [x, y, z] in m/s^2. Y is up.
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],

    /// Log wall-clock step timings.
    #[serde(default)]
    pub profiling: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            simulator: default_simulator(),
            timestep: default_timestep(),
            max_substeps: default_max_substeps(),
            gravity: default_gravity(),
            profiling: false,
        }
    }
}

impl PhysicsConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep(self.timestep));
        }
        if self.max_substeps < 1 {
            return Err(ConfigError::InvalidMaxSubsteps(self.max_substeps));
        }
        Ok(())
    }

    pub fn gravity_vec(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }

    /// Sub-step cap as an unsigned count. Call after [`validate`](Self::validate).
    #[allow(clippy::cast_sign_loss)]
    pub const fn max_substeps_u32(&self) -> u32 {
        if self.max_substeps < 1 {
            1
        } else {
            self.max_substeps as u32
        }
    }

    /// Physics rate in Hz.
    pub fn physics_hz(&self) -> f64 {
        1.0 / self.timestep
    }

    /// The manager attribute set this configuration describes.
    pub fn to_attributes(&self) -> AttributeStore {
        let mut attrs = AttributeStore::manager_defaults();
        attrs.set_string(keys::SIMULATOR, self.simulator.clone());
        attrs.set_double(keys::TIMESTEP, self.timestep);
        attrs.set_int(keys::MAX_SUBSTEPS, self.max_substeps);
        attrs.set_vec3(keys::GRAVITY, self.gravity_vec());
        attrs
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// ObjectTemplateConfig
// ---------------------------------------------------------------------------

/// Physical properties of an object template.
///
/// `mass` is optional: when absent, the object's mass is derived from its
/// collision mesh at instantiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTemplateConfig {
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_one")]
    pub scale: f64,
    /// Center of mass in the object frame.
    #[serde(default)]
    pub com: [f32; 3],
    /// Diagonal inertia. All zeros lets the backend derive it.
    #[serde(default)]
    pub inertia: [f32; 3],
    #[serde(default = "default_friction")]
    pub friction: f64,
    #[serde(default = "default_restitution")]
    pub restitution: f64,
    #[serde(default = "default_damping")]
    pub lin_damping: f64,
    #[serde(default = "default_damping")]
    pub ang_damping: f64,
    #[serde(default)]
    pub render_mesh: String,
    #[serde(default)]
    pub collision_mesh: String,
}

impl Default for ObjectTemplateConfig {
    fn default() -> Self {
        Self {
            mass: None,
            margin: default_margin(),
            scale: default_one(),
            com: [0.0; 3],
            inertia: [0.0; 3],
            friction: default_friction(),
            restitution: default_restitution(),
            lin_damping: default_damping(),
            ang_damping: default_damping(),
            render_mesh: String::new(),
            collision_mesh: String::new(),
        }
    }
}

impl ObjectTemplateConfig {
    /// Object attributes for this template. Leaves `mass` unset when it is
    /// not configured.
    pub fn to_attributes(&self) -> AttributeStore {
        let mut attrs = AttributeStore::object_defaults();
        match self.mass {
            Some(mass) => attrs.set_double(keys::MASS, mass),
            None => {
                attrs.erase_as::<f64>(keys::MASS);
            }
        }
        attrs.set_double(keys::MARGIN, self.margin);
        attrs.set_double(keys::SCALE, self.scale);
        attrs.set_vec3(keys::COM, Vec3::from_array(self.com));
        attrs.set_vec3(keys::INERTIA, Vec3::from_array(self.inertia));
        attrs.set_double(keys::FRICTION, self.friction);
        attrs.set_double(keys::RESTITUTION, self.restitution);
        attrs.set_double(keys::LIN_DAMPING, self.lin_damping);
        attrs.set_double(keys::ANG_DAMPING, self.ang_damping);
        attrs.set_string(keys::RENDER_MESH_HANDLE, self.render_mesh.clone());
        attrs.set_string(keys::COLLISION_MESH_HANDLE, self.collision_mesh.clone());
        attrs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physics_config_defaults() {
        let c = PhysicsConfig::default();
        assert_eq!(c.simulator, "none");
        assert!((c.timestep - 0.01).abs() < f64::EPSILON);
        assert_eq!(c.max_substeps, 10);
        assert_eq!(c.gravity, [0.0, -9.8, 0.0]);
        assert!(!c.profiling);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn physics_config_rejects_bad_timestep() {
        for timestep in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            let c = PhysicsConfig {
                timestep,
                ..PhysicsConfig::default()
            };
            assert!(matches!(c.validate(), Err(ConfigError::InvalidTimestep(_))));
        }
    }

    #[test]
    fn physics_config_rejects_zero_substeps() {
        let c = PhysicsConfig {
            max_substeps: 0,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidMaxSubsteps(0))
        ));
        assert_eq!(c.max_substeps_u32(), 1);
    }

    #[test]
    fn physics_config_partial_toml() {
        let c = PhysicsConfig::from_toml_str(
            r#"
            simulator = "rapier"
            timestep = 0.004166666666666667
            profiling = true
            "#,
        )
        .unwrap();
        assert_eq!(c.simulator, "rapier");
        assert!((c.physics_hz() - 240.0).abs() < 1e-6);
        assert_eq!(c.max_substeps, 10);
        assert!(c.profiling);
    }

    #[test]
    fn physics_config_invalid_toml_is_rejected() {
        let err = PhysicsConfig::from_toml_str("timestep = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        let err = PhysicsConfig::from_toml_str("timestep = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimestep(_)));
    }

    #[test]
    fn physics_config_missing_file_is_io_error() {
        let err = PhysicsConfig::from_file("/nonexistent/tumble.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn physics_config_to_attributes() {
        let c = PhysicsConfig {
            simulator: "rapier".into(),
            max_substeps: 4,
            ..PhysicsConfig::default()
        };
        let attrs = c.to_attributes();
        assert_eq!(attrs.string(keys::SIMULATOR).unwrap(), "rapier");
        assert_eq!(attrs.int(keys::MAX_SUBSTEPS).unwrap(), 4);
        assert_eq!(attrs.vec3(keys::GRAVITY).unwrap(), Vec3::new(0.0, -9.8, 0.0));
    }

    #[test]
    fn object_template_without_mass_leaves_it_unset() {
        let attrs = ObjectTemplateConfig::default().to_attributes();
        assert!(!attrs.exists_as::<f64>(keys::MASS));
        assert!((attrs.double(keys::FRICTION).unwrap() - 0.5).abs() < f64::EPSILON);
        assert!((attrs.double(keys::MARGIN).unwrap() - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn object_template_from_toml() {
        let c: ObjectTemplateConfig = toml::from_str(
            r#"
            mass = 2.5
            restitution = 0.0
            com = [0.0, 0.1, 0.0]
            "#,
        )
        .unwrap();
        let attrs = c.to_attributes();
        assert!((attrs.double(keys::MASS).unwrap() - 2.5).abs() < f64::EPSILON);
        assert!(attrs.double(keys::RESTITUTION).unwrap().abs() < f64::EPSILON);
        assert_eq!(attrs.vec3(keys::COM).unwrap(), Vec3::new(0.0, 0.1, 0.0));
        assert!((attrs.double(keys::LIN_DAMPING).unwrap() - 0.2).abs() < f64::EPSILON);
    }
}
