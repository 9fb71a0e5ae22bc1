//! Tumble headless drop-test driver.
//!
//! Builds a static ground plane and a row of cubes on the rapier backend,
//! then steps the physics manager at a fixed frame rate and logs heights and
//! the active-object census once per simulated second.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tumble_core::prelude::*;
use tumble_physics::prelude::*;

const FRAME_RATE: f64 = 60.0;
const GROUND_ASSET: &str = "ground.glb";
const CUBE: &str = "cube";

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Tumble object and simulation registry.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop cubes onto a ground plane and report as they settle.
    Run {
        /// TOML file with `[physics]` and `[cube]` tables.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of 60 Hz frames to simulate.
        #[arg(short, long, default_value_t = 600)]
        frames: u32,

        /// Number of cubes to drop.
        #[arg(short, long, default_value_t = 4)]
        objects: usize,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const fn default_cube_half_extent() -> f32 {
    0.25
}
const fn default_ground_half_extent() -> f32 {
    20.0
}

/// Drop-test configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DropConfig {
    #[serde(default)]
    physics: PhysicsConfig,
    #[serde(default)]
    cube: ObjectTemplateConfig,
    #[serde(default = "default_cube_half_extent")]
    cube_half_extent: f32,
    #[serde(default = "default_ground_half_extent")]
    ground_half_extent: f32,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            cube: ObjectTemplateConfig::default(),
            cube_half_extent: default_cube_half_extent(),
            ground_half_extent: default_ground_half_extent(),
        }
    }
}

impl DropConfig {
    fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.physics.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Meshes
// ---------------------------------------------------------------------------

fn box_mesh(half: f32) -> CollisionMeshData {
    let positions = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ]
    .into_iter()
    .map(|p| Vec3::from_array(p) * half)
    .collect();
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2,
        4, 5, 6, 4, 6, 7,
        0, 1, 5, 0, 5, 4,
        3, 6, 2, 3, 7, 6,
        0, 4, 7, 0, 7, 3,
        1, 2, 6, 1, 6, 5,
    ];
    CollisionMeshData::triangles(positions, indices)
}

fn ground_mesh(half: f32) -> CollisionMeshData {
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

fn library(config: &DropConfig) -> ObjectLibrary {
    let mut lib = ObjectLibrary::new();
    lib.insert(
        ObjectTemplate::new(CUBE, vec![box_mesh(config.cube_half_extent)])
            .with_attributes(config.cube.to_attributes()),
    );
    lib.insert_asset(GROUND_ASSET, vec![ground_mesh(config.ground_half_extent)]);
    lib
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn run_drop(config: &DropConfig, frames: u32, objects: usize) -> Result<(), TumbleError> {
    let mut tree = SceneTree::new();
    let top = tree.root();
    let root = tree.create_child(top);

    let mut physics =
        PhysicsManager::from_config(RapierBackend::new(), Arc::new(library(config)), &config.physics)?;
    physics.initialize(root, config.physics.gravity_vec())?;
    physics.add_scene_from_asset(
        &AssetInfo::new(AssetType::Generic, GROUND_ASSET),
        AttributeStore::scene_defaults(),
    )?;

    let spacing = config.cube_half_extent * 4.0;
    let mut ids = Vec::with_capacity(objects);
    for i in 0..objects {
        #[allow(clippy::cast_precision_loss)]
        let slot = i as f32;
        let id = match physics.add_object(CUBE, &mut tree, root, None) {
            Ok(id) => id,
            Err(e) => {
                error!("Skipping cube {i}: {e}");
                continue;
            }
        };
        let start = Vec3::new(slot * spacing, 1.0 + slot * 0.5, 0.0);
        if let Err(e) = physics.set_translation(id, start) {
            warn!("Could not place object {id}: {e}");
        }
        ids.push(id);
    }
    info!(
        "Dropping {} cubes for {frames} frames at {} Hz physics",
        ids.len(),
        config.physics.physics_hz()
    );

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let report_every = FRAME_RATE as u32;
    for frame in 1..=frames {
        physics.step_simulation(1.0 / FRAME_RATE)?;
        physics.sync_scene_graph(&mut tree);
        let census = physics.advance_frame(&tree);

        if frame % report_every == 0 {
            let heights: Vec<String> = ids
                .iter()
                .filter_map(|&id| physics.translation(id).ok())
                .map(|t| format!("{:.3}", t.y))
                .collect();
            info!(
                "t={:.2}s active={}/{} heights=[{}]",
                physics.world_time().secs_f64(),
                census.active,
                census.total,
                heights.join(", ")
            );
        }
    }

    if let Some(fps) = physics.profile().and_then(StepProfile::average_fps) {
        info!("Average step rate {fps:.1} FPS");
    }
    Ok(())
}

fn run_info() {
    println!("tumble v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  tumble-core     {}", env!("CARGO_PKG_VERSION"));
    println!("  tumble-physics  {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("backend: {}", RapierBackend::new().name());
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run {
            config,
            frames,
            objects,
        }) => {
            let config = match DropConfig::load(config.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    error!("Invalid configuration: {e}");
                    std::process::exit(2);
                }
            };
            if let Err(e) = run_drop(&config, frames, objects) {
                error!("Drop test failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Info) | None => run_info(),
    }
}
