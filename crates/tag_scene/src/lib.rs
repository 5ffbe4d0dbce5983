//! Tag Scene - MJCF scene generation for a two-agent pursuit arena
//!
//! This crate builds the physics scene for a chaser/evader tag environment
//! and indexes the sensor buffer the engine produces for it.
//!
//! # Features
//!
//! - Binary STL cylinder synthesis for the chassis meshes
//! - Collision roles mapped onto MJCF contype/conaffinity bitmasks
//! - Deterministic MJCF document assembly from an environment configuration
//! - Name-keyed sensor layout derived from the compiled sensor table
//! - Memoized scenes shared across simulation instances
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ EnvironmentConfig │
//! └─────────┬─────────┘
//!           ▼
//! ┌─────────────────────────────────────────────────┐
//! │                    assemble                      │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────────────┐  │
//! │  │  Arena  │  │  Agent  │  │ mesh::synthesize│  │
//! │  └─────────┘  └─────────┘  └─────────────────┘  │
//! │        CollisionRole ─► CollisionMask            │
//! └───────────────────────┬─────────────────────────┘
//!                         ▼
//!              Scene { xml, assets }
//!                         │  engine compiles
//!                         ▼
//!   SensorTable ──► SensorLayout::derive ──► AgentSensors
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tag_scene::prelude::*;
//!
//! let config = EnvironmentConfig::default();
//! let scene = assemble(&config)?;
//!
//! // Hand scene.xml() and scene.assets() to the engine, then read back
//! // its compiled sensor table.
//! let layout = SensorLayout::for_scene(&table, &scene)?;
//! let chaser = layout.chaser()?.read(&sensordata)?;
//! println!("chaser heading {}", chaser.yaw());
//! ```

pub mod agent;
pub mod arena;
pub mod cache;
pub mod config;
pub mod error;
pub mod layers;
pub mod mesh;
pub mod mjcf;
pub mod scene;
pub mod sensors;

pub mod prelude {
    //! Common imports for scene generation
    pub use crate::agent::Agent;
    pub use crate::arena::{Arena, Wall};
    pub use crate::cache::{MeshCache, SceneCache};
    pub use crate::config::EnvironmentConfig;
    pub use crate::error::{Result, SceneError};
    pub use crate::layers::{CollisionLayer, CollisionMask, CollisionRole};
    pub use crate::mjcf::{Assets, MjcfModel, SensorKind};
    pub use crate::scene::{assemble, assemble_model, Scene};
    pub use crate::sensors::{
        AgentReading, AgentSensors, SensorLayout, SensorRange, SensorRecord, SensorTable,
    };
}

pub use prelude::*;
