// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod geometry;
pub mod state;

// Re-export public types for convenient access via `qghost::core::TypeName`
pub use error::{EngineError, GhostId, InstanceId};
pub use geometry::Vec2;
pub use state::{AmplitudeVector, state_space_size};

pub mod constants;
pub use constants::{DEFAULT_MAX_STATE_SPACE, DEFAULT_OCCUPATION_CUTOFF};
