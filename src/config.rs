// src/config.rs

//! Engine configuration.
//!
//! Loaded from `engine_config.json` with support for environment variable overrides.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::core::constants::DEFAULT_POSITION_TOLERANCE;
use crate::core::{DEFAULT_MAX_STATE_SPACE, DEFAULT_OCCUPATION_CUTOFF};

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("data/engine_config.json");

pub const CONFIG_PATH_ENV: &str = "QGHOST_CONFIG_PATH";
pub const OCCUPATION_CUTOFF_ENV: &str = "QGHOST_OCCUPATION_CUTOFF";

/// Tunables read once at process start. Changing `occupation_cutoff`
/// requires recreating every quantum ghost.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-mode occupation cutoff `D`.
    pub occupation_cutoff: usize,
    /// Largest amplitude vector (`D^n` entries) a ghost may grow to.
    pub max_state_space: usize,
    pub position_tolerance: f64,
    pub shot_hit_radius: f64,
    /// Base attack radius; each ghost kind offsets it.
    pub ghost_attack_radius: f64,
    pub attack_probability: f64,
    pub trap_probability: f64,
    pub max_difficulty: u32,
    pub difficulty: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            occupation_cutoff: DEFAULT_OCCUPATION_CUTOFF,
            max_state_space: DEFAULT_MAX_STATE_SPACE,
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
            shot_hit_radius: 0.5,
            ghost_attack_radius: 3.0,
            attack_probability: 0.3,
            trap_probability: 0.05,
            max_difficulty: 5,
            difficulty: 3,
        }
    }
}

impl EngineConfig {
    /// The compiled-in configuration. Falls back to `Default` if the
    /// embedded JSON does not parse or validate.
    pub fn builtin() -> Self {
        match Self::from_json_str(BUILTIN_ENGINE_CONFIG) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    target: "qghost::config",
                    error = %err,
                    "engine_config.builtin_invalid"
                );
                Self::default()
            }
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        EngineConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.occupation_cutoff < 2 {
            return Err(ConfigError::Invalid {
                message: format!("occupation_cutoff must be at least 2, got {}", self.occupation_cutoff),
            });
        }
        if self.max_state_space == 0 {
            return Err(ConfigError::Invalid { message: "max_state_space must be positive".to_string() });
        }
        // A splitter acts on a pair of modes, so the ceiling must hold D².
        match pair_space(self.occupation_cutoff) {
            Some(pair) if pair <= self.max_state_space => {}
            _ => {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "max_state_space {} cannot hold a mode pair of cutoff {}",
                        self.max_state_space, self.occupation_cutoff
                    ),
                });
            }
        }
        for (name, p) in [
            ("attack_probability", self.attack_probability),
            ("trap_probability", self.trap_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid { message: format!("{name} must lie in [0, 1], got {p}") });
            }
        }
        if self.position_tolerance < 0.0 || self.shot_hit_radius < 0.0 || self.ghost_attack_radius < 0.0 {
            return Err(ConfigError::Invalid { message: "radii and tolerances must be non-negative".to_string() });
        }
        Ok(())
    }

    /// Applies a `QGHOST_OCCUPATION_CUTOFF` value if it parses to a usable
    /// cutoff.
    fn apply_cutoff_override(&mut self, raw: &str) {
        match raw.trim().parse::<usize>() {
            Ok(cutoff) if cutoff >= 2 && pair_space(cutoff).is_some() => {
                self.occupation_cutoff = cutoff;
                tracing::info!(target: "qghost::config", cutoff, "engine_config.cutoff_override");
            }
            _ => {
                tracing::warn!(
                    target: "qghost::config",
                    value = %raw,
                    "engine_config.cutoff_override_ignored"
                );
            }
        }
    }
}

/// `D²`, the size of the two-mode space a splitter acts on.
fn pair_space(cutoff: usize) -> Option<usize> {
    cutoff.checked_mul(cutoff)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine config: {message}")]
    Invalid { message: String },
}

/// Load engine configuration from `QGHOST_CONFIG_PATH`, else the builtin,
/// then apply `QGHOST_OCCUPATION_CUTOFF`.
///
/// Returns the config and the file it came from, if any.
pub fn load_engine_config_from_env() -> (EngineConfig, Option<PathBuf>) {
    let path = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let cutoff_override = env::var(OCCUPATION_CUTOFF_ENV).ok();
    load_engine_config(path, cutoff_override.as_deref())
}

/// Load engine configuration from an optional file, falling back to the
/// builtin, with an optional cutoff override. The ceiling is raised to
/// `D²` when the override outgrows it.
pub fn load_engine_config(path: Option<PathBuf>, cutoff_override: Option<&str>) -> (EngineConfig, Option<PathBuf>) {
    let (mut config, path) = match path {
        Some(path) => match EngineConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "qghost::config",
                    path = %path.display(),
                    "engine_config.loaded=file"
                );
                (config, Some(path))
            }
            Err(err) => {
                tracing::warn!(
                    target: "qghost::config",
                    path = %path.display(),
                    error = %err,
                    "engine_config.load_failed"
                );
                (EngineConfig::builtin(), None)
            }
        },
        None => {
            tracing::info!(target: "qghost::config", "engine_config.loaded=builtin");
            (EngineConfig::builtin(), None)
        }
    };

    if let Some(raw) = cutoff_override {
        config.apply_cutoff_override(raw);
    }
    if let Some(pair) = pair_space(config.occupation_cutoff) {
        if config.max_state_space < pair {
            tracing::warn!(
                target: "qghost::config",
                cutoff = config.occupation_cutoff,
                ceiling = config.max_state_space,
                raised_to = pair,
                "engine_config.ceiling_raised"
            );
            config.max_state_space = pair;
        }
    }
    (config, path)
}
