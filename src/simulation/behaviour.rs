// src/simulation/behaviour.rs

//! Ghost temperament as data rather than a type hierarchy.

use crate::config::EngineConfig;
use rand::{Rng, RngExt};
use std::fmt;

/// The temperaments a ghost branch can be spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GhostKind {
    Aggressive,
    Passive,
}

impl GhostKind {
    pub const ALL: [GhostKind; 2] = [GhostKind::Aggressive, GhostKind::Passive];

    /// Uniform draw over all kinds; every new branch gets its own.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> GhostKind {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Tuning for this kind given the base attack radius.
    pub fn behaviour(self, base_attack_radius: f64) -> Behaviour {
        match self {
            GhostKind::Aggressive => {
                let attack_radius = base_attack_radius + 2.0;
                Behaviour {
                    follow_player_chance: 0.9,
                    follow_waypoint_chance: 0.3,
                    attack_radius,
                    attack_probability: 0.8,
                    detect_player_radius: attack_radius + 2.0,
                    flees_player: false,
                }
            }
            GhostKind::Passive => Behaviour {
                follow_player_chance: 0.8,
                follow_waypoint_chance: 0.8,
                attack_radius: (base_attack_radius - 2.0).max(0.0),
                attack_probability: 0.5,
                detect_player_radius: base_attack_radius + 4.0,
                flees_player: true,
            },
        }
    }
}

impl fmt::Display for GhostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GhostKind::Aggressive => write!(f, "aggressive"),
            GhostKind::Passive => write!(f, "passive"),
        }
    }
}

/// Per-instance tuning. The movement collaborator reads the chase fields;
/// the engine reads `attack_radius` and `attack_probability`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Behaviour {
    pub follow_player_chance: f64,
    pub follow_waypoint_chance: f64,
    pub attack_radius: f64,
    /// Base chance this branch lands an attack, before weighting by occupation.
    pub attack_probability: f64,
    pub detect_player_radius: f64,
    /// Passive branches walk away from the player instead of towards it.
    pub flees_player: bool,
}

/// Per-ghost action rates, scaled by difficulty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostParameters {
    /// Chance per tick that the ghost attempts an attack.
    pub attack_probability: f64,
    /// Chance per tick (when not attacking) that a branch lays a trap.
    pub trap_probability: f64,
    pub difficulty: u32,
    pub max_difficulty: u32,
    base_attack_probability: f64,
    base_trap_probability: f64,
}

impl GhostParameters {
    pub fn new(base_attack_probability: f64, base_trap_probability: f64, max_difficulty: u32, difficulty: u32) -> Self {
        let mut parameters = Self {
            attack_probability: base_attack_probability,
            trap_probability: base_trap_probability,
            difficulty,
            max_difficulty: max_difficulty.max(1),
            base_attack_probability,
            base_trap_probability,
        };
        parameters.change_difficulty(difficulty);
        parameters
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.attack_probability, config.trap_probability, config.max_difficulty, config.difficulty)
    }

    /// Rescales both rates by `difficulty / max_difficulty`.
    pub fn change_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty.min(self.max_difficulty);
        let scale = f64::from(self.difficulty) / f64::from(self.max_difficulty);
        self.attack_probability = self.base_attack_probability * scale;
        self.trap_probability = self.base_trap_probability * scale;
    }
}
