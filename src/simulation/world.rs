// src/simulation/world.rs

//! Boundary types supplied by the game's collaborators each tick.

use crate::core::Vec2;
use crate::operations::SplitterTile;

/// What the engine needs to know about the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    pub position: Vec2,
    /// Radius of the player's measurement action.
    pub measure_radius: f64,
}

impl PlayerView {
    pub fn new(position: Vec2, measure_radius: f64) -> Self {
        Self { position, measure_radius }
    }
}

/// A projectile fired by the player. Consumed (marked dead) on its first hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub position: Vec2,
    pub alive: bool,
}

impl Shot {
    pub fn new(position: Vec2) -> Self {
        Self { position, alive: true }
    }
}

/// A trap laid by a ghost branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trap {
    pub position: Vec2,
}

/// Everything the map and player controller hand over for one tick.
#[derive(Debug)]
pub struct TickContext<'a> {
    pub player: PlayerView,
    pub splitters: &'a [SplitterTile],
    pub shots: &'a mut [Shot],
    pub traps: &'a mut Vec<Trap>,
}
