// src/operations/mod.rs

//! Map objects that act on a ghost's amplitude vector and the beam-splitter
//! operator they trigger.
//!
//! A splitter tile is a diagonal mirror. Its orientation decides two things:
//! which pair of incoming directions counts as two branches meeting from
//! opposite sides, and the phase of the 50/50 mixing it applies.

mod beam_splitter;

pub use beam_splitter::BeamSplitter;

use crate::core::{EngineError, Vec2};
use serde::Deserialize;
use std::fmt;

/// The two diagonal mirror axes a splitter tile can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum SplitterOrientation {
    /// Axis at 45° to the X axis.
    #[serde(rename = "45")]
    Diagonal45,
    /// Axis at 125° to the X axis.
    #[serde(rename = "125")]
    Diagonal125,
}

impl SplitterOrientation {
    /// Phase `φ` of the mixing generator for this tile type.
    pub fn mixing_phase(self) -> f64 {
        match self {
            SplitterOrientation::Diagonal45 => 0.0,
            SplitterOrientation::Diagonal125 => std::f64::consts::FRAC_PI_2,
        }
    }

    /// Sum of two last-move vectors that marks a recombination, up to sign.
    pub fn coincidence_signature(self) -> Vec2 {
        match self {
            SplitterOrientation::Diagonal45 => Vec2::new(1.0, -1.0),
            SplitterOrientation::Diagonal125 => Vec2::new(1.0, 1.0),
        }
    }

    /// Does `sum` (of two last-moves) match `±signature`?
    pub fn is_coincidence(self, sum: Vec2, tolerance: f64) -> bool {
        let signature = self.coincidence_signature();
        sum.approx_eq(signature, tolerance) || sum.approx_eq(-signature, tolerance)
    }

    /// Direction of the branch reflected off this tile.
    pub fn reflect(self, last_move: Vec2) -> Vec2 {
        match self {
            SplitterOrientation::Diagonal45 => -last_move.swapped(),
            SplitterOrientation::Diagonal125 => last_move.swapped(),
        }
    }
}

impl fmt::Display for SplitterOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitterOrientation::Diagonal45 => write!(f, "45°"),
            SplitterOrientation::Diagonal125 => write!(f, "125°"),
        }
    }
}

/// A static splitter tile on the map.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SplitterTile {
    pub position: Vec2,
    pub orientation: SplitterOrientation,
}

impl SplitterTile {
    pub fn new(position: Vec2, orientation: SplitterOrientation) -> Self {
        Self { position, orientation }
    }
}

/// One precomputed beam splitter per orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamSplitters {
    diagonal_45: BeamSplitter,
    diagonal_125: BeamSplitter,
}

impl BeamSplitters {
    pub fn new(cutoff: usize, max_state_space: usize) -> Result<Self, EngineError> {
        Ok(Self {
            diagonal_45: BeamSplitter::for_orientation(cutoff, SplitterOrientation::Diagonal45, max_state_space)?,
            diagonal_125: BeamSplitter::for_orientation(cutoff, SplitterOrientation::Diagonal125, max_state_space)?,
        })
    }

    pub fn get(&self, orientation: SplitterOrientation) -> &BeamSplitter {
        match orientation {
            SplitterOrientation::Diagonal45 => &self.diagonal_45,
            SplitterOrientation::Diagonal125 => &self.diagonal_125,
        }
    }

    pub fn cutoff(&self) -> usize {
        self.diagonal_45.cutoff()
    }
}
