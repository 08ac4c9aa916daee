//! Error handling logic

use std::fmt;
use thiserror::Error;

/// Identifier of one concrete ghost instance (one branch of a superposition).
/// Stable for the lifetime of the instance and unique within a `Simulator`,
/// so render and physics collaborators can key their own data on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ghost#{}", self.0)
    }
}

/// Identifier of one quantum ghost (one superposition) in a `Simulator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GhostId(pub u64);

impl fmt::Display for GhostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QGhost#{}", self.0)
    }
}

/// Failures raised by the superposition engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Renormalization of a vector whose norm is numerically zero.
    /// The branch (or the whole ghost) has no probability mass left.
    #[error("degenerate state: cannot normalize a vector with squared norm {norm_sqr:e}")]
    DegenerateState {
        /// Squared norm that was found.
        norm_sqr: f64,
    },

    /// A vector expected to be normalized is not.
    #[error("state not normalized: squared norm {norm_sqr} (tolerance {tolerance:e})")]
    NotNormalized {
        /// Squared norm that was found.
        norm_sqr: f64,
        /// Allowed deviation from 1.0.
        tolerance: f64,
    },

    /// The requested rank would need more amplitudes than the engine allows.
    #[error("state space overflow: {requested} amplitudes requested, ceiling is {ceiling}")]
    StateSpaceOverflow {
        /// Number of amplitudes the operation would have produced.
        requested: usize,
        /// Configured ceiling.
        ceiling: usize,
    },

    /// Registry length and vector rank disagree after an operation.
    #[error("registry mismatch: {registry} registry entries but vector rank {rank}")]
    RegistryMismatch {
        /// Number of registry entries.
        registry: usize,
        /// Rank of the amplitude vector.
        rank: usize,
    },

    /// A mode index outside `0..rank` was named.
    #[error("invalid mode {index} for a vector of rank {rank}")]
    InvalidMode {
        /// Offending mode index.
        index: usize,
        /// Rank of the vector.
        rank: usize,
    },

    /// The per-mode occupation cutoff must be at least 2.
    #[error("invalid occupation cutoff {cutoff}: must be at least 2")]
    InvalidCutoff {
        /// Offending cutoff.
        cutoff: usize,
    },

    /// Raw amplitude data does not have `cutoff^rank` entries.
    #[error("dimension mismatch: expected {expected} amplitudes, got {actual}")]
    DimensionMismatch {
        /// `cutoff^rank`.
        expected: usize,
        /// Provided length.
        actual: usize,
    },

    /// An instance id that is not (or no longer) in the registry.
    #[error("unknown ghost instance {0}")]
    UnknownInstance(InstanceId),
}
