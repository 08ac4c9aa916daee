//! Engine-wide constants.

/// Default per-mode occupation cutoff `D`.
pub const DEFAULT_OCCUPATION_CUTOFF: usize = 4;

/// Default ceiling on the number of complex amplitudes (`D^n`) a ghost may hold.
pub const DEFAULT_MAX_STATE_SPACE: usize = 4096;

/// Squared norms below this are treated as zero.
pub const NORM_EPSILON: f64 = 1e-12;

/// Allowed deviation of the squared norm from 1.0 for a normalized vector.
pub const NORM_TOLERANCE: f64 = 1e-9;

/// Default tolerance when deciding that two positions are the same cell.
pub const DEFAULT_POSITION_TOLERANCE: f64 = 1e-2;

/// Mixing angle of the 50/50 beam splitter.
pub const BEAM_SPLITTER_ANGLE: f64 = std::f64::consts::FRAC_PI_4;
