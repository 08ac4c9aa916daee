// src/simulation/measurement.rs

//! Born-rule sampling over the full joint occupation space.

use crate::core::constants::NORM_EPSILON;
use crate::core::{AmplitudeVector, EngineError};
use rand::{Rng, RngExt};

/// Samples one joint basis state `k` with probability `|c_k|²` and returns
/// its occupation tuple (one count per mode).
///
/// The distribution is renormalized by its total, so a slightly
/// unnormalized vector still samples correctly.
///
/// # Errors
/// `EngineError::DegenerateState` if every amplitude is numerically zero.
pub fn sample_joint_outcome<R: Rng + ?Sized>(
    state: &AmplitudeVector,
    rng: &mut R,
) -> Result<Vec<usize>, EngineError> {
    let probabilities = state.probabilities();
    let total: f64 = probabilities.iter().sum();
    if total < NORM_EPSILON || !total.is_finite() {
        return Err(EngineError::DegenerateState { norm_sqr: total });
    }

    let p_sample = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    // Fallback for p_sample landing on total through rounding: the last
    // outcome with any mass.
    let mut chosen = probabilities.iter().rposition(|p| *p > 0.0).unwrap_or(0);
    for (index, p) in probabilities.iter().enumerate() {
        if *p <= 0.0 {
            continue;
        }
        cumulative += p;
        if p_sample < cumulative {
            chosen = index;
            break;
        }
    }
    Ok(state.occupations(chosen))
}

/// Modes measured present (non-zero occupation), in increasing order.
pub fn surviving_modes(occupations: &[usize]) -> Vec<usize> {
    occupations
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .map(|(mode, _)| mode)
        .collect()
}
