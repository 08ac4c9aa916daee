// src/validation/mod.rs

//! Invariant checks on amplitude vectors and their registries.

use crate::core::constants::NORM_TOLERANCE;
use crate::core::{AmplitudeVector, EngineError};

/// Sum of Born-rule probabilities over every joint occupation assignment.
pub fn total_probability(state: &AmplitudeVector) -> f64 {
    state.probabilities().iter().sum()
}

/// Checks that the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `state` - The `AmplitudeVector` to check.
/// * `tolerance` - Allowed deviation from 1.0. Defaults to `NORM_TOLERANCE`.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(EngineError::NotNormalized)` otherwise.
pub fn check_normalization(state: &AmplitudeVector, tolerance: Option<f64>) -> Result<(), EngineError> {
    let tolerance = tolerance.unwrap_or(NORM_TOLERANCE);
    let norm_sqr = total_probability(state);
    if (norm_sqr - 1.0).abs() > tolerance {
        Err(EngineError::NotNormalized { norm_sqr, tolerance })
    } else {
        Ok(())
    }
}

/// Registry length must equal vector rank.
///
/// A mismatch is a broken engine contract: it panics in debug builds and is
/// returned as `EngineError::RegistryMismatch` otherwise.
pub fn check_registry_consistency(registry_len: usize, rank: usize) -> Result<(), EngineError> {
    debug_assert_eq!(registry_len, rank, "mode registry and amplitude vector out of step");
    if registry_len != rank {
        return Err(EngineError::RegistryMismatch { registry: registry_len, rank });
    }
    Ok(())
}

/// Runs both checks. Used after every public operator on a superposition.
pub fn validate_state(state: &AmplitudeVector, registry_len: usize, norm_tolerance: Option<f64>) -> Result<(), EngineError> {
    check_registry_consistency(registry_len, state.rank())?;
    check_normalization(state, norm_tolerance)?;
    Ok(())
}
