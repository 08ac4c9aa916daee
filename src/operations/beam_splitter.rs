// src/operations/beam_splitter.rs

use super::SplitterOrientation;
use crate::core::constants::BEAM_SPLITTER_ANGLE;
use crate::core::{AmplitudeVector, EngineError, state_space_size};
use num_complex::Complex;
use num_traits::{One, Zero};

/// A fixed 50/50 two-mode unitary on the truncated Fock space.
///
/// `U = exp(i·θ·G)` with `θ = π/4` and generator
/// `G = e^{iφ}·a†⊗b + e^{-iφ}·a⊗b†`, where `a`, `b` are ladder operators
/// truncated at the occupation cutoff `D`. `G` is Hermitian even after
/// truncation, so `U` is exactly unitary. The `D²×D²` matrix is computed once
/// at construction.
///
/// Basis order on the pair is big-endian: `|n_a, n_b>` sits at `n_a·D + n_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamSplitter {
    cutoff: usize,
    max_state_space: usize,
    /// Row-major `(D²)×(D²)` matrix.
    matrix: Vec<Complex<f64>>,
}

impl BeamSplitter {
    /// Builds the splitter for generator phase `phase` (radians).
    pub fn new(cutoff: usize, phase: f64, max_state_space: usize) -> Result<Self, EngineError> {
        if cutoff < 2 {
            return Err(EngineError::InvalidCutoff { cutoff });
        }
        let pair_dim = cutoff * cutoff;
        if pair_dim > max_state_space {
            return Err(EngineError::StateSpaceOverflow { requested: pair_dim, ceiling: max_state_space });
        }
        let generator = mixing_generator(cutoff, phase);
        let exponent: Vec<Complex<f64>> = generator
            .iter()
            .map(|g| Complex::i() * BEAM_SPLITTER_ANGLE * *g)
            .collect();
        let matrix = expm(&exponent, pair_dim);
        Ok(Self { cutoff, max_state_space, matrix })
    }

    /// Builds the splitter used by tiles of the given orientation.
    pub fn for_orientation(
        cutoff: usize,
        orientation: SplitterOrientation,
        max_state_space: usize,
    ) -> Result<Self, EngineError> {
        Self::new(cutoff, orientation.mixing_phase(), max_state_space)
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    pub fn max_state_space(&self) -> usize {
        self.max_state_space
    }

    /// Row-major `(D²)×(D²)` matrix of the operator.
    pub fn matrix(&self) -> &[Complex<f64>] {
        &self.matrix
    }

    /// The inverse operator `U†`.
    pub fn inverse(&self) -> BeamSplitter {
        let n = self.cutoff * self.cutoff;
        let mut matrix = vec![Complex::zero(); n * n];
        for row in 0..n {
            for col in 0..n {
                matrix[col * n + row] = self.matrix[row * n + col].conj();
            }
        }
        BeamSplitter { cutoff: self.cutoff, max_state_space: self.max_state_space, matrix }
    }

    /// Would a rank-`rank` vector fit under the ceiling?
    pub fn admits_rank(&self, rank: usize) -> bool {
        state_space_size(self.cutoff, rank).is_some_and(|dim| dim <= self.max_state_space)
    }

    /// Applies the splitter.
    ///
    /// * `mode_b == None`: a vacuum mode is appended (new index `rank`) and the
    ///   operator acts on `(mode_a, rank)`. The result has rank `rank + 1`.
    /// * `mode_b == Some(b)`: the operator acts on the existing pair `(mode_a, b)`.
    ///
    /// Factor order of the result matches the input (plus the appended mode),
    /// so registry indices keep their meaning. The result is normalized.
    ///
    /// # Errors
    /// * `StateSpaceOverflow` if the grown vector would exceed the ceiling.
    /// * `InvalidMode` for out-of-range or identical modes.
    /// * `DimensionMismatch` if the vector uses a different cutoff.
    pub fn apply(
        &self,
        vector: &AmplitudeVector,
        mode_a: usize,
        mode_b: Option<usize>,
    ) -> Result<AmplitudeVector, EngineError> {
        if vector.cutoff() != self.cutoff {
            return Err(EngineError::DimensionMismatch { expected: self.cutoff, actual: vector.cutoff() });
        }
        if mode_a >= vector.rank() {
            return Err(EngineError::InvalidMode { index: mode_a, rank: vector.rank() });
        }
        match mode_b {
            None => {
                let new_rank = vector.rank() + 1;
                let requested = state_space_size(self.cutoff, new_rank).unwrap_or(usize::MAX);
                if requested > self.max_state_space {
                    return Err(EngineError::StateSpaceOverflow { requested, ceiling: self.max_state_space });
                }
                let extended = vector.extend_with_vacuum_mode()?;
                self.apply_pair(&extended, mode_a, new_rank - 1)
            }
            Some(mode_b) => self.apply_pair(vector, mode_a, mode_b),
        }
    }

    fn apply_pair(
        &self,
        vector: &AmplitudeVector,
        mode_a: usize,
        mode_b: usize,
    ) -> Result<AmplitudeVector, EngineError> {
        let rank = vector.rank();
        if mode_b >= rank {
            return Err(EngineError::InvalidMode { index: mode_b, rank });
        }
        if mode_a == mode_b {
            return Err(EngineError::InvalidMode { index: mode_b, rank });
        }

        // Bring (a, b) to the last two factors, keeping the others in order.
        let mut order: Vec<usize> = (0..rank).filter(|m| *m != mode_a && *m != mode_b).collect();
        order.push(mode_a);
        order.push(mode_b);
        let mut work = vector.permute_modes(&order)?;

        let block = self.cutoff * self.cutoff;
        let mut scratch = vec![Complex::zero(); block];
        for chunk in work.amplitudes_mut().chunks_exact_mut(block) {
            for (row, out) in scratch.iter_mut().enumerate() {
                let coeffs = &self.matrix[row * block..(row + 1) * block];
                *out = coeffs.iter().zip(chunk.iter()).map(|(u, psi)| *u * *psi).sum();
            }
            chunk.copy_from_slice(&scratch);
        }

        let mut restore = vec![0; rank];
        for (position, &mode) in order.iter().enumerate() {
            restore[mode] = position;
        }
        let mut result = work.permute_modes(&restore)?;
        result.normalize()?;
        Ok(result)
    }
}

/// `e^{iφ}·a†⊗b + e^{-iφ}·a⊗b†` on the truncated pair space.
fn mixing_generator(cutoff: usize, phase: f64) -> Vec<Complex<f64>> {
    let n = cutoff * cutoff;
    let forward = Complex::from_polar(1.0, phase);
    let backward = forward.conj();
    let mut g = vec![Complex::zero(); n * n];
    for na in 0..cutoff {
        for nb in 0..cutoff {
            let col = na * cutoff + nb;
            if na + 1 < cutoff && nb >= 1 {
                let row = (na + 1) * cutoff + (nb - 1);
                g[row * n + col] += forward * (((na + 1) * nb) as f64).sqrt();
            }
            if na >= 1 && nb + 1 < cutoff {
                let row = (na - 1) * cutoff + (nb + 1);
                g[row * n + col] += backward * ((na * (nb + 1)) as f64).sqrt();
            }
        }
    }
    g
}

fn matmul(a: &[Complex<f64>], b: &[Complex<f64>], n: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::zero(); n * n];
    for i in 0..n {
        for k in 0..n {
            let aik = a[i * n + k];
            if aik.is_zero() {
                continue;
            }
            for j in 0..n {
                out[i * n + j] += aik * b[k * n + j];
            }
        }
    }
    out
}

fn one_norm(a: &[Complex<f64>], n: usize) -> f64 {
    (0..n)
        .map(|col| (0..n).map(|row| a[row * n + col].norm()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Matrix exponential by scaling and squaring with a Taylor core.
fn expm(a: &[Complex<f64>], n: usize) -> Vec<Complex<f64>> {
    let mut squarings = 0;
    let mut norm = one_norm(a, n);
    while norm > 0.5 {
        norm /= 2.0;
        squarings += 1;
    }
    let scale = 1.0 / f64::powi(2.0, squarings);
    let scaled: Vec<Complex<f64>> = a.iter().map(|x| *x * scale).collect();

    let mut identity = vec![Complex::zero(); n * n];
    for i in 0..n {
        identity[i * n + i] = Complex::one();
    }
    let mut result = identity.clone();
    let mut term = identity;
    for k in 1..=30 {
        term = matmul(&term, &scaled, n);
        let inv_k = 1.0 / k as f64;
        for x in term.iter_mut() {
            *x *= inv_k;
        }
        for (r, t) in result.iter_mut().zip(&term) {
            *r += *t;
        }
        if one_norm(&term, n) < 1e-18 {
            break;
        }
    }
    for _ in 0..squarings {
        result = matmul(&result, &result, n);
    }
    result
}
