// src/core/state.rs

use super::constants::{NORM_EPSILON, NORM_TOLERANCE};
use super::error::EngineError;
use num_complex::Complex;
use num_traits::Zero;
use std::fmt;

/// The joint state of every branch of one quantum ghost.
///
/// Amplitudes are indexed by an occupation tuple `(n_0, .., n_{rank-1})`, one
/// count per mode, each in `0..cutoff`. Storage is a flat vector of length
/// `cutoff^rank` using big-endian encoding: mode 0 is the most significant
/// digit.
///
/// Outside of an operator call the vector is normalized. Operators that
/// change the rank return a new vector; the owner is responsible for keeping
/// the mode registry in step (see `simulation::engine::Superposition`).
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeVector {
    cutoff: usize,
    rank: usize,
    amplitudes: Vec<Complex<f64>>,
}

/// `cutoff^rank`, or `None` when it does not fit in `usize`.
pub fn state_space_size(cutoff: usize, rank: usize) -> Option<usize> {
    u32::try_from(rank).ok().and_then(|r| cutoff.checked_pow(r))
}

impl AmplitudeVector {
    /// The rank-1 state "occupation 1": a freshly spawned ghost.
    pub fn single_occupation(cutoff: usize) -> Result<Self, EngineError> {
        Self::basis(cutoff, &[1])
    }

    /// The rank-0 state left behind once every branch is gone.
    pub fn empty(cutoff: usize) -> Result<Self, EngineError> {
        Self::basis(cutoff, &[])
    }

    /// The pure basis state with the given occupations.
    pub fn basis(cutoff: usize, occupations: &[usize]) -> Result<Self, EngineError> {
        check_cutoff(cutoff)?;
        let dim = state_space_size(cutoff, occupations.len()).ok_or(
            EngineError::StateSpaceOverflow { requested: usize::MAX, ceiling: usize::MAX },
        )?;
        if let Some((index, _)) = occupations.iter().enumerate().find(|(_, n)| **n >= cutoff) {
            return Err(EngineError::InvalidMode { index, rank: occupations.len() });
        }
        let mut amplitudes = vec![Complex::zero(); dim];
        amplitudes[encode(cutoff, occupations)] = Complex::new(1.0, 0.0);
        Ok(Self { cutoff, rank: occupations.len(), amplitudes })
    }

    /// Builds a vector from raw amplitudes. The data is taken as is; call
    /// `normalize` if it is not already unit length.
    pub fn from_amplitudes(
        cutoff: usize,
        rank: usize,
        amplitudes: Vec<Complex<f64>>,
    ) -> Result<Self, EngineError> {
        check_cutoff(cutoff)?;
        let expected = state_space_size(cutoff, rank).ok_or(EngineError::StateSpaceOverflow {
            requested: usize::MAX,
            ceiling: usize::MAX,
        })?;
        if amplitudes.len() != expected {
            return Err(EngineError::DimensionMismatch { expected, actual: amplitudes.len() });
        }
        Ok(Self { cutoff, rank, amplitudes })
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    /// Number of modes (tensor factors).
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of stored amplitudes, `cutoff^rank`.
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn amplitudes(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    pub(crate) fn amplitudes_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.amplitudes
    }

    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Born-rule probability of every basis state, in storage order.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|c| c.norm_sqr()).collect()
    }

    pub fn is_normalized(&self) -> bool {
        (self.norm_sqr() - 1.0).abs() <= NORM_TOLERANCE
    }

    /// Decodes a flat index into its occupation tuple.
    pub fn occupations(&self, index: usize) -> Vec<usize> {
        decode(self.cutoff, self.rank, index)
    }

    /// Flat index of an occupation tuple.
    pub fn index_of(&self, occupations: &[usize]) -> Result<usize, EngineError> {
        if occupations.len() != self.rank {
            return Err(EngineError::DimensionMismatch {
                expected: self.rank,
                actual: occupations.len(),
            });
        }
        if let Some((index, _)) = occupations.iter().enumerate().find(|(_, n)| **n >= self.cutoff) {
            return Err(EngineError::InvalidMode { index, rank: self.rank });
        }
        Ok(encode(self.cutoff, occupations))
    }

    /// Component of the state in which `mode` holds exactly `occupation`.
    ///
    /// The named mode is contracted away, so the returned vector has rank
    /// `rank - 1`; it is left unnormalized. The second value is its squared
    /// norm, i.e. the probability of finding that occupation.
    pub fn project(&self, mode: usize, occupation: usize) -> Result<(AmplitudeVector, f64), EngineError> {
        self.check_mode(mode)?;
        if occupation >= self.cutoff {
            return Err(EngineError::InvalidMode { index: mode, rank: self.rank });
        }
        let d = self.cutoff;
        let stride = d.pow((self.rank - 1 - mode) as u32);
        let new_dim = self.dim() / d;

        let mut amplitudes = Vec::with_capacity(new_dim);
        for new_idx in 0..new_dim {
            let high = new_idx / stride;
            let low = new_idx % stride;
            amplitudes.push(self.amplitudes[high * stride * d + occupation * stride + low]);
        }
        let component = AmplitudeVector { cutoff: d, rank: self.rank - 1, amplitudes };
        let probability = component.norm_sqr();
        Ok((component, probability))
    }

    /// Probability that `mode` holds exactly `occupation`.
    pub fn occupation_probability(&self, mode: usize, occupation: usize) -> Result<f64, EngineError> {
        self.project(mode, occupation).map(|(_, p)| p)
    }

    /// Rescales to unit norm.
    ///
    /// # Errors
    /// `EngineError::DegenerateState` when the norm is numerically zero; the
    /// vector is left untouched in that case.
    pub fn normalize(&mut self) -> Result<(), EngineError> {
        let norm_sqr = self.norm_sqr();
        if norm_sqr < NORM_EPSILON || !norm_sqr.is_finite() {
            return Err(EngineError::DegenerateState { norm_sqr });
        }
        let scale = 1.0 / norm_sqr.sqrt();
        for c in &mut self.amplitudes {
            *c *= scale;
        }
        Ok(())
    }

    /// Tensor product with a vacuum ("occupation 0") mode appended at the end.
    pub fn extend_with_vacuum_mode(&self) -> Result<AmplitudeVector, EngineError> {
        let d = self.cutoff;
        let dim = self.dim().checked_mul(d).ok_or(EngineError::StateSpaceOverflow {
            requested: usize::MAX,
            ceiling: usize::MAX,
        })?;
        let mut amplitudes = vec![Complex::zero(); dim];
        for (idx, c) in self.amplitudes.iter().enumerate() {
            amplitudes[idx * d] = *c;
        }
        Ok(AmplitudeVector { cutoff: d, rank: self.rank + 1, amplitudes })
    }

    /// Keeps only the modes listed in `surviving` (strictly increasing old
    /// indices); every other mode is projected onto occupation 0 and removed.
    /// Surviving modes keep their relative order. The result is not
    /// renormalized.
    pub fn restrict_to_subset(&self, surviving: &[usize]) -> Result<AmplitudeVector, EngineError> {
        for pair in surviving.windows(2) {
            if pair[0] >= pair[1] {
                return Err(EngineError::InvalidMode { index: pair[1], rank: self.rank });
            }
        }
        if let Some(&last) = surviving.last() {
            self.check_mode(last)?;
        }

        let mut restricted = self.clone();
        // Highest first so lower mode indices stay valid while contracting.
        for mode in (0..self.rank).rev() {
            if surviving.binary_search(&mode).is_err() {
                restricted = restricted.project(mode, 0)?.0;
            }
        }
        Ok(restricted)
    }

    /// Reorders tensor factors: mode `k` of the result is mode `order[k]` of
    /// `self`. `order` must be a permutation of `0..rank`.
    pub(crate) fn permute_modes(&self, order: &[usize]) -> Result<AmplitudeVector, EngineError> {
        if order.len() != self.rank {
            return Err(EngineError::DimensionMismatch { expected: self.rank, actual: order.len() });
        }
        let mut seen = vec![false; self.rank];
        for &m in order {
            self.check_mode(m)?;
            if seen[m] {
                return Err(EngineError::InvalidMode { index: m, rank: self.rank });
            }
            seen[m] = true;
        }

        let d = self.cutoff;
        let old_strides: Vec<usize> = (0..self.rank).map(|m| d.pow((self.rank - 1 - m) as u32)).collect();
        let mut amplitudes = vec![Complex::zero(); self.dim()];
        for (new_idx, slot) in amplitudes.iter_mut().enumerate() {
            let digits = decode(d, self.rank, new_idx);
            let old_idx: usize = digits
                .iter()
                .zip(order)
                .map(|(digit, &old_mode)| digit * old_strides[old_mode])
                .sum();
            *slot = self.amplitudes[old_idx];
        }
        Ok(AmplitudeVector { cutoff: d, rank: self.rank, amplitudes })
    }

    fn check_mode(&self, mode: usize) -> Result<(), EngineError> {
        if mode >= self.rank {
            Err(EngineError::InvalidMode { index: mode, rank: self.rank })
        } else {
            Ok(())
        }
    }
}

fn check_cutoff(cutoff: usize) -> Result<(), EngineError> {
    if cutoff < 2 {
        Err(EngineError::InvalidCutoff { cutoff })
    } else {
        Ok(())
    }
}

fn encode(cutoff: usize, occupations: &[usize]) -> usize {
    occupations.iter().fold(0, |acc, n| acc * cutoff + n)
}

fn decode(cutoff: usize, rank: usize, mut index: usize) -> Vec<usize> {
    let mut digits = vec![0; rank];
    for slot in digits.iter_mut().rev() {
        *slot = index % cutoff;
        index /= cutoff;
    }
    digits
}

impl fmt::Display for AmplitudeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amplitudes(D={}, n={})[", self.cutoff, self.rank)?;
        let mut first = true;
        for (idx, c) in self.amplitudes.iter().enumerate() {
            if c.norm_sqr() < NORM_EPSILON {
                continue;
            }
            let occ: Vec<String> = self.occupations(idx).iter().map(|n| n.to_string()).collect();
            write!(f, "{}{:.4}|{}>", if first { "" } else { " + " }, c, occ.join(","))?;
            first = false;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TOL: f64 = 1e-12;

    fn c(re: f64) -> Complex<f64> {
        Complex::new(re, 0.0)
    }

    #[test]
    fn single_occupation_is_normalized_rank_one() -> Result<(), EngineError> {
        let v = AmplitudeVector::single_occupation(4)?;
        assert_eq!(v.rank(), 1);
        assert_eq!(v.dim(), 4);
        assert_eq!(v.amplitudes()[1], c(1.0));
        assert!(v.is_normalized());
        Ok(())
    }

    #[test]
    fn rejects_small_cutoff() {
        assert_eq!(
            AmplitudeVector::single_occupation(1),
            Err(EngineError::InvalidCutoff { cutoff: 1 })
        );
    }

    #[test]
    fn big_endian_encoding() -> Result<(), EngineError> {
        let v = AmplitudeVector::basis(3, &[1, 2])?;
        assert_eq!(v.index_of(&[1, 2])?, 5);
        assert_eq!(v.amplitudes()[5], c(1.0));
        assert_eq!(v.occupations(5), vec![1, 2]);
        Ok(())
    }

    #[test]
    fn project_contracts_the_named_mode() -> Result<(), EngineError> {
        // (|1,0> + |0,1>) / sqrt(2), D = 2: indices 2 and 1.
        let v = AmplitudeVector::from_amplitudes(
            2,
            2,
            vec![c(0.0), c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2), c(0.0)],
        )?;
        let (component, p) = v.project(0, 0)?;
        assert_eq!(component.rank(), 1);
        assert!((p - 0.5).abs() < TOL);
        // Remaining mode 1 must hold occupation 1.
        assert!((component.amplitudes()[1].re - FRAC_1_SQRT_2).abs() < TOL);
        assert!(component.amplitudes()[0].norm_sqr() < TOL);

        let (component, p) = v.project(1, 0)?;
        assert!((p - 0.5).abs() < TOL);
        assert!((component.amplitudes()[1].re - FRAC_1_SQRT_2).abs() < TOL);
        Ok(())
    }

    #[test]
    fn project_does_not_mutate() -> Result<(), EngineError> {
        let v = AmplitudeVector::basis(4, &[1, 0, 2])?;
        let before = v.clone();
        let _ = v.project(2, 2)?;
        assert_eq!(v, before);
        Ok(())
    }

    #[test]
    fn normalize_zero_vector_is_degenerate() -> Result<(), EngineError> {
        let mut v = AmplitudeVector::from_amplitudes(2, 1, vec![c(0.0), c(0.0)])?;
        assert!(matches!(v.normalize(), Err(EngineError::DegenerateState { .. })));
        Ok(())
    }

    #[test]
    fn normalize_rescales() -> Result<(), EngineError> {
        let mut v = AmplitudeVector::from_amplitudes(2, 1, vec![c(3.0), c(4.0)])?;
        v.normalize()?;
        assert!((v.amplitudes()[0].re - 0.6).abs() < TOL);
        assert!((v.amplitudes()[1].re - 0.8).abs() < TOL);
        Ok(())
    }

    #[test]
    fn vacuum_extension_appends_zero_occupation() -> Result<(), EngineError> {
        let v = AmplitudeVector::single_occupation(4)?;
        let extended = v.extend_with_vacuum_mode()?;
        assert_eq!(extended.rank(), 2);
        assert_eq!(extended.dim(), 16);
        assert_eq!(extended.amplitudes()[extended.index_of(&[1, 0])?], c(1.0));
        assert!(extended.is_normalized());
        Ok(())
    }

    #[test]
    fn restrict_keeps_relative_order() -> Result<(), EngineError> {
        // |2,0,1> restricted to modes {0, 2} -> |2,1>.
        let v = AmplitudeVector::basis(3, &[2, 0, 1])?;
        let r = v.restrict_to_subset(&[0, 2])?;
        assert_eq!(r.rank(), 2);
        assert_eq!(r.amplitudes()[r.index_of(&[2, 1])?], c(1.0));
        assert!(r.is_normalized());
        Ok(())
    }

    #[test]
    fn restrict_drops_components_with_occupied_removed_modes() -> Result<(), EngineError> {
        // |1,1> restricted to {0}: mode 1 is occupied, nothing survives.
        let v = AmplitudeVector::basis(2, &[1, 1])?;
        let r = v.restrict_to_subset(&[0])?;
        assert!(r.norm_sqr() < TOL);
        Ok(())
    }

    #[test]
    fn restrict_to_nothing_yields_rank_zero() -> Result<(), EngineError> {
        let v = AmplitudeVector::basis(2, &[0, 0])?;
        let r = v.restrict_to_subset(&[])?;
        assert_eq!(r.rank(), 0);
        assert_eq!(r.dim(), 1);
        assert!((r.norm_sqr() - 1.0).abs() < TOL);
        Ok(())
    }

    #[test]
    fn restrict_rejects_unsorted_indices() -> Result<(), EngineError> {
        let v = AmplitudeVector::basis(2, &[1, 0, 0])?;
        assert!(v.restrict_to_subset(&[2, 0]).is_err());
        assert!(v.restrict_to_subset(&[0, 3]).is_err());
        Ok(())
    }

    #[test]
    fn permute_moves_factors() -> Result<(), EngineError> {
        let v = AmplitudeVector::basis(4, &[1, 2, 3])?;
        let p = v.permute_modes(&[2, 0, 1])?;
        assert_eq!(p.amplitudes()[p.index_of(&[3, 1, 2])?], c(1.0));
        // Inverse of [2, 0, 1] is [1, 2, 0].
        let back = p.permute_modes(&[1, 2, 0])?;
        assert_eq!(back, v);
        Ok(())
    }
}
