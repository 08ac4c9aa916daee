// src/simulation/engine.rs

use super::measurement::{sample_joint_outcome, surviving_modes};
use super::registry::{GhostInstance, ModeRegistry};
use crate::core::{AmplitudeVector, EngineError};
use crate::operations::BeamSplitter;
use crate::validation::validate_state;
use rand::Rng;

/// The amplitude vector of one quantum ghost together with the registry of
/// instances bound to its modes.
///
/// Every method that changes the rank changes the registry length in the
/// same call, and only after the new vector has been computed successfully,
/// so a failed operation leaves both untouched. After each mutation the pair
/// is checked: `registry.len() == state.rank()` and `‖state‖ = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Superposition {
    state: AmplitudeVector,
    registry: ModeRegistry,
}

/// Instances taken out of a superposition by one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub removed: Vec<GhostInstance>,
    /// True when nothing survived: the registry is now empty.
    pub destroyed: bool,
}

/// Result of a measurement on a superposition.
#[derive(Debug, Clone, PartialEq)]
pub enum Collapse {
    /// A single branch: nothing to collapse.
    Unchanged,
    Collapsed {
        /// Sampled occupation of every mode, indexed by pre-collapse mode.
        outcome: Vec<usize>,
        removal: Removal,
    },
}

impl Superposition {
    /// A fresh ghost: one instance in the rank-1 state "occupation 1".
    pub(crate) fn new(cutoff: usize, first: GhostInstance) -> Result<Self, EngineError> {
        let mut registry = ModeRegistry::default();
        registry.push(first);
        let superposition = Self { state: AmplitudeVector::single_occupation(cutoff)?, registry };
        superposition.verify()?;
        Ok(superposition)
    }

    pub fn state(&self) -> &AmplitudeVector {
        &self.state
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ModeRegistry {
        &mut self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Probability that `mode` is occupied at all.
    pub fn occupied_probability(&self, mode: usize) -> Result<f64, EngineError> {
        Ok(1.0 - self.state.occupation_probability(mode, 0)?)
    }

    /// Splits `mode` into a new branch bound to `branch`, appended as the
    /// last mode. Returns the new mode index.
    ///
    /// # Errors
    /// `StateSpaceOverflow` when the grown vector would exceed the splitter's
    /// ceiling; the superposition is unchanged.
    pub(crate) fn split(
        &mut self,
        splitter: &BeamSplitter,
        mode: usize,
        branch: GhostInstance,
    ) -> Result<usize, EngineError> {
        let next = splitter.apply(&self.state, mode, None)?;
        self.state = next;
        self.registry.push(branch);
        self.verify()?;
        Ok(self.registry.len() - 1)
    }

    /// Mixes two existing modes that met on a splitter. Rank is unchanged.
    pub(crate) fn recombine(&mut self, splitter: &BeamSplitter, mode_a: usize, mode_b: usize) -> Result<(), EngineError> {
        self.state = splitter.apply(&self.state, mode_a, Some(mode_b))?;
        self.verify()
    }

    /// Removes the listed modes (any order, duplicates ignored) by projecting
    /// each onto occupation 0, then renormalizes.
    ///
    /// If no probability mass is left the whole ghost is gone: every
    /// instance is removed and `destroyed` is set.
    pub(crate) fn remove_modes(&mut self, modes: &[usize]) -> Result<Removal, EngineError> {
        let mut dropped = modes.to_vec();
        dropped.sort_unstable();
        dropped.dedup();
        if let Some(&last) = dropped.last() {
            if last >= self.registry.len() {
                return Err(EngineError::InvalidMode { index: last, rank: self.registry.len() });
            }
        }
        if dropped.is_empty() {
            return Ok(Removal { removed: Vec::new(), destroyed: false });
        }

        let surviving: Vec<usize> = (0..self.registry.len()).filter(|m| dropped.binary_search(m).is_err()).collect();
        let mut next = self.state.restrict_to_subset(&surviving)?;
        let removal = match next.normalize() {
            Ok(()) if !surviving.is_empty() => {
                self.state = next;
                Removal { removed: self.registry.remove_indices(&dropped), destroyed: false }
            }
            Ok(()) | Err(EngineError::DegenerateState { .. }) => self.destroy()?,
            Err(err) => return Err(err),
        };
        self.verify()?;
        Ok(removal)
    }

    /// Measures the joint occupation of every mode and keeps only the modes
    /// found occupied.
    ///
    /// A single-branch superposition is left as is. If sampling finds no
    /// mode occupied (or the state has no mass) the ghost is destroyed.
    pub(crate) fn collapse<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Collapse, EngineError> {
        if self.registry.len() <= 1 {
            return Ok(Collapse::Unchanged);
        }
        let outcome = match sample_joint_outcome(&self.state, rng) {
            Ok(outcome) => outcome,
            Err(EngineError::DegenerateState { .. }) => {
                let removal = self.destroy()?;
                return Ok(Collapse::Collapsed { outcome: vec![0; removal.removed.len()], removal });
            }
            Err(err) => return Err(err),
        };
        let survivors = surviving_modes(&outcome);
        let dropped: Vec<usize> = (0..outcome.len()).filter(|m| survivors.binary_search(m).is_err()).collect();
        let removal = self.remove_modes(&dropped)?;
        Ok(Collapse::Collapsed { outcome, removal })
    }

    fn destroy(&mut self) -> Result<Removal, EngineError> {
        self.state = AmplitudeVector::empty(self.state.cutoff())?;
        Ok(Removal { removed: self.registry.drain_all(), destroyed: true })
    }

    fn verify(&self) -> Result<(), EngineError> {
        validate_state(&self.state, self.registry.len(), None)
    }
}
