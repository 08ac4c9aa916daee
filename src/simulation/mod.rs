// src/simulation/mod.rs

//! Drives quantum ghosts through game ticks and player measurements.
//! This module contains the `Simulator` entry point; each `QuantumGhost`
//! owns its own `Superposition` (amplitude vector plus mode registry) and
//! evolves independently of the others.

pub mod behaviour;
pub mod classifier;
pub(crate) mod engine;
pub mod events;
pub mod ghost;
pub mod measurement;
pub mod registry;
pub mod world;

pub use behaviour::{Behaviour, GhostKind, GhostParameters};
pub use classifier::{SplitterEvent, classify};
pub use engine::{Collapse, Removal, Superposition};
pub use events::{
    AttackRoll, GhostTick, MeasurementOutcome, NullSink, RecordingSink, RenderEvent, RenderSink, TickReport,
};
pub use ghost::{GhostRules, InstanceIds, QuantumGhost};
pub use registry::{GhostInstance, ModeRegistry};
pub use world::{PlayerView, Shot, TickContext, Trap};

use crate::config::{EngineConfig, load_engine_config_from_env};
use crate::core::{EngineError, GhostId, InstanceId, Vec2};
use crate::operations::BeamSplitters;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Owns every live quantum ghost and the shared, precomputed splitters.
///
/// Ghosts never share state; the simulator only routes input to them and
/// collects their reports.
#[derive(Debug)]
pub struct Simulator {
    config: EngineConfig,
    splitters: BeamSplitters,
    ghosts: Vec<QuantumGhost>,
    ids: InstanceIds,
    next_ghost: u64,
    parameters: GhostParameters,
    rules: GhostRules,
    rng: StdRng,
}

impl Simulator {
    /// Creates a simulator seeded from the operating system.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_rng(config, rand::make_rng::<StdRng>())
    }

    /// Creates a simulator with a fixed seed, for reproducible runs.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Creates a simulator from `QGHOST_CONFIG_PATH` or the builtin config.
    pub fn from_env() -> Result<Self, EngineError> {
        let (config, _path) = load_engine_config_from_env();
        Self::new(config)
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Result<Self, EngineError> {
        let splitters = BeamSplitters::new(config.occupation_cutoff, config.max_state_space)?;
        tracing::info!(
            target: "qghost::engine",
            cutoff = config.occupation_cutoff,
            ceiling = config.max_state_space,
            "simulator.initialized"
        );
        Ok(Self {
            parameters: GhostParameters::from_config(&config),
            rules: GhostRules::from_config(&config),
            config,
            splitters,
            ghosts: Vec::new(),
            ids: InstanceIds::default(),
            next_ghost: 0,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn splitters(&self) -> &BeamSplitters {
        &self.splitters
    }

    pub fn parameters(&self) -> &GhostParameters {
        &self.parameters
    }

    pub fn ghosts(&self) -> &[QuantumGhost] {
        &self.ghosts
    }

    pub fn ghost(&self, id: GhostId) -> Option<&QuantumGhost> {
        self.ghosts.iter().find(|g| g.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    /// Spawns a ghost of a random kind at `position`.
    pub fn spawn_ghost<S: RenderSink + ?Sized>(&mut self, position: Vec2, sink: &mut S) -> Result<GhostId, EngineError> {
        let kind = GhostKind::random(&mut self.rng);
        self.spawn_ghost_of(kind, position, sink)
    }

    pub fn spawn_ghost_of<S: RenderSink + ?Sized>(
        &mut self,
        kind: GhostKind,
        position: Vec2,
        sink: &mut S,
    ) -> Result<GhostId, EngineError> {
        let id = GhostId(self.next_ghost);
        let ghost = QuantumGhost::spawn(id, self.ids.next_id(), kind, position, self.parameters, self.rules, sink)?;
        self.next_ghost += 1;
        self.ghosts.push(ghost);
        Ok(id)
    }

    /// Moves an instance of whichever ghost owns it.
    pub fn move_instance(&mut self, id: InstanceId, delta: Vec2) -> Result<(), EngineError> {
        let ghost = self.ghosts.iter_mut().find(|g| g.owns(id)).ok_or(EngineError::UnknownInstance(id))?;
        ghost.move_instance(id, delta)
    }

    /// Updates every ghost once and drops the ones that were destroyed.
    pub fn tick<S: RenderSink + ?Sized>(
        &mut self,
        ctx: &mut TickContext<'_>,
        sink: &mut S,
    ) -> Result<TickReport, EngineError> {
        let mut report = TickReport::default();
        for ghost in &mut self.ghosts {
            report.ghosts.push(ghost.update(ctx, &self.splitters, &mut self.ids, &mut self.rng, sink)?);
        }
        self.drop_destroyed();
        Ok(report)
    }

    /// Applies a player measurement. At most one ghost is collapsed: the
    /// first, in spawn order, that has an instance in range and more than
    /// one branch.
    pub fn measure<S: RenderSink + ?Sized>(
        &mut self,
        player: &PlayerView,
        sink: &mut S,
    ) -> Result<Option<MeasurementOutcome>, EngineError> {
        let mut collapsed = None;
        for ghost in &mut self.ghosts {
            if let Some(outcome) = ghost.measure(player, &mut self.rng, sink)? {
                collapsed = Some(outcome);
                break;
            }
        }
        if collapsed.is_some() {
            self.drop_destroyed();
        }
        Ok(collapsed)
    }

    /// Sum of every ghost's aggregate attack probability. Read-only.
    pub fn attack_probability(&self, player: Vec2) -> Result<f64, EngineError> {
        let mut total = 0.0;
        for ghost in &self.ghosts {
            total += ghost.attack_probability(player)?;
        }
        Ok(total)
    }

    /// Rescales attack and trap rates for every ghost, present and future.
    pub fn change_difficulty(&mut self, difficulty: u32) {
        self.parameters.change_difficulty(difficulty);
        for ghost in &mut self.ghosts {
            ghost.set_parameters(self.parameters);
        }
        tracing::info!(target: "qghost::engine", difficulty = self.parameters.difficulty, "simulator.difficulty_changed");
    }

    fn drop_destroyed(&mut self) {
        self.ghosts.retain(|g| {
            if g.is_destroyed() {
                tracing::info!(target: "qghost::ghost", ghost = %g.id(), "simulator.ghost_removed");
            }
            !g.is_destroyed()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{SplitterOrientation, SplitterTile};

    fn simulator() -> Simulator {
        let config = EngineConfig { attack_probability: 0.0, trap_probability: 0.0, ..EngineConfig::default() };
        Simulator::with_seed(config, 42).expect("default config builds")
    }

    #[test]
    fn spawned_ghosts_get_distinct_ids() -> Result<(), EngineError> {
        let mut sim = simulator();
        let mut sink = RecordingSink::new();
        let a = sim.spawn_ghost(Vec2::ZERO, &mut sink)?;
        let b = sim.spawn_ghost(Vec2::new(5.0, 5.0), &mut sink)?;
        assert_ne!(a, b);
        assert_eq!(sim.ghosts().len(), 2);
        assert_eq!(sink.attached_count(), 2);
        let first = sim.ghost(a).map(|g| g.registry().ids()[0]);
        let second = sim.ghost(b).map(|g| g.registry().ids()[0]);
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn measurement_touches_at_most_one_ghost() -> Result<(), EngineError> {
        let mut sim = simulator();
        let mut sink = RecordingSink::new();
        let tile = Vec2::new(2.0, 2.0);
        sim.spawn_ghost_of(GhostKind::Passive, tile, &mut sink)?;
        sim.spawn_ghost_of(GhostKind::Passive, tile, &mut sink)?;

        let tiles = [SplitterTile::new(tile, SplitterOrientation::Diagonal45)];
        let mut traps = Vec::new();
        let mut ctx = TickContext {
            player: PlayerView::new(Vec2::new(50.0, 50.0), 1.0),
            splitters: &tiles,
            shots: &mut [],
            traps: &mut traps,
        };
        let report = sim.tick(&mut ctx, &mut sink)?;
        assert_eq!(report.spawned().len(), 2);
        assert!(sim.ghosts().iter().all(|g| g.len() == 2));

        let outcome = sim.measure(&PlayerView::new(tile, 1.0), &mut sink)?.expect("a ghost is in range");
        assert_eq!(outcome.ghost, GhostId(0));
        let lens: Vec<usize> = sim.ghosts().iter().map(QuantumGhost::len).collect();
        assert_eq!(lens, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn unknown_instance_is_reported() {
        let mut sim = simulator();
        assert_eq!(
            sim.move_instance(InstanceId(3), Vec2::new(1.0, 0.0)),
            Err(EngineError::UnknownInstance(InstanceId(3)))
        );
    }

    #[test]
    fn difficulty_reaches_existing_ghosts() -> Result<(), EngineError> {
        let mut sim = Simulator::with_seed(EngineConfig::default(), 1)?;
        let id = sim.spawn_ghost(Vec2::ZERO, &mut NullSink)?;
        sim.change_difficulty(5);
        let attack = sim.ghost(id).map(|g| g.parameters().attack_probability);
        assert_eq!(attack, Some(EngineConfig::default().attack_probability));
        Ok(())
    }

    #[test]
    fn destroyed_ghosts_leave_the_simulator() -> Result<(), EngineError> {
        let mut sim = simulator();
        let mut sink = RecordingSink::new();
        let id = sim.spawn_ghost(Vec2::ZERO, &mut sink)?;
        let mut shots = [Shot::new(Vec2::ZERO)];
        let mut traps = Vec::new();
        let mut ctx = TickContext {
            player: PlayerView::new(Vec2::new(50.0, 50.0), 1.0),
            splitters: &[],
            shots: &mut shots,
            traps: &mut traps,
        };
        let report = sim.tick(&mut ctx, &mut sink)?;
        assert_eq!(report.destroyed_ghosts(), vec![id]);
        assert!(sim.is_empty());
        assert_eq!(sink.attached_count(), 0);
        Ok(())
    }
}
