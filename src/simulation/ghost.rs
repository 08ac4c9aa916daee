// src/simulation/ghost.rs

//! The quantum ghost aggregate: one superposition plus the rules that drive
//! it through a game tick.

use super::behaviour::{GhostKind, GhostParameters};
use super::classifier::{SplitterEvent, classify};
use super::engine::{Collapse, Removal, Superposition};
use super::events::{AttackRoll, GhostTick, MeasurementOutcome, RenderSink};
use super::registry::{GhostInstance, ModeRegistry};
use super::world::{PlayerView, Shot, TickContext, Trap};
use crate::config::EngineConfig;
use crate::core::{EngineError, GhostId, InstanceId, Vec2};
use crate::operations::{BeamSplitters, SplitterTile};
use rand::{Rng, RngExt};

/// Hands out instance ids that are unique across every ghost sharing it.
#[derive(Debug, Clone, Default)]
pub struct InstanceIds {
    next: u64,
}

impl InstanceIds {
    pub fn next_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next);
        self.next += 1;
        id
    }
}

/// Fixed per-ghost rules taken from the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostRules {
    pub occupation_cutoff: usize,
    pub position_tolerance: f64,
    pub shot_hit_radius: f64,
    pub base_attack_radius: f64,
}

impl GhostRules {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            occupation_cutoff: config.occupation_cutoff,
            position_tolerance: config.position_tolerance,
            shot_hit_radius: config.shot_hit_radius,
            base_attack_radius: config.ghost_attack_radius,
        }
    }
}

/// An enemy that exists as a superposition of visible instances until the
/// player measures it.
///
/// All changes to the amplitude vector and the registry go through the
/// owned `Superposition`, one atomic call at a time. The ghost is destroyed
/// once its registry is empty.
#[derive(Debug, Clone)]
pub struct QuantumGhost {
    id: GhostId,
    superposition: Superposition,
    parameters: GhostParameters,
    rules: GhostRules,
}

impl QuantumGhost {
    /// Creates a ghost with a single instance in the state "occupation 1"
    /// and attaches that instance to the sink.
    pub fn spawn<S: RenderSink + ?Sized>(
        id: GhostId,
        first: InstanceId,
        kind: GhostKind,
        position: Vec2,
        parameters: GhostParameters,
        rules: GhostRules,
        sink: &mut S,
    ) -> Result<Self, EngineError> {
        let instance = GhostInstance::new(first, kind, kind.behaviour(rules.base_attack_radius), position, Vec2::ZERO);
        let superposition = Superposition::new(rules.occupation_cutoff, instance)?;
        if let Some(instance) = superposition.registry().get(0) {
            sink.attach(instance);
        }
        tracing::debug!(target: "qghost::ghost", ghost = %id, instance = %first, %kind, "ghost.spawned");
        Ok(Self { id, superposition, parameters, rules })
    }

    pub fn id(&self) -> GhostId {
        self.id
    }

    pub fn superposition(&self) -> &Superposition {
        &self.superposition
    }

    pub fn registry(&self) -> &ModeRegistry {
        self.superposition.registry()
    }

    pub fn len(&self) -> usize {
        self.superposition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.superposition.is_empty()
    }

    /// The death condition of the quantum ghost as a whole.
    pub fn is_destroyed(&self) -> bool {
        self.superposition.is_empty()
    }

    pub fn parameters(&self) -> &GhostParameters {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: GhostParameters) {
        self.parameters = parameters;
    }

    pub fn rules(&self) -> &GhostRules {
        &self.rules
    }

    pub fn owns(&self, id: InstanceId) -> bool {
        self.superposition.registry().index_of(id).is_some()
    }

    /// Moves one instance. Movement policy belongs to the caller.
    pub fn move_instance(&mut self, id: InstanceId, delta: Vec2) -> Result<(), EngineError> {
        let index = self.superposition.registry().index_of(id).ok_or(EngineError::UnknownInstance(id))?;
        let instance = self.superposition.registry_mut().get_mut(index).ok_or(EngineError::UnknownInstance(id))?;
        instance.step(delta);
        Ok(())
    }

    /// Aggregate attack probability against a player at `player`.
    ///
    /// Sums, over instances within their own attack radius, the probability
    /// that the instance's mode is occupied times its kind's base attack
    /// probability. Read-only.
    pub fn attack_probability(&self, player: Vec2) -> Result<f64, EngineError> {
        let mut total = 0.0;
        for (mode, instance) in self.superposition.registry().iter().enumerate() {
            let behaviour = instance.behaviour();
            if !instance.is_alive() || !instance.position().is_within(player, behaviour.attack_radius) {
                continue;
            }
            total += self.superposition.occupied_probability(mode)? * behaviour.attack_probability;
        }
        Ok(total)
    }

    /// Does any live instance stand within the player's measurement radius?
    pub fn is_within_measurement(&self, player: &PlayerView) -> bool {
        self.superposition
            .registry()
            .iter()
            .any(|g| g.is_alive() && g.position().is_within(player.position, player.measure_radius))
    }

    /// One game tick: splitter interaction, shots, removal of dead
    /// instances, then an attack roll or else a trap roll.
    pub fn update<R, S>(
        &mut self,
        ctx: &mut TickContext<'_>,
        splitters: &BeamSplitters,
        ids: &mut InstanceIds,
        rng: &mut R,
        sink: &mut S,
    ) -> Result<GhostTick, EngineError>
    where
        R: Rng + ?Sized,
        S: RenderSink + ?Sized,
    {
        let mut tick = GhostTick::new(self.id);
        if self.is_destroyed() {
            tick.destroyed = true;
            return Ok(tick);
        }

        self.interact_with_splitters(ctx.splitters, splitters, ids, rng, sink, &mut tick)?;
        self.resolve_shots(ctx.shots);
        self.cull_dead(sink, &mut tick)?;
        if self.is_destroyed() {
            return Ok(tick);
        }

        if rng.random::<f64>() < self.parameters.attack_probability {
            tick.attack = Some(self.roll_attack(ctx.player.position, rng)?);
        } else if rng.random::<f64>() < self.parameters.trap_probability {
            tick.trap_laid = self.lay_trap(ctx.traps, rng);
        }
        tick.attack_probability = self.attack_probability(ctx.player.position)?;
        Ok(tick)
    }

    /// Applies every splitter event for this tick.
    ///
    /// Splits are declined once the registry holds `occupation_cutoff`
    /// instances or when the grown vector would pass the state-space
    /// ceiling. Either way the instance is settled on the tile so it is not
    /// retried until it moves.
    fn interact_with_splitters<R, S>(
        &mut self,
        tiles: &[SplitterTile],
        splitters: &BeamSplitters,
        ids: &mut InstanceIds,
        rng: &mut R,
        sink: &mut S,
        tick: &mut GhostTick,
    ) -> Result<(), EngineError>
    where
        R: Rng + ?Sized,
        S: RenderSink + ?Sized,
    {
        let events = classify(self.superposition.registry(), tiles, self.rules.position_tolerance);
        for event in events {
            match event {
                SplitterEvent::Coincidence { mode_a, mode_b, orientation, cell } => {
                    self.superposition.recombine(splitters.get(orientation), mode_a, mode_b)?;
                    self.settle(mode_a, cell);
                    self.settle(mode_b, cell);
                    tick.recombinations += 1;
                    tracing::debug!(
                        target: "qghost::engine",
                        ghost = %self.id,
                        mode_a,
                        mode_b,
                        %orientation,
                        "ghost.recombined"
                    );
                }
                SplitterEvent::Split { mode, orientation, cell, reflected_move } => {
                    self.settle(mode, cell);
                    if self.superposition.len() >= self.rules.occupation_cutoff {
                        tick.declined_splits += 1;
                        tracing::debug!(
                            target: "qghost::engine",
                            ghost = %self.id,
                            mode,
                            cutoff = self.rules.occupation_cutoff,
                            "ghost.split_declined=cutoff"
                        );
                        continue;
                    }

                    let kind = GhostKind::random(rng);
                    let mut branch = GhostInstance::new(
                        ids.next_id(),
                        kind,
                        kind.behaviour(self.rules.base_attack_radius),
                        cell,
                        reflected_move,
                    );
                    branch.settle_on(cell);
                    match self.superposition.split(splitters.get(orientation), mode, branch) {
                        Ok(new_mode) => {
                            if let Some(instance) = self.superposition.registry().get(new_mode) {
                                sink.attach(instance);
                                tick.spawned.push(instance.id());
                            }
                            tracing::debug!(
                                target: "qghost::engine",
                                ghost = %self.id,
                                mode,
                                new_mode,
                                %orientation,
                                "ghost.split"
                            );
                        }
                        Err(EngineError::StateSpaceOverflow { requested, ceiling }) => {
                            tick.declined_splits += 1;
                            tracing::debug!(
                                target: "qghost::engine",
                                ghost = %self.id,
                                mode,
                                requested,
                                ceiling,
                                "ghost.split_declined=overflow"
                            );
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(())
    }

    fn settle(&mut self, mode: usize, cell: Vec2) {
        if let Some(instance) = self.superposition.registry_mut().get_mut(mode) {
            instance.settle_on(cell);
        }
    }

    /// Marks instances hit by a live shot as dead. Each shot kills at most
    /// one instance and is consumed by it.
    fn resolve_shots(&mut self, shots: &mut [Shot]) {
        let radius = self.rules.shot_hit_radius;
        let registry = self.superposition.registry_mut();
        for mode in 0..registry.len() {
            let Some(instance) = registry.get_mut(mode) else { continue };
            if !instance.is_alive() {
                continue;
            }
            let position = instance.position();
            if let Some(shot) = shots.iter_mut().find(|s| s.alive && s.position.is_within(position, radius)) {
                shot.alive = false;
                instance.kill();
            }
        }
    }

    /// Removes every dead instance from the superposition in one call.
    fn cull_dead<S: RenderSink + ?Sized>(&mut self, sink: &mut S, tick: &mut GhostTick) -> Result<(), EngineError> {
        let dead: Vec<usize> = self
            .superposition
            .registry()
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.is_alive())
            .map(|(mode, _)| mode)
            .collect();
        if dead.is_empty() {
            return Ok(());
        }
        let removal = self.superposition.remove_modes(&dead)?;
        self.detach_removed(&removal, sink, &mut tick.died);
        tick.destroyed |= removal.destroyed;
        Ok(())
    }

    fn detach_removed<S: RenderSink + ?Sized>(&self, removal: &Removal, sink: &mut S, died: &mut Vec<InstanceId>) {
        for instance in &removal.removed {
            sink.detach(instance.id());
            died.push(instance.id());
        }
        if removal.destroyed {
            tracing::info!(target: "qghost::ghost", ghost = %self.id, "ghost.destroyed");
        }
    }

    fn roll_attack<R: Rng + ?Sized>(&self, player: Vec2, rng: &mut R) -> Result<AttackRoll, EngineError> {
        let probability = self.attack_probability(player)?;
        let landed = rng.random::<f64>() < probability;
        if landed {
            tracing::debug!(target: "qghost::ghost", ghost = %self.id, probability, "ghost.attack_landed");
        }
        Ok(AttackRoll { probability, landed })
    }

    /// A uniformly chosen live instance lays a trap on its cell, unless a
    /// trap is already there.
    fn lay_trap<R: Rng + ?Sized>(&self, traps: &mut Vec<Trap>, rng: &mut R) -> Option<Trap> {
        let live: Vec<&GhostInstance> = self.superposition.registry().iter().filter(|g| g.is_alive()).collect();
        if live.is_empty() {
            return None;
        }
        let position = live[rng.random_range(0..live.len())].position();
        if traps.iter().any(|t| t.position.approx_eq(position, self.rules.position_tolerance)) {
            return None;
        }
        let trap = Trap { position };
        traps.push(trap);
        Some(trap)
    }

    /// Measures this ghost if the player's measurement reaches it.
    ///
    /// Returns `None` when no instance is within range or when the ghost has
    /// a single branch (nothing to collapse).
    pub fn measure<R, S>(
        &mut self,
        player: &PlayerView,
        rng: &mut R,
        sink: &mut S,
    ) -> Result<Option<MeasurementOutcome>, EngineError>
    where
        R: Rng + ?Sized,
        S: RenderSink + ?Sized,
    {
        if !self.is_within_measurement(player) {
            return Ok(None);
        }
        match self.superposition.collapse(rng)? {
            Collapse::Unchanged => Ok(None),
            Collapse::Collapsed { outcome, removal } => {
                let mut removed = Vec::with_capacity(removal.removed.len());
                self.detach_removed(&removal, sink, &mut removed);
                let survivors = self.superposition.registry().ids();
                tracing::debug!(
                    target: "qghost::measure",
                    ghost = %self.id,
                    ?outcome,
                    survivors = survivors.len(),
                    removed = removed.len(),
                    "ghost.collapsed"
                );
                Ok(Some(MeasurementOutcome {
                    ghost: self.id,
                    outcome,
                    survivors,
                    removed,
                    destroyed: removal.destroyed,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_MAX_STATE_SPACE;
    use crate::operations::SplitterOrientation;
    use crate::simulation::events::RecordingSink;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TILE: Vec2 = Vec2::new(4.0, 4.0);
    const FAR: Vec2 = Vec2::new(100.0, 100.0);

    fn rules(cutoff: usize) -> GhostRules {
        GhostRules { occupation_cutoff: cutoff, ..GhostRules::from_config(&EngineConfig::default()) }
    }

    /// Rates of zero keep attack and trap rolls out of the way.
    fn quiet() -> GhostParameters {
        GhostParameters::new(0.0, 0.0, 5, 5)
    }

    struct Fixture {
        ghost: QuantumGhost,
        splitters: BeamSplitters,
        ids: InstanceIds,
        rng: StdRng,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new(cutoff: usize, position: Vec2) -> Result<Self, EngineError> {
            Self::with_ceiling(cutoff, DEFAULT_MAX_STATE_SPACE, position)
        }

        fn with_ceiling(cutoff: usize, ceiling: usize, position: Vec2) -> Result<Self, EngineError> {
            let mut ids = InstanceIds::default();
            let mut sink = RecordingSink::new();
            let ghost = QuantumGhost::spawn(
                GhostId(0),
                ids.next_id(),
                GhostKind::Aggressive,
                position,
                quiet(),
                rules(cutoff),
                &mut sink,
            )?;
            Ok(Self {
                ghost,
                splitters: BeamSplitters::new(cutoff, ceiling)?,
                ids,
                rng: StdRng::seed_from_u64(17),
                sink,
            })
        }

        fn tick(&mut self, tiles: &[SplitterTile], shots: &mut [Shot], traps: &mut Vec<Trap>) -> Result<GhostTick, EngineError> {
            let mut ctx = TickContext { player: PlayerView::new(FAR, 1.0), splitters: tiles, shots, traps };
            self.ghost.update(&mut ctx, &self.splitters, &mut self.ids, &mut self.rng, &mut self.sink)
        }
    }

    #[test]
    fn lone_instance_on_tile_splits_once() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, TILE)?;
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        let tick = f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert_eq!(tick.spawned.len(), 1);
        assert_eq!(f.ghost.len(), 2);
        assert_eq!(f.sink.attached_count(), 2);
        assert!(f.ghost.superposition().state().is_normalized());

        // Both are settled on the tile, so standing still does nothing.
        let tick = f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert!(tick.spawned.is_empty());
        assert_eq!(f.ghost.len(), 2);
        Ok(())
    }

    #[test]
    fn split_refused_at_cutoff() -> Result<(), EngineError> {
        let mut f = Fixture::new(2, TILE)?;
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert_eq!(f.ghost.len(), 2);

        // Step off and back on: the instance meets the tile again alone.
        let first = f.ghost.registry().ids()[0];
        f.ghost.move_instance(first, Vec2::new(1.0, 0.0))?;
        f.ghost.move_instance(first, Vec2::new(-1.0, 0.0))?;
        let before = f.ghost.superposition().clone();
        let tick = f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert_eq!(tick.declined_splits, 1);
        assert!(tick.spawned.is_empty());
        assert_eq!(f.ghost.superposition().state(), before.state());
        assert_eq!(f.ghost.len(), 2);
        Ok(())
    }

    #[test]
    fn split_declined_at_state_space_ceiling() -> Result<(), EngineError> {
        // 4^3 = 64 fits, 4^4 = 256 does not, while the cutoff still allows a fourth mode.
        let mut f = Fixture::with_ceiling(4, 64, TILE)?;
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert_eq!(f.ghost.len(), 2);

        let first = f.ghost.registry().ids()[0];
        f.ghost.move_instance(first, Vec2::new(1.0, 0.0))?;
        f.ghost.move_instance(first, Vec2::new(-1.0, 0.0))?;
        let tick = f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert_eq!(tick.spawned.len(), 1);
        assert_eq!(f.ghost.len(), 3);

        f.ghost.move_instance(first, Vec2::new(1.0, 0.0))?;
        f.ghost.move_instance(first, Vec2::new(-1.0, 0.0))?;
        let before = f.ghost.superposition().clone();
        let attached = f.sink.attached_count();
        let tick = f.tick(&tiles, &mut [], &mut Vec::new())?;
        assert_eq!(tick.declined_splits, 1);
        assert!(tick.spawned.is_empty());
        assert_eq!(f.ghost.superposition().state(), before.state());
        assert_eq!(f.ghost.registry().ids(), before.registry().ids());
        assert_eq!(f.sink.attached_count(), attached);
        assert!(!f.ghost.is_destroyed());
        Ok(())
    }

    #[test]
    fn shot_kills_one_instance_and_is_consumed() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, TILE)?;
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        f.tick(&tiles, &mut [], &mut Vec::new())?;
        let victim = f.ghost.registry().ids()[0];

        let mut shots = [Shot::new(TILE)];
        let tick = f.tick(&tiles, &mut shots, &mut Vec::new())?;
        assert!(!shots[0].alive);
        assert_eq!(tick.died, vec![victim]);
        assert!(!tick.destroyed);
        assert_eq!(f.ghost.len(), 1);
        assert!(!f.sink.is_attached(victim));
        // The remaining branch holds the ghost with certainty.
        assert!((f.ghost.superposition().occupied_probability(0)? - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn shooting_the_last_branch_destroys_the_ghost() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, Vec2::ZERO)?;
        let mut shots = [Shot::new(Vec2::new(0.2, 0.0))];
        let tick = f.tick(&[], &mut shots, &mut Vec::new())?;
        assert!(tick.destroyed);
        assert_eq!(tick.died.len(), 1);
        assert!(f.ghost.is_destroyed());
        assert_eq!(f.sink.attached_count(), 0);
        Ok(())
    }

    #[test]
    fn attack_probability_weights_by_occupation() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, TILE)?;
        // Aggressive: base 0.8, radius 5 with the default base radius of 3.
        assert!((f.ghost.attack_probability(TILE + Vec2::new(1.0, 0.0))? - 0.8).abs() < 1e-9);
        assert_eq!(f.ghost.attack_probability(FAR)?, 0.0);

        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        f.tick(&tiles, &mut [], &mut Vec::new())?;
        let expected: f64 = f.ghost.registry().iter().map(|g| 0.5 * g.behaviour().attack_probability).sum();
        let before = f.ghost.superposition().clone();
        let p = f.ghost.attack_probability(TILE)?;
        assert!((p - expected).abs() < 1e-9);
        assert_eq!(f.ghost.superposition(), &before);
        Ok(())
    }

    #[test]
    fn measuring_single_branch_changes_nothing() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, TILE)?;
        let player = PlayerView::new(TILE, 2.0);
        assert_eq!(f.ghost.measure(&player, &mut f.rng, &mut f.sink)?, None);
        assert_eq!(f.ghost.len(), 1);
        Ok(())
    }

    #[test]
    fn measuring_split_ghost_keeps_one_branch() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, TILE)?;
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal125)];
        f.tick(&tiles, &mut [], &mut Vec::new())?;

        let out_of_reach = PlayerView::new(FAR, 2.0);
        assert_eq!(f.ghost.measure(&out_of_reach, &mut f.rng, &mut f.sink)?, None);

        let player = PlayerView::new(TILE, 2.0);
        let outcome = f.ghost.measure(&player, &mut f.rng, &mut f.sink)?.expect("two branches collapse");
        assert_eq!(outcome.survivors.len(), 1);
        assert_eq!(outcome.removed.len(), 1);
        assert!(!outcome.destroyed);
        assert!(!f.sink.is_attached(outcome.removed[0]));
        assert_eq!(f.ghost.registry().ids(), outcome.survivors);
        Ok(())
    }

    #[test]
    fn unknown_instance_cannot_move() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, TILE)?;
        let err = f.ghost.move_instance(InstanceId(99), Vec2::new(1.0, 0.0));
        assert_eq!(err, Err(EngineError::UnknownInstance(InstanceId(99))));
        Ok(())
    }

    #[test]
    fn traps_are_not_stacked() -> Result<(), EngineError> {
        let f = Fixture::new(4, TILE)?;
        let mut rng = StdRng::seed_from_u64(2);
        let mut traps = Vec::new();
        assert_eq!(f.ghost.lay_trap(&mut traps, &mut rng), Some(Trap { position: TILE }));
        assert_eq!(f.ghost.lay_trap(&mut traps, &mut rng), None);
        assert_eq!(traps.len(), 1);
        Ok(())
    }

    #[test]
    fn certain_trap_roll_lays_a_trap() -> Result<(), EngineError> {
        let mut f = Fixture::new(4, Vec2::ZERO)?;
        f.ghost.set_parameters(GhostParameters::new(0.0, 1.0, 5, 5));
        let mut traps = Vec::new();
        let tick = f.tick(&[], &mut [], &mut traps)?;
        assert_eq!(tick.trap_laid, Some(Trap { position: Vec2::ZERO }));
        assert_eq!(traps.len(), 1);
        Ok(())
    }
}
