// src/simulation/events.rs

//! What the engine hands back to its collaborators: the render add/remove
//! stream and the per-tick reports for the player controller.

use super::registry::GhostInstance;
use super::world::Trap;
use crate::core::{GhostId, InstanceId, Vec2};
use std::collections::BTreeSet;

/// Receiver of instance attach/detach notifications.
///
/// The engine never queries a sink. An instance removed from a registry is
/// detached in the same call that removes it.
pub trait RenderSink {
    fn attach(&mut self, instance: &GhostInstance);
    fn detach(&mut self, id: InstanceId);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn attach(&mut self, _instance: &GhostInstance) {}
    fn detach(&mut self, _id: InstanceId) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Attached { id: InstanceId, position: Vec2 },
    Detached(InstanceId),
}

/// Sink that keeps the full stream plus the set currently attached.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<RenderEvent>,
    attached: BTreeSet<InstanceId>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self, id: InstanceId) -> bool {
        self.attached.contains(&id)
    }

    pub fn attached(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.attached.iter().copied()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }
}

impl RenderSink for RecordingSink {
    fn attach(&mut self, instance: &GhostInstance) {
        self.attached.insert(instance.id());
        self.events.push(RenderEvent::Attached { id: instance.id(), position: instance.position() });
    }

    fn detach(&mut self, id: InstanceId) {
        self.attached.remove(&id);
        self.events.push(RenderEvent::Detached(id));
    }
}

/// Outcome of one attack roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackRoll {
    /// Aggregate probability over instances in range. Not clamped.
    pub probability: f64,
    pub landed: bool,
}

/// What happened to one quantum ghost during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostTick {
    pub ghost: GhostId,
    /// New branches created by splits.
    pub spawned: Vec<InstanceId>,
    /// Instances removed this tick (shot, or taken with a destroyed ghost).
    pub died: Vec<InstanceId>,
    pub recombinations: usize,
    /// Splits refused at the cutoff or the state-space ceiling.
    pub declined_splits: usize,
    /// Aggregate attack probability at the end of the tick.
    pub attack_probability: f64,
    /// Present when the ghost decided to attack this tick.
    pub attack: Option<AttackRoll>,
    pub trap_laid: Option<Trap>,
    pub destroyed: bool,
}

impl GhostTick {
    pub fn new(ghost: GhostId) -> Self {
        Self {
            ghost,
            spawned: Vec::new(),
            died: Vec::new(),
            recombinations: 0,
            declined_splits: 0,
            attack_probability: 0.0,
            attack: None,
            trap_laid: None,
            destroyed: false,
        }
    }

    pub fn attack_landed(&self) -> bool {
        self.attack.is_some_and(|roll| roll.landed)
    }
}

/// Everything the player controller needs after a tick of every ghost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub ghosts: Vec<GhostTick>,
}

impl TickReport {
    /// Every instance that died this tick, across ghosts.
    pub fn died(&self) -> Vec<InstanceId> {
        self.ghosts.iter().flat_map(|g| g.died.iter().copied()).collect()
    }

    pub fn spawned(&self) -> Vec<InstanceId> {
        self.ghosts.iter().flat_map(|g| g.spawned.iter().copied()).collect()
    }

    pub fn destroyed_ghosts(&self) -> Vec<GhostId> {
        self.ghosts.iter().filter(|g| g.destroyed).map(|g| g.ghost).collect()
    }

    /// Number of attacks that landed on the player.
    pub fn attacks_landed(&self) -> usize {
        self.ghosts.iter().filter(|g| g.attack_landed()).count()
    }

    /// Sum of every ghost's aggregate attack probability.
    pub fn total_attack_probability(&self) -> f64 {
        self.ghosts.iter().map(|g| g.attack_probability).sum()
    }

    pub fn traps_laid(&self) -> Vec<Trap> {
        self.ghosts.iter().filter_map(|g| g.trap_laid).collect()
    }
}

/// Result of a measurement that collapsed a ghost.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementOutcome {
    pub ghost: GhostId,
    /// Sampled occupation per pre-collapse mode.
    pub outcome: Vec<usize>,
    pub survivors: Vec<InstanceId>,
    pub removed: Vec<InstanceId>,
    pub destroyed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::behaviour::GhostKind;

    #[test]
    fn recording_sink_tracks_attached_set() {
        let instance = GhostInstance::new(
            InstanceId(7),
            GhostKind::Aggressive,
            GhostKind::Aggressive.behaviour(3.0),
            Vec2::new(1.0, 2.0),
            Vec2::ZERO,
        );
        let mut sink = RecordingSink::new();
        sink.attach(&instance);
        assert!(sink.is_attached(InstanceId(7)));
        sink.detach(InstanceId(7));
        assert!(!sink.is_attached(InstanceId(7)));
        assert_eq!(
            sink.events,
            vec![
                RenderEvent::Attached { id: InstanceId(7), position: Vec2::new(1.0, 2.0) },
                RenderEvent::Detached(InstanceId(7)),
            ]
        );
    }

    #[test]
    fn report_aggregates_across_ghosts() {
        let mut a = GhostTick::new(GhostId(1));
        a.died.push(InstanceId(3));
        a.attack = Some(AttackRoll { probability: 0.4, landed: true });
        let mut b = GhostTick::new(GhostId(2));
        b.died.push(InstanceId(9));
        b.destroyed = true;
        let report = TickReport { ghosts: vec![a, b] };
        assert_eq!(report.died(), vec![InstanceId(3), InstanceId(9)]);
        assert_eq!(report.destroyed_ghosts(), vec![GhostId(2)]);
        assert_eq!(report.attacks_landed(), 1);
    }
}
