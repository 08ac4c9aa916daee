// src/simulation/registry.rs

use super::behaviour::{Behaviour, GhostKind};
use crate::core::{InstanceId, Vec2};

/// One visible branch of a quantum ghost.
///
/// Its index in the owning `ModeRegistry` is the tensor factor it stands for
/// in the amplitude vector.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostInstance {
    id: InstanceId,
    kind: GhostKind,
    behaviour: Behaviour,
    position: Vec2,
    last_move: Vec2,
    alive: bool,
    /// Splitter cell this instance already interacted with and has not left.
    settled_on: Option<Vec2>,
}

impl GhostInstance {
    pub(crate) fn new(id: InstanceId, kind: GhostKind, behaviour: Behaviour, position: Vec2, last_move: Vec2) -> Self {
        Self { id, kind, behaviour, position, last_move, alive: true, settled_on: None }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn kind(&self) -> GhostKind {
        self.kind
    }

    pub fn behaviour(&self) -> &Behaviour {
        &self.behaviour
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn last_move(&self) -> Vec2 {
        self.last_move
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn kill(&mut self) {
        self.alive = false;
    }

    /// Moves by `delta`. Only a non-zero move is recorded as the last move,
    /// and it leaves any splitter cell the instance was settled on.
    pub(crate) fn step(&mut self, delta: Vec2) {
        self.position = self.position + delta;
        if !delta.is_zero() {
            self.last_move = delta;
            self.settled_on = None;
        }
    }

    pub(crate) fn settle_on(&mut self, cell: Vec2) {
        self.settled_on = Some(cell);
    }

    pub(crate) fn is_settled_on(&self, cell: Vec2, tolerance: f64) -> bool {
        self.settled_on.is_some_and(|p| p.approx_eq(cell, tolerance))
    }
}

/// Ordered list of instances; index `i` is mode `i` of the amplitude vector.
///
/// Length only changes through `Superposition`, which grows or shrinks the
/// vector in the same call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeRegistry {
    instances: Vec<GhostInstance>,
}

impl ModeRegistry {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GhostInstance> {
        self.instances.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GhostInstance> {
        self.instances.iter()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(GhostInstance::id).collect()
    }

    /// Mode index of an instance.
    pub fn index_of(&self, id: InstanceId) -> Option<usize> {
        self.instances.iter().position(|g| g.id == id)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut GhostInstance> {
        self.instances.get_mut(index)
    }

    pub(super) fn push(&mut self, instance: GhostInstance) {
        self.instances.push(instance);
    }

    /// Removes the given (strictly increasing) indices, marking each removed
    /// instance dead. Returned in their former registry order.
    pub(super) fn remove_indices(&mut self, indices: &[usize]) -> Vec<GhostInstance> {
        let mut removed: Vec<GhostInstance> = indices
            .iter()
            .rev()
            .map(|&i| {
                let mut instance = self.instances.remove(i);
                instance.kill();
                instance
            })
            .collect();
        removed.reverse();
        removed
    }

    pub(super) fn drain_all(&mut self) -> Vec<GhostInstance> {
        let mut removed: Vec<GhostInstance> = self.instances.drain(..).collect();
        removed.iter_mut().for_each(GhostInstance::kill);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: u64) -> GhostInstance {
        GhostInstance::new(
            InstanceId(id),
            GhostKind::Passive,
            GhostKind::Passive.behaviour(3.0),
            Vec2::new(id as f64, 0.0),
            Vec2::new(1.0, 0.0),
        )
    }

    #[test]
    fn removal_preserves_order_of_survivors() {
        let mut registry = ModeRegistry::default();
        for id in 0..5 {
            registry.push(instance(id));
        }
        let removed = registry.remove_indices(&[1, 3]);
        assert_eq!(removed.iter().map(GhostInstance::id).collect::<Vec<_>>(), vec![InstanceId(1), InstanceId(3)]);
        assert!(removed.iter().all(|g| !g.is_alive()));
        assert_eq!(registry.ids(), vec![InstanceId(0), InstanceId(2), InstanceId(4)]);
        assert_eq!(registry.index_of(InstanceId(4)), Some(2));
    }

    #[test]
    fn moving_off_a_cell_clears_settlement() {
        let mut g = instance(0);
        let cell = Vec2::new(0.0, 0.0);
        g.settle_on(cell);
        g.step(Vec2::ZERO);
        assert!(g.is_settled_on(cell, 1e-2));
        g.step(Vec2::new(0.0, 1.0));
        assert!(!g.is_settled_on(cell, 1e-2));
        assert_eq!(g.last_move(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn idle_step_keeps_last_move() {
        let mut g = instance(0);
        g.step(Vec2::new(-1.0, 0.0));
        g.step(Vec2::ZERO);
        assert_eq!(g.last_move(), Vec2::new(-1.0, 0.0));
        assert_eq!(g.position(), Vec2::new(-1.0, 0.0));
    }
}
