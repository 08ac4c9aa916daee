// src/simulation/classifier.rs

//! Decides, per tick, what each instance standing on a splitter tile does.

use super::registry::ModeRegistry;
use crate::core::Vec2;
use crate::operations::{SplitterOrientation, SplitterTile};

/// What a splitter does to the instances on it this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitterEvent {
    /// Two branches arrived from opposite sides and recombine.
    Coincidence {
        mode_a: usize,
        mode_b: usize,
        orientation: SplitterOrientation,
        cell: Vec2,
    },
    /// A lone branch splits; the new branch leaves along `reflected_move`.
    Split {
        mode: usize,
        orientation: SplitterOrientation,
        cell: Vec2,
        reflected_move: Vec2,
    },
}

/// Classifies every live instance standing on a splitter tile.
///
/// Pairs are matched in registry order. An instance already used by an
/// event this tick is skipped, and a third simultaneous arrival whose only
/// partners are taken produces no event: it waits for the next tick.
/// Instances settled on the tile (they interacted with it and have not
/// moved off) are ignored. Mode indices refer to the registry as
/// passed in; events that add modes only append, so they stay valid.
pub fn classify(registry: &ModeRegistry, splitters: &[SplitterTile], tolerance: f64) -> Vec<SplitterEvent> {
    let mut seen = vec![false; registry.len()];
    let mut events = Vec::new();

    let on_tile = |index: usize, tile: &SplitterTile| {
        registry.get(index).is_some_and(|g| {
            g.is_alive() && g.position().approx_eq(tile.position, tolerance) && !g.is_settled_on(tile.position, tolerance)
        })
    };

    for tile in splitters {
        for i in 0..registry.len() {
            if seen[i] || !on_tile(i, tile) {
                continue;
            }
            let Some(this) = registry.get(i) else { continue };

            let reflects_with = |j: usize| {
                j != i
                    && on_tile(j, tile)
                    && registry
                        .get(j)
                        .is_some_and(|other| tile.orientation.is_coincidence(this.last_move() + other.last_move(), tolerance))
            };
            let partner = (i + 1..registry.len()).find(|&j| !seen[j] && reflects_with(j));
            if partner.is_none() && (0..registry.len()).any(|j| seen[j] && reflects_with(j)) {
                // Its partner is taken this tick; try again next tick.
                continue;
            }

            seen[i] = true;
            match partner {
                Some(j) => {
                    seen[j] = true;
                    events.push(SplitterEvent::Coincidence {
                        mode_a: i,
                        mode_b: j,
                        orientation: tile.orientation,
                        cell: tile.position,
                    });
                }
                None => events.push(SplitterEvent::Split {
                    mode: i,
                    orientation: tile.orientation,
                    cell: tile.position,
                    reflected_move: tile.orientation.reflect(this.last_move()),
                }),
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstanceId, constants::DEFAULT_POSITION_TOLERANCE};
    use crate::simulation::behaviour::GhostKind;
    use crate::simulation::registry::GhostInstance;

    fn registry_of(instances: &[(Vec2, Vec2)]) -> ModeRegistry {
        let mut registry = ModeRegistry::default();
        for (id, (position, last_move)) in instances.iter().enumerate() {
            registry.push(GhostInstance::new(
                InstanceId(id as u64),
                GhostKind::Passive,
                GhostKind::Passive.behaviour(3.0),
                *position,
                *last_move,
            ));
        }
        registry
    }

    const TILE: Vec2 = Vec2::new(5.0, 5.0);

    #[test]
    fn lone_instance_splits_with_reflected_move() {
        let registry = registry_of(&[(TILE, Vec2::new(1.0, 0.0))]);
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal125)];
        let events = classify(&registry, &tiles, DEFAULT_POSITION_TOLERANCE);
        assert_eq!(
            events,
            vec![SplitterEvent::Split {
                mode: 0,
                orientation: SplitterOrientation::Diagonal125,
                cell: TILE,
                reflected_move: Vec2::new(0.0, 1.0),
            }]
        );
    }

    #[test]
    fn opposite_diagonal_arrivals_recombine() {
        // (1,0) + (0,1) = (1,1): the 125° signature.
        let registry = registry_of(&[
            (Vec2::new(1.0, 1.0), Vec2::new(-1.0, 0.0)),
            (TILE, Vec2::new(1.0, 0.0)),
            (TILE, Vec2::new(0.0, 1.0)),
        ]);
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal125)];
        let events = classify(&registry, &tiles, DEFAULT_POSITION_TOLERANCE);
        assert_eq!(
            events,
            vec![SplitterEvent::Coincidence {
                mode_a: 1,
                mode_b: 2,
                orientation: SplitterOrientation::Diagonal125,
                cell: TILE,
            }]
        );
    }

    #[test]
    fn wrong_signature_splits_both() {
        // (1,0) + (0,1) does not match the 45° signature.
        let registry = registry_of(&[(TILE, Vec2::new(1.0, 0.0)), (TILE, Vec2::new(0.0, 1.0))]);
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        let events = classify(&registry, &tiles, DEFAULT_POSITION_TOLERANCE);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, SplitterEvent::Split { .. })));
    }

    #[test]
    fn third_arrival_is_deferred_not_paired_twice() {
        let registry = registry_of(&[
            (TILE, Vec2::new(1.0, 0.0)),
            (TILE, Vec2::new(0.0, 1.0)),
            (TILE, Vec2::new(0.0, 1.0)),
        ]);
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal125)];
        let events = classify(&registry, &tiles, DEFAULT_POSITION_TOLERANCE);
        assert_eq!(
            events,
            vec![SplitterEvent::Coincidence {
                mode_a: 0,
                mode_b: 1,
                orientation: SplitterOrientation::Diagonal125,
                cell: TILE,
            }]
        );
    }

    #[test]
    fn settled_instances_are_ignored() {
        let mut registry = registry_of(&[(TILE, Vec2::new(1.0, 0.0))]);
        if let Some(g) = registry.get_mut(0) {
            g.settle_on(TILE);
        }
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        assert!(classify(&registry, &tiles, DEFAULT_POSITION_TOLERANCE).is_empty());
    }

    #[test]
    fn instances_off_tile_do_nothing() {
        let registry = registry_of(&[(Vec2::new(5.5, 5.0), Vec2::new(1.0, 0.0))]);
        let tiles = [SplitterTile::new(TILE, SplitterOrientation::Diagonal45)];
        assert!(classify(&registry, &tiles, DEFAULT_POSITION_TOLERANCE).is_empty());
    }
}
