// src/lib.rs

//! `qghost` - the superposition engine behind a quantum-ghost arcade game
//!
//! A quantum ghost is one normalized amplitude vector over a truncated Fock
//! space together with the ordered list of visible instances bound to its
//! modes. Splitter tiles branch and recombine it; the player's measurement
//! collapses it.

pub mod config;
pub mod core;
pub mod operations;
pub mod simulation;
pub mod validation;

// Re-export the most common types for easier top-level use
pub use config::{ConfigError, EngineConfig, load_engine_config, load_engine_config_from_env};
pub use core::{AmplitudeVector, EngineError, GhostId, InstanceId, Vec2};
pub use operations::{BeamSplitter, BeamSplitters, SplitterOrientation, SplitterTile};
pub use simulation::{
    GhostKind, MeasurementOutcome, NullSink, PlayerView, QuantumGhost, RecordingSink, RenderSink, Shot,
    Simulator, TickContext, TickReport, Trap,
};
pub use validation::{check_normalization, check_registry_consistency, total_probability, validate_state};

// Example 1: A ghost walks onto a splitter and branches
// Demonstrates the tick loop: the ghost's single instance stands on a 45°
// tile, splits into two equally likely branches, and the render sink is told
// about the new instance.
/// ```
/// use qghost::{
///     EngineConfig, EngineError, GhostKind, PlayerView, RecordingSink, Simulator, SplitterOrientation,
///     SplitterTile, TickContext, Vec2,
/// };
///
/// fn main() -> Result<(), EngineError> {
///     let config = EngineConfig { attack_probability: 0.0, trap_probability: 0.0, ..EngineConfig::default() };
///     let mut sim = Simulator::with_seed(config, 7)?;
///     let mut sink = RecordingSink::new();
///
///     let tile = Vec2::new(3.0, 3.0);
///     let ghost = sim.spawn_ghost_of(GhostKind::Aggressive, tile, &mut sink)?;
///
///     let tiles = [SplitterTile::new(tile, SplitterOrientation::Diagonal45)];
///     let mut traps = Vec::new();
///     let mut ctx = TickContext {
///         player: PlayerView::new(Vec2::new(20.0, 20.0), 1.5),
///         splitters: &tiles,
///         shots: &mut [],
///         traps: &mut traps,
///     };
///     let report = sim.tick(&mut ctx, &mut sink)?;
///
///     assert_eq!(report.spawned().len(), 1);
///     assert_eq!(sink.attached_count(), 2);
///     let state = sim.ghost(ghost).map(|g| g.superposition().state().clone());
///     assert_eq!(state.map(|s| s.rank()), Some(2));
///     Ok(())
/// }
/// ```
#[doc(hidden)]
const _: () = ();

// Example 2: Measuring a split ghost
// After the split the player measures within range: exactly one branch
// survives and the other is detached from rendering.
/// ```
/// use qghost::{
///     EngineConfig, EngineError, GhostKind, PlayerView, RecordingSink, Simulator, SplitterOrientation,
///     SplitterTile, TickContext, Vec2,
/// };
///
/// fn main() -> Result<(), EngineError> {
///     let config = EngineConfig { attack_probability: 0.0, trap_probability: 0.0, ..EngineConfig::default() };
///     let mut sim = Simulator::with_seed(config, 11)?;
///     let mut sink = RecordingSink::new();
///     let tile = Vec2::new(0.0, 0.0);
///     sim.spawn_ghost_of(GhostKind::Passive, tile, &mut sink)?;
///
///     let tiles = [SplitterTile::new(tile, SplitterOrientation::Diagonal125)];
///     let mut traps = Vec::new();
///     let mut ctx = TickContext {
///         player: PlayerView::new(Vec2::new(20.0, 20.0), 1.5),
///         splitters: &tiles,
///         shots: &mut [],
///         traps: &mut traps,
///     };
///     sim.tick(&mut ctx, &mut sink)?;
///
///     let outcome = sim.measure(&PlayerView::new(tile, 1.5), &mut sink)?;
///     match outcome {
///         Some(outcome) => {
///             assert_eq!(outcome.survivors.len(), 1);
///             assert_eq!(outcome.removed.len(), 1);
///             assert!(!sink.is_attached(outcome.removed[0]));
///         }
///         None => panic!("a two-branch ghost in range must collapse"),
///     }
///     Ok(())
/// }
/// ```
#[doc(hidden)]
const _: () = ();
