//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Wall-clock deltas clamped before use
//! - Seeded RNG only
//! - Stable iteration order (by insertion, which is entity ID order)
//! - No rendering, audio or platform dependencies

pub mod actor;
pub mod ai;
pub mod collision;
pub mod effects;
pub mod events;
pub mod projectile;
pub mod state;
pub mod tick;
pub mod upgrades;
pub mod wave;

pub use actor::{Actor, ActorKind, ActorStats};
pub use events::{EventListener, GameEvent};
pub use projectile::Projectile;
pub use state::{Bounds, Checkpoint, GameState, Modifiers, Phase, Structure};
pub use tick::{CommandError, RunSnapshot, Simulation, StepFault};
pub use upgrades::{UpgradeCatalog, UpgradeError, UpgradeId, UpgradeOffer};
pub use wave::SpawnRequest;
