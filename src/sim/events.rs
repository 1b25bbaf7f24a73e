//! Outbound events
//!
//! The core never touches presentation state. Everything a renderer, audio
//! engine or UI needs is queued here during a step and handed out once per
//! step by the simulation loop.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::actor::ActorKind;
use super::upgrades::UpgradeOffer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreChanged { score: u64 },
    HealthChanged { health: f32, max_health: f32 },
    WaveChanged { wave: u32 },
    UpgradeChoicesAvailable { choices: Vec<UpgradeOffer> },
    GameOver { score: u64, wave: u32 },
    GameWon { score: u64, wave: u32 },

    /// Kill credit; `from_friendly` separates summon kills from player kills
    ActorKilled {
        id: u32,
        kind: ActorKind,
        pos: Vec2,
        from_friendly: bool,
    },
    /// A volley left the structure
    Shot { origin: Vec2, count: u32 },
    StructureHit { damage: f32 },
    RangedAttack { from: Vec2, damage: f32 },

    // Effect cues
    AreaBurst { pos: Vec2, radius: f32, damage: f32 },
    Implosion { pos: Vec2, radius: f32 },
    CriticalProc { pos: Vec2, damage: f32 },
    AftermathBurst { pos: Vec2, radius: f32, damage: f32 },
    Summon { pos: Vec2, friendly: bool },
    LifeSteal { amount: f32 },

    /// A step faulted and transient entities were cleared
    Recovered,
}

/// Anything that wants to observe the event stream
pub trait EventListener {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F: FnMut(&GameEvent)> EventListener for F {
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}
