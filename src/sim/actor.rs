//! Actors: hostile attackers and friendly summons
//!
//! An actor owns its own effect ledger so delayed and death-triggered effects
//! travel with it rather than living in a side table.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::circles_overlap;

/// Actor variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorKind {
    #[default]
    Baseline,
    Fast,
    Armored,
    /// Stops at range and fires at the structure
    Ranged,
    /// Stops at range and calls in minions
    Summoner,
    /// Small, splits once on death
    Minion,
}

impl ActorKind {
    /// Projectiles may ricochet off this kind
    pub fn can_bounce_off(self) -> bool {
        self != ActorKind::Minion
    }

    /// Ghost projectiles may pass through this kind
    pub fn can_be_pierced(self) -> bool {
        self != ActorKind::Minion
    }

    /// Auto-aim grouping; higher is shot first
    pub fn auto_target_priority(self) -> i32 {
        match self {
            ActorKind::Ranged => 1,
            ActorKind::Summoner => -1,
            _ => 0,
        }
    }
}

/// Resolved stats for a freshly created actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorStats {
    pub health: f32,
    pub speed: f32,
    pub damage: f32,
    pub size: f32,
}

/// Area burst waiting on a timer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingArea {
    pub timer: f32,
    pub damage: f32,
    pub radius: f32,
}

/// Flat bonus damage waiting on a timer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingCritical {
    pub timer: f32,
    pub damage: f32,
}

/// Timed effects that came due this frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerExpiry {
    pub area: Option<PendingArea>,
    pub critical: Option<f32>,
}

/// Per-actor marks and timers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectLedger {
    pub explosive: Option<PendingArea>,
    pub critical: Option<PendingCritical>,
    pub aftermath: bool,
    pub necromantic: bool,
    /// Life-steal hits taken so far
    pub drain_hits: u8,
}

impl EffectLedger {
    /// Count down timers, returning anything that expired
    pub fn advance(&mut self, dt: f32) -> LedgerExpiry {
        let mut expiry = LedgerExpiry::default();

        if let Some(area) = self.explosive.as_mut() {
            area.timer -= dt;
            if area.timer <= 0.0 {
                expiry.area = self.explosive.take();
            }
        }
        if let Some(crit) = self.critical.as_mut() {
            crit.timer -= dt;
            if crit.timer <= 0.0 {
                expiry.critical = self.critical.take().map(|c| c.damage);
            }
        }

        expiry
    }
}

/// Outcome of a single damage application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    /// Health actually removed
    pub dealt: f32,
    /// True only on the call that took health to zero
    pub killed: bool,
}

/// A hostile or friendly actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: u32,
    pub kind: ActorKind,
    pub pos: Vec2,
    pub size: f32,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    /// Contact damage (per hit vs structure, per second for friendlies)
    pub damage: f32,
    pub friendly: bool,
    pub active: bool,
    /// 0 for originals; split children are 1 and never split again
    pub generation: u8,
    /// Seconds until the next ranged shot or summon
    pub action_cooldown: f32,
    /// Damage of the hit that killed this actor
    pub killing_blow: f32,
    pub ledger: EffectLedger,
    dead: bool,
}

impl Actor {
    pub fn new(id: u32, kind: ActorKind, pos: Vec2, stats: ActorStats) -> Self {
        let health = stats.health.max(1.0);
        Self {
            id,
            kind,
            pos,
            size: stats.size,
            health,
            max_health: health,
            speed: stats.speed,
            damage: stats.damage,
            friendly: false,
            active: true,
            generation: 0,
            action_cooldown: 0.0,
            killing_blow: 0.0,
            ledger: EffectLedger::default(),
            dead: false,
        }
    }

    pub fn can_bounce_off(&self) -> bool {
        self.kind.can_bounce_off()
    }

    pub fn can_be_pierced(&self) -> bool {
        self.kind.can_be_pierced()
    }

    pub fn auto_target_priority(&self) -> i32 {
        self.kind.auto_target_priority()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Minions of the first generation split on death
    pub fn splits_on_death(&self) -> bool {
        self.kind == ActorKind::Minion && self.generation == 0
    }

    /// Overlap test against a circle
    pub fn touches(&self, pos: Vec2, size: f32) -> bool {
        circles_overlap(self.pos, self.size, pos, size)
    }

    /// Apply damage, clamping stored health at zero.
    ///
    /// The kill is reported exactly once; later calls on a dead actor are
    /// no-ops. Non-finite or negative amounts are ignored.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.dead || !amount.is_finite() || amount <= 0.0 {
            return DamageOutcome {
                dealt: 0.0,
                killed: false,
            };
        }

        let dealt = amount.min(self.health);
        self.health = (self.health - amount).max(0.0);

        let killed = self.health <= 0.0;
        if killed {
            self.dead = true;
            self.active = false;
            self.killing_blow = amount;
            self.ledger.critical = None;
        }

        DamageOutcome { dealt, killed }
    }

    /// Retire without a kill (structure contact, cleanup)
    pub fn retire(&mut self) {
        self.active = false;
    }
}
