//! Game state and core simulation types
//!
//! Everything the simulation loop owns lives in [`GameState`]. Upgrade effects
//! land in [`Modifiers`], a fixed set of named fields, one per effect.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::events::GameEvent;
use super::projectile::Projectile;
use super::upgrades::{UpgradeCatalog, UpgradeOffer};
use crate::consts::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::tuning::Tuning;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Constructed, not started
    Idle,
    /// Active gameplay
    Running,
    /// Paused by the host (no checkpoint involved)
    Paused,
    /// Kill threshold reached this frame; resolved before the frame ends
    WaveClearPending,
    /// Waiting on the player to pick (or skip) an upgrade
    AwaitingUpgradeChoice,
    /// Final wave cleared
    Won,
    /// Structure destroyed
    Lost,
    /// Torn down; accepts no further commands
    Destroyed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Won | Phase::Lost | Phase::Destroyed)
    }
}

/// Play area, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn contains_with_margin(&self, pos: Vec2, margin: f32) -> bool {
        pos.x >= -margin
            && pos.x <= self.width + margin
            && pos.y >= -margin
            && pos.y <= self.height + margin
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// The defended structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub pos: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub size: f32,
}

impl Structure {
    pub fn new(pos: Vec2, max_health: f32, size: f32) -> Self {
        Self {
            pos,
            health: max_health,
            max_health,
            size,
        }
    }

    /// Currently passive
    pub fn update(&mut self, _dt: f32) {}

    pub fn take_damage(&mut self, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.health = (self.health - amount).max(0.0);
        }
    }

    pub fn heal(&mut self, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.health = (self.health + amount).min(self.max_health);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn reset(&mut self) {
        self.health = self.max_health;
    }
}

/// Upgrade-derived fields. Each upgrade writes only its own entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub bullet_bounces: u32,
    pub projectile_count: u32,
    pub split: bool,
    pub ghost: bool,
    pub hitscan_speed: f32,
    pub bullet_time_speed: f32,
    pub bullet_time_damage: f32,
    /// Extra damage fraction per bounce already used
    pub trickster_bonus: f32,
    pub homing: bool,
    pub explosive_level: u32,
    pub implosive_level: u32,
    pub critical_level: u32,
    pub aftermath: bool,
    pub necromantic: bool,
    pub life_steal_level: u32,
    /// Seconds between automatic shots; `None` when auto-aim is off
    pub auto_aim_cooldown: Option<f32>,
    pub heavy_rounds_damage: f32,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            bullet_bounces: 0,
            projectile_count: 1,
            split: false,
            ghost: false,
            hitscan_speed: 1.0,
            bullet_time_speed: 1.0,
            bullet_time_damage: 1.0,
            trickster_bonus: 0.0,
            homing: false,
            explosive_level: 0,
            implosive_level: 0,
            critical_level: 0,
            aftermath: false,
            necromantic: false,
            life_steal_level: 0,
            auto_aim_cooldown: None,
            heavy_rounds_damage: 1.0,
        }
    }
}

/// One non-default modifier value, as stored in a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DerivedField {
    BulletBounces(u32),
    ProjectileCount(u32),
    Split(bool),
    Ghost(bool),
    HitscanSpeed(f32),
    BulletTimeSpeed(f32),
    BulletTimeDamage(f32),
    TricksterBonus(f32),
    Homing(bool),
    ExplosiveLevel(u32),
    ImplosiveLevel(u32),
    CriticalLevel(u32),
    Aftermath(bool),
    Necromantic(bool),
    LifeStealLevel(u32),
    AutoAimCooldown(Option<f32>),
    HeavyRoundsDamage(f32),
}

impl Modifiers {
    /// Combined projectile speed multiplier
    pub fn speed_multiplier(&self) -> f32 {
        self.hitscan_speed * self.bullet_time_speed
    }

    /// Combined projectile damage multiplier
    pub fn damage_multiplier(&self) -> f32 {
        self.bullet_time_damage * self.heavy_rounds_damage
    }

    /// Fields that differ from their defaults
    pub fn non_default(&self) -> Vec<DerivedField> {
        let d = Self::default();
        let mut out = Vec::new();
        macro_rules! diff {
            ($field:ident, $variant:ident) => {
                if self.$field != d.$field {
                    out.push(DerivedField::$variant(self.$field));
                }
            };
        }
        diff!(bullet_bounces, BulletBounces);
        diff!(projectile_count, ProjectileCount);
        diff!(split, Split);
        diff!(ghost, Ghost);
        diff!(hitscan_speed, HitscanSpeed);
        diff!(bullet_time_speed, BulletTimeSpeed);
        diff!(bullet_time_damage, BulletTimeDamage);
        diff!(trickster_bonus, TricksterBonus);
        diff!(homing, Homing);
        diff!(explosive_level, ExplosiveLevel);
        diff!(implosive_level, ImplosiveLevel);
        diff!(critical_level, CriticalLevel);
        diff!(aftermath, Aftermath);
        diff!(necromantic, Necromantic);
        diff!(life_steal_level, LifeStealLevel);
        diff!(auto_aim_cooldown, AutoAimCooldown);
        diff!(heavy_rounds_damage, HeavyRoundsDamage);
        out
    }

    pub fn set(&mut self, field: DerivedField) {
        match field {
            DerivedField::BulletBounces(v) => self.bullet_bounces = v,
            DerivedField::ProjectileCount(v) => self.projectile_count = v,
            DerivedField::Split(v) => self.split = v,
            DerivedField::Ghost(v) => self.ghost = v,
            DerivedField::HitscanSpeed(v) => self.hitscan_speed = v,
            DerivedField::BulletTimeSpeed(v) => self.bullet_time_speed = v,
            DerivedField::BulletTimeDamage(v) => self.bullet_time_damage = v,
            DerivedField::TricksterBonus(v) => self.trickster_bonus = v,
            DerivedField::Homing(v) => self.homing = v,
            DerivedField::ExplosiveLevel(v) => self.explosive_level = v,
            DerivedField::ImplosiveLevel(v) => self.implosive_level = v,
            DerivedField::CriticalLevel(v) => self.critical_level = v,
            DerivedField::Aftermath(v) => self.aftermath = v,
            DerivedField::Necromantic(v) => self.necromantic = v,
            DerivedField::LifeStealLevel(v) => self.life_steal_level = v,
            DerivedField::AutoAimCooldown(v) => self.auto_aim_cooldown = v,
            DerivedField::HeavyRoundsDamage(v) => self.heavy_rounds_damage = v,
        }
    }
}

/// Aggregated mutable run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub score: u64,
    /// 1-based wave number
    pub wave: u32,
    pub kills_this_wave: u32,
    pub kill_threshold: u32,
    pub total_kills: u32,
    pub spawned_this_wave: u32,
    /// Seconds since the last regular spawn
    pub spawn_timer: f32,
    /// Seconds until auto-aim may fire again
    pub auto_aim_timer: f32,
    pub wave_completed: bool,
    pub modifiers: Modifiers,
}

impl RunState {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            score: 0,
            wave: 1,
            kills_this_wave: 0,
            kill_threshold: tuning.kill_threshold_base,
            total_kills: 0,
            spawned_this_wave: 0,
            spawn_timer: 0.0,
            auto_aim_timer: 0.0,
            wave_completed: false,
            modifiers: Modifiers::default(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            wave: self.wave,
            score: self.score,
            kills_this_wave: self.kills_this_wave,
            kill_threshold: self.kill_threshold,
            wave_completed: self.wave_completed,
            modifiers: self.modifiers.non_default(),
        }
    }

    /// Overwrite from a checkpoint. Modifiers not in the checkpoint revert to defaults.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.wave = checkpoint.wave;
        self.score = checkpoint.score;
        self.kills_this_wave = checkpoint.kills_this_wave;
        self.kill_threshold = checkpoint.kill_threshold;
        self.wave_completed = checkpoint.wave_completed;
        self.modifiers = Modifiers::default();
        for field in checkpoint.modifiers {
            self.modifiers.set(field);
        }
    }
}

/// Partial run-state snapshot taken before an upgrade pause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub wave: u32,
    pub score: u64,
    pub kills_this_wave: u32,
    pub kill_threshold: u32,
    pub wave_completed: bool,
    pub modifiers: Vec<DerivedField>,
}

/// Short-lived visual marker (bursts, procs); no gameplay effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ephemeral {
    pub kind: EphemeralKind,
    pub pos: Vec2,
    pub radius: f32,
    /// Seconds left
    pub ttl: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EphemeralKind {
    AreaBurst,
    Implosion,
    Critical,
    Aftermath,
    Summon,
}

/// Complete game state owned by the simulation loop
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub bounds: Bounds,
    pub phase: Phase,
    pub structure: Structure,
    /// Active actors (ordered by id)
    pub actors: Vec<Actor>,
    pub projectiles: Vec<Projectile>,
    pub ephemeral: Vec<Ephemeral>,
    pub run: RunState,
    pub catalog: UpgradeCatalog,
    /// Taken before an upgrade pause, consumed on resume
    pub checkpoint: Option<Checkpoint>,
    /// Choices currently on offer
    pub offered: Vec<UpgradeOffer>,
    /// Outbound events queued during the current step
    pub events: Vec<GameEvent>,
    /// Simulated seconds since start
    pub time: f32,
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let bounds = Bounds::default();
        let structure = Structure::new(bounds.center(), tuning.structure_health, tuning.structure_size);
        let run = RunState::new(&tuning);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            bounds,
            phase: Phase::Idle,
            structure,
            actors: Vec::new(),
            projectiles: Vec::new(),
            ephemeral: Vec::new(),
            run,
            catalog: UpgradeCatalog::new(),
            checkpoint: None,
            offered: Vec::new(),
            events: Vec::new(),
            time: 0.0,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID. IDs are never reused, even across restarts.
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drop every actor, projectile and visual marker
    pub fn clear_transients(&mut self) {
        self.actors.clear();
        self.projectiles.clear();
        self.ephemeral.clear();
    }

    /// Fresh run on the same world: full health, wave 1, no upgrades
    pub fn reset_run(&mut self) {
        self.clear_transients();
        self.structure.reset();
        self.structure.pos = self.bounds.center();
        self.run = RunState::new(&self.tuning);
        self.catalog.reset();
        self.checkpoint = None;
        self.offered.clear();
        self.time = 0.0;
    }

    pub fn hostile_count(&self) -> usize {
        self.actors.iter().filter(|a| a.active && !a.friendly).count()
    }

    pub fn actor_index(&self, id: u32) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_health_clamped() {
        let mut s = Structure::new(Vec2::ZERO, 100.0, 60.0);
        s.take_damage(150.0);
        assert_eq!(s.health, 0.0);
        assert!(s.is_destroyed());
        s.heal(500.0);
        assert_eq!(s.health, 100.0);
        s.take_damage(f32::NAN);
        assert_eq!(s.health, 100.0);
    }

    #[test]
    fn checkpoint_keeps_only_non_default_modifiers() {
        let mut run = RunState::new(&Tuning::default());
        run.modifiers.bullet_bounces = 3;
        run.modifiers.homing = true;
        run.score = 420;
        let cp = run.checkpoint();
        assert_eq!(
            cp.modifiers,
            vec![DerivedField::BulletBounces(3), DerivedField::Homing(true)]
        );

        let mut other = RunState::new(&Tuning::default());
        other.modifiers.ghost = true;
        other.restore(cp);
        assert_eq!(other.score, 420);
        assert_eq!(other.modifiers.bullet_bounces, 3);
        assert!(other.modifiers.homing);
        assert!(!other.modifiers.ghost);
    }

    #[test]
    fn multipliers_compose() {
        let m = Modifiers {
            hitscan_speed: 2.0,
            bullet_time_speed: 0.5,
            bullet_time_damage: 1.4,
            heavy_rounds_damage: 1.2,
            ..Default::default()
        };
        assert!((m.speed_multiplier() - 1.0).abs() < 1e-6);
        assert!((m.damage_multiplier() - 1.68).abs() < 1e-5);
    }

    #[test]
    fn ids_monotonic_across_reset() {
        let mut state = GameState::new(1, Tuning::default());
        let a = state.next_entity_id();
        state.reset_run();
        let b = state.next_entity_id();
        assert!(b > a);
    }
}
