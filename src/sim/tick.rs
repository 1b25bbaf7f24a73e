//! Frame-stepped simulation loop
//!
//! [`Simulation`] owns the game state and is the only thing that mutates it.
//! Hosts call [`Simulation::step`] once per frame with the wall-clock delta;
//! everything else goes through the command methods.

use std::panic::{self, AssertUnwindSafe};

use glam::Vec2;
use serde::Serialize;
use thiserror::Error;

use super::ai;
use super::collision;
use super::effects;
use super::events::{EventListener, GameEvent};
use super::projectile::Projectile;
use super::state::{GameState, Phase};
use super::upgrades::{UpgradeError, UpgradeId};
use super::wave;
use crate::consts::*;
use crate::tuning::Tuning;
use crate::{direction_to, rotate};

/// Rejected command; the state is left untouched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("simulation has been destroyed")]
    Destroyed,
    #[error("command not valid in phase {0:?}")]
    InvalidPhase(Phase),
    #[error("no checkpoint to resume from")]
    NoCheckpoint,
    #[error("invalid play area {0}x{1}")]
    InvalidSize(f32, f32),
    #[error("invalid aim point ({0}, {1})")]
    InvalidTarget(f32, f32),
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
}

/// A step that could not complete; recovered by clearing transient entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepFault {
    #[error("structure state is not finite")]
    CorruptStructure,
    #[error("step panicked: {0}")]
    Panicked(String),
}

/// Read-only view of the run, for diagnostics and UI
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub phase: Phase,
    pub wave: u32,
    pub score: u64,
    pub kills_this_wave: u32,
    pub kill_threshold: u32,
    pub total_kills: u32,
    pub structure_health: f32,
    pub structure_max_health: f32,
    pub actors: usize,
    pub friendlies: usize,
    pub projectiles: usize,
    pub upgrades: Vec<(UpgradeId, u32)>,
    pub recoveries: u32,
    pub time: f32,
}

/// Last values pushed to listeners, to detect changes
#[derive(Debug, Clone, Copy, PartialEq)]
struct Broadcast {
    score: u64,
    health: f32,
    wave: u32,
}

/// The simulation core
pub struct Simulation {
    state: GameState,
    listeners: Vec<Box<dyn EventListener>>,
    outbox: Vec<GameEvent>,
    last_broadcast: Option<Broadcast>,
    recoveries: u32,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("phase", &self.state.phase)
            .field("wave", &self.state.run.wave)
            .field("listeners", &self.listeners.len())
            .field("recoveries", &self.recoveries)
            .finish()
    }
}

impl Simulation {
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        Self {
            state: GameState::new(seed, tuning),
            listeners: Vec::new(),
            outbox: Vec::new(),
            last_broadcast: None,
            recoveries: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Whether the host should keep calling `step`
    pub fn is_scheduling(&self) -> bool {
        self.state.phase == Phase::Running
    }

    pub fn subscribe(&mut self, listener: impl EventListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Take every event broadcast since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let s = &self.state;
        RunSnapshot {
            phase: s.phase,
            wave: s.run.wave,
            score: s.run.score,
            kills_this_wave: s.run.kills_this_wave,
            kill_threshold: s.run.kill_threshold,
            total_kills: s.run.total_kills,
            structure_health: s.structure.health,
            structure_max_health: s.structure.max_health,
            actors: s.actors.iter().filter(|a| a.active && !a.friendly).count(),
            friendlies: s.actors.iter().filter(|a| a.active && a.friendly).count(),
            projectiles: s.projectiles.len(),
            upgrades: s.catalog.iter().map(|u| (u.id(), u.level)).collect(),
            recoveries: self.recoveries,
            time: s.time,
        }
    }

    fn ensure_alive(&self) -> Result<(), CommandError> {
        if self.state.phase == Phase::Destroyed {
            Err(CommandError::Destroyed)
        } else {
            Ok(())
        }
    }

    // === Commands ===

    /// Begin a run (or a fresh one after a win/loss)
    pub fn start(&mut self) -> Result<(), CommandError> {
        self.ensure_alive()?;
        match self.state.phase {
            Phase::Idle | Phase::Won | Phase::Lost => {}
            other => return Err(CommandError::InvalidPhase(other)),
        }
        self.state.reset_run();
        self.state.phase = Phase::Running;
        self.last_broadcast = None;
        log::info!("Run started (seed {})", self.state.seed);
        self.broadcast();
        Ok(())
    }

    /// Stop stepping until `resume`
    pub fn pause(&mut self) -> Result<(), CommandError> {
        self.ensure_alive()?;
        match self.state.phase {
            Phase::Running => {
                self.state.phase = Phase::Paused;
                log::info!("Paused");
                Ok(())
            }
            // already stopped for the upgrade choice
            Phase::AwaitingUpgradeChoice | Phase::Paused => Ok(()),
            other => Err(CommandError::InvalidPhase(other)),
        }
    }

    /// Resume from a host pause, or leave the upgrade pause without choosing
    pub fn resume(&mut self) -> Result<(), CommandError> {
        self.ensure_alive()?;
        match self.state.phase {
            Phase::Paused => {
                self.state.phase = Phase::Running;
                log::info!("Resumed");
                Ok(())
            }
            Phase::AwaitingUpgradeChoice => {
                if !wave::resume_from_checkpoint(&mut self.state) {
                    log::warn!("Resume requested without a checkpoint");
                    return Err(CommandError::NoCheckpoint);
                }
                self.broadcast();
                Ok(())
            }
            other => {
                log::warn!("Ignoring resume in phase {:?}", other);
                Err(CommandError::InvalidPhase(other))
            }
        }
    }

    /// Release listeners and entities. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.state.phase == Phase::Destroyed {
            return;
        }
        self.listeners.clear();
        self.outbox.clear();
        self.state.events.clear();
        self.state.clear_transients();
        self.state.checkpoint = None;
        self.state.offered.clear();
        self.state.phase = Phase::Destroyed;
        log::info!("Simulation destroyed");
    }

    /// Fire a volley from the structure toward a point
    pub fn shoot_at(&mut self, x: f32, y: f32) -> Result<(), CommandError> {
        self.ensure_alive()?;
        if self.state.phase != Phase::Running {
            return Err(CommandError::InvalidPhase(self.state.phase));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(CommandError::InvalidTarget(x, y));
        }
        fire_volley(&mut self.state, Vec2::new(x, y));
        Ok(())
    }

    /// Take one level of the named upgrade and resume the next wave
    pub fn select_upgrade(&mut self, key: &str) -> Result<(), CommandError> {
        self.ensure_alive()?;
        if self.state.phase != Phase::AwaitingUpgradeChoice {
            return Err(CommandError::InvalidPhase(self.state.phase));
        }
        let Some(id) = UpgradeId::from_key(key) else {
            log::warn!("Upgrade selection rejected: unknown `{}`", key);
            return Err(UpgradeError::Unknown(key.to_string()).into());
        };
        if !self.state.offered.iter().any(|o| o.id == id) {
            log::warn!("Upgrade selection rejected: {:?} was not offered", id);
            return Err(UpgradeError::NotOffered(id).into());
        }
        if let Err(e) = self.state.catalog.select(id) {
            log::warn!("Upgrade selection rejected: {}", e);
            return Err(e.into());
        }
        self.resume()
    }

    /// Decline the offered upgrades and resume the next wave
    pub fn skip_upgrade(&mut self) -> Result<(), CommandError> {
        self.ensure_alive()?;
        if self.state.phase != Phase::AwaitingUpgradeChoice {
            return Err(CommandError::InvalidPhase(self.state.phase));
        }
        log::info!("Upgrade skipped");
        self.resume()
    }

    /// Change the play area; the structure re-centres
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), CommandError> {
        self.ensure_alive()?;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(CommandError::InvalidSize(width, height));
        }
        self.state.bounds.width = width;
        self.state.bounds.height = height;
        self.state.structure.pos = self.state.bounds.center();
        Ok(())
    }

    // === Frame ===

    /// Advance one frame. Returns false when nothing was simulated.
    pub fn step(&mut self, wall_delta_ms: f32) -> bool {
        if self.state.phase != Phase::Running {
            return false;
        }

        let dt = if wall_delta_ms.is_finite() {
            wall_delta_ms.clamp(0.0, MAX_FRAME_DELTA_MS) / 1000.0
        } else {
            0.0
        };

        let state = &mut self.state;
        let result = panic::catch_unwind(AssertUnwindSafe(|| step_inner(state, dt)))
            .unwrap_or_else(|payload| Err(StepFault::Panicked(panic_message(payload.as_ref()))));

        if let Err(fault) = result {
            self.recover(fault);
        }

        self.broadcast();
        true
    }

    fn recover(&mut self, fault: StepFault) {
        self.recoveries += 1;
        log::warn!("Recovering from step fault ({}): {}", self.recoveries, fault);
        self.state.clear_transients();
        if !self.state.structure.health.is_finite() {
            self.state.structure.health = self.state.structure.max_health;
        }
        if !self.state.structure.pos.is_finite() {
            self.state.structure.pos = self.state.bounds.center();
        }
        if self.state.phase == Phase::WaveClearPending {
            self.state.phase = Phase::Running;
        }
        self.state.emit(GameEvent::Recovered);
    }

    /// Queue change notifications and hand every pending event out
    fn broadcast(&mut self) {
        let now = Broadcast {
            score: self.state.run.score,
            health: self.state.structure.health,
            wave: self.state.run.wave,
        };
        let prev = self.last_broadcast;
        if prev.map(|p| p.score) != Some(now.score) {
            self.state.emit(GameEvent::ScoreChanged { score: now.score });
        }
        if prev.map(|p| p.health) != Some(now.health) {
            self.state.emit(GameEvent::HealthChanged {
                health: now.health,
                max_health: self.state.structure.max_health,
            });
        }
        if prev.map(|p| p.wave) != Some(now.wave) {
            self.state.emit(GameEvent::WaveChanged { wave: now.wave });
        }
        self.last_broadcast = Some(now);

        let events = std::mem::take(&mut self.state.events);
        for event in &events {
            for listener in self.listeners.iter_mut() {
                listener.on_event(event);
            }
        }
        self.outbox.extend(events);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// One frame in fixed order: aim, spawn, structure, AI, projectiles and
/// collisions, effects, compaction, progress
fn step_inner(state: &mut GameState, dt: f32) -> Result<(), StepFault> {
    state.time += dt;

    auto_aim(state, dt);

    wave::update_spawning(state, dt);

    state.structure.update(dt);
    if !state.structure.pos.is_finite() || !state.structure.health.is_finite() {
        return Err(StepFault::CorruptStructure);
    }

    let outcome = ai::update_actors(state, dt);
    wave::fulfil_all(state, outcome.spawns);
    effects::resolve_deaths(state, outcome.deaths);

    {
        let GameState {
            projectiles,
            actors,
            bounds,
            tuning,
            ..
        } = state;
        for p in projectiles.iter_mut() {
            p.advance(dt, bounds, actors, tuning);
        }
    }
    collision::resolve_collisions(state);

    effects::update(state, dt);

    compact(state);

    wave::check_progress(state);
    Ok(())
}

/// Drop inactive entities and enforce population caps (newest kept)
fn compact(state: &mut GameState) {
    state.actors.retain(|a| a.active);
    state.projectiles.retain(|p| p.active);
    state.ephemeral.retain(|e| e.ttl > 0.0);

    trim_oldest(&mut state.actors, MAX_ACTORS);
    trim_oldest(&mut state.projectiles, MAX_PROJECTILES);
    trim_oldest(&mut state.ephemeral, MAX_EPHEMERAL);
}

fn trim_oldest<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}

/// Automatic fire at the most pressing target, when the upgrade is held
fn auto_aim(state: &mut GameState, dt: f32) {
    let Some(cooldown) = state.run.modifiers.auto_aim_cooldown else {
        return;
    };
    state.run.auto_aim_timer -= dt;
    if state.run.auto_aim_timer > 0.0 {
        return;
    }

    if let Some(target) = pick_auto_target(state) {
        fire_volley(state, target);
        state.run.auto_aim_timer = cooldown;
    }
}

/// Highest priority first, then nearest to the structure
fn pick_auto_target(state: &GameState) -> Option<Vec2> {
    let origin = state.structure.pos;
    state
        .actors
        .iter()
        .filter(|a| a.active && !a.friendly)
        .max_by(|a, b| {
            a.auto_target_priority()
                .cmp(&b.auto_target_priority())
                .then_with(|| {
                    let da = a.pos.distance(origin);
                    let db = b.pos.distance(origin);
                    db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
                })
        })
        .map(|a| a.pos)
}

/// Spawn `projectile_count` projectiles fanned around the aim line
fn fire_volley(state: &mut GameState, target: Vec2) {
    let m = &state.run.modifiers;
    let t = &state.tuning;
    let origin = state.structure.pos;
    let aim = direction_to(origin, target, Vec2::Y);
    let count = m.projectile_count.max(1);
    let base_speed = t.projectile_speed;
    let speed = base_speed * m.speed_multiplier();

    for k in 0..count {
        let offset = (k as f32 - (count - 1) as f32 * 0.5) * MULTI_SHOT_SPREAD;
        let mut p = Projectile::new(origin, rotate(aim, offset), speed, t.projectile_size, t.projectile_damage)
            .with_bounces(m.bullet_bounces);
        p.base_speed = base_speed;
        p.damage_multiplier = m.damage_multiplier();
        p.ghost = m.ghost;
        p.homing = m.homing;
        p.bounce_speed_growth = t.hitscan_bounce_speed;
        p.bounce_damage_growth = t.hitscan_bounce_damage;
        state.projectiles.push(p);
    }

    state.emit(GameEvent::Shot { origin, count });
}
