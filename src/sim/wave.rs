//! Wave controller
//!
//! Spawn cadence and actor mix per wave, kill-threshold tracking, and the
//! checkpoint/restore dance around the upgrade pause.

use glam::Vec2;
use rand::Rng;

use super::actor::{Actor, ActorKind, ActorStats};
use super::events::GameEvent;
use super::state::{GameState, Phase};
use crate::tuning::{KindFactors, Tuning};

/// Request to create an actor, produced by AI and the death path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub kind: ActorKind,
    pub pos: Vec2,
    pub friendly: bool,
    pub generation: u8,
    /// Explicit stats (split copies); `None` uses the current wave's stats
    pub stats: Option<ActorStats>,
}

impl SpawnRequest {
    pub fn hostile(kind: ActorKind, pos: Vec2) -> Self {
        Self {
            kind,
            pos,
            friendly: false,
            generation: 0,
            stats: None,
        }
    }
}

/// Cumulative probability table per wave bracket
fn kind_table(wave: u32) -> &'static [(ActorKind, f32)] {
    use ActorKind::*;
    match wave {
        0..=2 => &[(Baseline, 1.0)],
        3..=4 => &[(Baseline, 0.7), (Fast, 1.0)],
        5..=6 => &[(Baseline, 0.5), (Fast, 0.8), (Armored, 1.0)],
        7..=8 => &[(Baseline, 0.4), (Fast, 0.65), (Armored, 0.85), (Ranged, 1.0)],
        9..=10 => &[
            (Baseline, 0.35),
            (Fast, 0.55),
            (Armored, 0.7),
            (Ranged, 0.85),
            (Summoner, 1.0),
        ],
        _ => &[
            (Baseline, 0.3),
            (Fast, 0.5),
            (Armored, 0.65),
            (Ranged, 0.8),
            (Summoner, 0.9),
            (Minion, 1.0),
        ],
    }
}

/// Pick a kind for `wave` from a roll in `[0, 1)`
pub fn pick_kind(wave: u32, roll: f32) -> ActorKind {
    let table = kind_table(wave);
    table
        .iter()
        .find(|(_, cumulative)| roll < *cumulative)
        .or(table.last())
        .map(|(kind, _)| *kind)
        .unwrap_or_default()
}

/// Wave-scaled stats for a kind
pub fn stats_for(kind: ActorKind, wave: u32, tuning: &Tuning) -> ActorStats {
    let w = wave.saturating_sub(1) as f32;
    let health = tuning.actor_health + w * tuning.actor_health_per_wave;
    let speed = tuning.actor_speed + w * tuning.actor_speed_per_wave;
    let damage = tuning.actor_damage + w * tuning.actor_damage_per_wave;

    let f = match kind {
        ActorKind::Baseline => KindFactors::new(1.0, 1.0, 1.0, 1.0),
        ActorKind::Fast => tuning.fast,
        ActorKind::Armored => tuning.armored,
        ActorKind::Ranged => tuning.ranged,
        ActorKind::Summoner => tuning.summoner,
        ActorKind::Minion => tuning.minion,
    };

    ActorStats {
        health: health * f.health,
        speed: speed * f.speed,
        damage: damage * f.damage,
        size: tuning.actor_size * f.size,
    }
}

/// Random point on the play-area perimeter
fn edge_position<R: Rng + ?Sized>(w: f32, h: f32, rng: &mut R) -> Vec2 {
    let t: f32 = rng.random();
    match rng.random_range(0..4u8) {
        0 => Vec2::new(t * w, 0.0),
        1 => Vec2::new(w, t * h),
        2 => Vec2::new(t * w, h),
        _ => Vec2::new(0.0, t * h),
    }
}

/// Regular spawn check for this frame
pub fn update_spawning(state: &mut GameState, dt: f32) {
    let interval = state.tuning.spawn_interval(state.run.wave);
    state.run.spawn_timer += dt;
    if state.run.spawn_timer < interval {
        return;
    }

    let target = state.tuning.population_target(state.run.wave);
    if state.hostile_count() >= target {
        // hold the timer so the next free slot fills immediately
        state.run.spawn_timer = interval;
        return;
    }

    spawn_wave_actor(state);
    state.run.spawn_timer = 0.0;
}

/// Spawn one actor picked from the current wave's table
pub fn spawn_wave_actor(state: &mut GameState) -> u32 {
    let roll: f32 = state.rng.random();
    let kind = pick_kind(state.run.wave, roll);
    let pos = edge_position(state.bounds.width, state.bounds.height, &mut state.rng);
    state.run.spawned_this_wave += 1;
    fulfil(state, SpawnRequest::hostile(kind, pos))
}

/// Create the actor described by a request; returns its id
pub fn fulfil(state: &mut GameState, request: SpawnRequest) -> u32 {
    let stats = request
        .stats
        .unwrap_or_else(|| stats_for(request.kind, state.run.wave, &state.tuning));
    let id = state.next_entity_id();
    let mut actor = Actor::new(id, request.kind, request.pos, stats);
    actor.friendly = request.friendly;
    actor.generation = request.generation;
    log::debug!(
        "Spawned {:?} #{} at ({:.0}, {:.0}){}",
        request.kind,
        id,
        request.pos.x,
        request.pos.y,
        if request.friendly { " [friendly]" } else { "" }
    );
    state.actors.push(actor);
    id
}

pub fn fulfil_all(state: &mut GameState, requests: Vec<SpawnRequest>) {
    for request in requests {
        fulfil(state, request);
    }
}

/// Win/loss and kill-threshold check, run once at the end of a frame.
/// Clearing the final wave wins immediately instead of pausing for an upgrade.
pub fn check_progress(state: &mut GameState) {
    if state.phase != Phase::Running {
        return;
    }

    if state.structure.is_destroyed() {
        state.phase = Phase::Lost;
        log::info!("Structure destroyed on wave {} (score {})", state.run.wave, state.run.score);
        state.emit(GameEvent::GameOver {
            score: state.run.score,
            wave: state.run.wave,
        });
        return;
    }

    if state.run.kills_this_wave < state.run.kill_threshold {
        return;
    }

    state.phase = Phase::WaveClearPending;
    state.run.wave_completed = true;
    log::info!("Wave {} cleared", state.run.wave);

    // Nothing left to play for after the last wave
    if state.run.wave >= state.tuning.max_wave {
        advance_wave(state);
        return;
    }

    let choices = state.catalog.offer_choices(&mut state.rng);
    if choices.is_empty() {
        log::info!("No upgrades left; granting {} bonus", state.tuning.no_choice_bonus);
        state.run.score += state.tuning.no_choice_bonus;
        state.phase = Phase::Running;
        advance_wave(state);
        return;
    }

    state.checkpoint = Some(state.run.checkpoint());
    state.offered = choices.clone();
    state.phase = Phase::AwaitingUpgradeChoice;
    state.emit(GameEvent::UpgradeChoicesAvailable { choices });
}

/// Move to the next wave, or to `Won` past the last one
pub fn advance_wave(state: &mut GameState) {
    state.run.wave += 1;
    if state.run.wave > state.tuning.max_wave {
        state.run.wave = state.tuning.max_wave;
        state.phase = Phase::Won;
        log::info!("All {} waves cleared (score {})", state.tuning.max_wave, state.run.score);
        state.emit(GameEvent::GameWon {
            score: state.run.score,
            wave: state.run.wave,
        });
        return;
    }

    state.run.kills_this_wave = 0;
    state.run.spawned_this_wave = 0;
    state.run.kill_threshold = state.tuning.next_threshold(state.run.kill_threshold);
    state.run.wave_completed = false;
    state.run.spawn_timer = 0.0;
    state.phase = Phase::Running;
    log::info!(
        "Wave {} begins: threshold {}, population {}",
        state.run.wave,
        state.run.kill_threshold,
        state.tuning.population_target(state.run.wave)
    );
}

/// Leave the upgrade pause. Returns false when there is no checkpoint to consume.
pub fn resume_from_checkpoint(state: &mut GameState) -> bool {
    let Some(checkpoint) = state.checkpoint.take() else {
        return false;
    };

    state.run.restore(checkpoint);
    state.offered.clear();
    state.phase = Phase::Running;

    if state.run.wave_completed {
        advance_wave(state);
    }
    state.catalog.apply_all(&mut state.run.modifiers);

    if state.phase == Phase::Running {
        spawn_wave_actor(state);
    }
    true
}
