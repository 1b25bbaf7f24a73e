//! On-hit and on-death effects
//!
//! On-hit modifiers run in a fixed order for every hit, before damage lands:
//!
//! 1. life steal
//! 2. critical mark
//! 3. explosive mark
//! 4. aftermath mark
//! 5. necromantic mark
//! 6. implosive pull
//! 7. split
//!
//! Deaths are processed from a queue so area damage that kills further actors
//! resolves in the same frame, and every actor goes through the death path once.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;

use super::actor::{ActorKind, ActorStats, PendingArea, PendingCritical};
use super::events::GameEvent;
use super::projectile::Projectile;
use super::state::{Ephemeral, EphemeralKind, GameState};
use super::wave::{self, SpawnRequest};
use crate::direction_to;

/// How long visual markers linger (seconds)
pub const EPHEMERAL_TTL: f32 = 0.4;

/// Who gets credit for a kill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSource {
    Player,
    Friendly,
}

/// An actor whose health reached zero this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death {
    pub actor_id: u32,
    pub source: KillSource,
}

impl Death {
    pub fn by_player(actor_id: u32) -> Self {
        Self {
            actor_id,
            source: KillSource::Player,
        }
    }

    pub fn by_friendly(actor_id: u32) -> Self {
        Self {
            actor_id,
            source: KillSource::Friendly,
        }
    }
}

/// What the resolver knows about the striking projectile
#[derive(Debug, Clone, Copy)]
pub struct HitContext {
    /// Damage this hit deals, after every per-hit bonus
    pub damage: f32,
    /// Projectile's raw damage before this hit
    pub raw_damage: f32,
    pub damage_multiplier: f32,
    pub speed: f32,
    pub size: f32,
    /// Split children can't split again
    pub disabled: bool,
}

fn push_ephemeral(state: &mut GameState, kind: EphemeralKind, pos: Vec2, radius: f32) {
    state.ephemeral.push(Ephemeral {
        kind,
        pos,
        radius,
        ttl: EPHEMERAL_TTL,
    });
}

/// Run every enabled on-hit modifier against `target`. Returns the split
/// projectile, if one was spawned.
pub fn apply_on_hit(state: &mut GameState, target: usize, hit: &HitContext) -> Option<Projectile> {
    let m = state.run.modifiers.clone();
    let tuning = state.tuning.clone();
    let target_id = state.actors[target].id;
    let center = state.actors[target].pos;

    if m.life_steal_level > 0 && state.actors[target].ledger.drain_hits < tuning.life_steal_max_hits {
        state.actors[target].ledger.drain_hits += 1;
        let amount = state.structure.max_health * tuning.life_steal_per_level * m.life_steal_level as f32;
        state.structure.heal(amount);
        state.emit(GameEvent::LifeSteal { amount });
    }

    let ledger = &mut state.actors[target].ledger;
    if m.critical_level > 0 && ledger.critical.is_none() {
        ledger.critical = Some(PendingCritical {
            timer: tuning.critical_delay,
            damage: tuning.critical_damage_per_level * m.critical_level as f32,
        });
    }
    if m.explosive_level > 0 && ledger.explosive.is_none() {
        ledger.explosive = Some(PendingArea {
            timer: tuning.explosive_delay,
            damage: hit.damage * tuning.explosive_payload,
            radius: tuning.explosive_radius_per_level * m.explosive_level as f32,
        });
    }
    if m.aftermath {
        ledger.aftermath = true;
    }
    if m.necromantic {
        ledger.necromantic = true;
    }

    if m.implosive_level > 0 {
        let radius = tuning.implosive_radius_per_level * (m.implosive_level as f32 * 0.8);
        for other in state.actors.iter_mut() {
            if !other.active || other.friendly || other.id == target_id {
                continue;
            }
            let dist = other.pos.distance(center);
            if dist < radius && dist > f32::EPSILON {
                let pull = (1.0 - dist / radius) * tuning.implosive_strength;
                other.pos += (center - other.pos) * pull;
            }
        }
        push_ephemeral(state, EphemeralKind::Implosion, center, radius);
        state.emit(GameEvent::Implosion { pos: center, radius });
    }

    if m.split && !hit.disabled {
        return split_projectile(state, target_id, center, hit);
    }
    None
}

fn split_projectile(state: &mut GameState, from_id: u32, from: Vec2, hit: &HitContext) -> Option<Projectile> {
    let candidates: Vec<Vec2> = state
        .actors
        .iter()
        .filter(|a| a.active && !a.friendly && a.id != from_id)
        .map(|a| a.pos)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let aim = candidates[state.rng.random_range(0..candidates.len())];

    let tuning = &state.tuning;
    let dir = direction_to(from, aim, Vec2::X);
    let mut p = Projectile::new(
        from,
        dir,
        hit.speed,
        hit.size * tuning.split_size_factor,
        hit.raw_damage * tuning.split_damage_factor,
    );
    p.damage_multiplier = hit.damage_multiplier;
    p.disabled = true;
    p.last_hit = Some(from_id);
    Some(p)
}

/// Damage every hostile within `radius` of `center`; returns resulting deaths.
/// With `falloff`, damage scales down linearly to zero at the edge.
pub fn area_damage(
    state: &mut GameState,
    center: Vec2,
    radius: f32,
    damage: f32,
    falloff: bool,
) -> Vec<Death> {
    let mut deaths = Vec::new();
    if radius <= 0.0 {
        return deaths;
    }
    for actor in state.actors.iter_mut() {
        if !actor.active || actor.friendly {
            continue;
        }
        let dist = actor.pos.distance(center);
        if dist > radius {
            continue;
        }
        let amount = if falloff {
            damage * (1.0 - dist / radius)
        } else {
            damage
        };
        if actor.take_damage(amount).killed {
            deaths.push(Death::by_player(actor.id));
        }
    }
    deaths
}

fn detonate(state: &mut GameState, pos: Vec2, area: PendingArea) -> Vec<Death> {
    push_ephemeral(state, EphemeralKind::AreaBurst, pos, area.radius);
    state.emit(GameEvent::AreaBurst {
        pos,
        radius: area.radius,
        damage: area.damage,
    });
    area_damage(state, pos, area.radius, area.damage, true)
}

/// Credit kills and run death-triggered effects, including any deaths they cause
pub fn resolve_deaths(state: &mut GameState, deaths: Vec<Death>) {
    let mut queue: VecDeque<Death> = deaths.into();
    let mut spawns = Vec::new();

    while let Some(death) = queue.pop_front() {
        let Some(idx) = state.actor_index(death.actor_id) else {
            continue;
        };
        // Take the ledger so nothing fires twice
        let ledger = std::mem::take(&mut state.actors[idx].ledger);
        let actor = state.actors[idx].clone();

        if actor.friendly {
            log::debug!("Friendly #{} fell", actor.id);
            continue;
        }

        state.run.kills_this_wave += 1;
        state.run.total_kills += 1;
        state.run.score += state.tuning.score_per_kill * state.run.wave as u64;
        state.emit(GameEvent::ActorKilled {
            id: actor.id,
            kind: actor.kind,
            pos: actor.pos,
            from_friendly: death.source == KillSource::Friendly,
        });

        if let Some(area) = ledger.explosive {
            queue.extend(detonate(state, actor.pos, area));
        }

        if ledger.aftermath {
            let radius = state.tuning.aftermath_radius;
            let damage = actor.killing_blow * state.tuning.aftermath_multiplier;
            push_ephemeral(state, EphemeralKind::Aftermath, actor.pos, radius);
            state.emit(GameEvent::AftermathBurst {
                pos: actor.pos,
                radius,
                damage,
            });
            queue.extend(area_damage(state, actor.pos, radius, damage, false));
        }

        if ledger.necromantic {
            spawns.push(SpawnRequest {
                kind: ActorKind::Minion,
                pos: actor.pos,
                friendly: true,
                generation: 1,
                stats: None,
            });
            push_ephemeral(state, EphemeralKind::Summon, actor.pos, actor.size);
            state.emit(GameEvent::Summon {
                pos: actor.pos,
                friendly: true,
            });
        }

        if actor.splits_on_death() {
            let scale = state.tuning.split_child_scale;
            let stats = ActorStats {
                health: actor.max_health * scale,
                speed: actor.speed,
                damage: actor.damage,
                size: actor.size * scale,
            };
            let offset = Vec2::new(actor.size * 0.5, 0.0);
            for pos in [actor.pos - offset, actor.pos + offset] {
                spawns.push(SpawnRequest {
                    kind: ActorKind::Minion,
                    pos,
                    friendly: actor.friendly,
                    generation: actor.generation + 1,
                    stats: Some(stats),
                });
            }
        }
    }

    wave::fulfil_all(state, spawns);
}

/// Ledger timers and visual marker lifetimes
pub fn update(state: &mut GameState, dt: f32) {
    // Age markers from earlier frames first; ones pushed below start at full TTL
    for e in state.ephemeral.iter_mut() {
        e.ttl -= dt;
    }
    state.ephemeral.retain(|e| e.ttl > 0.0);

    let mut deaths = Vec::new();

    for i in 0..state.actors.len() {
        if !state.actors[i].active {
            continue;
        }
        let expiry = state.actors[i].ledger.advance(dt);
        let pos = state.actors[i].pos;
        let size = state.actors[i].size;

        if let Some(damage) = expiry.critical {
            push_ephemeral(state, EphemeralKind::Critical, pos, size);
            state.emit(GameEvent::CriticalProc { pos, damage });
            if state.actors[i].take_damage(damage).killed {
                deaths.push(Death::by_player(state.actors[i].id));
            }
        }
        if let Some(area) = expiry.area {
            deaths.extend(detonate(state, pos, area));
        }
    }

    resolve_deaths(state, deaths);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::Actor;
    use crate::sim::state::Phase;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        let mut s = GameState::new(9, Tuning::default());
        s.phase = Phase::Running;
        s
    }

    fn add(state: &mut GameState, kind: ActorKind, pos: Vec2, health: f32) -> usize {
        let id = state.next_entity_id();
        state.actors.push(Actor::new(
            id,
            kind,
            pos,
            ActorStats {
                health,
                speed: 0.0,
                damage: 5.0,
                size: 24.0,
            },
        ));
        state.actors.len() - 1
    }

    fn hit(damage: f32) -> HitContext {
        HitContext {
            damage,
            raw_damage: damage,
            damage_multiplier: 1.0,
            speed: 500.0,
            size: 8.0,
            disabled: false,
        }
    }

    #[test]
    fn explosive_detonates_after_delay_with_falloff() {
        let mut s = state();
        s.run.modifiers.explosive_level = 1;
        let t = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 500.0);
        let near = add(&mut s, ActorKind::Baseline, Vec2::new(135.0, 100.0), 500.0);
        let far = add(&mut s, ActorKind::Baseline, Vec2::new(300.0, 100.0), 500.0);

        apply_on_hit(&mut s, t, &hit(100.0));
        let pending = s.actors[t].ledger.explosive.unwrap();
        assert_eq!(pending.damage, 80.0);
        assert_eq!(pending.radius, 70.0);

        update(&mut s, 0.5);
        assert_eq!(s.actors[near].health, 500.0);
        update(&mut s, 0.6);
        assert_eq!(s.actors[t].health, 420.0);
        assert!((s.actors[near].health - (500.0 - 80.0 * 0.5)).abs() < 1e-3);
        assert_eq!(s.actors[far].health, 500.0);
        assert!(s.actors[t].ledger.explosive.is_none());
        assert!(s.ephemeral.iter().any(|e| e.kind == EphemeralKind::AreaBurst));
    }

    #[test]
    fn pending_explosive_detonates_on_death() {
        let mut s = state();
        s.run.modifiers.explosive_level = 1;
        let t = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 50.0);
        let near = add(&mut s, ActorKind::Baseline, Vec2::new(130.0, 100.0), 500.0);

        apply_on_hit(&mut s, t, &hit(50.0));
        assert!(s.actors[t].take_damage(50.0).killed);
        let id = s.actors[t].id;
        resolve_deaths(&mut s, vec![Death::by_player(id)]);

        // payload 40, radius 70, dist 30
        let expected = 500.0 - 40.0 * (1.0 - 30.0 / 70.0);
        assert!((s.actors[near].health - expected).abs() < 1e-3);
        assert!(s.events.iter().any(|e| matches!(e, GameEvent::AreaBurst { pos, .. } if *pos == Vec2::new(100.0, 100.0))));

        // the mark was consumed: later timers don't fire it again
        update(&mut s, 2.0);
        assert!((s.actors[near].health - expected).abs() < 1e-3);
    }

    #[test]
    fn new_markers_start_at_full_ttl() {
        let mut s = state();
        push_ephemeral(&mut s, EphemeralKind::Summon, Vec2::ZERO, 10.0);
        s.run.modifiers.critical_level = 1;
        let t = add(&mut s, ActorKind::Baseline, Vec2::ZERO, 100.0);
        apply_on_hit(&mut s, t, &hit(10.0));

        update(&mut s, 3.0);
        assert_eq!(s.ephemeral.len(), 1);
        assert_eq!(s.ephemeral[0].kind, EphemeralKind::Critical);
        assert_eq!(s.ephemeral[0].ttl, EPHEMERAL_TTL);

        update(&mut s, EPHEMERAL_TTL);
        assert!(s.ephemeral.is_empty());
    }

    #[test]
    fn critical_applies_flat_bonus() {
        let mut s = state();
        s.run.modifiers.critical_level = 2;
        let t = add(&mut s, ActorKind::Baseline, Vec2::ZERO, 100.0);
        apply_on_hit(&mut s, t, &hit(10.0));
        update(&mut s, 2.9);
        assert_eq!(s.actors[t].health, 100.0);
        update(&mut s, 0.2);
        assert_eq!(s.actors[t].health, 60.0);
        assert!(s.events.iter().any(|e| matches!(e, GameEvent::CriticalProc { damage, .. } if *damage == 40.0)));
    }

    #[test]
    fn implosive_pulls_neighbours() {
        let mut s = state();
        s.run.modifiers.implosive_level = 1;
        let t = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 50.0);
        let n = add(&mut s, ActorKind::Baseline, Vec2::new(132.0, 100.0), 50.0);
        apply_on_hit(&mut s, t, &hit(10.0));
        // radius 64, dist 32: pull = 0.5 * 0.2 = 10%
        assert!((s.actors[n].pos.x - 128.8).abs() < 1e-3);
        assert_eq!(s.actors[t].pos, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn life_steal_caps_at_two_hits() {
        let mut s = state();
        s.run.modifiers.life_steal_level = 2;
        s.structure.health = 50.0;
        let t = add(&mut s, ActorKind::Baseline, Vec2::ZERO, 100.0);
        for _ in 0..4 {
            apply_on_hit(&mut s, t, &hit(1.0));
        }
        assert!((s.structure.health - 52.0).abs() < 1e-4);
        assert_eq!(s.actors[t].ledger.drain_hits, 2);
    }

    #[test]
    fn split_targets_another_actor() {
        let mut s = state();
        s.run.modifiers.split = true;
        let t = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 50.0);
        add(&mut s, ActorKind::Baseline, Vec2::new(300.0, 100.0), 50.0);
        let p = apply_on_hit(&mut s, t, &hit(30.0)).unwrap();
        assert!(p.disabled);
        assert_eq!(p.bounces, 0);
        assert!(!p.ghost);
        assert!((p.dir - Vec2::X).length() < 1e-5);
        assert!((p.size - 6.4).abs() < 1e-4);
        assert!((p.damage - 20.1).abs() < 1e-3);

        let mut disabled = hit(30.0);
        disabled.disabled = true;
        assert!(apply_on_hit(&mut s, t, &disabled).is_none());
    }

    #[test]
    fn split_needs_another_target() {
        let mut s = state();
        s.run.modifiers.split = true;
        let t = add(&mut s, ActorKind::Baseline, Vec2::ZERO, 50.0);
        assert!(apply_on_hit(&mut s, t, &hit(30.0)).is_none());
    }

    #[test]
    fn aftermath_chains_through_queue() {
        let mut s = state();
        s.run.modifiers.aftermath = true;
        let a = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 10.0);
        let b = add(&mut s, ActorKind::Baseline, Vec2::new(200.0, 100.0), 50.0);
        let c = add(&mut s, ActorKind::Baseline, Vec2::new(320.0, 100.0), 50.0);
        apply_on_hit(&mut s, a, &hit(10.0));
        apply_on_hit(&mut s, b, &hit(1.0));
        s.actors[b].take_damage(1.0);

        assert!(s.actors[a].take_damage(10.0).killed);
        let id = s.actors[a].id;
        resolve_deaths(&mut s, vec![Death::by_player(id)]);

        // a: 60 damage to b (dist 100) kills it; b's aftermath (6 x 60) reaches c
        assert!(!s.actors[b].active);
        assert!(!s.actors[c].active);
        assert_eq!(s.run.total_kills, 3);
    }

    #[test]
    fn necromantic_raises_friendly_minion() {
        let mut s = state();
        s.run.modifiers.necromantic = true;
        let t = add(&mut s, ActorKind::Baseline, Vec2::new(50.0, 50.0), 10.0);
        apply_on_hit(&mut s, t, &hit(10.0));
        s.actors[t].take_damage(10.0);
        let id = s.actors[t].id;
        resolve_deaths(&mut s, vec![Death::by_player(id)]);

        let raised: Vec<_> = s.actors.iter().filter(|a| a.friendly).collect();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, ActorKind::Minion);
        assert_eq!(raised[0].pos, Vec2::new(50.0, 50.0));
        assert!(raised[0].id > id);
    }

    #[test]
    fn minion_splits_once() {
        let mut s = state();
        let m = add(&mut s, ActorKind::Minion, Vec2::new(50.0, 50.0), 10.0);
        s.actors[m].take_damage(10.0);
        let id = s.actors[m].id;
        resolve_deaths(&mut s, vec![Death::by_player(id)]);

        let children: Vec<usize> = (0..s.actors.len()).filter(|&i| s.actors[i].active).collect();
        assert_eq!(children.len(), 2);
        for &i in &children {
            assert_eq!(s.actors[i].generation, 1);
            assert!(s.actors[i].max_health < 10.0);
            assert!(s.actors[i].size < 24.0);
        }

        // killing a child adds no grandchildren
        let child = children[0];
        let max = s.actors[child].max_health;
        s.actors[child].take_damage(max);
        let cid = s.actors[child].id;
        resolve_deaths(&mut s, vec![Death::by_player(cid)]);
        assert_eq!(s.actors.iter().filter(|a| a.active).count(), 1);
    }

    #[test]
    fn kill_credit_scales_with_wave() {
        let mut s = state();
        s.run.wave = 3;
        let t = add(&mut s, ActorKind::Baseline, Vec2::ZERO, 10.0);
        s.actors[t].take_damage(10.0);
        let id = s.actors[t].id;
        resolve_deaths(&mut s, vec![Death::by_friendly(id)]);
        assert_eq!(s.run.score, 30);
        assert_eq!(s.run.kills_this_wave, 1);
        assert!(s.events.iter().any(|e| matches!(e, GameEvent::ActorKilled { from_friendly: true, .. })));
    }
}
