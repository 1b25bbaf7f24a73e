//! Actor AI
//!
//! Hostiles walk at the structure; ranged and summoner variants stop at their
//! range and act on a cooldown. Friendlies hunt the nearest hostile instead.
//! New actors are never created here directly: the AI returns
//! [`SpawnRequest`]s for the wave controller to fulfil.

use glam::Vec2;

use super::actor::ActorKind;
use super::effects::Death;
use super::events::GameEvent;
use super::state::{Ephemeral, EphemeralKind, GameState};
use super::wave::SpawnRequest;
use crate::direction_to;

/// Side effects of one AI pass
#[derive(Debug, Default)]
pub struct AiOutcome {
    pub spawns: Vec<SpawnRequest>,
    pub deaths: Vec<Death>,
}

/// Update every active actor once
pub fn update_actors(state: &mut GameState, dt: f32) -> AiOutcome {
    let mut out = AiOutcome::default();

    for i in 0..state.actors.len() {
        let actor = &mut state.actors[i];
        if !actor.active {
            continue;
        }
        if !actor.pos.is_finite() {
            log::warn!("Retiring actor #{} with non-finite position", actor.id);
            actor.retire();
            continue;
        }

        if actor.friendly {
            update_friendly(state, i, dt, &mut out);
        } else {
            update_hostile(state, i, dt, &mut out);
        }
    }

    out
}

/// Range and cooldown for kinds that stop short of the structure
fn special_action(state: &GameState, kind: ActorKind) -> Option<(f32, f32)> {
    let t = &state.tuning;
    match kind {
        ActorKind::Ranged => Some((t.ranged_range, t.ranged_cooldown)),
        ActorKind::Summoner => Some((t.summoner_range, t.summoner_cooldown)),
        _ => None,
    }
}

fn update_hostile(state: &mut GameState, i: usize, dt: f32, out: &mut AiOutcome) {
    let target = state.structure.pos;
    let kind = state.actors[i].kind;
    let special = special_action(state, kind);

    let actor = &mut state.actors[i];
    let to_target = target - actor.pos;
    let dist = to_target.length();
    let heading = direction_to(actor.pos, target, Vec2::ZERO);

    let mut acted = false;
    match special {
        Some((range, cooldown)) if dist <= range => {
            actor.action_cooldown -= dt;
            if actor.action_cooldown <= 0.0 {
                actor.action_cooldown = cooldown;
                acted = true;
            }
        }
        _ => {
            let step = (actor.speed * dt).min(dist);
            actor.pos += heading * step;
        }
    }

    let (pos, damage, id, size) = (actor.pos, actor.damage, actor.id, actor.size);

    if acted {
        match kind {
            ActorKind::Ranged => {
                state.structure.take_damage(damage);
                state.emit(GameEvent::RangedAttack { from: pos, damage });
            }
            ActorKind::Summoner => {
                let side = Vec2::new(-heading.y, heading.x) * state.tuning.summon_offset;
                for spot in [pos + side, pos - side] {
                    out.spawns.push(SpawnRequest::hostile(ActorKind::Minion, spot));
                }
                state.ephemeral.push(Ephemeral {
                    kind: EphemeralKind::Summon,
                    pos,
                    radius: size,
                    ttl: super::effects::EPHEMERAL_TTL,
                });
                state.emit(GameEvent::Summon { pos, friendly: false });
            }
            _ => {}
        }
    }

    if state.actors[i].touches(state.structure.pos, state.structure.size) {
        state.structure.take_damage(damage);
        state.actors[i].retire();
        log::debug!("Actor #{} reached the structure for {:.1}", id, damage);
        state.emit(GameEvent::StructureHit { damage });
    }
}

fn update_friendly(state: &mut GameState, i: usize, dt: f32, out: &mut AiOutcome) {
    let pos = state.actors[i].pos;
    let nearest = state
        .actors
        .iter()
        .enumerate()
        .filter(|(_, a)| a.active && !a.friendly)
        .map(|(j, a)| (j, a.pos.distance(pos)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let Some((j, dist)) = nearest else {
        return;
    };

    let target_pos = state.actors[j].pos;
    let me = &mut state.actors[i];
    let step = (me.speed * dt).min(dist);
    me.pos += direction_to(me.pos, target_pos, Vec2::ZERO) * step;

    let (my_pos, my_size, my_damage) = (me.pos, me.size, me.damage);
    if !state.actors[j].touches(my_pos, my_size) {
        return;
    }

    // Contact damage flows both ways, per second
    let their_damage = state.actors[j].damage;
    if state.actors[j].take_damage(my_damage * dt).killed {
        out.deaths.push(Death::by_friendly(state.actors[j].id));
    }
    state.actors[i].take_damage(their_damage * dt);
}
