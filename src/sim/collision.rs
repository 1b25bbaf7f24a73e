//! Collision detection and response
//!
//! Projectiles and actors are circles. Each active projectile takes at most
//! one hit per frame: the first actor it overlaps, in actor order.

use glam::Vec2;

use super::actor::Actor;
use super::effects::{self, Death, HitContext};
use super::projectile::Projectile;
use super::state::GameState;
use crate::direction_to;

/// Reflect a velocity vector off a surface with the given normal
///
/// The normal should point away from the surface (toward the incoming object).
pub fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Circle overlap, sizes are diameters
#[inline]
pub fn circles_overlap(a: Vec2, a_size: f32, b: Vec2, b_size: f32) -> bool {
    a.distance(b) < (a_size + b_size) * 0.5
}

/// Ricochet, pass through, or stop the projectile after it struck `actor`
pub fn settle_after_hit(p: &mut Projectile, actor: &Actor) {
    if p.bounces > 0 && !p.ghost && actor.can_bounce_off() {
        let normal = direction_to(actor.pos, p.pos, -p.dir);
        if p.dir.dot(normal) < 0.0 {
            p.dir = reflect_velocity(p.dir, normal).try_normalize().unwrap_or(normal);
        }
        // Push clear of the actor so it can't register again next frame
        p.pos = actor.pos + normal * ((actor.size + p.size) * 0.5 + 1.0);
        p.bounces -= 1;
    } else if !(p.ghost && actor.can_be_pierced()) {
        p.active = false;
    }
}

/// Test every active projectile against every active actor and apply hits.
/// Returns the number of hits this frame.
pub fn resolve_collisions(state: &mut GameState) -> usize {
    let count = state.projectiles.len();
    let mut spawned = Vec::new();
    let mut deaths = Vec::new();
    let mut hits = 0;

    for pi in 0..count {
        let target = {
            let p = &state.projectiles[pi];
            if !p.active {
                continue;
            }
            state.actors.iter().position(|a| p.hits(a))
        };
        let Some(ai) = target else {
            continue;
        };
        hits += 1;

        let actor_id = state.actors[ai].id;
        let decay = state.tuning.ghost_damage_decay;
        let trickster = state.run.modifiers.trickster_bonus;

        let p = &mut state.projectiles[pi];
        let raw_damage = p.damage;
        let bonus = 1.0 + p.bounces_used() as f32 * trickster;
        let damage = p.register_hit(actor_id, decay) * bonus;
        let ctx = HitContext {
            damage,
            raw_damage,
            damage_multiplier: p.damage_multiplier,
            speed: p.speed,
            size: p.size,
            disabled: p.disabled,
        };

        if let Some(split) = effects::apply_on_hit(state, ai, &ctx) {
            spawned.push(split);
        }

        let outcome = state.actors[ai].take_damage(damage);
        log::debug!("Hit #{} for {:.1}", actor_id, outcome.dealt);
        settle_after_hit(&mut state.projectiles[pi], &state.actors[ai]);

        if outcome.killed {
            deaths.push(Death::by_player(actor_id));
        }
    }

    state.projectiles.extend(spawned);
    effects::resolve_deaths(state, deaths);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::{ActorKind, ActorStats};
    use crate::sim::events::GameEvent;
    use crate::sim::state::Phase;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        let mut s = GameState::new(5, Tuning::default());
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

    #[test]
    fn reflect_off_vertical_wall() {
        let v = reflect_velocity(Vec2::new(1.0, 1.0), Vec2::new(-1.0, 0.0));
        assert_eq!(v, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn overlap_uses_half_sizes() {
        assert!(circles_overlap(Vec2::ZERO, 10.0, Vec2::new(9.0, 0.0), 10.0));
        assert!(!circles_overlap(Vec2::ZERO, 10.0, Vec2::new(10.0, 0.0), 10.0));
    }

    #[test]
    fn plain_hit_stops_projectile_and_kills() {
        let mut s = state();
        let a = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 30.0);
        s.projectiles.push(Projectile::new(Vec2::new(90.0, 100.0), Vec2::X, 500.0, 8.0, 35.0));
        assert_eq!(resolve_collisions(&mut s), 1);
        assert!(!s.actors[a].active);
        assert!(!s.projectiles[0].active);
        assert_eq!(s.run.kills_this_wave, 1);
        assert!(s.events.iter().any(|e| matches!(e, GameEvent::ActorKilled { from_friendly: false, .. })));
    }

    #[test]
    fn bounce_reflects_off_actor() {
        let mut s = state();
        let a = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 100.0);
        s.projectiles
            .push(Projectile::new(Vec2::new(90.0, 100.0), Vec2::X, 500.0, 8.0, 10.0).with_bounces(2));
        resolve_collisions(&mut s);
        let p = &s.projectiles[0];
        assert!(p.active);
        assert_eq!(p.bounces, 1);
        assert!(p.dir.x < 0.0);
        assert!(!circles_overlap(p.pos, p.size, s.actors[a].pos, s.actors[a].size));
        assert_eq!(s.actors[a].health, 90.0);
    }

    #[test]
    fn minion_cannot_be_bounced_or_pierced() {
        let mut s = state();
        add(&mut s, ActorKind::Minion, Vec2::new(100.0, 100.0), 100.0);
        let mut p = Projectile::new(Vec2::new(95.0, 100.0), Vec2::X, 500.0, 8.0, 10.0).with_bounces(3);
        p.ghost = true;
        s.projectiles.push(p);
        s.projectiles
            .push(Projectile::new(Vec2::new(95.0, 100.0), Vec2::X, 500.0, 8.0, 10.0).with_bounces(3));
        resolve_collisions(&mut s);
        assert!(!s.projectiles[0].active);
        assert!(!s.projectiles[1].active);
    }

    #[test]
    fn ghost_passes_through_with_decay() {
        let mut s = state();
        let ids: Vec<usize> = (0..3)
            .map(|i| add(&mut s, ActorKind::Baseline, Vec2::new(100.0 + i as f32 * 40.0, 100.0), 500.0))
            .collect();
        let mut p = Projectile::new(Vec2::new(100.0, 100.0), Vec2::X, 40.0, 8.0, 100.0);
        p.ghost = true;
        s.projectiles.push(p);

        let mut dealt = Vec::new();
        for &i in &ids {
            s.projectiles[0].pos = s.actors[i].pos;
            resolve_collisions(&mut s);
            dealt.push(500.0 - s.actors[i].health);
        }
        assert!(s.projectiles[0].active);
        assert!((dealt[0] - 100.0).abs() < 1e-3);
        assert!((dealt[1] - 90.0).abs() < 1e-3);
        assert!((dealt[2] - 81.0).abs() < 1e-3);

        // already struck: standing on an old target does nothing
        s.projectiles[0].pos = s.actors[ids[0]].pos;
        assert_eq!(resolve_collisions(&mut s), 0);
    }

    #[test]
    fn trickster_scales_with_bounces_used() {
        let mut s = state();
        s.run.modifiers.trickster_bonus = 0.25;
        let a = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 500.0);
        let mut p = Projectile::new(Vec2::new(95.0, 100.0), Vec2::X, 500.0, 8.0, 10.0).with_bounces(3);
        p.bounces = 1;
        s.projectiles.push(p);
        resolve_collisions(&mut s);
        assert!((s.actors[a].health - 485.0).abs() < 1e-4);
    }

    #[test]
    fn one_hit_per_projectile_per_frame() {
        let mut s = state();
        let a = add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 500.0);
        let b = add(&mut s, ActorKind::Baseline, Vec2::new(104.0, 100.0), 500.0);
        let mut p = Projectile::new(Vec2::new(102.0, 100.0), Vec2::X, 500.0, 8.0, 10.0);
        p.ghost = true;
        s.projectiles.push(p);
        resolve_collisions(&mut s);
        assert_eq!(s.actors[a].health, 490.0);
        assert_eq!(s.actors[b].health, 500.0);
    }

    #[test]
    fn split_projectile_joins_next_frame() {
        let mut s = state();
        s.run.modifiers.split = true;
        add(&mut s, ActorKind::Baseline, Vec2::new(100.0, 100.0), 500.0);
        add(&mut s, ActorKind::Baseline, Vec2::new(400.0, 100.0), 500.0);
        s.projectiles.push(Projectile::new(Vec2::new(95.0, 100.0), Vec2::X, 500.0, 8.0, 10.0));
        resolve_collisions(&mut s);
        assert_eq!(s.projectiles.len(), 2);
        assert!(s.projectiles[1].disabled);
        assert!(s.projectiles[1].active);
    }
}
