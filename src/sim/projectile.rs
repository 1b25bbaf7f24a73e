//! Projectile entity and its per-step physics
//!
//! Projectiles move in a straight line (optionally steering toward a target),
//! ricochet off the play-area edges while they have bounces left, and keep
//! track of which actors they already struck.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::collision::circles_overlap;
use super::state::Bounds;
use crate::consts::OUT_OF_BOUNDS_MARGIN;
use crate::tuning::Tuning;
use crate::{angle_between, direction_to};

/// A projectile in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    /// Heading (unit vector)
    pub dir: Vec2,
    pub speed: f32,
    /// Speed before any speed modifier; hitscan rounds travel faster than this
    pub base_speed: f32,
    pub size: f32,
    /// Raw damage (ghost decay and hitscan growth act on this)
    pub damage: f32,
    pub damage_multiplier: f32,
    /// Remaining bounces
    pub bounces: u32,
    /// Bounces the projectile started with
    pub bounce_budget: u32,
    /// Speed/damage growth per edge bounce, only for hitscan rounds
    pub bounce_speed_growth: f32,
    pub bounce_damage_growth: f32,
    /// Passes through actors
    pub ghost: bool,
    pub homing: bool,
    /// Split children: may not split again
    pub disabled: bool,
    pub active: bool,
    /// Last actor struck (non-ghost)
    pub last_hit: Option<u32>,
    /// Every actor struck since the last bounce (ghost)
    pub hit_set: Vec<u32>,
}

impl Projectile {
    pub fn new(pos: Vec2, dir: Vec2, speed: f32, size: f32, damage: f32) -> Self {
        Self {
            pos,
            dir: dir.normalize_or_zero(),
            speed,
            base_speed: speed,
            size,
            damage,
            damage_multiplier: 1.0,
            bounces: 0,
            bounce_budget: 0,
            bounce_speed_growth: 1.0,
            bounce_damage_growth: 1.0,
            ghost: false,
            homing: false,
            disabled: false,
            active: true,
            last_hit: None,
            hit_set: Vec::new(),
        }
    }

    /// Builder: start with `n` bounces
    pub fn with_bounces(mut self, n: u32) -> Self {
        self.bounces = n;
        self.bounce_budget = n;
        self
    }

    pub fn bounces_used(&self) -> u32 {
        self.bounce_budget.saturating_sub(self.bounces)
    }

    /// Faster than its unmodified speed
    pub fn is_hitscan(&self) -> bool {
        self.speed > self.base_speed + f32::EPSILON
    }

    /// Damage this projectile would deal right now, before per-hit bonuses
    pub fn hit_damage(&self) -> f32 {
        self.damage * self.damage_multiplier
    }

    /// Advance one step. Returns the number of edge bounces taken.
    pub fn advance(&mut self, dt: f32, bounds: &Bounds, actors: &[Actor], tuning: &Tuning) -> u32 {
        if !self.active {
            return 0;
        }

        if self.homing {
            self.steer(actors, tuning);
        }

        self.pos += self.dir * self.speed * dt;

        if !self.pos.is_finite() || !self.dir.is_finite() {
            log::warn!("Dropping projectile with non-finite state at {:?}", self.pos);
            self.active = false;
            return 0;
        }

        let bounced = self.reflect_off_edges(bounds);

        if self.bounces == 0 && !bounds.contains_with_margin(self.pos, OUT_OF_BOUNDS_MARGIN) {
            self.active = false;
        }

        bounced
    }

    /// Nudge the heading toward the nearest hostile in the search cone
    fn steer(&mut self, actors: &[Actor], tuning: &Tuning) {
        let half_angle = tuning.homing_half_angle();
        let target = actors
            .iter()
            .filter(|a| a.active && !a.friendly)
            .filter_map(|a| {
                let to = a.pos - self.pos;
                let dist = to.length();
                if dist > tuning.homing_radius || dist <= f32::EPSILON {
                    return None;
                }
                if angle_between(self.dir, to) > half_angle {
                    return None;
                }
                Some((a.pos, dist))
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((target_pos, _)) = target {
            let want = direction_to(self.pos, target_pos, self.dir);
            let steered = self.dir + (want - self.dir) * tuning.homing_blend;
            self.dir = steered.try_normalize().unwrap_or(self.dir);
        }
    }

    fn reflect_off_edges(&mut self, bounds: &Bounds) -> u32 {
        let mut count = 0;

        if self.bounces > 0 && (self.pos.x < 0.0 || self.pos.x > bounds.width) {
            self.dir.x = -self.dir.x;
            self.pos.x = self.pos.x.clamp(0.0, bounds.width);
            self.on_bounce();
            count += 1;
        }
        if self.bounces > 0 && (self.pos.y < 0.0 || self.pos.y > bounds.height) {
            self.dir.y = -self.dir.y;
            self.pos.y = self.pos.y.clamp(0.0, bounds.height);
            self.on_bounce();
            count += 1;
        }

        count
    }

    fn on_bounce(&mut self) {
        self.bounces -= 1;
        self.last_hit = None;
        self.hit_set.clear();
        if self.is_hitscan() {
            self.speed *= self.bounce_speed_growth;
            self.damage *= self.bounce_damage_growth;
        }
    }

    /// Whether this projectile may strike `actor` at all (ignores geometry)
    pub fn can_hit(&self, actor: &Actor) -> bool {
        if !self.active || !actor.active || actor.friendly {
            return false;
        }
        if self.ghost {
            !self.hit_set.contains(&actor.id)
        } else {
            self.last_hit != Some(actor.id)
        }
    }

    /// Eligibility plus the circle overlap test
    pub fn hits(&self, actor: &Actor) -> bool {
        self.can_hit(actor) && circles_overlap(self.pos, self.size, actor.pos, actor.size)
    }

    /// Record a strike on `actor_id`, returning the damage it carries.
    /// Ghost rounds lose a share of their remaining damage per actor.
    pub fn register_hit(&mut self, actor_id: u32, ghost_decay: f32) -> f32 {
        let dealt = self.hit_damage();
        if self.ghost {
            self.hit_set.push(actor_id);
            self.damage *= ghost_decay;
        } else {
            self.last_hit = Some(actor_id);
        }
        dealt
    }
}
