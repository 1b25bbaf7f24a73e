//! Game balance tuning
//!
//! Every balancing figure lives here so a run can be re-tuned from JSON
//! without touching simulation code. Missing fields fall back to defaults.

use serde::{Deserialize, Serialize};

/// Stat multipliers applied on top of the wave-scaled base stats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindFactors {
    pub health: f32,
    pub speed: f32,
    pub damage: f32,
    /// Size multiplier relative to the base actor size
    pub size: f32,
}

impl KindFactors {
    pub const fn new(health: f32, speed: f32, damage: f32, size: f32) -> Self {
        Self {
            health,
            speed,
            damage,
            size,
        }
    }
}

/// Game balance parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Structure ===
    pub structure_health: f32,
    pub structure_size: f32,

    // === Projectiles ===
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_size: f32,

    // === Spawning ===
    /// Seconds between spawns on wave 1
    pub spawn_interval_base: f32,
    /// Seconds shaved off the interval per wave
    pub spawn_interval_per_wave: f32,
    pub spawn_interval_min: f32,
    pub population_base: u32,
    pub population_per_wave: u32,

    // === Actor base stats (wave 1, grow linearly) ===
    pub actor_size: f32,
    pub actor_health: f32,
    pub actor_health_per_wave: f32,
    pub actor_speed: f32,
    pub actor_speed_per_wave: f32,
    pub actor_damage: f32,
    pub actor_damage_per_wave: f32,

    // === Per-kind factors ===
    pub fast: KindFactors,
    pub armored: KindFactors,
    pub ranged: KindFactors,
    pub summoner: KindFactors,
    pub minion: KindFactors,

    // === Specials ===
    pub ranged_range: f32,
    pub ranged_cooldown: f32,
    pub summoner_range: f32,
    pub summoner_cooldown: f32,
    /// Sideways offset of summoned minions
    pub summon_offset: f32,
    /// Size and health of each split child relative to the parent
    pub split_child_scale: f32,

    // === Progression ===
    pub kill_threshold_base: u32,
    pub kill_threshold_growth: f32,
    pub max_wave: u32,
    pub score_per_kill: u64,
    /// Awarded instead of an upgrade pause when nothing is left to offer
    pub no_choice_bonus: u64,

    // === On-hit / on-death effects ===
    pub explosive_delay: f32,
    pub explosive_payload: f32,
    pub explosive_radius_per_level: f32,
    pub implosive_radius_per_level: f32,
    pub implosive_strength: f32,
    pub split_size_factor: f32,
    pub split_damage_factor: f32,
    pub critical_delay: f32,
    pub critical_damage_per_level: f32,
    pub aftermath_multiplier: f32,
    pub aftermath_radius: f32,
    pub life_steal_per_level: f32,
    pub life_steal_max_hits: u8,
    pub ghost_damage_decay: f32,
    pub hitscan_bounce_speed: f32,
    pub hitscan_bounce_damage: f32,

    // === Homing ===
    pub homing_radius: f32,
    /// Full aperture of the homing search cone (degrees)
    pub homing_cone_degrees: f32,
    pub homing_blend: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            structure_health: 100.0,
            structure_size: 60.0,

            projectile_speed: 500.0,
            projectile_damage: 10.0,
            projectile_size: 8.0,

            spawn_interval_base: 2.0,
            spawn_interval_per_wave: 0.1,
            spawn_interval_min: 0.5,
            population_base: 10,
            population_per_wave: 5,

            actor_size: 24.0,
            actor_health: 20.0,
            actor_health_per_wave: 5.0,
            actor_speed: 40.0,
            actor_speed_per_wave: 2.0,
            actor_damage: 5.0,
            actor_damage_per_wave: 1.0,

            fast: KindFactors::new(0.7, 1.5, 0.8, 1.0),
            armored: KindFactors::new(2.0, 0.6, 1.5, 1.4),
            ranged: KindFactors::new(0.8, 0.7, 0.7, 1.0),
            summoner: KindFactors::new(1.2, 0.5, 0.5, 1.1),
            minion: KindFactors::new(0.6, 1.0, 0.6, 0.7),

            ranged_range: 250.0,
            ranged_cooldown: 2.0,
            summoner_range: 300.0,
            summoner_cooldown: 5.0,
            summon_offset: 30.0,
            split_child_scale: 0.7,

            kill_threshold_base: 10,
            kill_threshold_growth: 1.5,
            max_wave: 20,
            score_per_kill: 10,
            no_choice_bonus: 500,

            explosive_delay: 1.0,
            explosive_payload: 0.8,
            explosive_radius_per_level: 70.0,
            implosive_radius_per_level: 80.0,
            implosive_strength: 0.2,
            split_size_factor: 0.8,
            split_damage_factor: 0.67,
            critical_delay: 3.0,
            critical_damage_per_level: 20.0,
            aftermath_multiplier: 6.0,
            aftermath_radius: 150.0,
            life_steal_per_level: 0.005,
            life_steal_max_hits: 2,
            ghost_damage_decay: 0.9,
            hitscan_bounce_speed: 1.2,
            hitscan_bounce_damage: 1.15,

            homing_radius: 600.0,
            homing_cone_degrees: 20.0,
            homing_blend: 0.2,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Self = serde_json::from_str(json)?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    /// Seconds between spawns for a wave
    pub fn spawn_interval(&self, wave: u32) -> f32 {
        let reduction = wave.saturating_sub(1) as f32 * self.spawn_interval_per_wave;
        (self.spawn_interval_base - reduction).max(self.spawn_interval_min)
    }

    /// Live population the spawner fills up to
    pub fn population_target(&self, wave: u32) -> usize {
        (self.population_base + wave.saturating_sub(1) * self.population_per_wave) as usize
    }

    /// Kill threshold following `current`
    pub fn next_threshold(&self, current: u32) -> u32 {
        (current as f32 * self.kill_threshold_growth).ceil() as u32
    }

    /// Half-angle of the homing cone (radians)
    pub fn homing_half_angle(&self) -> f32 {
        (self.homing_cone_degrees * 0.5).to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_interval_floors_at_min() {
        let t = Tuning::default();
        assert!((t.spawn_interval(1) - 2.0).abs() < 1e-6);
        assert!((t.spawn_interval(6) - 1.5).abs() < 1e-6);
        assert!((t.spawn_interval(40) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn population_grows_per_wave() {
        let t = Tuning::default();
        assert_eq!(t.population_target(1), 10);
        assert_eq!(t.population_target(3), 20);
    }

    #[test]
    fn threshold_grows_by_half() {
        let t = Tuning::default();
        assert_eq!(t.next_threshold(10), 15);
        assert_eq!(t.next_threshold(15), 23);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let t = Tuning::from_json(r#"{ "structure_health": 250.0, "max_wave": 5 }"#).unwrap();
        assert_eq!(t.structure_health, 250.0);
        assert_eq!(t.max_wave, 5);
        assert_eq!(t.kill_threshold_base, 10);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Tuning::from_json("{ not json").is_err());
    }
}
