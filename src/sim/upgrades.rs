//! Upgrade catalog
//!
//! A fixed list of modifiers. Each one has a level, a cap and optional
//! incompatibilities, and knows how to write its effect into [`Modifiers`].
//! Apply routines write absolute values derived from the level, so calling
//! [`UpgradeCatalog::apply_all`] any number of times gives the same result.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    Ricochet,
    MultiShot,
    Split,
    Ghost,
    Hitscan,
    BulletTime,
    Trickster,
    Homing,
    Explosive,
    Implosive,
    Critical,
    Aftermath,
    Necromantic,
    LifeSteal,
    AutoAim,
    HeavyRounds,
}

impl UpgradeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeId::Ricochet => "ricochet",
            UpgradeId::MultiShot => "multi_shot",
            UpgradeId::Split => "split",
            UpgradeId::Ghost => "ghost",
            UpgradeId::Hitscan => "hitscan",
            UpgradeId::BulletTime => "bullet_time",
            UpgradeId::Trickster => "trickster",
            UpgradeId::Homing => "homing",
            UpgradeId::Explosive => "explosive",
            UpgradeId::Implosive => "implosive",
            UpgradeId::Critical => "critical",
            UpgradeId::Aftermath => "aftermath",
            UpgradeId::Necromantic => "necromantic",
            UpgradeId::LifeSteal => "life_steal",
            UpgradeId::AutoAim => "auto_aim",
            UpgradeId::HeavyRounds => "heavy_rounds",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        CATALOG.iter().map(|d| d.id).find(|id| id.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    #[error("unknown upgrade `{0}`")]
    Unknown(String),
    #[error("{0:?} is already at max level")]
    Maxed(UpgradeId),
    #[error("{0:?} conflicts with an upgrade already taken")]
    Incompatible(UpgradeId),
    #[error("{0:?} is not among the offered choices")]
    NotOffered(UpgradeId),
}

/// Static definition of one catalog entry
#[derive(Debug)]
struct UpgradeDef {
    id: UpgradeId,
    name: &'static str,
    description: &'static str,
    max_level: u32,
    incompatible_with: &'static [UpgradeId],
    /// Own level from which the incompatibilities above take effect
    exclusive_from: u32,
}

const CATALOG: &[UpgradeDef] = &[
    UpgradeDef {
        id: UpgradeId::Ricochet,
        name: "Ricochet",
        description: "Shots bounce off the edges once more per level",
        max_level: 5,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::MultiShot,
        name: "Multi-Shot",
        description: "Fire one extra projectile per level",
        max_level: 4,
        incompatible_with: &[UpgradeId::Split],
        exclusive_from: 3,
    },
    UpgradeDef {
        id: UpgradeId::Split,
        name: "Split",
        description: "Hits fork a smaller shot toward another enemy",
        max_level: 1,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Ghost,
        name: "Ghost Rounds",
        description: "Shots pass through enemies, losing 10% damage each",
        max_level: 1,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Hitscan,
        name: "Hitscan",
        description: "Faster shots that speed up and hit harder on every bounce",
        max_level: 3,
        incompatible_with: &[UpgradeId::BulletTime],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::BulletTime,
        name: "Bullet Time",
        description: "Slower shots, much more damage",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Trickster,
        name: "Trickster",
        description: "+25% damage per bounce already taken",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Homing,
        name: "Homing",
        description: "Shots curve toward enemies ahead of them",
        max_level: 1,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Explosive,
        name: "Explosive",
        description: "Struck enemies explode a second later",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Implosive,
        name: "Implosive",
        description: "Hits drag nearby enemies inward",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Critical,
        name: "Critical",
        description: "Struck enemies take a delayed flat bonus",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Aftermath,
        name: "Aftermath",
        description: "Marked enemies detonate for 600% of the killing hit",
        max_level: 1,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::Necromantic,
        name: "Necromantic",
        description: "Marked enemies rise as friendly minions",
        max_level: 1,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::LifeSteal,
        name: "Life Steal",
        description: "The first two hits on each enemy repair the structure",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::AutoAim,
        name: "Auto-Aim",
        description: "The structure fires on its own, faster per level",
        max_level: 3,
        incompatible_with: &[],
        exclusive_from: 1,
    },
    UpgradeDef {
        id: UpgradeId::HeavyRounds,
        name: "Heavy Rounds",
        description: "+20% damage per level",
        max_level: 5,
        incompatible_with: &[],
        exclusive_from: 1,
    },
];

/// Player-facing description of an offered upgrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeOffer {
    pub id: UpgradeId,
    pub name: String,
    pub description: String,
    /// Level the upgrade would reach if chosen
    pub next_level: u32,
    pub max_level: u32,
}

/// A catalog entry with its current level
#[derive(Debug, Clone)]
pub struct Upgrade {
    def: &'static UpgradeDef,
    pub level: u32,
}

impl Upgrade {
    pub fn id(&self) -> UpgradeId {
        self.def.id
    }

    pub fn is_maxed(&self) -> bool {
        self.level >= self.def.max_level
    }

    /// Does this upgrade, at `level`, exclude `other`?
    fn excludes_at(&self, level: u32, other: UpgradeId) -> bool {
        level >= self.def.exclusive_from && self.def.incompatible_with.contains(&other)
    }

    /// Write this upgrade's fields. No-op at level 0.
    fn apply(&self, m: &mut Modifiers) {
        let level = self.level;
        if level == 0 {
            return;
        }
        let lf = level as f32;
        match self.def.id {
            UpgradeId::Ricochet => m.bullet_bounces = level,
            UpgradeId::MultiShot => m.projectile_count = 1 + level,
            UpgradeId::Split => m.split = true,
            UpgradeId::Ghost => m.ghost = true,
            UpgradeId::Hitscan => m.hitscan_speed = 1.5 + 0.25 * (lf - 1.0),
            UpgradeId::BulletTime => {
                m.bullet_time_speed = 0.8f32.powi(level as i32).max(0.4);
                m.bullet_time_damage = 1.0 + 0.4 * lf;
            }
            UpgradeId::Trickster => m.trickster_bonus = 0.25 * lf,
            UpgradeId::Homing => m.homing = true,
            UpgradeId::Explosive => m.explosive_level = level,
            UpgradeId::Implosive => m.implosive_level = level,
            UpgradeId::Critical => m.critical_level = level,
            UpgradeId::Aftermath => m.aftermath = true,
            UpgradeId::Necromantic => m.necromantic = true,
            UpgradeId::LifeSteal => m.life_steal_level = level,
            UpgradeId::AutoAim => m.auto_aim_cooldown = Some((1.0 - 0.2 * (lf - 1.0)).max(0.2)),
            UpgradeId::HeavyRounds => m.heavy_rounds_damage = 1.0 + 0.2 * lf,
        }
    }

    fn offer(&self) -> UpgradeOffer {
        UpgradeOffer {
            id: self.def.id,
            name: self.def.name.to_string(),
            description: self.def.description.to_string(),
            next_level: self.level + 1,
            max_level: self.def.max_level,
        }
    }
}

/// Maximum choices offered per pause
pub const CHOICES_PER_OFFER: usize = 2;

/// All upgrades, in apply order
#[derive(Debug, Clone)]
pub struct UpgradeCatalog {
    upgrades: Vec<Upgrade>,
}

impl Default for UpgradeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl UpgradeCatalog {
    pub fn new() -> Self {
        Self {
            upgrades: CATALOG.iter().map(|def| Upgrade { def, level: 0 }).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Upgrade> {
        self.upgrades.iter()
    }

    pub fn get(&self, id: UpgradeId) -> Option<&Upgrade> {
        self.upgrades.iter().find(|u| u.id() == id)
    }

    pub fn level(&self, id: UpgradeId) -> u32 {
        self.get(id).map(|u| u.level).unwrap_or(0)
    }

    /// Back to level 0 everywhere
    pub fn reset(&mut self) {
        for u in &mut self.upgrades {
            u.level = 0;
        }
    }

    /// Whether taking one more level of `id` would conflict with anything held.
    ///
    /// Checked both ways: the candidate's own list at its next level, and every
    /// held upgrade that lists the candidate.
    fn conflicts(&self, candidate: &Upgrade) -> bool {
        let next = candidate.level + 1;
        self.upgrades.iter().any(|other| {
            if other.id() == candidate.id() || other.level == 0 {
                return false;
            }
            candidate.excludes_at(next, other.id()) || other.excludes_at(other.level, candidate.id())
        })
    }

    pub fn is_eligible(&self, id: UpgradeId) -> bool {
        self.get(id)
            .map(|u| !u.is_maxed() && !self.conflicts(u))
            .unwrap_or(false)
    }

    pub fn eligible(&self) -> Vec<&Upgrade> {
        self.upgrades
            .iter()
            .filter(|u| !u.is_maxed() && !self.conflicts(u))
            .collect()
    }

    /// Up to two distinct eligible upgrades, drawn uniformly
    pub fn offer_choices<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<UpgradeOffer> {
        let mut pool: Vec<UpgradeOffer> = self.eligible().iter().map(|u| u.offer()).collect();
        pool.shuffle(rng);
        pool.truncate(CHOICES_PER_OFFER);
        pool
    }

    /// Raise `id` one level. Returns whether any choices remain afterwards.
    pub fn select(&mut self, id: UpgradeId) -> Result<bool, UpgradeError> {
        let idx = self
            .upgrades
            .iter()
            .position(|u| u.id() == id)
            .ok_or_else(|| UpgradeError::Unknown(id.as_str().to_string()))?;

        if self.upgrades[idx].is_maxed() {
            return Err(UpgradeError::Maxed(id));
        }
        if self.conflicts(&self.upgrades[idx]) {
            return Err(UpgradeError::Incompatible(id));
        }

        self.upgrades[idx].level += 1;
        log::info!("Upgrade {} -> level {}", id.as_str(), self.upgrades[idx].level);
        Ok(!self.eligible().is_empty())
    }

    /// Re-run every held upgrade's apply routine, in catalog order
    pub fn apply_all(&self, modifiers: &mut Modifiers) {
        for u in self.upgrades.iter().filter(|u| u.level > 0) {
            u.apply(modifiers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn max_out(catalog: &mut UpgradeCatalog, id: UpgradeId) {
        while catalog.select(id).is_ok() {}
    }

    #[test]
    fn keys_round_trip() {
        for def in CATALOG {
            assert_eq!(UpgradeId::from_key(def.id.as_str()), Some(def.id));
        }
        assert_eq!(UpgradeId::from_key("laser"), None);
    }

    #[test]
    fn offers_at_most_two_distinct() {
        let catalog = UpgradeCatalog::new();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..20 {
            let offer = catalog.offer_choices(&mut rng);
            assert_eq!(offer.len(), 2);
            assert_ne!(offer[0].id, offer[1].id);
        }
    }

    #[test]
    fn maxed_upgrade_never_offered() {
        let mut catalog = UpgradeCatalog::new();
        max_out(&mut catalog, UpgradeId::Homing);
        assert_eq!(catalog.level(UpgradeId::Homing), 1);
        assert_eq!(catalog.select(UpgradeId::Homing), Err(UpgradeError::Maxed(UpgradeId::Homing)));
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..200 {
            assert!(catalog.offer_choices(&mut rng).iter().all(|o| o.id != UpgradeId::Homing));
        }
    }

    #[test]
    fn incompatibility_is_symmetric() {
        let mut catalog = UpgradeCatalog::new();
        catalog.select(UpgradeId::Hitscan).unwrap();
        assert!(!catalog.is_eligible(UpgradeId::BulletTime));

        let mut catalog = UpgradeCatalog::new();
        catalog.select(UpgradeId::BulletTime).unwrap();
        assert!(!catalog.is_eligible(UpgradeId::Hitscan));
        assert_eq!(
            catalog.select(UpgradeId::Hitscan),
            Err(UpgradeError::Incompatible(UpgradeId::Hitscan))
        );
    }

    #[test]
    fn multi_shot_excludes_split_from_level_three() {
        let mut catalog = UpgradeCatalog::new();
        catalog.select(UpgradeId::MultiShot).unwrap();
        catalog.select(UpgradeId::MultiShot).unwrap();
        assert!(catalog.is_eligible(UpgradeId::Split));
        catalog.select(UpgradeId::MultiShot).unwrap();
        assert!(!catalog.is_eligible(UpgradeId::Split));

        // and the other way round: holding split caps multi-shot at 2
        let mut catalog = UpgradeCatalog::new();
        catalog.select(UpgradeId::Split).unwrap();
        catalog.select(UpgradeId::MultiShot).unwrap();
        catalog.select(UpgradeId::MultiShot).unwrap();
        assert!(!catalog.is_eligible(UpgradeId::MultiShot));
    }

    #[test]
    fn apply_all_is_idempotent_and_composable() {
        let mut catalog = UpgradeCatalog::new();
        catalog.select(UpgradeId::MultiShot).unwrap();
        catalog.select(UpgradeId::Ghost).unwrap();
        catalog.select(UpgradeId::Ricochet).unwrap();
        catalog.select(UpgradeId::Ricochet).unwrap();
        catalog.select(UpgradeId::BulletTime).unwrap();
        catalog.select(UpgradeId::HeavyRounds).unwrap();

        let mut once = Modifiers::default();
        catalog.apply_all(&mut once);
        let mut twice = once.clone();
        catalog.apply_all(&mut twice);
        assert_eq!(once, twice);

        assert_eq!(once.projectile_count, 2);
        assert!(once.ghost);
        assert_eq!(once.bullet_bounces, 2);
        assert!((once.damage_multiplier() - 1.4 * 1.2).abs() < 1e-5);
        assert!((once.speed_multiplier() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn select_reports_when_catalog_exhausted() {
        let mut catalog = UpgradeCatalog::new();
        let ids: Vec<UpgradeId> = CATALOG.iter().map(|d| d.id).collect();
        for id in &ids {
            max_out(&mut catalog, *id);
        }
        assert!(catalog.eligible().is_empty());
        let mut rng = Pcg32::seed_from_u64(3);
        assert!(catalog.offer_choices(&mut rng).is_empty());
    }
}
