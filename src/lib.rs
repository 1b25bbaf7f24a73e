//! Bastion Siege - wave-based defense simulation core
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (physics, collisions, waves, upgrades)
//! - `tuning`: Data-driven game balance
//! - `leaderboard`: In-memory score sink for finished runs

pub mod leaderboard;
pub mod sim;
pub mod tuning;

pub use leaderboard::{Leaderboard, ScoreSink};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Longest wall-clock delta a single step will simulate (ms).
    /// Larger gaps (backgrounded tab, debugger stop) are clamped to this.
    pub const MAX_FRAME_DELTA_MS: f32 = 100.0;

    /// Default play area
    pub const DEFAULT_WIDTH: f32 = 800.0;
    pub const DEFAULT_HEIGHT: f32 = 600.0;

    /// Hard population caps (most recent entries are kept)
    pub const MAX_ACTORS: usize = 200;
    pub const MAX_PROJECTILES: usize = 300;
    pub const MAX_EPHEMERAL: usize = 100;

    /// How far past the edge a projectile may travel before it is dropped
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 50.0;

    /// Angle between fanned multi-shot projectiles (radians)
    pub const MULTI_SHOT_SPREAD: f32 = 10.0 * std::f32::consts::PI / 180.0;
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Unit vector from `from` toward `to`, or `fallback` when they coincide
#[inline]
pub fn direction_to(from: Vec2, to: Vec2, fallback: Vec2) -> Vec2 {
    let d = to - from;
    if d.length_squared() > f32::EPSILON {
        d.normalize()
    } else {
        fallback
    }
}

/// Unsigned angle between two non-zero vectors (radians)
#[inline]
pub fn angle_between(a: Vec2, b: Vec2) -> f32 {
    let denom = a.length() * b.length();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turn() {
        let v = rotate(Vec2::X, std::f32::consts::FRAC_PI_2);
        assert!((v - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn direction_to_falls_back_on_zero() {
        assert_eq!(direction_to(Vec2::ONE, Vec2::ONE, Vec2::Y), Vec2::Y);
        let d = direction_to(Vec2::ZERO, Vec2::new(3.0, 4.0), Vec2::Y);
        assert!((d.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn angle_between_opposites() {
        let a = angle_between(Vec2::X, -Vec2::X);
        assert!((a - std::f32::consts::PI).abs() < 1e-5);
    }
}
