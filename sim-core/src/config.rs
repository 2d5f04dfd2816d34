use glam::Vec2;

use crate::error::{Result, SimError};
use crate::types::Bounds;

/// Global configuration for a [`crate::sim::Simulation`].
///
/// ### Fields
/// - `world` - Size of the box particles live in.
/// - `population` - Number of particles created on reset.
/// - `temperature` - Nominal temperature, mapped to a base speed by [`base_speed`].
/// - `radius_range` - `(min, max)` radius for randomly spawned particles.
/// - `reference_radius` - Radius whose thermal speed equals the base speed.
/// - `push_radius`, `push_strength` - Defaults for cursor push forces.
/// - `seed` - RNG seed; `None` draws one from the thread RNG.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub world: Bounds,
    pub population: usize,
    pub temperature: f32,
    pub radius_range: (f32, f32),
    pub reference_radius: f32,
    pub push_radius: f32,
    pub push_strength: f32,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: Bounds::new(1280.0, 720.0),
            population: 500,
            temperature: 50.0,
            radius_range: (3.0, 6.0),
            reference_radius: 4.0,
            push_radius: 150.0,
            push_strength: 1.0,
            seed: None,
        }
    }
}

impl Config {
    /// Rejects configurations that would break per-tick invariants.
    pub fn validate(&self) -> Result<()> {
        let Bounds { width, height } = self.world;
        let (min_r, max_r) = self.radius_range;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(SimError::InvalidConfig(
                "world size must be finite and > 0".into(),
            ));
        }
        if !(min_r.is_finite() && max_r.is_finite() && min_r > 0.0 && min_r <= max_r) {
            return Err(SimError::InvalidConfig(
                "radius_range must satisfy 0 < min <= max".into(),
            ));
        }
        if 2.0 * max_r > width.min(height) {
            return Err(SimError::InvalidConfig(
                "largest particle does not fit in the world".into(),
            ));
        }
        if !(self.reference_radius.is_finite() && self.reference_radius > 0.0) {
            return Err(SimError::InvalidConfig(
                "reference_radius must be finite and > 0".into(),
            ));
        }
        validate_temperature(self.temperature)?;
        if !(self.push_radius.is_finite() && self.push_radius >= 0.0) {
            return Err(SimError::InvalidConfig(
                "push_radius must be finite and >= 0".into(),
            ));
        }
        if !self.push_strength.is_finite() {
            return Err(SimError::InvalidConfig("push_strength must be finite".into()));
        }
        Ok(())
    }
}

pub(crate) fn validate_temperature(t: f32) -> Result<()> {
    if t.is_finite() && t >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(
            "temperature must be finite and >= 0".into(),
        ))
    }
}

/// Maps a temperature to the nominal particle speed.
///
/// Affine and monotonic: `0 -> 0.5`, `100 -> 3.0`.
#[inline]
pub fn base_speed(temperature: f32) -> f32 {
    0.5 + temperature / 100.0 * 2.5
}

/// A radial "push" applied to velocities before physics.
///
/// Particles within `radius` of `origin` (and farther than a small dead zone)
/// receive a velocity kick pointing away from `origin`, attenuated linearly
/// with distance and scaled by the inverse of the particle radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PushForce {
    pub origin: Vec2,
    pub radius: f32,
    pub strength: f32,
}

impl PushForce {
    pub fn new(origin: Vec2, radius: f32, strength: f32) -> Self {
        Self {
            origin,
            radius,
            strength,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn base_speed_is_affine() {
        assert_eq!(base_speed(0.0), 0.5);
        assert_eq!(base_speed(50.0), 1.75);
        assert_eq!(base_speed(100.0), 3.0);
    }

    #[test]
    fn negative_radius_rejected() {
        let cfg = Config {
            radius_range: (-1.0, 4.0),
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("radius_range"));
    }

    #[test]
    fn nan_temperature_rejected() {
        let cfg = Config {
            temperature: f32::NAN,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn world_smaller_than_particle_rejected() {
        let cfg = Config {
            world: Bounds::new(8.0, 8.0),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
