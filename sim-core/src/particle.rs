use glam::Vec2;
use rand::Rng;

use crate::error::{Result, SimError};
use crate::types::{Bounds, ParticleId};

/// A circular body with area-proportional mass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

impl Particle {
    /// Creates a particle at rest.
    ///
    /// ### Errors
    /// [`SimError::InvalidParticle`] if `radius` is not finite and positive
    /// or `pos` has a non-finite component.
    pub fn new(pos: Vec2, radius: f32) -> Result<Self> {
        Self::with_velocity(pos, Vec2::ZERO, radius)
    }

    pub fn with_velocity(pos: Vec2, vel: Vec2, radius: f32) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimError::InvalidParticle(
                "radius must be finite and > 0".into(),
            ));
        }
        if !pos.is_finite() {
            return Err(SimError::InvalidParticle("position must be finite".into()));
        }
        if !vel.is_finite() {
            return Err(SimError::InvalidParticle("velocity must be finite".into()));
        }
        Ok(Self { pos, vel, radius })
    }

    /// Mass is `radius²` (area, not volume).
    #[inline]
    pub fn mass(&self) -> f32 {
        self.radius * self.radius
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        1.0 / self.mass()
    }

    #[inline]
    pub fn speed_sq(&self) -> f32 {
        self.vel.length_squared()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }

    /// Advances the position by one tick of velocity.
    #[inline]
    pub fn integrate(&mut self) {
        self.pos += self.vel;
    }

    /// Keeps the disk inside `bounds`, reflecting the velocity on each axis
    /// whose wall was crossed.
    ///
    /// After the call `radius <= x <= width - radius` and likewise for `y`.
    /// The reflected component always points back into the box, so a particle
    /// pushed past a wall while already moving inward is not sent outward.
    pub fn reflect_at_boundary(&mut self, bounds: Bounds) {
        let r = self.radius;
        let max = Vec2::new(bounds.width - r, bounds.height - r);

        if self.pos.x < r {
            self.pos.x = r;
            self.vel.x = self.vel.x.abs();
        } else if self.pos.x > max.x {
            self.pos.x = max.x;
            self.vel.x = -self.vel.x.abs();
        }

        if self.pos.y < r {
            self.pos.y = r;
            self.vel.y = self.vel.y.abs();
        } else if self.pos.y > max.y {
            self.pos.y = max.y;
            self.vel.y = -self.vel.y.abs();
        }
    }

    /// Draws a fresh random velocity for the given nominal speed.
    ///
    /// Each axis is uniform in `[-s/2, s/2]` with
    /// `s = base_speed * reference_radius / radius`, so smaller particles move
    /// faster at the same temperature.
    pub fn set_thermal_speed(&mut self, base_speed: f32, reference_radius: f32, rng: &mut impl Rng) {
        let s = base_speed * (reference_radius / self.radius);
        if s <= 0.0 {
            self.vel = Vec2::ZERO;
            return;
        }
        let half = 0.5 * s;
        self.vel = Vec2::new(
            rng.random_range(-half..=half),
            rng.random_range(-half..=half),
        );
    }
}

/// Index-addressable arena of particles.
///
/// Indices stay stable for every surviving particle: removal only ever drops
/// the most recently added ones from the tail.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: ParticleId) -> bool {
        id < self.particles.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn push(&mut self, particle: Particle) -> ParticleId {
        let id = self.particles.len();
        self.particles.push(particle);
        id
    }

    /// Appends `count` particles at random positions inside `bounds`.
    ///
    /// Radii are uniform in `radius_range`; velocities come from
    /// [`Particle::set_thermal_speed`].
    pub fn spawn_random(
        &mut self,
        count: usize,
        bounds: Bounds,
        radius_range: (f32, f32),
        base_speed: f32,
        reference_radius: f32,
        rng: &mut impl Rng,
    ) {
        self.particles.reserve(count);
        let (min_r, max_r) = radius_range;
        for _ in 0..count {
            let radius = if max_r > min_r {
                rng.random_range(min_r..max_r)
            } else {
                min_r
            };
            let pos = Vec2::new(
                rng.random_range(radius..=bounds.width - radius),
                rng.random_range(radius..=bounds.height - radius),
            );
            let mut p = Particle {
                pos,
                vel: Vec2::ZERO,
                radius,
            };
            p.set_thermal_speed(base_speed, reference_radius, rng);
            self.particles.push(p);
        }
    }

    /// Shrinks to `len` particles, removing the newest first.
    ///
    /// Returns how many were removed. Growing is not done here; see
    /// [`ParticleStore::spawn_random`].
    pub fn truncate(&mut self, len: usize) -> usize {
        let removed = self.particles.len().saturating_sub(len);
        self.particles.truncate(len);
        removed
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Integrates every particle one tick and reflects it at the walls.
    pub fn integrate_all(&mut self, bounds: Bounds) {
        for p in &mut self.particles {
            p.integrate();
            p.reflect_at_boundary(bounds);
        }
    }

    /// Pulls every particle back inside `bounds`, reflecting as needed.
    pub fn confine(&mut self, bounds: Bounds) {
        for p in &mut self.particles {
            p.reflect_at_boundary(bounds);
        }
    }

    /// Re-rolls every particle's velocity for a new nominal speed.
    pub fn rethermalize(&mut self, base_speed: f32, reference_radius: f32, rng: &mut impl Rng) {
        for p in &mut self.particles {
            p.set_thermal_speed(base_speed, reference_radius, rng);
        }
    }

    /// Scales every velocity by `factor`.
    pub fn damp(&mut self, factor: f32) {
        for p in &mut self.particles {
            p.vel *= factor;
        }
    }

    /// Mean of `vx² + vy²`, or `0` for an empty store.
    pub fn mean_speed_sq(&self) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let total: f32 = self.particles.iter().map(Particle::speed_sq).sum();
        total / self.particles.len() as f32
    }
}

/// Borrows two distinct particles mutably.
///
/// ### Panics
/// Panics if `i == j` or either index is out of bounds.
#[inline]
pub fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    assert_ne!(i, j, "pair_mut needs two distinct indices");
    if i < j {
        let (head, tail) = particles.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = particles.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}
