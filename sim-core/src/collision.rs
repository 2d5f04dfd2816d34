//! Pairwise elastic collision resolution.
//!
//! Collisions are resolved sequentially over every unordered pair `i < j`
//! in store order. A single tick's outcome therefore depends on that order
//! when three or more particles touch; only converged rest states are
//! order-independent.

use crate::particle::{Particle, pair_mut};
use crate::types::ParticleId;

/// Coefficient of restitution for particle-particle contacts.
pub const RESTITUTION: f32 = 0.8;

/// A resolved contact between two particles during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionEvent {
    pub a: ParticleId,
    pub b: ParticleId,
}

/// What happened when a single overlapping pair was examined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Contact {
    /// Disks do not overlap.
    Apart,
    /// Centres coincide, so there is no contact normal.
    Degenerate,
    /// Overlapping but already moving apart; left untouched.
    Separating,
    /// Impulse applied; carries its magnitude.
    Resolved(f32),
}

/// Resolves one pair in place.
///
/// Steps, for overlapping disks with a well-defined normal `n` (from `p1` to `p2`):
/// 1. If the relative normal velocity is non-negative the pair is separating
///    and is left alone.
/// 2. Otherwise apply `j = -(1 + e)(v_rel · n) / (1/m1 + 1/m2)` equally and
///    oppositely, scaled by inverse mass.
/// 3. Push both particles apart along `n` by half the overlap each.
pub fn resolve_pair(p1: &mut Particle, p2: &mut Particle) -> Contact {
    let delta = p2.pos - p1.pos;
    let dist = delta.length();
    let min_dist = p1.radius + p2.radius;

    if dist >= min_dist {
        return Contact::Apart;
    }
    if dist == 0.0 {
        return Contact::Degenerate;
    }

    let n = delta / dist;
    let vel_along_normal = (p2.vel - p1.vel).dot(n);
    if vel_along_normal >= 0.0 {
        return Contact::Separating;
    }

    let inv_m1 = p1.inv_mass();
    let inv_m2 = p2.inv_mass();
    let impulse = -(1.0 + RESTITUTION) * vel_along_normal / (inv_m1 + inv_m2);
    let j = n * impulse;
    p1.vel -= j * inv_m1;
    p2.vel += j * inv_m2;

    let correction = n * ((min_dist - dist) * 0.5);
    p1.pos -= correction;
    p2.pos += correction;

    Contact::Resolved(impulse)
}

/// Resolves every overlapping pair and records one event per resolved pair.
///
/// `events` is cleared first. Degenerate (coincident) and separating pairs
/// are skipped for this tick.
///
/// ### Returns
/// Number of degenerate pairs that were skipped.
pub fn resolve_collisions(particles: &mut [Particle], events: &mut Vec<CollisionEvent>) -> usize {
    events.clear();
    let mut degenerate = 0;
    let n = particles.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (p1, p2) = pair_mut(particles, i, j);
            match resolve_pair(p1, p2) {
                Contact::Resolved(_) => events.push(CollisionEvent { a: i, b: j }),
                Contact::Degenerate => degenerate += 1,
                Contact::Apart | Contact::Separating => {}
            }
        }
    }
    if degenerate > 0 {
        tracing::trace!(degenerate, "skipped coincident particle pairs");
    }
    degenerate
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Vec2;

    fn particle(x: f32, y: f32, vx: f32, vy: f32, r: f32) -> Particle {
        Particle::with_velocity(Vec2::new(x, y), Vec2::new(vx, vy), r).unwrap()
    }

    fn momentum(ps: &[Particle]) -> Vec2 {
        ps.iter().map(|p| p.vel * p.mass()).sum()
    }

    fn kinetic(ps: &[Particle]) -> f32 {
        ps.iter().map(|p| 0.5 * p.mass() * p.speed_sq()).sum()
    }

    #[test]
    fn head_on_equal_masses_reverse_symmetrically() {
        let mut ps = vec![
            particle(0.0, 50.0, 1.0, 0.0, 5.0),
            particle(8.0, 50.0, -1.0, 0.0, 5.0),
        ];
        let mut events = Vec::new();
        resolve_collisions(&mut ps, &mut events);

        assert_eq!(events, vec![CollisionEvent { a: 0, b: 1 }]);
        // Full exchange scaled by the restitution coefficient.
        assert_abs_diff_eq!(ps[0].vel.x, -RESTITUTION, epsilon = 1e-5);
        assert_abs_diff_eq!(ps[1].vel.x, RESTITUTION, epsilon = 1e-5);
        assert_abs_diff_eq!(ps[0].vel.y, 0.0);
        assert!(ps[0].pos.distance(ps[1].pos) >= 10.0 - 1e-5);
    }

    #[test]
    fn momentum_conserved_and_energy_not_gained() {
        let mut ps = vec![
            particle(10.0, 10.0, 2.0, 0.5, 3.0),
            particle(16.0, 12.0, -1.0, -0.3, 6.0),
        ];
        let p_before = momentum(&ps);
        let e_before = kinetic(&ps);

        let (a, b) = pair_mut(&mut ps, 0, 1);
        assert!(matches!(resolve_pair(a, b), Contact::Resolved(j) if j > 0.0));

        let p_after = momentum(&ps);
        assert_abs_diff_eq!(p_before.x, p_after.x, epsilon = 1e-3);
        assert_abs_diff_eq!(p_before.y, p_after.y, epsilon = 1e-3);
        assert!(kinetic(&ps) <= e_before + 1e-4);
    }

    #[test]
    fn separating_pair_gets_no_impulse() {
        let mut a = particle(0.0, 0.0, -1.0, 0.0, 5.0);
        let mut b = particle(8.0, 0.0, 1.0, 0.0, 5.0);
        assert_eq!(resolve_pair(&mut a, &mut b), Contact::Separating);
        assert_eq!(a.pos, Vec2::ZERO);
        assert_eq!(a.vel, Vec2::new(-1.0, 0.0));
        assert_eq!(b.vel, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn coincident_pair_is_skipped() {
        let mut ps = vec![particle(5.0, 5.0, 1.0, 0.0, 2.0), particle(5.0, 5.0, -1.0, 0.0, 2.0)];
        let mut events = Vec::new();
        let skipped = resolve_collisions(&mut ps, &mut events);
        assert_eq!(skipped, 1);
        assert!(events.is_empty());
        assert_eq!(ps[0].pos, Vec2::new(5.0, 5.0));
        assert_eq!(ps[0].vel, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn distant_pair_untouched() {
        let mut a = particle(0.0, 0.0, 1.0, 0.0, 1.0);
        let mut b = particle(10.0, 0.0, -1.0, 0.0, 1.0);
        assert_eq!(resolve_pair(&mut a, &mut b), Contact::Apart);
        assert_eq!(a.pos, Vec2::ZERO);
    }

    #[test]
    fn heavier_particle_changes_velocity_less() {
        let mut light = particle(0.0, 0.0, 1.0, 0.0, 2.0);
        let mut heavy = particle(7.0, 0.0, 0.0, 0.0, 6.0);
        resolve_pair(&mut light, &mut heavy);
        assert!((light.vel.x - 1.0).abs() > heavy.vel.x.abs());
    }
}
