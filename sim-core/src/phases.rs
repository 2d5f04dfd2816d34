//! Per-tick simulation phases for the particle–bond system.
//!
//! One tick runs, in this order:
//! 1. [`push_phase`]: external push forces perturb velocities.
//! 2. [`bond_force_phase`]: spring impulses along bonds (solid only), using
//!    positions as left by the previous tick.
//! 3. [`collision_phase`]: pairwise elastic collisions.
//! 4. [`integration_phase`]: move particles and reflect them at the walls.
//! 5. [`prune_phase`]: drop dangling and overstretched bonds.
//! 6. [`rebuild_phase`]: form new bonds for the active environment.
//! 7. [`relax_phase`]: solid-only position relaxation and velocity damping,
//!    then walls are enforced again.
//!
//! [`run_pipeline`] strings these together. Each phase is the only writer of
//! the state it touches while it runs.

use crate::bonds::{BondGraph, RelaxReport};
use crate::collision::{CollisionEvent, resolve_collisions};
use crate::config::PushForce;
use crate::environment::{Environment, EnvironmentPolicy};
use crate::particle::{Particle, ParticleStore};
use crate::types::Bounds;

/// Per-tick velocity multiplier applied to every particle in a solid.
pub const SOLID_DAMPING: f32 = 0.95;

/// Push forces closer than this to a particle leave it alone.
const PUSH_DEAD_ZONE: f32 = 0.1;

/// Counts gathered while running one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub collisions: usize,
    pub degenerate_pairs: usize,
    pub bonds_pruned: usize,
    pub bonds_rebuilt: usize,
    pub relax: RelaxReport,
}

/// Applies every push force to every particle in range.
///
/// For a particle at distance `d` from the push origin with
/// `0.1 < d < radius`, the velocity gains
/// `n * strength * (1 - d / radius) / particle.radius`, `n` pointing away
/// from the origin.
pub fn push_phase(particles: &mut [Particle], pushes: &[PushForce]) {
    for push in pushes {
        if push.radius <= 0.0 {
            continue;
        }
        for p in particles.iter_mut() {
            let delta = p.pos - push.origin;
            let d = delta.length();
            if d >= push.radius || d <= PUSH_DEAD_ZONE {
                continue;
            }
            let force = push.strength * (1.0 - d / push.radius) / p.radius;
            p.vel += delta / d * force;
        }
    }
}

/// Spring impulses along bonds; a no-op outside the solid environment.
#[inline]
pub fn bond_force_phase(bonds: &BondGraph, particles: &mut [Particle], env: Environment) {
    bonds.apply_bond_forces(particles, env);
}

/// Resolves collisions and fills `events` with the pairs that collided.
///
/// ### Returns
/// Number of coincident pairs skipped.
#[inline]
pub fn collision_phase(particles: &mut [Particle], events: &mut Vec<CollisionEvent>) -> usize {
    resolve_collisions(particles, events)
}

#[inline]
pub fn integration_phase(store: &mut ParticleStore, bounds: Bounds) {
    store.integrate_all(bounds);
}

/// ### Returns
/// Number of bonds removed.
#[inline]
pub fn prune_phase(bonds: &mut BondGraph, particles: &[Particle], policy: &EnvironmentPolicy) -> usize {
    bonds.cleanup_bonds(particles, policy.break_factor)
}

/// ### Returns
/// Size of the rebuilt bond set.
#[inline]
pub fn rebuild_phase(
    bonds: &mut BondGraph,
    particles: &[Particle],
    env: Environment,
    policy: &EnvironmentPolicy,
) -> usize {
    bonds.create_bonds(particles, env, policy)
}

/// Solid relaxation followed by the rigidity damping of all velocities.
///
/// Relaxation can move particles past a wall, so they are confined to
/// `bounds` again afterwards. Does nothing outside the solid environment.
pub fn relax_phase(
    bonds: &mut BondGraph,
    store: &mut ParticleStore,
    env: Environment,
    policy: &EnvironmentPolicy,
    bounds: Bounds,
) -> RelaxReport {
    if !env.is_solid() {
        return RelaxReport::default();
    }
    let report = bonds.enforce_solid_bonds(store.as_mut_slice(), env, policy);
    store.damp(SOLID_DAMPING);
    store.confine(bounds);
    report
}

/// Runs one full tick over `store` and `bonds`.
///
/// ### Parameters
/// - `store`, `bonds` - State advanced in place.
/// - `events` - Receives this tick's collision events (cleared first).
/// - `env`, `policy` - Active environment and its parameters.
/// - `bounds` - World rectangle for wall reflection.
/// - `pushes` - External push forces for this tick.
pub fn run_pipeline(
    store: &mut ParticleStore,
    bonds: &mut BondGraph,
    events: &mut Vec<CollisionEvent>,
    env: Environment,
    policy: &EnvironmentPolicy,
    bounds: Bounds,
    pushes: &[PushForce],
) -> TickSummary {
    push_phase(store.as_mut_slice(), pushes);
    bond_force_phase(bonds, store.as_mut_slice(), env);
    let degenerate_pairs = collision_phase(store.as_mut_slice(), events);
    integration_phase(store, bounds);
    let bonds_pruned = prune_phase(bonds, store.as_slice(), policy);
    let bonds_rebuilt = rebuild_phase(bonds, store.as_slice(), env, policy);
    let relax = relax_phase(bonds, store, env, policy, bounds);

    TickSummary {
        collisions: events.len(),
        degenerate_pairs,
        bonds_pruned,
        bonds_rebuilt,
        relax,
    }
}
