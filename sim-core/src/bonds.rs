//! Bond network over particle indices.
//!
//! A [`BondGraph`] holds undirected links between particles. Bonds never own
//! particle data; every length is measured through the particle slice at the
//! moment it is needed, so they always see the store's current positions.
//!
//! Per tick the graph goes through, in order:
//! 1. [`BondGraph::apply_bond_forces`] (solid only): spring impulses on velocities.
//! 2. [`BondGraph::cleanup_bonds`]: drop dangling or overstretched bonds.
//! 3. [`BondGraph::create_bonds`]: rebuild the set from close neighbours.
//! 4. [`BondGraph::enforce_solid_bonds`] (solid only): position relaxation.

use std::collections::HashSet;

use glam::Vec2;

use crate::environment::{Environment, EnvironmentPolicy};
use crate::particle::{Particle, pair_mut};
use crate::types::ParticleId;

/// Length ratio above which a bond is reported as stressed.
pub const STRESS_FACTOR: f32 = 1.3;

/// An undirected link between two particles.
///
/// ### Fields
/// - `a`, `b` - Endpoint indices, never equal.
/// - `rest` - Distance between the endpoints when the bond formed.
/// - `stiffness` - Spring constant copied from the policy at formation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bond {
    pub a: ParticleId,
    pub b: ParticleId,
    pub rest: f32,
    pub stiffness: f32,
}

impl Bond {
    /// The endpoints as an ordered key, identical for `{a, b}` and `{b, a}`.
    #[inline]
    pub fn key(&self) -> (ParticleId, ParticleId) {
        pair_key(self.a, self.b)
    }

    #[inline]
    pub fn involves(&self, id: ParticleId) -> bool {
        self.a == id || self.b == id
    }

    /// Current endpoint distance, or `None` if an endpoint is gone.
    pub fn length(&self, particles: &[Particle]) -> Option<f32> {
        let pa = particles.get(self.a)?;
        let pb = particles.get(self.b)?;
        Some(pa.pos.distance(pb.pos))
    }

    #[inline]
    pub fn is_stressed(&self, length: f32) -> bool {
        length > self.rest * STRESS_FACTOR
    }
}

#[inline]
fn pair_key(a: ParticleId, b: ParticleId) -> (ParticleId, ParticleId) {
    if a < b { (a, b) } else { (b, a) }
}

/// Read-only snapshot of a bond for presentation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BondView {
    pub a: ParticleId,
    pub b: ParticleId,
    pub a_pos: Vec2,
    pub b_pos: Vec2,
    pub rest: f32,
    pub length: f32,
    pub stressed: bool,
}

/// Counts from one [`BondGraph::enforce_solid_bonds`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelaxReport {
    pub corrected: usize,
    pub broken: usize,
}

#[derive(Clone, Debug, Default)]
pub struct BondGraph {
    bonds: Vec<Bond>,
}

impl BondGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.iter()
    }

    pub fn clear(&mut self) {
        self.bonds.clear();
    }

    /// Inserts a bond as-is, without capacity or duplicate checks.
    ///
    /// Meant for building fixtures; [`BondGraph::create_bonds`] is the
    /// normal way bonds come into existence.
    pub fn insert(&mut self, bond: Bond) {
        self.bonds.push(bond);
    }

    /// Returns `true` if a bond joins `a` and `b` in either direction.
    pub fn bond_exists(&self, a: ParticleId, b: ParticleId) -> bool {
        let key = pair_key(a, b);
        self.bonds.iter().any(|bond| bond.key() == key)
    }

    /// Number of bonds incident to `id`.
    pub fn degree(&self, id: ParticleId) -> usize {
        self.bonds.iter().filter(|bond| bond.involves(id)).count()
    }

    /// Incident-bond count for every particle in `0..n`.
    pub fn degrees(&self, n: usize) -> Vec<usize> {
        let mut out = vec![0; n];
        for bond in &self.bonds {
            if let Some(d) = out.get_mut(bond.a) {
                *d += 1;
            }
            if let Some(d) = out.get_mut(bond.b) {
                *d += 1;
            }
        }
        out
    }

    /// Rebuilds the bond set from scratch according to `policy`.
    ///
    /// Every previous bond is discarded first; a pair stays bonded only if
    /// it qualifies again at the current positions. For `Environment::None`
    /// the graph simply stays empty. Otherwise every particle, in store
    /// order, ranks its candidate neighbours by distance:
    ///
    /// - Gas / Liquid: candidates strictly closer than `bond_distance`.
    /// - Solid: the `max_bonds` nearest particles, then those farther than
    ///   `bond_distance` are discarded.
    ///
    /// Up to `max_bonds` candidates are taken, and a bond is created for each
    /// one only if the pair is not bonded yet and both endpoints still have
    /// spare capacity. Rest length is the current distance. Coincident
    /// particles are never bonded.
    ///
    /// The same positions always produce the same bond list.
    ///
    /// ### Returns
    /// Number of bonds in the rebuilt set.
    pub fn create_bonds(
        &mut self,
        particles: &[Particle],
        env: Environment,
        policy: &EnvironmentPolicy,
    ) -> usize {
        self.bonds.clear();
        if env == Environment::None || policy.max_bonds == 0 {
            return 0;
        }

        let n = particles.len();
        let mut degree = vec![0usize; n];
        let mut formed: HashSet<(ParticleId, ParticleId)> = HashSet::new();
        let mut candidates: Vec<(ParticleId, f32)> = Vec::with_capacity(n);

        for i in 0..n {
            if degree[i] >= policy.max_bonds {
                continue;
            }
            select_neighbors(particles, i, env, policy, &mut candidates);

            for &(j, dist) in &candidates {
                if degree[i] >= policy.max_bonds {
                    break;
                }
                if degree[j] >= policy.max_bonds || !formed.insert(pair_key(i, j)) {
                    continue;
                }
                self.bonds.push(Bond {
                    a: i,
                    b: j,
                    rest: dist,
                    stiffness: policy.bond_stiffness,
                });
                degree[i] += 1;
                degree[j] += 1;
            }
        }

        let removed = self.dedup();
        if removed > 0 {
            tracing::warn!(removed, "duplicate bonds dropped after rebuild");
        }
        self.bonds.len()
    }

    /// Drops every bond whose unordered pair already appeared earlier.
    ///
    /// ### Returns
    /// Number of bonds removed.
    pub fn dedup(&mut self) -> usize {
        let before = self.bonds.len();
        let mut seen = HashSet::with_capacity(before);
        self.bonds.retain(|bond| seen.insert(bond.key()));
        before - self.bonds.len()
    }

    /// Removes bonds that dangle or are stretched past `rest * break_factor`.
    ///
    /// ### Returns
    /// Number of bonds removed.
    pub fn cleanup_bonds(&mut self, particles: &[Particle], break_factor: f32) -> usize {
        let before = self.bonds.len();
        self.bonds.retain(|bond| match bond.length(particles) {
            Some(len) => bond.a != bond.b && len <= bond.rest * break_factor,
            None => false,
        });
        before - self.bonds.len()
    }

    /// Applies linear spring impulses along every bond (solid only).
    ///
    /// `F = (length - rest) * stiffness` along the bond axis; each endpoint's
    /// velocity changes by `F / mass`. Zero-length bonds are skipped.
    pub fn apply_bond_forces(&self, particles: &mut [Particle], env: Environment) {
        if !env.is_solid() {
            return;
        }
        let n = particles.len();
        for bond in &self.bonds {
            if bond.a >= n || bond.b >= n || bond.a == bond.b {
                continue;
            }
            let (pa, pb) = pair_mut(particles, bond.a, bond.b);
            let delta = pb.pos - pa.pos;
            let dist = delta.length();
            if dist == 0.0 {
                continue;
            }
            let force = delta / dist * ((dist - bond.rest) * bond.stiffness);
            pa.vel += force * pa.inv_mass();
            pb.vel -= force * pb.inv_mass();
        }
    }

    /// One position-correction pass over the bond set (solid only).
    ///
    /// For each bond:
    /// - longer than `rest * relax_break_factor`: removed.
    /// - outside `[rest * (1 - tol), rest * (1 + tol)]`: both endpoints move
    ///   half the error along the axis, so the bond ends at its rest length.
    /// - otherwise untouched.
    ///
    /// Bonds are visited in order, so later corrections see earlier ones.
    pub fn enforce_solid_bonds(
        &mut self,
        particles: &mut [Particle],
        env: Environment,
        policy: &EnvironmentPolicy,
    ) -> RelaxReport {
        let mut report = RelaxReport::default();
        if !env.is_solid() {
            return report;
        }
        let n = particles.len();
        let tol = policy.relax_tolerance;
        self.bonds.retain(|bond| {
            if bond.a >= n || bond.b >= n || bond.a == bond.b {
                report.broken += 1;
                return false;
            }
            let (pa, pb) = pair_mut(particles, bond.a, bond.b);
            let delta = pb.pos - pa.pos;
            let dist = delta.length();
            if dist > bond.rest * policy.relax_break_factor {
                report.broken += 1;
                return false;
            }
            if dist == 0.0 {
                return true;
            }
            let lo = bond.rest * (1.0 - tol);
            let hi = bond.rest * (1.0 + tol);
            if dist < lo || dist > hi {
                let correction = delta / dist * ((dist - bond.rest) * 0.5);
                pa.pos += correction;
                pb.pos -= correction;
                report.corrected += 1;
            }
            true
        });
        report
    }

    /// Snapshot of every bond with its current geometry.
    pub fn views(&self, particles: &[Particle]) -> Vec<BondView> {
        self.bonds
            .iter()
            .filter_map(|bond| {
                let a_pos = particles.get(bond.a)?.pos;
                let b_pos = particles.get(bond.b)?.pos;
                let length = a_pos.distance(b_pos);
                Some(BondView {
                    a: bond.a,
                    b: bond.b,
                    a_pos,
                    b_pos,
                    rest: bond.rest,
                    length,
                    stressed: bond.is_stressed(length),
                })
            })
            .collect()
    }
}

/// Fills `out` with the ranked bonding candidates for particle `i`.
///
/// Candidates are `(index, distance)` pairs sorted by ascending distance
/// (ties broken by index), at most `policy.max_bonds` long.
fn select_neighbors(
    particles: &[Particle],
    i: ParticleId,
    env: Environment,
    policy: &EnvironmentPolicy,
    out: &mut Vec<(ParticleId, f32)>,
) {
    out.clear();
    let origin = particles[i].pos;
    let k = policy.max_bonds;
    let by_distance = |x: &(ParticleId, f32), y: &(ParticleId, f32)| {
        x.1.total_cmp(&y.1).then(x.0.cmp(&y.0))
    };

    out.extend(
        particles
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, p)| (j, p.pos.distance(origin)))
            .filter(|&(_, d)| d > 0.0),
    );

    if env.is_solid() {
        // Nearest k first, then the hard cutoff.
        if out.len() > k {
            out.select_nth_unstable_by(k, by_distance);
            out.truncate(k);
        }
        out.retain(|&(_, d)| d <= policy.bond_distance);
    } else {
        out.retain(|&(_, d)| d < policy.bond_distance);
    }

    out.sort_unstable_by(by_distance);
    out.truncate(k);
}
