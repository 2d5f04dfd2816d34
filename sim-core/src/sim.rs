//! The simulation context: particles, bonds, environment and RNG in one owned value.

use std::collections::HashSet;

use glam::Vec2;
use rand::{Rng, SeedableRng, rng, rngs::StdRng};
use tracing::{debug, trace, warn};

use crate::bonds::{BondGraph, BondView};
use crate::collision::CollisionEvent;
use crate::config::{Config, PushForce, base_speed, validate_temperature};
use crate::environment::{Environment, EnvironmentPolicy, PolicyTable};
use crate::error::{Result, SimError};
use crate::particle::{Particle, ParticleStore};
use crate::phases::{self, TickSummary};
use crate::stats::Stats;
use crate::types::{Bounds, ParticleId};

/// Owns all engine state and runs the per-tick pipeline.
///
/// Configuration mutators leave the state self-consistent before returning:
/// changing the environment or population rebuilds the bond set right away,
/// so snapshot accessors never observe a half-updated engine.
#[derive(Debug)]
pub struct Simulation {
    config: Config,
    policies: PolicyTable,
    env: Environment,
    store: ParticleStore,
    bonds: BondGraph,
    events: Vec<CollisionEvent>,
    rng: StdRng,
    paused: bool,
    ticks: u64,
    last_summary: TickSummary,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::seed_from_u64(rng().random()),
    }
}

impl Simulation {
    /// Creates a simulation with the default policy table and a random
    /// population of `config.population` particles.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_policies(config, PolicyTable::default())
    }

    /// Like [`Simulation::new`] with a custom policy table.
    ///
    /// ### Errors
    /// [`SimError::InvalidConfig`] if `config` or any policy entry is invalid.
    pub fn with_policies(config: Config, policies: PolicyTable) -> Result<Self> {
        config.validate()?;
        for env in Environment::ALL {
            policies.get(env).validate()?;
        }
        let mut sim = Self {
            config,
            policies,
            env: Environment::None,
            store: ParticleStore::new(),
            bonds: BondGraph::new(),
            events: Vec::new(),
            rng: seeded_rng(config.seed),
            paused: false,
            ticks: 0,
            last_summary: TickSummary::default(),
        };
        sim.repopulate();
        Ok(sim)
    }

    /// Creates a simulation over an explicit particle arrangement.
    ///
    /// `config.population` is ignored; the bond set is built immediately for `env`.
    pub fn from_particles(
        config: Config,
        policies: PolicyTable,
        env: Environment,
        particles: Vec<Particle>,
    ) -> Result<Self> {
        config.validate()?;
        for e in Environment::ALL {
            policies.get(e).validate()?;
        }
        for p in &particles {
            Particle::with_velocity(p.pos, p.vel, p.radius)?;
        }
        let mut sim = Self {
            config: Config {
                population: particles.len(),
                ..config
            },
            policies,
            env,
            store: ParticleStore::from_particles(particles),
            bonds: BondGraph::new(),
            events: Vec::new(),
            rng: seeded_rng(config.seed),
            paused: false,
            ticks: 0,
            last_summary: TickSummary::default(),
        };
        sim.rebuild_bonds();
        Ok(sim)
    }

    /// Advances the simulation by one tick.
    ///
    /// The pipeline runs on staged copies of the particle and bond state.
    /// They are committed only if the result passes the invariant check;
    /// otherwise the previous tick's state stays visible.
    ///
    /// While paused this does nothing except clear the collision events.
    ///
    /// ### Errors
    /// [`SimError::Internal`] if the tick produced inconsistent state.
    pub fn tick(&mut self, pushes: &[PushForce]) -> Result<()> {
        if self.paused {
            self.events.clear();
            return Ok(());
        }

        let policy = *self.policy();
        let mut store = self.store.clone();
        let mut bonds = self.bonds.clone();
        let mut events = Vec::with_capacity(self.events.len());

        let summary = phases::run_pipeline(
            &mut store,
            &mut bonds,
            &mut events,
            self.env,
            &policy,
            self.config.world,
            pushes,
        );

        if let Err(e) = check_invariants(&store, &bonds, &policy) {
            warn!(tick = self.ticks, error = %e, "tick rejected, keeping previous state");
            return Err(e);
        }

        self.store = store;
        self.bonds = bonds;
        self.events = events;
        self.last_summary = summary;
        self.ticks += 1;
        trace!(
            tick = self.ticks,
            collisions = summary.collisions,
            pruned = summary.bonds_pruned,
            rebuilt = summary.bonds_rebuilt,
            bonds = self.bonds.len(),
            "tick"
        );
        Ok(())
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    /// Bond endpoints, rest and current lengths for rendering.
    pub fn bonds(&self) -> Vec<BondView> {
        self.bonds.views(self.store.as_slice())
    }

    #[inline]
    pub fn bond_graph(&self) -> &BondGraph {
        &self.bonds
    }

    pub fn stats(&self) -> Stats {
        Stats::collect(&self.store, &self.bonds)
    }

    /// Pairs that collided during the last tick.
    #[inline]
    pub fn collisions(&self) -> &[CollisionEvent] {
        &self.events
    }

    #[inline]
    pub fn last_summary(&self) -> TickSummary {
        self.last_summary
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn environment(&self) -> Environment {
        self.env
    }

    #[inline]
    pub fn policy(&self) -> &EnvironmentPolicy {
        self.policies.get(self.env)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn temperature(&self) -> f32 {
        self.config.temperature
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.config.world
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Switches environment, discarding every bond and rebuilding at once.
    pub fn set_environment(&mut self, env: Environment) {
        debug!(from = %self.env, to = %env, "environment change");
        self.env = env;
        self.bonds.clear();
        self.rebuild_bonds();
    }

    /// Parses `name` and switches to it.
    ///
    /// ### Errors
    /// [`SimError::UnknownEnvironment`] if the name is not in the table;
    /// the current environment is left unchanged.
    pub fn set_environment_by_name(&mut self, name: &str) -> Result<()> {
        let (env, _) = self.policies.lookup(name)?;
        self.set_environment(env);
        Ok(())
    }

    /// Grows or shrinks the population to `n` particles.
    ///
    /// New particles appear at random positions with thermal speeds for the
    /// current temperature; shrinking removes the newest particles first.
    /// Bonds touching removed particles are pruned before the rebuild.
    pub fn set_population_target(&mut self, n: usize) {
        let current = self.store.len();
        if n > current {
            self.store.spawn_random(
                n - current,
                self.config.world,
                self.config.radius_range,
                base_speed(self.config.temperature),
                self.config.reference_radius,
                &mut self.rng,
            );
        } else {
            self.store.truncate(n);
        }
        self.config.population = n;
        let policy = *self.policy();
        phases::prune_phase(&mut self.bonds, self.store.as_slice(), &policy);
        self.rebuild_bonds();
        debug!(from = current, to = n, bonds = self.bonds.len(), "population change");
    }

    /// Sets the temperature and re-rolls every particle's velocity.
    ///
    /// The nominal speed is scaled by the environment's thermal factor, so a
    /// solid responds less to heating than a fluid.
    ///
    /// ### Errors
    /// [`SimError::InvalidConfig`] for a negative or non-finite temperature.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        validate_temperature(temperature)?;
        self.config.temperature = temperature;
        let speed = base_speed(temperature) * self.policy().thermal_factor;
        self.store
            .rethermalize(speed, self.config.reference_radius, &mut self.rng);
        debug!(temperature, speed, "temperature change");
        Ok(())
    }

    /// Replaces the population with a fresh random one.
    ///
    /// With `Some(seed)` the new population, and every later random draw, is
    /// reproducible.
    pub fn reset_with_seed(&mut self, seed: Option<u64>) {
        self.config.seed = seed;
        self.rng = seeded_rng(seed);
        self.repopulate();
        debug!(?seed, particles = self.store.len(), "reset");
    }

    /// Places one particle of the given radius at `pos`.
    ///
    /// The position is pulled inside the world if needed. The particle gets a
    /// thermal speed for the current temperature and the bond set is rebuilt.
    ///
    /// ### Errors
    /// [`SimError::InvalidParticle`] for a bad radius or position, or if the
    /// particle cannot fit in the world.
    pub fn spawn_at(&mut self, pos: Vec2, radius: f32) -> Result<ParticleId> {
        let mut p = Particle::new(pos, radius)?;
        let Bounds { width, height } = self.config.world;
        if 2.0 * radius > width.min(height) {
            return Err(SimError::InvalidParticle(
                "particle does not fit in the world".into(),
            ));
        }
        p.reflect_at_boundary(self.config.world);
        p.set_thermal_speed(
            base_speed(self.config.temperature),
            self.config.reference_radius,
            &mut self.rng,
        );
        let id = self.store.push(p);
        self.config.population = self.store.len();
        self.rebuild_bonds();
        trace!(id, x = p.pos.x, y = p.pos.y, radius, "spawned particle");
        Ok(id)
    }

    /// Changes the world size and re-seeds the population inside it.
    ///
    /// ### Errors
    /// [`SimError::InvalidConfig`] if the new size is invalid; nothing changes.
    pub fn resize(&mut self, world: Bounds) -> Result<()> {
        let next = Config { world, ..self.config };
        next.validate()?;
        self.config = next;
        self.rng = seeded_rng(self.config.seed);
        self.repopulate();
        debug!(width = world.width, height = world.height, "resize");
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    fn repopulate(&mut self) {
        self.store.clear();
        self.bonds.clear();
        self.events.clear();
        self.store.spawn_random(
            self.config.population,
            self.config.world,
            self.config.radius_range,
            base_speed(self.config.temperature),
            self.config.reference_radius,
            &mut self.rng,
        );
        self.rebuild_bonds();
    }

    fn rebuild_bonds(&mut self) {
        let policy = *self.policy();
        phases::rebuild_phase(&mut self.bonds, self.store.as_slice(), self.env, &policy);
    }
}

/// Verifies the state a tick is about to commit.
///
/// Checks finite particle state, bond endpoints, pair uniqueness and degree caps.
fn check_invariants(store: &ParticleStore, bonds: &BondGraph, policy: &EnvironmentPolicy) -> Result<()> {
    if let Some(i) = store.iter().position(|p| !p.is_finite()) {
        return Err(SimError::Internal(format!("particle {i} has non-finite state")));
    }

    let mut seen = HashSet::with_capacity(bonds.len());
    for bond in bonds.iter() {
        if bond.a == bond.b {
            return Err(SimError::Internal(format!("self bond on particle {}", bond.a)));
        }
        if !store.contains(bond.a) || !store.contains(bond.b) {
            return Err(SimError::Internal(format!(
                "bond ({}, {}) references a missing particle",
                bond.a, bond.b
            )));
        }
        if !seen.insert(bond.key()) {
            return Err(SimError::Internal(format!(
                "duplicate bond ({}, {})",
                bond.a, bond.b
            )));
        }
    }

    if let Some(id) = bonds
        .degrees(store.len())
        .iter()
        .position(|&d| d > policy.max_bonds)
    {
        return Err(SimError::Internal(format!(
            "particle {id} exceeds {} bonds",
            policy.max_bonds
        )));
    }
    Ok(())
}
