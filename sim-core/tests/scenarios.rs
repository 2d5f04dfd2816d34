use std::collections::HashSet;
use std::f32::consts::TAU;

use approx::assert_abs_diff_eq;
use glam::Vec2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use sim_core::bonds::{Bond, BondGraph};
use sim_core::collision::{CollisionEvent, resolve_collisions};
use sim_core::particle::Particle;
use sim_core::types::Bounds;
use sim_core::{Config, Environment, EnvironmentPolicy, PolicyTable, PushForce, Simulation};

fn config(world: Bounds, population: usize, seed: u64) -> Config {
    Config {
        world,
        population,
        seed: Some(seed),
        ..Config::default()
    }
}

fn moving(x: f32, y: f32, vx: f32, vy: f32, r: f32) -> Particle {
    Particle::with_velocity(Vec2::new(x, y), Vec2::new(vx, vy), r).unwrap()
}

/// Asserts pair uniqueness, no self bonds, valid endpoints and degree caps.
fn assert_bond_invariants(sim: &Simulation) {
    let n = sim.particles().len();
    let graph = sim.bond_graph();
    let mut seen = HashSet::new();
    for bond in graph.iter() {
        assert_ne!(bond.a, bond.b, "self bond");
        assert!(bond.a < n && bond.b < n, "dangling bond {bond:?}");
        assert!(seen.insert(bond.key()), "duplicate bond {bond:?}");
    }
    let cap = sim.policy().max_bonds;
    for (id, d) in graph.degrees(n).into_iter().enumerate() {
        assert!(d <= cap, "particle {id} has {d} bonds, cap {cap}");
    }
}

#[test]
fn head_on_collision_reverses_and_separates() {
    let mut ps = vec![moving(0.0, 50.0, 1.0, 0.0, 5.0), moving(8.0, 50.0, -1.0, 0.0, 5.0)];
    let mut events = Vec::new();
    resolve_collisions(&mut ps, &mut events);

    assert_eq!(events, vec![CollisionEvent { a: 0, b: 1 }]);
    assert!(ps[0].vel.x < 0.0 && ps[1].vel.x > 0.0);
    assert_abs_diff_eq!(ps[0].vel.x, -ps[1].vel.x, epsilon = 1e-6);
    assert_abs_diff_eq!(ps[1].vel.x, 0.8, epsilon = 1e-5);
    assert!(ps[0].pos.distance(ps[1].pos) >= 10.0 - 1e-5);
}

#[test]
fn cluster_collisions_conserve_momentum_and_never_gain_energy() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut ps: Vec<Particle> = (0..40)
        .map(|_| {
            moving(
                rng.random_range(0.0..60.0),
                rng.random_range(0.0..60.0),
                rng.random_range(-2.0..2.0),
                rng.random_range(-2.0..2.0),
                rng.random_range(3.0..6.0),
            )
        })
        .collect();

    let momentum = |ps: &[Particle]| -> Vec2 { ps.iter().map(|p| p.vel * p.mass()).sum() };
    let energy = |ps: &[Particle]| -> f32 { ps.iter().map(|p| 0.5 * p.mass() * p.speed_sq()).sum() };

    let p0 = momentum(&ps);
    let e0 = energy(&ps);
    let mut events = Vec::new();
    resolve_collisions(&mut ps, &mut events);
    assert!(!events.is_empty());

    let p1 = momentum(&ps);
    assert_abs_diff_eq!(p0.x, p1.x, epsilon = 0.1);
    assert_abs_diff_eq!(p0.y, p1.y, epsilon = 0.1);
    assert!(energy(&ps) <= e0 * (1.0 + 1e-5));
}

#[test]
fn particles_stay_inside_the_world() {
    let world = Bounds::new(300.0, 200.0);
    let mut sim = Simulation::new(config(world, 120, 7)).unwrap();
    sim.set_temperature(100.0).unwrap();
    let pushes = [
        PushForce::new(Vec2::new(150.0, 100.0), 150.0, 40.0),
        PushForce::new(Vec2::new(10.0, 10.0), 80.0, 25.0),
    ];
    for _ in 0..100 {
        sim.tick(&pushes).unwrap();
        for p in sim.particles() {
            assert!(p.pos.x >= p.radius && p.pos.x <= world.width - p.radius, "{p:?}");
            assert!(p.pos.y >= p.radius && p.pos.y <= world.height - p.radius, "{p:?}");
        }
    }
}

#[test]
fn bond_invariants_hold_in_every_environment() {
    for env in Environment::ALL {
        let mut sim = Simulation::new(config(Bounds::new(300.0, 200.0), 150, 11)).unwrap();
        sim.set_environment(env);
        assert_bond_invariants(&sim);
        let world = sim.bounds();
        for _ in 0..30 {
            sim.tick(&[]).unwrap();
            assert_bond_invariants(&sim);
            for p in sim.particles() {
                assert!(p.pos.x >= p.radius && p.pos.x <= world.width - p.radius, "{env}: {p:?}");
                assert!(p.pos.y >= p.radius && p.pos.y <= world.height - p.radius, "{env}: {p:?}");
            }
        }
        if env == Environment::None {
            assert_eq!(sim.stats().bond_count, 0);
        } else {
            assert!(sim.stats().bond_count > 0, "{env} formed no bonds");
        }
    }
}

#[test]
fn overstretched_bond_breaks_once_and_reforms_only_from_scratch() {
    let mut ps = vec![moving(0.0, 0.0, 0.0, 0.0, 3.0), moving(16.0, 0.0, 0.0, 0.0, 3.0)];
    let mut graph = BondGraph::new();
    graph.insert(Bond { a: 0, b: 1, rest: 10.0, stiffness: 0.01 });

    assert_eq!(graph.cleanup_bonds(&ps, 1.5), 1);
    assert_eq!(graph.cleanup_bonds(&ps, 1.5), 0);
    assert!(graph.is_empty());

    // Fresh formation captures the new distance as rest length.
    graph.create_bonds(&ps, Environment::Gas, &EnvironmentPolicy::GAS);
    assert_eq!(graph.len(), 1);
    assert_abs_diff_eq!(graph.as_slice()[0].rest, 16.0);

    // Out of formation range: pruned and never recreated.
    ps[1].pos.x = 100.0;
    assert_eq!(graph.cleanup_bonds(&ps, 1.5), 1);
    graph.create_bonds(&ps, Environment::Gas, &EnvironmentPolicy::GAS);
    assert!(graph.is_empty());
}

#[test]
fn bond_pulled_apart_during_tick_is_pruned_exactly_once() {
    let cfg = config(Bounds::new(1000.0, 200.0), 0, 1);
    let particles = vec![moving(100.0, 100.0, 0.0, 0.0, 3.0), moving(110.0, 100.0, 70.0, 0.0, 3.0)];
    let mut sim =
        Simulation::from_particles(cfg, PolicyTable::default(), Environment::Gas, particles).unwrap();
    assert_eq!(sim.stats().bond_count, 1);

    sim.tick(&[]).unwrap();
    assert_eq!(sim.last_summary().bonds_pruned, 1);
    assert_eq!(sim.last_summary().bonds_rebuilt, 0);

    sim.tick(&[]).unwrap();
    assert_eq!(sim.last_summary().bonds_pruned, 0);
    assert_eq!(sim.stats().bond_count, 0);
}

#[test]
fn solid_none_solid_matches_fresh_rebuild() {
    let cfg = config(Bounds::new(300.0, 200.0), 90, 21);
    let mut sim = Simulation::new(cfg).unwrap();
    sim.set_environment(Environment::Solid);
    let first = sim.bond_graph().as_slice().to_vec();
    assert!(!first.is_empty());

    sim.set_environment(Environment::None);
    assert_eq!(sim.stats().bond_count, 0);
    sim.set_environment(Environment::Solid);
    assert_eq!(sim.bond_graph().as_slice(), first.as_slice());

    let fresh = Simulation::from_particles(
        cfg,
        PolicyTable::default(),
        Environment::Solid,
        sim.particles().to_vec(),
    )
    .unwrap();
    assert_eq!(fresh.bond_graph().as_slice(), first.as_slice());
}

#[test]
fn hexagonal_cluster_bonds_centre_to_all_six_neighbours() {
    let centre = Vec2::new(200.0, 200.0);
    let mut particles = vec![Particle::new(centre, 5.0).unwrap()];
    for k in 0..6 {
        let angle = k as f32 / 6.0 * TAU;
        let pos = centre + Vec2::new(angle.cos(), angle.sin()) * 20.0;
        particles.push(Particle::new(pos, 5.0).unwrap());
    }
    let table = PolicyTable::default()
        .with_entry(
            Environment::Solid,
            EnvironmentPolicy {
                max_bonds: 7,
                bond_distance: 120.0,
                ..EnvironmentPolicy::SOLID
            },
        )
        .unwrap();
    let sim = Simulation::from_particles(
        config(Bounds::new(400.0, 400.0), 0, 3),
        table,
        Environment::Solid,
        particles,
    )
    .unwrap();

    let graph = sim.bond_graph();
    let centre_bonds: Vec<&Bond> = graph.iter().filter(|b| b.involves(0)).collect();
    assert_eq!(centre_bonds.len(), 6);
    for bond in centre_bonds {
        assert_abs_diff_eq!(bond.rest, 20.0, epsilon = 1e-3);
    }
    assert!(graph.iter().all(|b| b.a != b.b));
    assert_bond_invariants(&sim);
}

#[test]
fn kinetic_temperature_follows_configured_temperature() {
    let cfg = Config {
        radius_range: (4.0, 4.0),
        ..config(Bounds::new(800.0, 600.0), 100, 17)
    };
    let mut sim = Simulation::new(cfg).unwrap();

    sim.set_temperature(0.0).unwrap();
    let cold = sim.stats().mean_kinetic_temperature;
    sim.set_temperature(100.0).unwrap();
    let hot = sim.stats().mean_kinetic_temperature;
    assert!(hot > cold, "cold={cold} hot={hot}");
    assert_eq!(sim.stats().particle_count, 100);
}

#[test]
fn solid_responds_less_to_heating() {
    let cfg = Config {
        radius_range: (4.0, 4.0),
        ..config(Bounds::new(800.0, 600.0), 200, 5)
    };
    let mut fluid = Simulation::new(cfg).unwrap();
    let mut solid = Simulation::new(cfg).unwrap();
    solid.set_environment(Environment::Solid);

    fluid.set_temperature(100.0).unwrap();
    solid.set_temperature(100.0).unwrap();
    assert!(solid.stats().mean_kinetic_temperature < fluid.stats().mean_kinetic_temperature);
}

#[test]
fn shrinking_population_removes_newest_and_their_bonds() {
    let mut sim = Simulation::new(config(Bounds::new(300.0, 200.0), 120, 8)).unwrap();
    sim.set_environment(Environment::Liquid);
    let survivors = sim.particles()[..50].to_vec();

    sim.set_population_target(50);
    assert_eq!(sim.particles(), survivors.as_slice());
    assert_bond_invariants(&sim);

    sim.set_population_target(0);
    assert!(sim.particles().is_empty());
    assert_eq!(sim.stats(), Default::default());

    sim.set_population_target(30);
    assert_eq!(sim.particles().len(), 30);
    assert_bond_invariants(&sim);
}

#[test]
fn seeded_runs_are_reproducible() {
    let cfg = config(Bounds::new(300.0, 200.0), 80, 1234);
    let mut a = Simulation::new(cfg).unwrap();
    let mut b = Simulation::new(cfg).unwrap();
    for sim in [&mut a, &mut b] {
        sim.set_environment(Environment::Liquid);
        for _ in 0..25 {
            sim.tick(&[]).unwrap();
        }
    }
    assert_eq!(a.particles(), b.particles());
    assert_eq!(a.bond_graph().as_slice(), b.bond_graph().as_slice());

    a.reset_with_seed(Some(1234));
    let fresh = Simulation::new(cfg).unwrap();
    assert_eq!(a.particles(), fresh.particles());
}

#[test]
fn solid_lattice_loses_kinetic_energy() {
    let mut sim = Simulation::new(config(Bounds::new(300.0, 200.0), 150, 31)).unwrap();
    sim.set_environment(Environment::Solid);
    let start = sim.stats().mean_kinetic_temperature;
    assert!(start > 0);
    for _ in 0..60 {
        sim.tick(&[]).unwrap();
    }
    assert!(sim.stats().mean_kinetic_temperature < start);
}

#[test]
fn liquid_bond_dissolves_once_pair_leaves_formation_range() {
    let cfg = config(Bounds::new(400.0, 200.0), 0, 2);
    let particles = vec![moving(100.0, 100.0, 0.0, 0.0, 3.0), moving(160.0, 100.0, 20.0, 0.0, 3.0)];
    let mut sim =
        Simulation::from_particles(cfg, PolicyTable::default(), Environment::Liquid, particles).unwrap();
    assert_eq!(sim.stats().bond_count, 1);

    sim.tick(&[]).unwrap();
    let ps = sim.particles();
    assert_abs_diff_eq!(ps[0].pos.distance(ps[1].pos), 80.0, epsilon = 1e-4);
    assert_eq!(sim.last_summary().bonds_pruned, 0);
    assert_eq!(sim.stats().bond_count, 0);
}
