//! Core 2-D particle kinetics, collision and bond-network engine.
//!
//! Main components:
//! - [`particle`]: particle bodies and the index-addressed particle store.
//! - [`collision`]: pairwise elastic collision resolution.
//! - [`bonds`]: the bond graph: formation, pruning, springs and relaxation.
//! - [`environment`]: environments and their bond/thermal policies.
//! - [`config`]: global configuration, temperature mapping and push forces.
//! - [`phases`]: the ordered per-tick pipeline.
//! - [`sim`]: the [`Simulation`] context that owns all state.
//! - [`stats`]: aggregate statistics and the frame-rate counter.
//! - [`error`]: the crate error type.
//! - [`types`]: shared type aliases and IDs.

pub mod bonds;
pub mod collision;
pub mod config;
pub mod environment;
pub mod error;
pub mod particle;
pub mod phases;
pub mod sim;
pub mod stats;
pub mod types;

pub use config::{Config, PushForce};
pub use environment::{Environment, EnvironmentPolicy, PolicyTable};
pub use error::{Result, SimError};
pub use sim::Simulation;
