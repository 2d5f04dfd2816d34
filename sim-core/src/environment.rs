//! Environment policy: the per-regime parameters driving the bond network.
//!
//! An [`Environment`] is a closed set of physical regimes. Each one maps to an
//! [`EnvironmentPolicy`] through a [`PolicyTable`]. Tables are validated when
//! built and never change afterwards; the simulation swaps which entry is
//! active, not the entry itself.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimError};

/// Named physical regime selecting bond topology and force parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    #[default]
    None,
    Gas,
    Liquid,
    Solid,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::None,
        Environment::Gas,
        Environment::Liquid,
        Environment::Solid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Environment::None => "none",
            Environment::Gas => "gas",
            Environment::Liquid => "liquid",
            Environment::Solid => "solid",
        }
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        matches!(self, Environment::Solid)
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            Environment::None => 0,
            Environment::Gas => 1,
            Environment::Liquid => 2,
            Environment::Solid => 3,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Environment {
    type Err = SimError;

    /// Parses an environment name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Environment::ALL
            .into_iter()
            .find(|env| env.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SimError::UnknownEnvironment(s.to_string()))
    }
}

/// Parameters for one environment.
///
/// ### Fields
/// - `max_bonds` - Upper bound on bonds incident to any single particle.
/// - `bond_distance` - Formation cutoff distance.
/// - `bond_stiffness` - Spring constant copied into each bond at formation.
/// - `relax_tolerance` - Relative band around the rest length left untouched
///   by relaxation.
/// - `break_factor` - A bond longer than `rest * break_factor` is pruned.
/// - `relax_break_factor` - Break threshold applied during solid relaxation.
/// - `thermal_factor` - Multiplier on the thermal speed when temperature changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentPolicy {
    pub max_bonds: usize,
    pub bond_distance: f32,
    pub bond_stiffness: f32,
    pub relax_tolerance: f32,
    pub break_factor: f32,
    pub relax_break_factor: f32,
    pub thermal_factor: f32,
}

impl EnvironmentPolicy {
    const fn fluid(max_bonds: usize, bond_distance: f32, bond_stiffness: f32) -> Self {
        Self {
            max_bonds,
            bond_distance,
            bond_stiffness,
            relax_tolerance: 0.1,
            break_factor: 1.5,
            relax_break_factor: 2.0,
            thermal_factor: 1.0,
        }
    }

    pub const NONE: Self = Self::fluid(0, 0.0, 0.0);
    pub const GAS: Self = Self::fluid(2, 60.0, 0.01);
    pub const LIQUID: Self = Self::fluid(3, 70.0, 0.05);
    pub const SOLID: Self = Self {
        thermal_factor: 0.3,
        ..Self::fluid(6, 80.0, 0.3)
    };

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(SimError::InvalidConfig(msg.to_string()))
            }
        }

        check(
            self.bond_distance.is_finite() && self.bond_distance >= 0.0,
            "bond_distance must be finite and >= 0",
        )?;
        check(
            self.bond_stiffness.is_finite() && self.bond_stiffness >= 0.0,
            "bond_stiffness must be finite and >= 0",
        )?;
        check(
            (0.0..1.0).contains(&self.relax_tolerance),
            "relax_tolerance must be in [0, 1)",
        )?;
        check(
            self.break_factor.is_finite() && self.break_factor > 1.0,
            "break_factor must be finite and > 1",
        )?;
        check(
            self.relax_break_factor.is_finite() && self.relax_break_factor > 1.0,
            "relax_break_factor must be finite and > 1",
        )?;
        check(
            self.thermal_factor > 0.0 && self.thermal_factor <= 1.0,
            "thermal_factor must be in (0, 1]",
        )
    }
}

/// Lookup table from [`Environment`] to its [`EnvironmentPolicy`].
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyTable {
    entries: [EnvironmentPolicy; 4],
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            entries: [
                EnvironmentPolicy::NONE,
                EnvironmentPolicy::GAS,
                EnvironmentPolicy::LIQUID,
                EnvironmentPolicy::SOLID,
            ],
        }
    }
}

impl PolicyTable {
    /// Returns a copy of this table with the entry for `env` replaced.
    ///
    /// ### Errors
    /// [`SimError::InvalidConfig`] if `policy` fails [`EnvironmentPolicy::validate`].
    pub fn with_entry(mut self, env: Environment, policy: EnvironmentPolicy) -> Result<Self> {
        policy.validate()?;
        self.entries[env.index()] = policy;
        Ok(self)
    }

    #[inline]
    pub fn get(&self, env: Environment) -> &EnvironmentPolicy {
        &self.entries[env.index()]
    }

    /// Looks an environment up by name.
    pub fn lookup(&self, name: &str) -> Result<(Environment, &EnvironmentPolicy)> {
        let env: Environment = name.parse()?;
        Ok((env, self.get(env)))
    }
}
