use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors surfaced by the simulation core.
///
/// Degenerate geometry (coincident particles) is never an error: the affected
/// pair or bond is skipped for that tick. Everything here is either rejected
/// configuration or a broken internal invariant.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected at the boundary, before it reaches per-tick logic.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Environment name not present in the policy table.
    #[error("unknown environment: {0:?}")]
    UnknownEnvironment(String),

    /// Particle construction parameters out of range (radius, non-finite state).
    #[error("invalid particle: {0}")]
    InvalidParticle(String),

    /// A tick produced inconsistent state and was rolled back.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
