/// Identifier for a particle in a [`crate::particle::ParticleStore`].
///
/// This is an index into the store, and is only meaningful within
/// the lifetime of a given population (a reset or a shrink invalidates it).
pub type ParticleId = usize;

/// Axis-aligned world rectangle `[0, width] x [0, height]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}
