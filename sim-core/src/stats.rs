use crate::bonds::BondGraph;
use crate::particle::ParticleStore;

/// Scale from mean squared speed to the displayed kinetic temperature.
pub const TEMPERATURE_SCALE: f32 = 30.0;

/// Aggregate numbers forwarded to presentation once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub particle_count: usize,
    pub bond_count: usize,
    /// `round(30 * mean(vx² + vy²))`, `0` for an empty population.
    pub mean_kinetic_temperature: u32,
}

impl Stats {
    pub fn collect(store: &ParticleStore, bonds: &BondGraph) -> Self {
        Self {
            particle_count: store.len(),
            bond_count: bonds.len(),
            mean_kinetic_temperature: kinetic_temperature(store.mean_speed_sq()),
        }
    }
}

#[inline]
pub fn kinetic_temperature(mean_speed_sq: f32) -> u32 {
    (TEMPERATURE_SCALE * mean_speed_sq).round() as u32
}

/// Frames-per-second counter fed with caller timestamps (seconds).
///
/// The rate is recomputed once at least a second has passed since the last
/// update; in between, [`FrameRate::fps`] returns the previous value.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameRate {
    window_start: Option<f64>,
    frames: u32,
    fps: u32,
}

impl FrameRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one frame at time `now`.
    pub fn record_frame(&mut self, now: f64) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.frames += 1;
        let elapsed = now - start;
        if elapsed >= 1.0 {
            self.fps = (f64::from(self.frames) / elapsed).round() as u32;
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    #[inline]
    pub fn fps(&self) -> u32 {
        self.fps
    }
}
