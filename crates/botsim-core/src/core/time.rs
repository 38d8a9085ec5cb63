use crate::error::{Result, SimError};

/// Receiver of fixed physics ticks.
///
/// Within one tick the three calls always run in this order, each to
/// completion before the next starts.
pub trait StepTarget {
    fn before_physics_step(&mut self, dt_secs: f32);
    /// Integrate the physics world by exactly `dt_secs`.
    fn physics_step(&mut self, dt_secs: f32);
    fn after_physics_step(&mut self, dt_secs: f32);
}

/// Convert milliseconds to whole microseconds, rounding to the nearest one.
/// Negative and NaN inputs count as zero.
fn ms_to_micros(ms: f32) -> u64 {
    (f64::from(ms) * 1000.0).round().max(0.0) as u64
}

/// Fixed timestep loop.
/// Turns variable frame time into a whole number of constant-size ticks.
///
/// Time is counted in integer microseconds so the tick count depends only on
/// the total elapsed time, never on how it was split across calls. The
/// timestep is truncated to whole microseconds (1000/60 ms runs as 16666 µs).
#[derive(Debug, Clone, Copy)]
pub struct Stepper {
    timestep_us: u64,
}

impl Stepper {
    /// Fails unless `timestep_ms` is finite and at least one microsecond.
    pub fn new(timestep_ms: f32) -> Result<Self> {
        if !timestep_ms.is_finite() {
            return Err(SimError::InvalidConfig("timestep must be finite"));
        }
        // Round to nanoseconds first so f32 noise (4.6 stored as 4.5999…)
        // does not lose a whole microsecond.
        let nanos = (f64::from(timestep_ms) * 1.0e6).round();
        let timestep_us = (nanos / 1000.0).floor();
        if timestep_us < 1.0 {
            return Err(SimError::InvalidConfig("timestep must be at least 1 µs"));
        }
        Ok(Self {
            timestep_us: timestep_us as u64,
        })
    }

    pub fn timestep_ms(&self) -> f32 {
        self.timestep_us as f32 / 1000.0
    }

    pub fn timestep_secs(&self) -> f32 {
        (self.timestep_us as f64 / 1.0e6) as f32
    }

    /// Run as many ticks as fit in `elapsed_ms` and return the unused
    /// remainder, which the caller adds to its next call.
    pub fn advance<T: StepTarget + ?Sized>(&self, target: &mut T, elapsed_ms: f32) -> f32 {
        let dt = self.timestep_secs();
        let elapsed_us = ms_to_micros(elapsed_ms);
        let ticks = elapsed_us / self.timestep_us;
        for _ in 0..ticks {
            target.before_physics_step(dt);
            target.physics_step(dt);
            target.after_physics_step(dt);
        }
        let leftover_us = elapsed_us - ticks * self.timestep_us;
        leftover_us as f32 / 1000.0
    }
}
