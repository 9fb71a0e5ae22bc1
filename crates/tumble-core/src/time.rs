use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn secs_to_nanos(secs: f64) -> u64 {
    (secs * NANOS_PER_SEC).round() as u64
}

/// Fixed steps round down so `n` sub-steps never advance world time past
/// `n * timestep`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn step_to_nanos(secs: f64) -> u64 {
    (secs * NANOS_PER_SEC).floor() as u64
}

// ---------------------------------------------------------------------------
// SimTime
// ---------------------------------------------------------------------------

/// Integer-nanosecond simulated world time.
///
/// Advanced only by whole fixed sub-steps, so repeated stepping never
/// accumulates floating-point drift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime {
    nanos: u64,
}

impl SimTime {
    #[must_use]
    pub const fn new() -> Self {
        Self { nanos: 0 }
    }

    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        Self {
            nanos: secs_to_nanos(secs),
        }
    }

    #[must_use]
    pub const fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Elapsed seconds as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f64(&self) -> f64 {
        self.nanos as f64 / NANOS_PER_SEC
    }

    #[must_use]
    pub const fn to_duration(&self) -> Duration {
        Duration::from_nanos(self.nanos)
    }

    pub const fn advance(&mut self, delta_nanos: u64) {
        self.nanos = self.nanos.saturating_add(delta_nanos);
    }

    pub const fn reset(&mut self) {
        self.nanos = 0;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.nanos / 1_000_000_000;
        let micros = (self.nanos % 1_000_000_000) / 1_000;
        write!(f, "{secs}.{micros:06}s")
    }
}

// ---------------------------------------------------------------------------
// SubstepAccumulator
// ---------------------------------------------------------------------------

/// Fixed-step accumulator with a per-call sub-step cap.
///
/// Each [`accumulate`](Self::accumulate) call adds a frame delta, dispenses
/// as many whole fixed sub-steps as fit, and keeps the remainder for the next
/// call. When more than `max_substeps` steps fit, only `max_substeps` are run
/// and the excess whole steps are dropped, bounding per-frame cost.
#[derive(Debug, Clone)]
pub struct SubstepAccumulator {
    accumulated: u64,
    timestep_nanos: u64,
    timestep_secs: f64,
    max_substeps: u32,
    dropped_nanos: u64,
}

impl SubstepAccumulator {
    /// Accumulator with the given fixed timestep and a cap of 10 sub-steps.
    pub fn new(timestep_secs: f64) -> Self {
        Self {
            accumulated: 0,
            timestep_nanos: step_to_nanos(timestep_secs),
            timestep_secs,
            max_substeps: 10,
            dropped_nanos: 0,
        }
    }

    /// Set the sub-step cap. Values below 1 are raised to 1.
    #[must_use]
    pub const fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = if max_substeps == 0 { 1 } else { max_substeps };
        self
    }

    /// Feed `delta_secs` of frame time and return how many fixed sub-steps
    /// to run now.
    #[allow(clippy::cast_possible_truncation)]
    pub fn accumulate(&mut self, delta_secs: f64) -> u32 {
        if self.timestep_nanos == 0 {
            return 0;
        }
        self.accumulated = self.accumulated.saturating_add(secs_to_nanos(delta_secs));
        let available = self.accumulated / self.timestep_nanos;
        self.accumulated -= available * self.timestep_nanos;

        let cap = u64::from(self.max_substeps);
        if available > cap {
            self.dropped_nanos = self
                .dropped_nanos
                .saturating_add((available - cap) * self.timestep_nanos);
            return self.max_substeps;
        }
        available as u32
    }

    /// Fraction of a sub-step left over after the last call, in `[0, 1)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn alpha(&self) -> f32 {
        if self.timestep_nanos == 0 {
            return 0.0;
        }
        self.accumulated as f32 / self.timestep_nanos as f32
    }

    #[must_use]
    pub const fn timestep(&self) -> f64 {
        self.timestep_secs
    }

    #[must_use]
    pub const fn timestep_nanos(&self) -> u64 {
        self.timestep_nanos
    }

    #[must_use]
    pub const fn max_substeps(&self) -> u32 {
        self.max_substeps
    }

    /// Change the fixed timestep. Leftover time is discarded.
    pub fn set_timestep(&mut self, timestep_secs: f64) {
        self.timestep_secs = timestep_secs;
        self.timestep_nanos = step_to_nanos(timestep_secs);
        self.accumulated = 0;
    }

    /// Unconsumed time carried into the next call, in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accumulated_secs(&self) -> f64 {
        self.accumulated as f64 / NANOS_PER_SEC
    }

    /// Total time discarded by the sub-step cap, in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dropped_secs(&self) -> f64 {
        self.dropped_nanos as f64 / NANOS_PER_SEC
    }

    pub const fn reset(&mut self) {
        self.accumulated = 0;
        self.dropped_nanos = 0;
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Simulation clock: world time, the sub-step accumulator and a frame
/// counter.
///
/// ```ignore
/// let substeps = clock.tick(frame_dt);
/// for _ in 0..substeps {
///     backend.step(clock.timestep());
///     clock.advance();
/// }
/// clock.next_frame();
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    time: SimTime,
    accumulator: SubstepAccumulator,
    frame: u64,
}

impl Clock {
    pub fn new(timestep_secs: f64) -> Self {
        Self {
            time: SimTime::new(),
            accumulator: SubstepAccumulator::new(timestep_secs),
            frame: 0,
        }
    }

    #[must_use]
    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.accumulator = self.accumulator.with_max_substeps(max_substeps);
        self
    }

    /// Feed a frame delta; returns the number of sub-steps to run.
    pub fn tick(&mut self, delta_secs: f64) -> u32 {
        self.accumulator.accumulate(delta_secs)
    }

    /// Advance world time by one fixed sub-step.
    pub const fn advance(&mut self) {
        self.time.advance(self.accumulator.timestep_nanos());
    }

    pub const fn next_frame(&mut self) {
        self.frame += 1;
    }

    #[must_use]
    pub const fn time(&self) -> SimTime {
        self.time
    }

    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub const fn timestep(&self) -> f64 {
        self.accumulator.timestep()
    }

    pub fn set_timestep(&mut self, timestep_secs: f64) {
        self.accumulator.set_timestep(timestep_secs);
    }

    #[must_use]
    pub const fn max_substeps(&self) -> u32 {
        self.accumulator.max_substeps()
    }

    #[must_use]
    pub const fn accumulator(&self) -> &SubstepAccumulator {
        &self.accumulator
    }

    /// Reset world time, leftover time and the frame counter.
    pub const fn reset(&mut self) {
        self.time.reset();
        self.accumulator.reset();
        self.frame = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
