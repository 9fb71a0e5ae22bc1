//! Wall-clock step profiling.
//!
//! Purely observational: timings are measured around backend stepping and
//! logged, never fed back into the simulation.

use std::time::Duration;

use tracing::{debug, info};

/// Running statistics over profiled `step_simulation` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProfile {
    /// Number of profiled calls that ran at least one sub-step.
    pub steps: u64,
    /// Total wall-clock time spent stepping.
    pub total: Duration,
    /// Duration of the most recent profiled call.
    pub last: Duration,
    /// Emit an `info!` summary every this many calls (0 disables it).
    log_every: u64,
}

impl Default for StepProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProfile {
    pub const fn new() -> Self {
        Self {
            steps: 0,
            total: Duration::ZERO,
            last: Duration::ZERO,
            log_every: 600,
        }
    }

    #[must_use]
    pub const fn with_log_every(mut self, log_every: u64) -> Self {
        self.log_every = log_every;
        self
    }

    /// Record one call that ran `substeps` sub-steps in `elapsed`.
    pub fn record(&mut self, elapsed: Duration, substeps: u32) {
        self.steps += 1;
        self.total += elapsed;
        self.last = elapsed;
        debug!(
            "Physics step: {substeps} substeps in {:.3} ms ({:.1} FPS)",
            elapsed.as_secs_f64() * 1e3,
            self.last_fps().unwrap_or(f64::INFINITY)
        );
        if self.log_every > 0 && self.steps % self.log_every == 0 {
            if let Some(avg) = self.average_fps() {
                info!("Physics average: {avg:.1} FPS over {} steps", self.steps);
            }
        }
    }

    /// Step rate implied by the most recent call.
    pub fn last_fps(&self) -> Option<f64> {
        fps(self.last)
    }

    /// Step rate implied by the mean call duration.
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> Option<f64> {
        if self.steps == 0 {
            return None;
        }
        fps(self.total.div_f64(self.steps as f64))
    }

    pub fn reset(&mut self) {
        *self = Self::new().with_log_every(self.log_every);
    }
}

fn fps(d: Duration) -> Option<f64> {
    let secs = d.as_secs_f64();
    (secs > 0.0).then(|| 1.0 / secs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
