//! # Performance Meter
//!
//! Monotonic wall-clock timing ([`std::time::Instant`], never system time) and
//! throughput in GFLOPS.
//!
//! A product of an `n×m` by an `m×p` matrix performs `n·p·m` multiplies and
//! `n·p·(m-1)` adds, i.e. `2·n·m·p - n·p` floating-point operations
//! (`2n³ - n²` for square matrices).

use std::time::{Duration, Instant};

use crate::error::{MatmulError, Result};

/// Smallest non-zero duration [`Instant`] can report (one nanosecond).
/// Measurements shorter than the clock resolution are floored to this.
pub const MIN_ELAPSED_SECONDS: f64 = 1e-9;

/// Start/stop stopwatch over a monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer {
    start: Option<Instant>,
    end: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start timestamp and clears any previous stop.
    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.end = None;
    }

    /// Records the stop timestamp.
    pub fn stop(&mut self) {
        self.end = Some(Instant::now());
    }

    /// Time between `start` and `stop`. A running timer reports the time so
    /// far; a timer that was never started reports zero.
    pub fn elapsed(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn elapsed_milliseconds(&self) -> f64 {
        self.elapsed_seconds() * 1000.0
    }

    /// Runs `f` between `start` and `stop` and returns its output.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        self.start();
        let out = f();
        self.stop();
        out
    }
}

/// Floating-point operation count of an `(n×m)·(m×p)` product: `2·n·m·p - n·p`.
pub fn flop_count(n: usize, m: usize, p: usize) -> f64 {
    let (n, m, p) = (n as f64, m as f64, p as f64);
    2.0 * n * m * p - n * p
}

/// GFLOPS of a square `n×n×n` product that took `seconds`:
/// `(2n³ - n²) / (seconds · 1e9)`.
///
/// # Errors
/// [`MatmulError::InvalidDuration`] if `seconds` is zero, negative or not finite.
pub fn gflops(n: usize, seconds: f64) -> Result<f64> {
    gflops_for_shape(n, n, n, seconds)
}

/// GFLOPS of an `(n×m)·(m×p)` product that took `seconds`.
pub fn gflops_for_shape(n: usize, m: usize, p: usize, seconds: f64) -> Result<f64> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(MatmulError::InvalidDuration { seconds });
    }
    Ok(flop_count(n, m, p) / (seconds * 1e9))
}
