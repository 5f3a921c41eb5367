//! # Time — Frame Clock
//!
//! [`Time`] turns a frame loop into the `delta` seconds that
//! [`Engine::run`](crate::Engine::run) expects:
//!
//! ```ignore
//! let mut time = Time::new();
//! loop {
//!     engine.run(time.tick());
//! }
//! ```
//!
//! `tick` measures the wall clock; headless loops and tests call
//! [`step`](Time::step) with a fixed duration instead. The first `tick` has no
//! previous frame to measure against and reports zero.
//!
//! ## Clamping
//!
//! A frame that stalls (a breakpoint, a dragged window) would otherwise hand
//! every system one huge delta. Each delta is capped at
//! [`max_delta`](Time::with_max_delta), 250 ms by default, and elapsed time
//! advances by the capped amount.

use std::time::{Duration, Instant};

use log::trace;

/// Largest delta a single frame reports unless configured otherwise.
pub const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(250);

/// Frame clock producing per-frame deltas.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    /// Instant of the previous `tick`, `None` until the first one.
    last_tick: Option<Instant>,
    max_delta: Duration,
    delta: Duration,
    /// Sum of all (clamped) deltas.
    elapsed: Duration,
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            max_delta: DEFAULT_MAX_DELTA,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Cap every delta at `max_delta`.
    pub fn with_max_delta(mut self, max_delta: Duration) -> Self {
        self.max_delta = max_delta;
        self
    }

    /// Start a frame by the wall clock. Returns the delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let measured = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_tick = Some(now);
        self.record(measured)
    }

    /// Start a frame of a fixed length. Returns the delta in seconds.
    pub fn step(&mut self, step: Duration) -> f32 {
        self.record(step)
    }

    fn record(&mut self, measured: Duration) -> f32 {
        if measured > self.max_delta {
            trace!("frame took {measured:?}, clamped to {:?}", self.max_delta);
        }
        self.delta = measured.min(self.max_delta);
        self.elapsed += self.delta;
        self.frame_count += 1;
        self.delta.as_secs_f32()
    }

    /// Delta of the current frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Rate implied by the current delta; zero while the delta is zero.
    pub fn fps(&self) -> f32 {
        if self.delta.is_zero() {
            0.0
        } else {
            self.delta_secs().recip()
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
