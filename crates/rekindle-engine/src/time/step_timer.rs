use std::time::{Duration, Instant};

/// Timing snapshot for one simulation step.
#[derive(Debug, Copy, Clone)]
pub struct StepTime {
    /// Time elapsed since the previous step, in seconds.
    pub dt: f32,

    /// Accumulated simulation time, in seconds.
    pub total: f64,

    /// Monotonic timestamp taken at the step.
    pub now: Instant,

    /// Steps taken so far, including this one.
    pub frame_count: u64,
}

/// Step timer producing `StepTime` snapshots.
///
/// The frame count starts at zero; the lifecycle does not render until the
/// first step has been taken. Delta time is clamped so a stall (debugger,
/// suspension, long resize) does not arrive as one huge step.
#[derive(Debug, Clone)]
pub struct StepTimer {
    last: Instant,
    total: Duration,
    frame_count: u64,

    frames_this_second: u32,
    second_counter: Duration,
    frames_per_second: u32,

    dt_min: Duration,
    dt_max: Duration,
}

impl StepTimer {
    /// Creates a new timer with default clamps.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a timer with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            total: Duration::ZERO,
            frame_count: 0,
            frames_this_second: 0,
            second_counter: Duration::ZERO,
            frames_per_second: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Accumulated simulation time.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Steps counted over the last full second.
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Baseline the next delta is measured from.
    pub fn last_tick(&self) -> Instant {
        self.last
    }

    /// Discards the time accumulated since the last step.
    ///
    /// Call after an intentional pause (resuming from suspension) so the next
    /// step does not try to catch up. The frame count is kept.
    pub fn reset_elapsed(&mut self) {
        self.reset_elapsed_at(Instant::now());
    }

    pub(crate) fn reset_elapsed_at(&mut self, now: Instant) {
        self.last = now;
        self.frames_this_second = 0;
        self.second_counter = Duration::ZERO;
        self.frames_per_second = 0;
    }

    /// Takes one step and returns its timing.
    pub fn tick(&mut self) -> StepTime {
        self.advance(Instant::now())
    }

    pub(crate) fn advance(&mut self, now: Instant) -> StepTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.total += dt;
        self.frame_count = self.frame_count.wrapping_add(1);

        self.frames_this_second += 1;
        self.second_counter += dt;
        if self.second_counter >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.second_counter = Duration::from_nanos(
                (self.second_counter.as_nanos() % 1_000_000_000) as u64,
            );
        }

        StepTime {
            dt: dt.as_secs_f32(),
            total: self.total.as_secs_f64(),
            now,
            frame_count: self.frame_count,
        }
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}
