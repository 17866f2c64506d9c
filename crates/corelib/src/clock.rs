//! Frame clock: elapsed time drives the animated uniforms.

use std::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
    last: Instant,
}

/// One reading of the clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub delta: f32,
}

impl Clock {
    pub fn start_new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start, last: start }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Readings taken before the previous tick yield a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let elapsed = now.saturating_duration_since(self.start);
        let delta = now.saturating_duration_since(self.last);
        self.last = self.last.max(now);
        FrameTime {
            elapsed: elapsed.as_secs_f32(),
            delta: delta.as_secs_f32(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start_new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tick_reports_elapsed_and_delta() {
        let t0 = Instant::now();
        let mut clock = Clock::starting_at(t0);

        let a = clock.tick_at(t0 + Duration::from_millis(500));
        assert!((a.elapsed - 0.5).abs() < 1e-6);
        assert!((a.delta - 0.5).abs() < 1e-6);

        let b = clock.tick_at(t0 + Duration::from_millis(750));
        assert!((b.elapsed - 0.75).abs() < 1e-6);
        assert!((b.delta - 0.25).abs() < 1e-6);
    }

    #[test]
    fn stale_reading_has_zero_delta() {
        let t0 = Instant::now();
        let mut clock = Clock::starting_at(t0);
        clock.tick_at(t0 + Duration::from_secs(2));
        let stale = clock.tick_at(t0 + Duration::from_secs(1));
        assert_eq!(stale.delta, 0.0);
        assert!((stale.elapsed - 1.0).abs() < 1e-6);
    }
}
