use std::time::{Duration, Instant};

/// Averages frame rate over one-second windows.
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
    interval: Duration,
    last: Option<f32>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            window_start: None,
            frames: 0,
            interval: Duration::from_secs(1),
            last: None,
        }
    }

    /// Count a frame presented at `now`; returns the average once per window.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.interval {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.window_start = Some(now);
        self.frames = 0;
        self.last = Some(fps);
        Some(fps)
    }

    /// Most recent average, if a window has completed.
    pub fn last(&self) -> Option<f32> {
        self.last
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_second() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new();
        assert_eq!(fps.tick(t0), None);
        for i in 1..60 {
            assert_eq!(fps.tick(t0 + Duration::from_millis(i * 16)), None);
        }
        let avg = fps.tick(t0 + Duration::from_secs(1)).unwrap();
        assert!((avg - 61.0).abs() < 1e-3);
        assert_eq!(fps.last(), Some(avg));
    }

    #[test]
    fn window_restarts_after_report() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new();
        fps.tick(t0);
        fps.tick(t0 + Duration::from_secs(2));
        assert_eq!(fps.tick(t0 + Duration::from_millis(2500)), None);
        let avg = fps.tick(t0 + Duration::from_secs(3)).unwrap();
        assert!((avg - 2.0).abs() < 1e-3);
    }
}
