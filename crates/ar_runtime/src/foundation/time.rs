//! Frame timing

/// Frame-rate counter that publishes a reading once per interval
#[derive(Debug, Clone)]
pub struct FrameRateCounter {
    interval: f32,
    frames: u32,
    elapsed: f32,
    fps: f32,
}

impl Default for FrameRateCounter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl FrameRateCounter {
    /// Create a counter that resets every `interval` seconds
    pub fn new(interval: f32) -> Self {
        Self {
            interval: if interval > 0.0 { interval } else { 1.0 },
            frames: 0,
            elapsed: 0.0,
            fps: 0.0,
        }
    }

    /// Record one frame of `delta_time` seconds
    ///
    /// Returns the new reading when the interval rolled over this frame.
    pub fn tick(&mut self, delta_time: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += delta_time.max(0.0);

        if self.elapsed < self.interval {
            return None;
        }

        self.fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(self.fps)
    }

    /// Last published frames-per-second reading (0 until the first interval)
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Forget the current window and the last reading
    pub fn reset(&mut self) {
        self.frames = 0;
        self.elapsed = 0.0;
        self.fps = 0.0;
    }
}
