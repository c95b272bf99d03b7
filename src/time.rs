use log::debug;

const FPS_SAMPLE_COUNT: usize = 60;

/// Longest delta handed to the animation, so a backgrounded tab does not
/// resume with a multi-second jump.
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Measures the time between consecutive frames from host timestamps.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call; zero on the first one.
    pub fn delta(&mut self, now_seconds: f64) -> f32 {
        let delta = match self.last {
            Some(last) => (now_seconds - last).max(0.0) as f32,
            None => 0.0,
        };
        self.last = Some(now_seconds);
        delta.min(MAX_FRAME_DELTA)
    }
}

/// Rolling frame-rate counter.
#[derive(Debug, Clone)]
pub struct FrameStats {
    samples: [f32; FPS_SAMPLE_COUNT],
    next: usize,
    pub frame_count: u64,
    since_report: f32,
    pub smoothed_fps: f32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            next: 0,
            frame_count: 0,
            since_report: 0.0,
            smoothed_fps: 60.0,
        }
    }

    pub fn record(&mut self, delta: f32) {
        self.frame_count += 1;
        self.samples[self.next] = delta;
        self.next = (self.next + 1) % FPS_SAMPLE_COUNT;
        let average = self.samples.iter().sum::<f32>() / FPS_SAMPLE_COUNT as f32;
        self.smoothed_fps = if average > 0.0 { 1.0 / average } else { 0.0 };

        self.since_report += delta;
        if self.since_report >= 1.0 {
            self.since_report = 0.0;
            debug!(
                "{:.1} fps ({:.2} ms/frame)",
                self.smoothed_fps,
                average * 1000.0
            );
        }
    }
}
