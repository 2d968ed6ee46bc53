pub mod timer;
pub mod window;

use instant::Instant;

pub use timer::{TickPhase, TickTimers};
pub use window::{FrameWindow, WindowStats};

/// How often to log FPS (seconds).
const FPS_LOG_INTERVAL: f64 = 5.0;
/// Number of frame times kept for the rolling window.
const FRAME_HISTORY_LEN: usize = 300;

/// Host frame timing, logged every few seconds.
pub struct FrameStats {
    pub frame_count: u64,
    /// Rolling window of frame times (seconds).
    pub frame_times: FrameWindow,
    /// Simulation steps run since the last log line.
    steps_since_log: u64,
    last_log_time: Instant,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            frame_times: FrameWindow::new(FRAME_HISTORY_LEN),
            steps_since_log: 0,
            last_log_time: Instant::now(),
        }
    }

    pub fn record_steps(&mut self, steps: u32) {
        self.steps_since_log += u64::from(steps);
    }

    pub fn record_frame(&mut self, dt: f64) {
        self.frame_count += 1;
        self.frame_times.record(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= FPS_LOG_INTERVAL {
            let WindowStats { avg, min, max } = self.frame_times.stats().unwrap_or_default();
            log::info!(
                "FPS: {:.0} | sim: {:.0} Hz | avg: {:.2}ms | min: {:.2}ms | max: {:.2}ms | total frames: {}",
                1.0 / avg.max(f64::EPSILON),
                self.steps_since_log as f64 / elapsed,
                avg * 1000.0,
                min * 1000.0,
                max * 1000.0,
                self.frame_count,
            );
            self.last_log_time = Instant::now();
            self.steps_since_log = 0;
        }
    }
}
