/// Summary of the frame times currently in a [`FrameWindow`], in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// The last `len` frame times. Allocated once; the oldest sample is
/// overwritten when full. The sum is kept running so the average is O(1).
pub struct FrameWindow {
    samples: Box<[f64]>,
    next: usize,
    filled: usize,
    sum: f64,
}

impl FrameWindow {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len.max(1)].into_boxed_slice(),
            next: 0,
            filled: 0,
            sum: 0.0,
        }
    }

    pub fn record(&mut self, dt: f64) {
        let evicted = std::mem::replace(&mut self.samples[self.next], dt);
        if self.filled == self.samples.len() {
            self.sum -= evicted;
        } else {
            self.filled += 1;
        }
        self.sum += dt;
        self.next = (self.next + 1) % self.samples.len();
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn stats(&self) -> Option<WindowStats> {
        if self.filled == 0 {
            return None;
        }
        // Slots fill from index 0, so the first `filled` are all live.
        let (min, max) = self.samples[..self.filled]
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &t| (lo.min(t), hi.max(t)));
        Some(WindowStats {
            avg: self.sum / self.filled as f64,
            min,
            max,
        })
    }
}
