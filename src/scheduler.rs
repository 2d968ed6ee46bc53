use crate::config::SimConfig;

/// Slack on the drain comparison so elapsed times that sum to exactly
/// `k * dt` still produce `k` steps despite rounding.
const DRAIN_EPSILON: f64 = 1e-9;

/// Handle for a frame callback the host has scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest(pub u64);

/// Whatever delivers frames: a display's vsync, a timer, a test.
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// What the scheduler drives.
pub trait Stepper {
    /// Advance the simulation by exactly `dt` seconds.
    fn update(&mut self, dt: f32);
    /// Draw, blending the last two simulation states by `alpha` in `[0, 1)`.
    fn render(&mut self, alpha: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Stopped,
    Running {
        /// Timestamp of the previous frame; `None` until the first one.
        last: Option<f64>,
        pending: Option<FrameRequest>,
    },
}

/// Fixed-timestep driver: runs `update` at a constant rate no matter how
/// often the host delivers frames, then renders once per frame.
pub struct FixedTimestep {
    dt: f64,
    max_frame_time: f64,
    accumulator: f64,
    state: State,
    total_steps: u64,
}

impl FixedTimestep {
    pub fn new(tick_rate_hz: f64, max_frame_time: f64) -> Self {
        Self {
            dt: 1.0 / tick_rate_hz,
            max_frame_time,
            accumulator: 0.0,
            state: State::Stopped,
            total_steps: 0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.tick_rate_hz, config.max_frame_time)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Blend factor the last `render` received.
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.dt).clamp(0.0, 1.0) as f32
    }

    /// Begin requesting frames. No-op when already running.
    pub fn start(&mut self, host: &mut impl FrameHost) {
        if self.is_running() {
            return;
        }
        self.accumulator = 0.0;
        self.state = State::Running {
            last: None,
            pending: Some(host.request_frame()),
        };
        log::debug!("fixed timestep started at {:.1} Hz", 1.0 / self.dt);
    }

    /// Cancel the outstanding frame request and stop.
    pub fn stop(&mut self, host: &mut impl FrameHost) {
        if let State::Running {
            pending: Some(request),
            ..
        } = self.state
        {
            host.cancel_frame(request);
        }
        self.state = State::Stopped;
    }

    /// Handle one host frame at time `now` (seconds). Returns the number of
    /// simulation steps run. Frames delivered while stopped are ignored.
    pub fn frame(&mut self, host: &mut impl FrameHost, now: f64, stepper: &mut impl Stepper) -> u32 {
        let State::Running { last, pending } = &mut self.state else {
            return 0;
        };
        *pending = None;

        let elapsed = match last.replace(now) {
            Some(prev) => (now - prev).clamp(0.0, self.max_frame_time),
            None => 0.0,
        };
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator + DRAIN_EPSILON >= self.dt {
            stepper.update(self.dt as f32);
            self.accumulator -= self.dt;
            steps += 1;
        }
        self.accumulator = self.accumulator.max(0.0);
        self.total_steps += u64::from(steps);

        stepper.render((self.accumulator / self.dt).clamp(0.0, 1.0) as f32);
        *pending = Some(host.request_frame());
        steps
    }
}
