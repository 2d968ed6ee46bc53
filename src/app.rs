use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::time::Duration;

use instant::Instant;

use arenasync::arena;
use arenasync::config::SimConfig;
use arenasync::debug::FrameStats;
use arenasync::ecs::SimContext;
use arenasync::error::ConfigError;
use arenasync::net::channel::{self, Tx};
use arenasync::net::{Inbox, SnapshotSender};
use arenasync::scheduler::{FixedTimestep, FrameHost, FrameRequest, Stepper};

/// How many movers to spawn on startup.
const DEFAULT_ENTITY_COUNT: usize = 300;
/// Food kept on the field.
const DEFAULT_FOOD_COUNT: usize = 600;
/// Wall-clock run length in seconds.
const DEFAULT_RUN_SECONDS: f64 = 10.0;
/// Rate the headless "display" delivers frames at.
const DISPLAY_HZ: f64 = 144.0;
/// Ticks between food respawns.
const FOOD_TOP_UP_TICKS: u64 = 60;
/// Ticks between replica sync checks.
const SYNC_CHECK_TICKS: u64 = 300;

/// Run settings, overridable from the environment.
#[derive(Debug, Clone)]
struct Settings {
    entities: usize,
    seconds: f64,
    seed: u64,
}

impl Settings {
    fn from_env() -> Self {
        Self {
            entities: env_or("ARENA_ENTITIES", DEFAULT_ENTITY_COUNT),
            seconds: env_or("ARENA_SECONDS", DEFAULT_RUN_SECONDS),
            seed: env_or("ARENA_SEED", 0x5eed),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparsable {key}={raw}");
            default
        }),
        Err(_) => default,
    }
}

/// Frame source for running without a window: frames arrive on a fixed
/// wall-clock cadence and the "request" is just a sequence number.
struct HeadlessHost {
    next: u64,
    pending: Option<FrameRequest>,
}

impl FrameHost for HeadlessHost {
    fn request_frame(&mut self) -> FrameRequest {
        self.next += 1;
        let request = FrameRequest(self.next);
        self.pending = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }
}

/// Authoritative server and one replica joined by the in-process channel.
struct Session {
    server: SimContext,
    replica: SimContext,
    sender: SnapshotSender,
    tx: Tx,
    rng: fastrand::Rng,
    food_target: usize,
    peer_gone: bool,
}

impl Session {
    fn new(config: SimConfig, settings: &Settings) -> Result<Self, ConfigError> {
        let (tx, rx) = channel::channel();
        let mut server = SimContext::try_new(config.clone())?;
        let mut replica = SimContext::try_new(config)?;
        replica.inbox = Some(Inbox::new(rx));

        let mut rng = fastrand::Rng::with_seed(settings.seed);
        let food_target = DEFAULT_FOOD_COUNT.max(settings.entities * 2);
        arena::populate(&mut server, &mut rng, settings.entities, food_target);

        Ok(Self {
            server,
            replica,
            sender: SnapshotSender::new(),
            tx,
            rng,
            food_target,
            peer_gone: false,
        })
    }

    fn check_sync(&self) {
        let (server, replica) = (state_digest(&self.server), state_digest(&self.replica));
        if server == replica {
            log::debug!(
                "tick {}: replica in sync ({} entities)",
                self.server.tick_count,
                self.replica.entity_count()
            );
        } else {
            log::warn!(
                "tick {}: replica diverged (server {} entities, replica {})",
                self.server.tick_count,
                self.server.entity_count(),
                self.replica.entity_count()
            );
        }
    }
}

impl Stepper for Session {
    fn update(&mut self, dt: f32) {
        if self.server.tick_count % FOOD_TOP_UP_TICKS == 0 {
            arena::top_up_food(&mut self.server, &mut self.rng, self.food_target);
        }
        arena::drive_bots(&mut self.server, &mut self.rng);
        self.server.tick(dt);

        if !self.peer_gone && !self.sender.send(&self.server, &self.tx) {
            log::warn!("replica hung up, no more snapshots");
            self.peer_gone = true;
        }
        self.replica.tick(dt);

        if self.server.tick_count % SYNC_CHECK_TICKS == 0 {
            self.check_sync();
            log::debug!("[server] {}", self.server.timers);
            log::debug!("[replica] {}", self.replica.timers);
            self.server.timers.reset_peaks();
            self.replica.timers.reset_peaks();
        }
    }

    fn render(&mut self, alpha: f32) {
        // Stand-in for a renderer: walk what it would draw.
        let mut extent = 0.0f32;
        for id in self.replica.live_ids() {
            let p = self.replica.interpolated_position(id, alpha);
            extent = extent.max(p.abs().max_element());
        }
        log::trace!("render alpha {alpha:.2}, extent {extent:.0}");
    }
}

/// Hash of every live entity's fast-lane state.
fn state_digest(ctx: &SimContext) -> u64 {
    let mut hasher = DefaultHasher::new();
    for id in ctx.live_ids() {
        hasher.write_u32(id);
        hasher.write(ctx.transform.as_bytes(id..id + 1));
        hasher.write(ctx.physics.as_bytes(id..id + 1));
    }
    hasher.finish()
}

/// Entry point: run the server/replica pair for the configured time.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    let config = SimConfig::default();
    log::info!(
        "Running {} movers for {:.1}s (seed {:#x})",
        settings.entities,
        settings.seconds,
        settings.seed
    );

    let mut session = Session::new(config.clone(), &settings)?;
    let mut host = HeadlessHost {
        next: 0,
        pending: None,
    };
    let mut clock = FixedTimestep::from_config(&config);
    let mut frame_stats = FrameStats::new();
    let frame_interval = Duration::from_secs_f64(1.0 / DISPLAY_HZ);

    let started = Instant::now();
    let mut last_frame = started;
    clock.start(&mut host);

    while host.pending.take().is_some() {
        std::thread::sleep(frame_interval);
        let now = Instant::now();
        frame_stats.record_frame(now.duration_since(last_frame).as_secs_f64());
        last_frame = now;

        let elapsed = now.duration_since(started).as_secs_f64();
        let steps = clock.frame(&mut host, elapsed, &mut session);
        frame_stats.record_steps(steps);

        if elapsed >= settings.seconds {
            clock.stop(&mut host);
        }
    }

    session.check_sync();
    log::info!(
        "Done: {} ticks, {} entities on server, {} on replica",
        clock.total_steps(),
        session.server.entity_count(),
        session.replica.entity_count()
    );
    Ok(())
}
