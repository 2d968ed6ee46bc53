use crate::error::ConfigError;

/// Target simulation tick rate (ticks per second).
pub const TICK_RATE_HZ: f64 = 60.0;
/// Longest wall-clock frame we will simulate (prevents spiral of death).
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Spatial grid cell size. Must cover the widest query (contacts, bursts).
pub const SPATIAL_CELL_SIZE: f32 = 128.0;
/// Spatial hash table size (prime-ish for good distribution).
pub const SPATIAL_TABLE_SIZE: usize = 1021;

/// Half width of the square arena; positions are clamped to it.
pub const ARENA_HALF_EXTENT: f32 = 1500.0;

/// Squared distance under which a mover counts as arrived.
pub const DEADZONE_SQ: f32 = 5.0;
/// Per-tick velocity damping once arrived.
pub const FRICTION: f32 = 0.9;

/// Size ratio at or above which the larger entity consumes the smaller.
pub const DANGER_THRESHOLD: f32 = 1.25;
/// Size ratio at or below which the would-be predator backs off.
pub const EAT_THRESHOLD: f32 = 0.8;
/// Entities never grow past this radius, so contact pairs stay within one cell.
pub const MAX_RADIUS: f32 = 64.0;

pub const DASH_SPEED: f32 = 420.0;
pub const DASH_COOLDOWN: f32 = 2.0;
pub const CHARGE_DURATION: f32 = 0.3;
pub const SHIELD_DURATION: f32 = 1.5;
pub const SHIELD_COOLDOWN: f32 = 6.0;
pub const BURST_RADIUS: f32 = 110.0;
pub const BURST_IMPULSE: f32 = 260.0;
pub const BURST_COOLDOWN: f32 = 4.0;

/// Replicas ignore records for ids at or above this, so a bad packet cannot
/// balloon the stores.
pub const MAX_REPLICATED_ID: u32 = 1 << 20;

/// Smart-lane payloads held for entities the replica has not seen yet.
pub const PENDING_COMPONENT_LIMIT: usize = 1024;

/// Tuning for one simulation. Supplied by the host; never computed by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub tick_rate_hz: f64,
    pub max_frame_time: f64,
    pub cell_size: f32,
    pub table_size: usize,
    pub arena_half_extent: f32,
    pub deadzone_sq: f32,
    pub friction: f32,
    pub danger_threshold: f32,
    pub eat_threshold: f32,
    pub max_radius: f32,
    pub dash_speed: f32,
    pub dash_cooldown: f32,
    pub charge_duration: f32,
    pub shield_duration: f32,
    pub shield_cooldown: f32,
    pub burst_radius: f32,
    pub burst_impulse: f32,
    pub burst_cooldown: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            max_frame_time: MAX_FRAME_TIME,
            cell_size: SPATIAL_CELL_SIZE,
            table_size: SPATIAL_TABLE_SIZE,
            arena_half_extent: ARENA_HALF_EXTENT,
            deadzone_sq: DEADZONE_SQ,
            friction: FRICTION,
            danger_threshold: DANGER_THRESHOLD,
            eat_threshold: EAT_THRESHOLD,
            max_radius: MAX_RADIUS,
            dash_speed: DASH_SPEED,
            dash_cooldown: DASH_COOLDOWN,
            charge_duration: CHARGE_DURATION,
            shield_duration: SHIELD_DURATION,
            shield_cooldown: SHIELD_COOLDOWN,
            burst_radius: BURST_RADIUS,
            burst_impulse: BURST_IMPULSE,
            burst_cooldown: BURST_COOLDOWN,
        }
    }
}

impl SimConfig {
    /// Fixed step in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }

    /// Widest radius any contact query needs.
    pub fn contact_range(&self) -> f32 {
        self.max_radius * 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate_hz > 0.0) {
            return Err(ConfigError::TickRate(self.tick_rate_hz));
        }
        if self.eat_threshold >= self.danger_threshold {
            return Err(ConfigError::OverlappingThresholds {
                eat: self.eat_threshold,
                danger: self.danger_threshold,
            });
        }
        let range = self.contact_range().max(self.burst_radius);
        if self.cell_size < range {
            return Err(ConfigError::CellTooSmall {
                cell_size: self.cell_size,
                range,
            });
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(ConfigError::OutOfUnitRange {
                name: "friction",
                value: self.friction,
            });
        }
        Ok(())
    }
}
