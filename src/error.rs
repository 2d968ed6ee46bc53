use thiserror::Error;

/// Reasons a single inbound snapshot record or packet is rejected.
///
/// These never tear down a connection: the offending record is dropped and
/// processing continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("short packet header: {0} bytes")]
    ShortHeader(usize),

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown lane: {0}")]
    UnknownLane(u8),

    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unknown component id: {0}")]
    UnknownComponent(u16),

    #[error("component {component} payload is {actual} bytes, expected {expected}")]
    PayloadSize {
        component: u16,
        expected: usize,
        actual: usize,
    },

    #[error("component {component} carries invalid value {value}")]
    InvalidValue { component: u16, value: u32 },
}

/// Invalid tuning values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("eat threshold {eat} must be below danger threshold {danger}")]
    OverlappingThresholds { eat: f32, danger: f32 },

    #[error("tick rate must be positive, got {0}")]
    TickRate(f64),

    #[error("spatial cell size {cell_size} is smaller than query range {range}")]
    CellTooSmall { cell_size: f32, range: f32 },

    #[error("{name} must be in (0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },
}
