//! Snapshot wire format.
//!
//! Every packet carries one lane:
//! - u8 `PROTOCOL_VERSION`
//! - u8 lane (see [`Lane`])
//! - u16 record count
//! - records
//!
//! Fast-lane records are fixed-layout `Pod` structs copied straight out of
//! the packet. Component records are `u32 id | u16 component | u16 len`
//! followed by `len` payload bytes, decoded through [`COMPONENT_TABLE`].
//! All multi-byte fields are little-endian.

use bytemuck::{Pod, Zeroable};

use crate::ecs::components::{EntityId, EntityKind};
use crate::ecs::context::SimContext;
use crate::error::DecodeError;
use crate::flags::Status;
use crate::store::locomotion;

// Records are memcpy'd in host order.
#[cfg(not(target_endian = "little"))]
compile_error!("snapshot records are little-endian on the wire");

pub const PROTOCOL_VERSION: u8 = 1;
pub const HEADER_LEN: usize = std::mem::size_of::<PacketHeader>();
pub const COMPONENT_HEADER_LEN: usize = std::mem::size_of::<ComponentHeader>();
/// Record count is a u16.
pub const MAX_RECORDS: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lane {
    Transform = 1,
    Physics = 2,
    Component = 3,
}

impl Lane {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Transform),
            2 => Some(Self::Physics),
            3 => Some(Self::Component),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PacketHeader {
    pub version: u8,
    pub lane: u8,
    pub count: u16,
}

/// Fast lane, 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TransformRecord {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Fast lane, 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PhysicsRecord {
    pub id: u32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ComponentHeader {
    pub id: u32,
    pub component: u16,
    pub len: u16,
}

/// Read a `T` at `at`, or report how short the buffer is.
pub fn read_pod<T: Pod>(bytes: &[u8], at: usize) -> Result<T, DecodeError> {
    let size = std::mem::size_of::<T>();
    let end = at.saturating_add(size);
    match bytes.get(at..end) {
        Some(raw) => Ok(bytemuck::pod_read_unaligned(raw)),
        None => Err(DecodeError::Truncated {
            needed: end,
            available: bytes.len(),
        }),
    }
}

/// Smart-lane component ids. The discriminant indexes [`COMPONENT_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ComponentId {
    /// Entity despawned; empty payload.
    Removed = 0,
    /// `u32` status bits.
    Status = 1,
    /// `f32 max_speed, f32 speed_multiplier`.
    Locomotion = 2,
    /// `u8` entity kind.
    Kind = 3,
}

/// How to decode one component's payload into a context.
pub struct ComponentCodec {
    pub name: &'static str,
    pub payload_len: usize,
    apply: fn(&mut SimContext, EntityId, &[u8]) -> Result<(), DecodeError>,
}

/// Decoding table shared by every receiver, indexed by component id.
pub static COMPONENT_TABLE: [ComponentCodec; 4] = [
    ComponentCodec {
        name: "removed",
        payload_len: 0,
        apply: apply_removed,
    },
    ComponentCodec {
        name: "status",
        payload_len: 4,
        apply: apply_status,
    },
    ComponentCodec {
        name: "locomotion",
        payload_len: 8,
        apply: apply_locomotion,
    },
    ComponentCodec {
        name: "kind",
        payload_len: 1,
        apply: apply_kind,
    },
];

pub fn codec(component: u16) -> Result<&'static ComponentCodec, DecodeError> {
    COMPONENT_TABLE
        .get(component as usize)
        .ok_or(DecodeError::UnknownComponent(component))
}

/// Decode `payload` and write it into `ctx` for entity `id`.
pub fn decode_component(
    ctx: &mut SimContext,
    id: EntityId,
    component: u16,
    payload: &[u8],
) -> Result<(), DecodeError> {
    let codec = codec(component)?;
    if payload.len() != codec.payload_len {
        return Err(DecodeError::PayloadSize {
            component,
            expected: codec.payload_len,
            actual: payload.len(),
        });
    }
    (codec.apply)(ctx, id, payload)
}

fn apply_removed(ctx: &mut SimContext, id: EntityId, _payload: &[u8]) -> Result<(), DecodeError> {
    ctx.despawn(id);
    Ok(())
}

fn apply_status(ctx: &mut SimContext, id: EntityId, payload: &[u8]) -> Result<(), DecodeError> {
    let bits: u32 = read_pod(payload, 0)?;
    ctx.flags.replace(id, Status(bits));
    Ok(())
}

fn apply_locomotion(ctx: &mut SimContext, id: EntityId, payload: &[u8]) -> Result<(), DecodeError> {
    let [max_speed, multiplier]: [f32; 2] = read_pod(payload, 0)?;
    ctx.locomotion.write(id, locomotion::MAX_SPEED, max_speed);
    ctx.locomotion
        .write(id, locomotion::SPEED_MULTIPLIER, multiplier);
    Ok(())
}

fn apply_kind(ctx: &mut SimContext, id: EntityId, payload: &[u8]) -> Result<(), DecodeError> {
    let raw: u8 = read_pod(payload, 0)?;
    let kind = EntityKind::from_u8(raw).ok_or(DecodeError::InvalidValue {
        component: ComponentId::Kind as u16,
        value: u32::from(raw),
    })?;
    ctx.set_kind(id, kind);
    Ok(())
}

/// Builds one lane's packet. The record count is patched in by `finish`.
pub struct PacketWriter {
    buf: Vec<u8>,
    count: u16,
}

impl PacketWriter {
    pub fn new(lane: Lane) -> Self {
        let mut buf = Vec::with_capacity(1024);
        buf.extend_from_slice(bytemuck::bytes_of(&PacketHeader {
            version: PROTOCOL_VERSION,
            lane: lane as u8,
            count: 0,
        }));
        Self { buf, count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_RECORDS
    }

    pub fn push_transform(&mut self, record: TransformRecord) {
        self.begin_record();
        self.buf.extend_from_slice(bytemuck::bytes_of(&record));
    }

    pub fn push_physics(&mut self, record: PhysicsRecord) {
        self.begin_record();
        self.buf.extend_from_slice(bytemuck::bytes_of(&record));
    }

    pub fn push_component(&mut self, id: EntityId, component: ComponentId, payload: &[u8]) {
        debug_assert!(payload.len() <= u16::MAX as usize);
        self.begin_record();
        let header = ComponentHeader {
            id,
            component: component as u16,
            len: payload.len() as u16,
        };
        self.buf.extend_from_slice(bytemuck::bytes_of(&header));
        self.buf.extend_from_slice(payload);
    }

    fn begin_record(&mut self) {
        debug_assert!(!self.is_full());
        self.count = self.count.saturating_add(1);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.buf[2..4].copy_from_slice(&self.count.to_le_bytes());
        self.buf
    }
}
