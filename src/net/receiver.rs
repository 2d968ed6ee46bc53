use std::collections::VecDeque;

use glam::Vec2;

use crate::config::{MAX_REPLICATED_ID, PENDING_COMPONENT_LIMIT};
use crate::ecs::components::EntityId;
use crate::ecs::context::SimContext;
use crate::error::DecodeError;
use crate::net::channel::Rx;
use crate::net::wire::{
    self, ComponentHeader, ComponentId, Lane, PacketHeader, PhysicsRecord, TransformRecord,
    COMPONENT_HEADER_LEN, HEADER_LEN, PROTOCOL_VERSION,
};
use crate::store::{physics, transform};

/// Callbacks invoked by [`dispatch`], one per decoded record.
pub trait SnapshotReceiver {
    fn on_transform(&mut self, id: EntityId, x: f32, y: f32);

    fn on_physics(&mut self, id: EntityId, vx: f32, vy: f32, radius: f32);

    /// A smart-lane record. The payload is `raw[offset..]`; decoding it is
    /// up to the receiver.
    fn on_component(&mut self, id: EntityId, component: u16, raw: &[u8], offset: usize);
}

/// What one packet contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub applied: usize,
    pub dropped: usize,
}

impl std::ops::AddAssign for DispatchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.applied += rhs.applied;
        self.dropped += rhs.dropped;
    }
}

/// Walk one packet and feed its records to `receiver`.
///
/// Header problems reject the whole packet. A record with an unknown
/// component id is skipped by its length and the rest still apply. A
/// truncated record ends the packet; it and everything after it are dropped.
pub fn dispatch(
    packet: &[u8],
    receiver: &mut impl SnapshotReceiver,
) -> Result<DispatchStats, DecodeError> {
    if packet.len() < HEADER_LEN {
        return Err(DecodeError::ShortHeader(packet.len()));
    }
    let header: PacketHeader = wire::read_pod(packet, 0)?;
    if header.version != PROTOCOL_VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }
    let lane = Lane::from_u8(header.lane).ok_or(DecodeError::UnknownLane(header.lane))?;

    let count = header.count as usize;
    let mut stats = DispatchStats::default();
    let mut at = HEADER_LEN;

    for index in 0..count {
        let step = match lane {
            Lane::Transform => wire::read_pod::<TransformRecord>(packet, at).map(|r| {
                receiver.on_transform(r.id, r.x, r.y);
                std::mem::size_of::<TransformRecord>()
            }),
            Lane::Physics => wire::read_pod::<PhysicsRecord>(packet, at).map(|r| {
                receiver.on_physics(r.id, r.vx, r.vy, r.radius);
                std::mem::size_of::<PhysicsRecord>()
            }),
            Lane::Component => dispatch_component(packet, at, &mut *receiver),
        };
        match step {
            Ok(size) => {
                stats.applied += 1;
                at += size;
            }
            Err(DecodeError::UnknownComponent(component)) => {
                log::warn!("dropping record with unknown component {component}");
                stats.dropped += 1;
                // Length was readable, so the next record is still aligned.
                let len = wire::read_pod::<ComponentHeader>(packet, at).map_or(0, |h| h.len);
                at += COMPONENT_HEADER_LEN + len as usize;
            }
            Err(e) => {
                log::warn!("{lane:?} packet cut short at record {index}/{count}: {e}");
                stats.dropped += count - index;
                break;
            }
        }
    }
    Ok(stats)
}

/// Validate one component record and hand it over. Returns its encoded size.
fn dispatch_component(
    packet: &[u8],
    at: usize,
    receiver: &mut impl SnapshotReceiver,
) -> Result<usize, DecodeError> {
    let header: ComponentHeader = wire::read_pod(packet, at)?;
    let offset = at + COMPONENT_HEADER_LEN;
    let end = offset + header.len as usize;
    if end > packet.len() {
        return Err(DecodeError::Truncated {
            needed: end,
            available: packet.len(),
        });
    }
    wire::codec(header.component)?;
    receiver.on_component(header.id, header.component, &packet[..end], offset);
    Ok(COMPONENT_HEADER_LEN + header.len as usize)
}

/// A buffered smart-lane record. The payload lives in the arena.
#[derive(Debug, Clone, Copy)]
struct PendingRecord {
    id: EntityId,
    component: u16,
    start: usize,
    len: usize,
}

/// Smart-lane payloads waiting to be decoded.
///
/// Payload bytes are copied into one arena; records index into it. Records
/// for entities the replica has not registered yet stay queued. When the
/// queue is full the oldest record is dropped.
pub struct PendingComponents {
    records: VecDeque<PendingRecord>,
    arena: Vec<u8>,
    /// Spare arena, swapped in during compaction.
    scratch: Vec<u8>,
    limit: usize,
}

impl Default for PendingComponents {
    fn default() -> Self {
        Self::new(PENDING_COMPONENT_LIMIT)
    }
}

impl PendingComponents {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit.min(256)),
            arena: Vec::with_capacity(1024),
            scratch: Vec::with_capacity(1024),
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, id: EntityId, component: u16, payload: &[u8]) {
        if self.records.len() == self.limit {
            if let Some(old) = self.records.pop_front() {
                log::warn!(
                    "pending component queue full, dropping component {} for entity {}",
                    old.component,
                    old.id
                );
            }
        }
        let start = self.arena.len();
        self.arena.extend_from_slice(payload);
        self.records.push_back(PendingRecord {
            id,
            component,
            start,
            len: payload.len(),
        });
    }

    /// Decode every record whose entity is live in `ctx`, in arrival order.
    /// Returns how many were applied.
    pub fn drain(&mut self, ctx: &mut SimContext) -> usize {
        let mut applied = 0;
        self.scratch.clear();

        for _ in 0..self.records.len() {
            let Some(rec) = self.records.pop_front() else {
                break;
            };
            let payload = &self.arena[rec.start..rec.start + rec.len];

            if ctx.is_live(rec.id) {
                match wire::decode_component(ctx, rec.id, rec.component, payload) {
                    Ok(()) => applied += 1,
                    Err(e) => log::warn!("entity {}: {e}", rec.id),
                }
            } else if rec.component == ComponentId::Removed as u16 {
                // Nothing to remove on this side.
            } else {
                let start = self.scratch.len();
                self.scratch.extend_from_slice(payload);
                self.records.push_back(PendingRecord { start, ..rec });
            }
        }

        std::mem::swap(&mut self.arena, &mut self.scratch);
        applied
    }
}

/// Writes snapshot records straight into a context.
///
/// Fast-lane records register ids the replica has not seen. Smart-lane
/// records are queued in `pending` and applied by [`PendingComponents::drain`].
pub struct StoreReceiver<'a> {
    ctx: &'a mut SimContext,
    pending: &'a mut PendingComponents,
}

impl<'a> StoreReceiver<'a> {
    pub fn new(ctx: &'a mut SimContext, pending: &'a mut PendingComponents) -> Self {
        Self { ctx, pending }
    }

    /// False for ids this replica refuses to track.
    fn ensure_registered(&mut self, id: EntityId, x: f32, y: f32) -> bool {
        if id >= MAX_REPLICATED_ID {
            log::warn!("ignoring record for out-of-range entity {id}");
            return false;
        }
        if self.ctx.register(id) {
            // First sighting: no previous frame to blend from.
            self.ctx.prev_transform.write(id, transform::X, x);
            self.ctx.prev_transform.write(id, transform::Y, y);
            log::trace!("replica registered entity {id}");
        }
        true
    }
}

impl SnapshotReceiver for StoreReceiver<'_> {
    fn on_transform(&mut self, id: EntityId, x: f32, y: f32) {
        if self.ensure_registered(id, x, y) {
            self.ctx.set_position(id, Vec2::new(x, y));
        }
    }

    fn on_physics(&mut self, id: EntityId, vx: f32, vy: f32, radius: f32) {
        let pos = self.ctx.position(id);
        if !self.ensure_registered(id, pos.x, pos.y) {
            return;
        }
        let slot = self.ctx.physics.slot_mut(id);
        slot[physics::VX] = vx;
        slot[physics::VY] = vy;
        slot[physics::RADIUS] = radius;
    }

    fn on_component(&mut self, id: EntityId, component: u16, raw: &[u8], offset: usize) {
        if id < MAX_REPLICATED_ID {
            self.pending.push(id, component, &raw[offset..]);
        }
    }
}

/// Inbound snapshot stream owned by a replica context.
pub struct Inbox {
    pub rx: Rx,
    pub pending: PendingComponents,
}

impl Inbox {
    pub fn new(rx: Rx) -> Self {
        Self {
            rx,
            pending: PendingComponents::default(),
        }
    }
}

/// Apply every packet queued on the context's inbox. A no-op without one.
///
/// Pending smart-lane records are retried after each packet so a despawn
/// lands before a later packet can reuse the id.
pub fn drain_inbox(ctx: &mut SimContext) -> DispatchStats {
    let Some(mut inbox) = ctx.inbox.take() else {
        return DispatchStats::default();
    };
    let mut total = DispatchStats::default();

    while let Some(packet) = inbox.rx.try_recv() {
        let mut receiver = StoreReceiver::new(ctx, &mut inbox.pending);
        match dispatch(&packet, &mut receiver) {
            Ok(stats) => total += stats,
            Err(e) => {
                log::warn!("rejected snapshot packet ({} bytes): {e}", packet.len());
                total.dropped += 1;
            }
        }
        inbox.pending.drain(ctx);
    }

    ctx.inbox = Some(inbox);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ecs::components::EntityKind;
    use crate::flags::Status;
    use crate::net::channel;
    use crate::net::wire::PacketWriter;

    fn replica() -> SimContext {
        SimContext::with_capacity(SimConfig::default(), 4)
    }

    /// Records every callback.
    #[derive(Default)]
    struct Recorder {
        transforms: Vec<(EntityId, f32, f32)>,
        components: Vec<(EntityId, u16, Vec<u8>)>,
    }

    impl SnapshotReceiver for Recorder {
        fn on_transform(&mut self, id: EntityId, x: f32, y: f32) {
            self.transforms.push((id, x, y));
        }

        fn on_physics(&mut self, _id: EntityId, _vx: f32, _vy: f32, _radius: f32) {}

        fn on_component(&mut self, id: EntityId, component: u16, raw: &[u8], offset: usize) {
            self.components.push((id, component, raw[offset..].to_vec()));
        }
    }

    #[test]
    fn transform_lands_in_store() {
        let mut ctx = replica();
        let mut pending = PendingComponents::default();
        let mut w = PacketWriter::new(Lane::Transform);
        w.push_transform(TransformRecord { id: 2, x: 10.0, y: 20.0 });

        let stats = dispatch(&w.finish(), &mut StoreReceiver::new(&mut ctx, &mut pending)).unwrap();
        assert_eq!(stats, DispatchStats { applied: 1, dropped: 0 });
        assert!(ctx.is_live(2));
        assert_eq!(ctx.transform.read(2, transform::X), 10.0);
        assert_eq!(ctx.transform.read(2, transform::Y), 20.0);
    }

    #[test]
    fn huge_ids_are_ignored() {
        let mut ctx = replica();
        let mut pending = PendingComponents::default();
        let mut w = PacketWriter::new(Lane::Transform);
        w.push_transform(TransformRecord {
            id: u32::MAX,
            x: 1.0,
            y: 1.0,
        });
        dispatch(&w.finish(), &mut StoreReceiver::new(&mut ctx, &mut pending)).unwrap();
        assert_eq!(ctx.entity_count(), 0);
        assert!(ctx.transform.capacity() < 1024);
    }

    #[test]
    fn unknown_component_is_skipped() {
        let mut packet = PacketWriter::new(Lane::Component);
        packet.push_component(1, ComponentId::Status, &7u32.to_le_bytes());
        packet.push_component(1, ComponentId::Kind, &[1]);
        let mut bytes = packet.finish();
        // Rewrite the first record's component id to one nobody knows.
        bytes[HEADER_LEN + 4..HEADER_LEN + 6].copy_from_slice(&99u16.to_le_bytes());

        let mut rec = Recorder::default();
        let stats = dispatch(&bytes, &mut rec).unwrap();
        assert_eq!(stats, DispatchStats { applied: 1, dropped: 1 });
        assert_eq!(rec.components, vec![(1, ComponentId::Kind as u16, vec![1])]);
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let mut w = PacketWriter::new(Lane::Transform);
        w.push_transform(TransformRecord { id: 0, x: 1.0, y: 1.0 });
        w.push_transform(TransformRecord { id: 1, x: 2.0, y: 2.0 });
        w.push_transform(TransformRecord { id: 2, x: 3.0, y: 3.0 });
        let mut bytes = w.finish();
        bytes.truncate(bytes.len() - 5);

        let mut rec = Recorder::default();
        let stats = dispatch(&bytes, &mut rec).unwrap();
        assert_eq!(stats, DispatchStats { applied: 2, dropped: 1 });
        assert_eq!(rec.transforms.len(), 2);
    }

    #[test]
    fn bad_headers_reject_packet() {
        let mut rec = Recorder::default();
        assert_eq!(dispatch(&[1, 1], &mut rec), Err(DecodeError::ShortHeader(2)));
        assert_eq!(
            dispatch(&[9, 1, 0, 0], &mut rec),
            Err(DecodeError::UnsupportedVersion(9))
        );
        assert_eq!(
            dispatch(&[PROTOCOL_VERSION, 7, 0, 0], &mut rec),
            Err(DecodeError::UnknownLane(7))
        );
    }

    #[test]
    fn smart_lane_waits_for_registration() {
        let mut ctx = replica();
        let mut pending = PendingComponents::default();

        let mut smart = PacketWriter::new(Lane::Component);
        smart.push_component(3, ComponentId::Status, &Status::SHIELDED.bits().to_le_bytes());
        dispatch(&smart.finish(), &mut StoreReceiver::new(&mut ctx, &mut pending)).unwrap();
        assert_eq!(pending.drain(&mut ctx), 0);
        assert_eq!(pending.len(), 1);
        assert!(!ctx.is_live(3));

        let mut fast = PacketWriter::new(Lane::Transform);
        fast.push_transform(TransformRecord { id: 3, x: 0.0, y: 0.0 });
        dispatch(&fast.finish(), &mut StoreReceiver::new(&mut ctx, &mut pending)).unwrap();
        assert_eq!(pending.drain(&mut ctx), 1);
        assert!(pending.is_empty());
        assert!(ctx.flags.has(3, Status::SHIELDED));
    }

    #[test]
    fn pending_queue_drops_oldest() {
        let mut ctx = replica();
        let mut pending = PendingComponents::new(2);
        pending.push(0, ComponentId::Kind as u16, &[1]);
        pending.push(1, ComponentId::Kind as u16, &[1]);
        pending.push(2, ComponentId::Kind as u16, &[0]);
        assert_eq!(pending.len(), 2);

        ctx.register(0);
        ctx.register(1);
        ctx.register(2);
        assert_eq!(pending.drain(&mut ctx), 2);
        assert_eq!(ctx.kind(0), EntityKind::Dynamic);
        assert_eq!(ctx.kind(1), EntityKind::Static);
    }

    #[test]
    fn removed_despawns_and_is_discarded_for_unknown_ids() {
        let mut ctx = replica();
        let mut pending = PendingComponents::default();
        ctx.register(1);
        pending.push(1, ComponentId::Removed as u16, &[]);
        pending.push(3, ComponentId::Removed as u16, &[]);
        assert_eq!(pending.drain(&mut ctx), 1);
        assert!(!ctx.is_live(1));
        assert!(pending.is_empty());
    }

    #[test]
    fn inbox_drains_at_tick_start() {
        let (tx, rx) = channel::channel();
        let mut ctx = replica();
        ctx.inbox = Some(Inbox::new(rx));

        let mut w = PacketWriter::new(Lane::Physics);
        w.push_physics(PhysicsRecord {
            id: 0,
            vx: 1.0,
            vy: -1.0,
            radius: 12.0,
        });
        assert!(tx.try_send(w.finish()));
        assert!(tx.try_send(vec![0xff]));

        let stats = drain_inbox(&mut ctx);
        assert_eq!(stats, DispatchStats { applied: 1, dropped: 1 });
        assert_eq!(ctx.radius(0), 12.0);
        assert!(ctx.inbox.is_some());
    }
}
