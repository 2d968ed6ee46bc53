use crate::ecs::components::EntityId;
use crate::ecs::context::SimContext;
use crate::net::channel::Tx;
use crate::net::wire::{ComponentId, Lane, PacketWriter, PhysicsRecord, TransformRecord};
use crate::store::{locomotion, physics, transform};

/// Last smart-lane state sent for one id.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Shadow {
    live: bool,
    generation: u32,
    kind: u8,
    status: u32,
    locomotion: [f32; 2],
}

/// Splits one lane across as many packets as the record count allows.
struct LaneBuilder {
    lane: Lane,
    writer: PacketWriter,
    done: Vec<Vec<u8>>,
}

impl LaneBuilder {
    fn new(lane: Lane) -> Self {
        Self {
            lane,
            writer: PacketWriter::new(lane),
            done: Vec::new(),
        }
    }

    fn writer(&mut self) -> &mut PacketWriter {
        if self.writer.is_full() {
            let full = std::mem::replace(&mut self.writer, PacketWriter::new(self.lane));
            self.done.push(full.finish());
        }
        &mut self.writer
    }

    fn finish(mut self, out: &mut Vec<Vec<u8>>) {
        out.append(&mut self.done);
        if !self.writer.is_empty() {
            out.push(self.writer.finish());
        }
    }
}

/// Encodes an authoritative context into snapshot packets.
///
/// The fast lane carries every live entity each call. The smart lane only
/// carries components that differ from what this sender last sent, plus a
/// REMOVED record for every id that died since. An id freed and reused
/// between two calls gets a REMOVED followed by its full component set.
#[derive(Default)]
pub struct SnapshotSender {
    shadows: Vec<Shadow>,
}

impl SnapshotSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform packets followed by physics packets.
    pub fn encode_fast_lane(&self, ctx: &SimContext, out: &mut Vec<Vec<u8>>) {
        let mut transforms = LaneBuilder::new(Lane::Transform);
        let mut bodies = LaneBuilder::new(Lane::Physics);

        for id in ctx.live_ids() {
            let pos = ctx.transform.slot(id);
            transforms.writer().push_transform(TransformRecord {
                id,
                x: pos[transform::X],
                y: pos[transform::Y],
            });
            let body = ctx.physics.slot(id);
            bodies.writer().push_physics(PhysicsRecord {
                id,
                vx: body[physics::VX],
                vy: body[physics::VY],
                radius: body[physics::RADIUS],
            });
        }

        transforms.finish(out);
        bodies.finish(out);
    }

    /// Component deltas since the previous call.
    pub fn encode_smart_lane(&mut self, ctx: &SimContext, out: &mut Vec<Vec<u8>>) {
        let mut lane = LaneBuilder::new(Lane::Component);
        let high_water = (ctx.ids.high_water() as usize).max(self.shadows.len());
        self.shadows.resize(high_water, Shadow::default());

        for (index, shadow) in self.shadows.iter_mut().enumerate() {
            let id = index as EntityId;
            if !ctx.is_live(id) {
                if shadow.live {
                    lane.writer().push_component(id, ComponentId::Removed, &[]);
                    *shadow = Shadow::default();
                }
                continue;
            }

            let generation = ctx.ids.generation(id);
            if shadow.live && shadow.generation != generation {
                lane.writer().push_component(id, ComponentId::Removed, &[]);
                *shadow = Shadow::default();
            }

            let now = Shadow {
                live: true,
                generation,
                kind: ctx.kind(id) as u8,
                status: ctx.flags.get(id).bits(),
                locomotion: [
                    ctx.locomotion.read(id, locomotion::MAX_SPEED),
                    ctx.locomotion.read(id, locomotion::SPEED_MULTIPLIER),
                ],
            };
            let fresh = !shadow.live;

            if fresh || now.kind != shadow.kind {
                lane.writer().push_component(id, ComponentId::Kind, &[now.kind]);
            }
            if fresh || now.locomotion != shadow.locomotion {
                lane.writer().push_component(
                    id,
                    ComponentId::Locomotion,
                    bytemuck::bytes_of(&now.locomotion),
                );
            }
            if fresh || now.status != shadow.status {
                lane.writer()
                    .push_component(id, ComponentId::Status, &now.status.to_le_bytes());
            }
            *shadow = now;
        }

        lane.finish(out);
    }

    /// Everything for one tick. Component deltas go first so a despawn
    /// reaches the replica before the fast lane reuses the id.
    pub fn encode(&mut self, ctx: &SimContext) -> Vec<Vec<u8>> {
        let mut packets = Vec::with_capacity(3);
        self.encode_smart_lane(ctx, &mut packets);
        self.encode_fast_lane(ctx, &mut packets);
        packets
    }

    /// Encode and push one tick onto `tx`. Returns false if the peer is gone.
    pub fn send(&mut self, ctx: &SimContext, tx: &Tx) -> bool {
        self.encode(ctx).into_iter().all(|packet| tx.try_send(packet))
    }

    /// Forget what was sent so the next smart lane repeats every component.
    pub fn resync(&mut self) {
        self.shadows.clear();
        log::debug!("snapshot sender resync");
    }
}
