use glam::Vec2;

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::debug::TickTimers;
use crate::ecs::components::{Contact, EntityId, EntityKind, MovementStats, PlayerInput};
use crate::flags::StatusFlags;
use crate::net::receiver::Inbox;
use crate::spatial::SpatialHash;
use crate::store::{intent, locomotion, physics, skill_timers, transform, ComponentStore};
use crate::util::IdPool;

/// Entities the stores are sized for before the first growth.
const INITIAL_CAPACITY: usize = 1024;
/// Scratch space for hot-path neighbor queries.
const QUERY_BUFFER_LEN: usize = 256;

/// Everything one simulation owns.
///
/// Passed by reference into every system. Fields are public so systems can
/// borrow disjoint stores at once (e.g. read Transform while writing Physics).
pub struct SimContext {
    pub config: SimConfig,
    pub ids: IdPool,
    pub kinds: Vec<EntityKind>,

    pub transform: ComponentStore,
    /// Transform as of the start of the last integration, for render interpolation.
    pub prev_transform: ComponentStore,
    pub physics: ComponentStore,
    pub locomotion: ComponentStore,
    pub intent: ComponentStore,
    pub skill_timers: ComponentStore,
    pub flags: StatusFlags,

    pub grid: SpatialHash,

    /// Controller input queued since the last tick.
    pub inputs: Vec<(EntityId, PlayerInput)>,
    /// Overlapping pairs found this tick (reused buffer).
    pub contacts: Vec<Contact>,
    /// Scratch ids for allocation-free grid queries.
    pub query_buf: Vec<EntityId>,

    /// Inbound snapshot stream, present on replicas.
    pub inbox: Option<Inbox>,

    pub tick_count: u64,
    pub timers: TickTimers,
}

impl SimContext {
    /// Build a context from a config that already passed
    /// [`SimConfig::validate`]. Use [`SimContext::try_new`] otherwise.
    pub fn new(config: SimConfig) -> Self {
        Self::with_capacity(config, INITIAL_CAPACITY)
    }

    /// Validate `config`, then build a context from it.
    pub fn try_new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn with_capacity(config: SimConfig, capacity: usize) -> Self {
        debug_assert!(config.validate().is_ok(), "unvalidated SimConfig: {config:?}");
        let grid = SpatialHash::new(config.cell_size, config.table_size);
        Self {
            ids: IdPool::with_capacity(capacity),
            kinds: vec![EntityKind::Dynamic; capacity],
            transform: ComponentStore::new(transform::STRIDE, capacity),
            prev_transform: ComponentStore::new(transform::STRIDE, capacity),
            physics: ComponentStore::new(physics::STRIDE, capacity),
            locomotion: ComponentStore::new(locomotion::STRIDE, capacity),
            intent: ComponentStore::new(intent::STRIDE, capacity),
            skill_timers: ComponentStore::new(skill_timers::STRIDE, capacity),
            flags: StatusFlags::new(capacity),
            grid,
            inputs: Vec::with_capacity(64),
            contacts: Vec::with_capacity(256),
            query_buf: vec![0; QUERY_BUFFER_LEN],
            inbox: None,
            tick_count: 0,
            timers: TickTimers::new(),
            config,
        }
    }

    /// Make ids `0..n` addressable in every store.
    pub fn ensure_capacity(&mut self, n: usize) {
        self.transform.ensure_capacity(n);
        self.prev_transform.ensure_capacity(n);
        self.physics.ensure_capacity(n);
        self.locomotion.ensure_capacity(n);
        self.intent.ensure_capacity(n);
        self.skill_timers.ensure_capacity(n);
        self.flags.ensure_capacity(n);
        if n > self.kinds.len() {
            self.kinds.resize(n.max(self.kinds.len() * 2), EntityKind::Dynamic);
        }
    }

    /// Allocate an id and initialize its slots.
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        pos: Vec2,
        radius: f32,
        stats: MovementStats,
    ) -> EntityId {
        let id = self.ids.alloc();
        self.ensure_capacity(id as usize + 1);
        self.kinds[id as usize] = kind;

        self.transform.write(id, transform::X, pos.x);
        self.transform.write(id, transform::Y, pos.y);
        self.prev_transform.write(id, transform::X, pos.x);
        self.prev_transform.write(id, transform::Y, pos.y);
        self.physics
            .write(id, physics::RADIUS, radius.min(self.config.max_radius));
        self.locomotion
            .write(id, locomotion::MAX_SPEED, stats.max_speed);
        self.locomotion
            .write(id, locomotion::SPEED_MULTIPLIER, stats.speed_multiplier);
        // Start "arrived" so a fresh mover idles until it gets input.
        self.intent.write(id, intent::TARGET_X, pos.x);
        self.intent.write(id, intent::TARGET_Y, pos.y);

        if kind == EntityKind::Static {
            self.grid.insert_static(&self.transform, id);
        }
        log::trace!("spawned {kind:?} entity {id} at ({:.1}, {:.1})", pos.x, pos.y);
        id
    }

    /// Mark an authority-assigned id live on a replica. Slots keep whatever
    /// was already written to them.
    pub fn register(&mut self, id: EntityId) -> bool {
        self.ensure_capacity(id as usize + 1);
        self.ids.claim(id)
    }

    /// Zero an entity's slots and release its id. Dead ids are a no-op.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.ids.is_live(id) {
            return false;
        }
        if self.kind(id) == EntityKind::Static {
            // Needs the position, so do it before zeroing.
            self.grid.remove_static(&self.transform, id);
        }
        self.transform.zero(id);
        self.prev_transform.zero(id);
        self.physics.zero(id);
        self.locomotion.zero(id);
        self.intent.zero(id);
        self.skill_timers.zero(id);
        self.flags.reset(id);
        self.kinds[id as usize] = EntityKind::Dynamic;
        self.ids.free(id);
        log::trace!("despawned entity {id}");
        true
    }

    /// Change the kind of a live entity, keeping the grid consistent.
    pub fn set_kind(&mut self, id: EntityId, kind: EntityKind) {
        if !self.ids.is_live(id) || self.kind(id) == kind {
            return;
        }
        match kind {
            EntityKind::Static => self.grid.insert_static(&self.transform, id),
            EntityKind::Dynamic => {
                self.grid.remove_static(&self.transform, id);
            }
        }
        self.kinds[id as usize] = kind;
    }

    #[inline]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.ids.is_live(id)
    }

    #[inline]
    pub fn kind(&self, id: EntityId) -> EntityKind {
        self.kinds.get(id as usize).copied().unwrap_or_default()
    }

    pub fn live_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter_live()
    }

    pub fn entity_count(&self) -> usize {
        self.ids.live_count()
    }

    #[inline]
    pub fn position(&self, id: EntityId) -> Vec2 {
        Vec2::new(
            self.transform.read(id, transform::X),
            self.transform.read(id, transform::Y),
        )
    }

    #[inline]
    pub fn velocity(&self, id: EntityId) -> Vec2 {
        Vec2::new(
            self.physics.read(id, physics::VX),
            self.physics.read(id, physics::VY),
        )
    }

    #[inline]
    pub fn radius(&self, id: EntityId) -> f32 {
        self.physics.read(id, physics::RADIUS)
    }

    /// Move an entity. Static entities are re-bucketed so the grid keeps
    /// matching the Transform store.
    pub fn set_position(&mut self, id: EntityId, pos: Vec2) {
        let rebucket = self.is_live(id)
            && self.kind(id) == EntityKind::Static
            && self.position(id) != pos;
        if rebucket {
            self.grid.remove_static(&self.transform, id);
        }
        self.transform.write(id, transform::X, pos.x);
        self.transform.write(id, transform::Y, pos.y);
        if rebucket {
            self.grid.insert_static(&self.transform, id);
        }
    }

    pub fn set_velocity(&mut self, id: EntityId, vel: Vec2) {
        self.physics.write(id, physics::VX, vel.x);
        self.physics.write(id, physics::VY, vel.y);
    }

    pub fn movement_stats(&self, id: EntityId) -> MovementStats {
        MovementStats {
            max_speed: self.locomotion.read(id, locomotion::MAX_SPEED),
            speed_multiplier: self.locomotion.read(id, locomotion::SPEED_MULTIPLIER),
        }
    }

    pub fn target(&self, id: EntityId) -> Vec2 {
        Vec2::new(
            self.intent.read(id, intent::TARGET_X),
            self.intent.read(id, intent::TARGET_Y),
        )
    }

    /// Queue controller input for the next tick.
    pub fn push_input(&mut self, id: EntityId, input: PlayerInput) {
        self.inputs.push((id, input));
    }

    /// Position blended between the previous and current tick.
    pub fn interpolated_position(&self, id: EntityId, alpha: f32) -> Vec2 {
        let prev = Vec2::new(
            self.prev_transform.read(id, transform::X),
            self.prev_transform.read(id, transform::Y),
        );
        prev.lerp(self.position(id), alpha.clamp(0.0, 1.0))
    }

    /// Advance one fixed step.
    pub fn tick(&mut self, dt: f32) {
        crate::ecs::systems::tick(self, dt);
    }
}
