use glam::Vec2;

use crate::store::skill_timers;

/// Dense, reused entity handle. Also the row index into every store.
pub type EntityId = u32;

/// Whether the grid re-buckets the entity every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EntityKind {
    /// Moves; re-bucketed each tick.
    #[default]
    Dynamic = 0,
    /// Food and obstacles; bucketed once at spawn.
    Static = 1,
}

impl EntityKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Dynamic),
            1 => Some(Self::Static),
            _ => None,
        }
    }
}

/// Movement stats copied into the Locomotion store on spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementStats {
    /// Top speed in units/second.
    pub max_speed: f32,
    /// Scales `max_speed`; buffs and size penalties go here.
    pub speed_multiplier: f32,
}

impl Default for MovementStats {
    fn default() -> Self {
        Self {
            max_speed: 160.0,
            speed_multiplier: 1.0,
        }
    }
}

/// Castable abilities. The discriminant indexes the skill handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ability {
    Dash = 0,
    Shield = 1,
    Burst = 2,
}

impl Ability {
    pub const COUNT: usize = 3;

    /// SkillTimers field holding this ability's cooldown.
    pub fn cooldown_field(self) -> usize {
        match self {
            Self::Dash => skill_timers::DASH_COOLDOWN,
            Self::Shield => skill_timers::SHIELD_COOLDOWN,
            Self::Burst => skill_timers::BURST_COOLDOWN,
        }
    }
}

/// Ability-specific cast payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbilityInput {
    /// Lunge toward a point.
    Dash { target: Vec2 },
    /// Raise a shield in place.
    Shield,
    /// Knock nearby movers away. `target` picks the push direction for
    /// anything sitting exactly on the caster.
    Burst { target: Vec2 },
}

impl AbilityInput {
    pub fn ability(&self) -> Ability {
        match self {
            Self::Dash { .. } => Ability::Dash,
            Self::Shield => Ability::Shield,
            Self::Burst { .. } => Ability::Burst,
        }
    }
}

/// One tick of intent from a controller (player connection or bot).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    /// Where the entity wants to go.
    pub target: Vec2,
    /// Present when the controller pressed a cast button this tick.
    pub cast: Option<AbilityInput>,
}

impl PlayerInput {
    pub fn move_to(target: Vec2) -> Self {
        Self { target, cast: None }
    }

    pub fn casting(target: Vec2, cast: AbilityInput) -> Self {
        Self {
            target,
            cast: Some(cast),
        }
    }
}

/// Outcome of comparing two overlapping entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Contested; left to the damage model.
    Combat,
    /// Predator absorbs prey.
    Consume,
    /// Predator is the vulnerable one and backs off.
    Avoid,
}

/// An overlapping pair found this tick. `predator` is the larger body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub predator: EntityId,
    pub prey: EntityId,
    pub verdict: Verdict,
}
