pub mod components;
pub mod context;
pub mod systems;

pub use components::{
    Ability, AbilityInput, Contact, EntityId, EntityKind, MovementStats, PlayerInput, Verdict,
};
pub use context::SimContext;
