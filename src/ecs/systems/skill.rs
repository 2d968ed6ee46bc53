use glam::Vec2;

use crate::ecs::components::{Ability, AbilityInput, EntityId, EntityKind, PlayerInput};
use crate::ecs::context::SimContext;
use crate::flags::Status;
use crate::store::{intent, skill_timers};

/// Casts one ability. Returns whether it took effect.
type SkillHandler = fn(&mut SimContext, EntityId, &AbilityInput) -> bool;

/// Indexed by `Ability as usize`.
const HANDLERS: [SkillHandler; Ability::COUNT] = [cast_dash, cast_shield, cast_burst];

/// Translate one controller input into store writes.
///
/// The movement target is always recorded. A cast goes through only if the
/// entity is live, dynamic, not stunned and the ability is off cooldown; on
/// success the cooldown starts. Returns whether a cast was applied.
pub fn handle_input(ctx: &mut SimContext, id: EntityId, input: &PlayerInput) -> bool {
    if !ctx.is_live(id) {
        return false;
    }
    ctx.intent.write(id, intent::TARGET_X, input.target.x);
    ctx.intent.write(id, intent::TARGET_Y, input.target.y);

    let Some(cast) = input.cast else {
        return false;
    };
    if ctx.kind(id) == EntityKind::Static || ctx.flags.has(id, Status::STUNNED) {
        return false;
    }
    let ability = cast.ability();
    let cooldown_field = ability.cooldown_field();
    if ctx.skill_timers.read(id, cooldown_field) > 0.0 {
        log::trace!("entity {id}: {ability:?} still cooling down");
        return false;
    }

    let applied = HANDLERS[ability as usize](ctx, id, &cast);
    if applied {
        let cooldown = cooldown_for(ctx, ability);
        ctx.skill_timers.write(id, cooldown_field, cooldown);
        log::debug!("entity {id} cast {ability:?}");
    }
    applied
}

/// Drain the queued inputs in arrival order.
pub fn process_inputs(ctx: &mut SimContext) {
    // Take the queue out so handlers can borrow the context; the buffer
    // goes back afterwards to keep its capacity.
    let mut inputs = std::mem::take(&mut ctx.inputs);
    for (id, input) in inputs.drain(..) {
        handle_input(ctx, id, &input);
    }
    ctx.inputs = inputs;
}

/// Count down cooldowns and effect timers, clearing the flags of effects
/// that ran out.
pub fn tick_effects(ctx: &mut SimContext, dt: f32) {
    for id in 0..ctx.ids.high_water() {
        if !ctx.is_live(id) {
            continue;
        }
        let timers = ctx.skill_timers.slot_mut(id);
        let shield_was = timers[skill_timers::SHIELD_LEFT];
        let charge_was = timers[skill_timers::CHARGE_LEFT];
        for t in timers.iter_mut() {
            *t = (*t - dt).max(0.0);
        }
        let shield_expired = shield_was > 0.0 && timers[skill_timers::SHIELD_LEFT] == 0.0;
        let charge_expired = charge_was > 0.0 && timers[skill_timers::CHARGE_LEFT] == 0.0;

        if shield_expired {
            ctx.flags.clear(id, Status::SHIELDED);
        }
        if charge_expired {
            ctx.flags.clear(id, Status::CHARGING);
        }
    }
}

fn cooldown_for(ctx: &SimContext, ability: Ability) -> f32 {
    match ability {
        Ability::Dash => ctx.config.dash_cooldown,
        Ability::Shield => ctx.config.shield_cooldown,
        Ability::Burst => ctx.config.burst_cooldown,
    }
}

fn cast_dash(ctx: &mut SimContext, id: EntityId, input: &AbilityInput) -> bool {
    let AbilityInput::Dash { target } = *input else {
        return false;
    };
    let dir = (target - ctx.position(id)).normalize_or_zero();
    if dir == Vec2::ZERO {
        return false;
    }
    ctx.set_velocity(id, dir * ctx.config.dash_speed);
    ctx.flags.set(id, Status::CHARGING);
    ctx.skill_timers
        .write(id, skill_timers::CHARGE_LEFT, ctx.config.charge_duration);
    true
}

fn cast_shield(ctx: &mut SimContext, id: EntityId, _input: &AbilityInput) -> bool {
    ctx.flags.set(id, Status::SHIELDED);
    ctx.skill_timers
        .write(id, skill_timers::SHIELD_LEFT, ctx.config.shield_duration);
    true
}

fn cast_burst(ctx: &mut SimContext, id: EntityId, input: &AbilityInput) -> bool {
    let AbilityInput::Burst { target } = *input else {
        return false;
    };
    let radius = ctx.config.burst_radius;
    let impulse = ctx.config.burst_impulse;
    let origin = ctx.position(id);
    let fallback = (target - origin).normalize_or(Vec2::X);
    let found = ctx
        .grid
        .query_nearby_into(&ctx.transform, id, radius, &mut ctx.query_buf);

    for i in 0..found {
        let other = ctx.query_buf[i];
        if !ctx.is_live(other) || ctx.kind(other) == EntityKind::Static {
            continue;
        }
        let away = (ctx.position(other) - origin).normalize_or(fallback);
        let vel = ctx.velocity(other) + away * impulse;
        ctx.set_velocity(other, vel);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ecs::components::MovementStats;
    use crate::ecs::systems::spatial;

    fn setup() -> (SimContext, EntityId) {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 8);
        let id = ctx.spawn(EntityKind::Dynamic, Vec2::ZERO, 10.0, MovementStats::default());
        (ctx, id)
    }

    #[test]
    fn dead_entity_is_not_applied() {
        let (mut ctx, _) = setup();
        let input = PlayerInput::casting(Vec2::ONE, AbilityInput::Shield);
        assert!(!handle_input(&mut ctx, 7, &input));
        assert!(!handle_input(&mut ctx, 500, &input));
    }

    #[test]
    fn move_only_input_sets_target() {
        let (mut ctx, id) = setup();
        assert!(!handle_input(&mut ctx, id, &PlayerInput::move_to(Vec2::new(3.0, 4.0))));
        assert_eq!(ctx.target(id), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn shield_sets_flag_and_cooldown_gates_recast() {
        let (mut ctx, id) = setup();
        let input = PlayerInput::casting(Vec2::ZERO, AbilityInput::Shield);
        assert!(handle_input(&mut ctx, id, &input));
        assert!(ctx.flags.has(id, Status::SHIELDED));
        assert!(!handle_input(&mut ctx, id, &input));

        // Shield expires before the cooldown does.
        let dt = 1.0 / 60.0;
        let mut elapsed = 0.0;
        while ctx.flags.has(id, Status::SHIELDED) {
            tick_effects(&mut ctx, dt);
            elapsed += dt;
        }
        assert!((elapsed - ctx.config.shield_duration).abs() < 2.0 * dt);
        assert!(!handle_input(&mut ctx, id, &input));

        for _ in 0..(ctx.config.shield_cooldown / dt) as usize + 2 {
            tick_effects(&mut ctx, dt);
        }
        assert!(handle_input(&mut ctx, id, &input));
    }

    #[test]
    fn dash_sets_velocity_and_charging() {
        let (mut ctx, id) = setup();
        let input = PlayerInput::casting(
            Vec2::new(100.0, 0.0),
            AbilityInput::Dash {
                target: Vec2::new(0.0, 50.0),
            },
        );
        assert!(handle_input(&mut ctx, id, &input));
        assert_eq!(ctx.velocity(id), Vec2::new(0.0, ctx.config.dash_speed));
        assert!(ctx.flags.has(id, Status::CHARGING));
        assert_eq!(ctx.target(id), Vec2::new(100.0, 0.0));

        let steps = (ctx.config.charge_duration * 60.0).ceil() as usize + 1;
        for _ in 0..steps {
            tick_effects(&mut ctx, 1.0 / 60.0);
        }
        assert!(!ctx.flags.has(id, Status::CHARGING));
    }

    #[test]
    fn dash_onto_self_is_not_applied() {
        let (mut ctx, id) = setup();
        let input = PlayerInput::casting(Vec2::ZERO, AbilityInput::Dash { target: Vec2::ZERO });
        assert!(!handle_input(&mut ctx, id, &input));
        assert_eq!(ctx.skill_timers.read(id, skill_timers::DASH_COOLDOWN), 0.0);
    }

    #[test]
    fn stunned_cannot_cast() {
        let (mut ctx, id) = setup();
        ctx.flags.set(id, Status::STUNNED);
        let input = PlayerInput::casting(Vec2::ZERO, AbilityInput::Shield);
        assert!(!handle_input(&mut ctx, id, &input));
    }

    #[test]
    fn burst_pushes_dynamic_neighbors_only() {
        let (mut ctx, caster) = setup();
        let near = ctx.spawn(EntityKind::Dynamic, Vec2::new(30.0, 0.0), 5.0, MovementStats::default());
        let far = ctx.spawn(EntityKind::Dynamic, Vec2::new(500.0, 0.0), 5.0, MovementStats::default());
        let food = ctx.spawn(EntityKind::Static, Vec2::new(0.0, 20.0), 2.0, MovementStats::default());
        spatial::rebuild(&mut ctx);

        let input = PlayerInput::casting(
            Vec2::ZERO,
            AbilityInput::Burst {
                target: Vec2::ZERO,
            },
        );
        assert!(handle_input(&mut ctx, caster, &input));
        assert_eq!(ctx.velocity(near), Vec2::new(ctx.config.burst_impulse, 0.0));
        assert_eq!(ctx.velocity(far), Vec2::ZERO);
        assert_eq!(ctx.velocity(food), Vec2::ZERO);
        assert_eq!(ctx.velocity(caster), Vec2::ZERO);
    }

    #[test]
    fn queued_inputs_drain_in_order() {
        let (mut ctx, id) = setup();
        ctx.push_input(id, PlayerInput::move_to(Vec2::new(1.0, 0.0)));
        ctx.push_input(id, PlayerInput::move_to(Vec2::new(2.0, 0.0)));
        process_inputs(&mut ctx);
        assert!(ctx.inputs.is_empty());
        assert_eq!(ctx.target(id), Vec2::new(2.0, 0.0));
    }
}
