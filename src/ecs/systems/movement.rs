use glam::Vec2;

use crate::ecs::components::{EntityId, EntityKind, MovementStats};
use crate::ecs::context::SimContext;
use crate::flags::Status;
use crate::store::{physics, transform};

/// Steer one entity toward `target`.
///
/// Outside the deadzone the velocity points at the target with magnitude
/// `max_speed * speed_multiplier`. Inside it, the existing velocity is damped
/// by friction so the entity brakes to a stop on arrival. `id` must be live.
pub fn apply_movement(
    ctx: &mut SimContext,
    id: EntityId,
    target: Vec2,
    stats: MovementStats,
    _dt: f32,
) {
    let to_target = target - ctx.position(id);
    let dist_sq = to_target.length_squared();

    let vel = if dist_sq > ctx.config.deadzone_sq {
        let dir = to_target / dist_sq.sqrt();
        dir * (stats.max_speed * stats.speed_multiplier)
    } else {
        ctx.velocity(id) * ctx.config.friction
    };
    ctx.set_velocity(id, vel);
}

/// Run `apply_movement` for every live mover using its stored target and stats.
/// Charging entities keep their dash velocity.
pub fn update(ctx: &mut SimContext, dt: f32) {
    for id in 0..ctx.ids.high_water() {
        if !ctx.is_live(id)
            || ctx.kind(id) == EntityKind::Static
            || ctx.flags.has(id, Status::CHARGING)
        {
            continue;
        }
        let target = ctx.target(id);
        let stats = ctx.movement_stats(id);
        apply_movement(ctx, id, target, stats, dt);
    }
}

/// Integrate velocity into position and clamp to the arena.
/// The pre-step transform is kept for render interpolation.
pub fn integrate(ctx: &mut SimContext, dt: f32) {
    ctx.prev_transform.copy_from(&ctx.transform);
    let bound = ctx.config.arena_half_extent;

    for id in 0..ctx.ids.high_water() {
        if !ctx.is_live(id) || ctx.kind(id) == EntityKind::Static {
            continue;
        }
        let vx = ctx.physics.read(id, physics::VX);
        let vy = ctx.physics.read(id, physics::VY);
        let pos = ctx.transform.slot_mut(id);
        pos[transform::X] = (pos[transform::X] + vx * dt).clamp(-bound, bound);
        pos[transform::Y] = (pos[transform::Y] + vy * dt).clamp(-bound, bound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    const EPS: f32 = 1e-4;

    fn ctx_with_mover(pos: Vec2) -> (SimContext, EntityId) {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 4);
        let id = ctx.spawn(EntityKind::Dynamic, pos, 10.0, MovementStats::default());
        (ctx, id)
    }

    #[test]
    fn outside_deadzone_moves_at_full_speed() {
        let (mut ctx, id) = ctx_with_mover(Vec2::new(1.0, 2.0));
        let stats = MovementStats {
            max_speed: 200.0,
            speed_multiplier: 1.5,
        };
        let target = Vec2::new(31.0, -38.0);
        apply_movement(&mut ctx, id, target, stats, 1.0 / 60.0);

        let vel = ctx.velocity(id);
        assert!((vel.length() - 300.0).abs() < 300.0 * EPS);
        let want = (target - Vec2::new(1.0, 2.0)).normalize();
        assert!((vel.normalize() - want).length() < EPS);
    }

    #[test]
    fn inside_deadzone_applies_friction() {
        let (mut ctx, id) = ctx_with_mover(Vec2::ZERO);
        ctx.set_velocity(id, Vec2::new(10.0, -4.0));
        // 2^2 = 4 <= 5: inside the deadzone.
        apply_movement(&mut ctx, id, Vec2::new(2.0, 0.0), MovementStats::default(), 1.0 / 60.0);
        let vel = ctx.velocity(id);
        assert!((vel.x - 9.0).abs() < EPS);
        assert!((vel.y + 3.6).abs() < EPS);
    }

    #[test]
    fn update_skips_charging_and_static() {
        let (mut ctx, mover) = ctx_with_mover(Vec2::ZERO);
        let rock = ctx.spawn(EntityKind::Static, Vec2::new(50.0, 0.0), 5.0, MovementStats::default());
        ctx.intent.write(mover, crate::store::intent::TARGET_X, 100.0);
        ctx.intent.write(rock, crate::store::intent::TARGET_X, 500.0);
        ctx.set_velocity(mover, Vec2::new(0.0, 99.0));
        ctx.flags.set(mover, Status::CHARGING);

        update(&mut ctx, 1.0 / 60.0);
        assert_eq!(ctx.velocity(mover), Vec2::new(0.0, 99.0));
        assert_eq!(ctx.velocity(rock), Vec2::ZERO);

        ctx.flags.clear(mover, Status::CHARGING);
        update(&mut ctx, 1.0 / 60.0);
        assert!(ctx.velocity(mover).x > 0.0);
    }

    #[test]
    fn integrate_moves_and_records_previous() {
        let (mut ctx, id) = ctx_with_mover(Vec2::new(10.0, 10.0));
        ctx.set_velocity(id, Vec2::new(60.0, -120.0));
        integrate(&mut ctx, 0.5);
        assert_eq!(ctx.position(id), Vec2::new(40.0, -50.0));
        assert_eq!(ctx.interpolated_position(id, 0.0), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn integrate_clamps_to_arena() {
        let (mut ctx, id) = ctx_with_mover(Vec2::ZERO);
        ctx.set_velocity(id, Vec2::new(1.0e6, 0.0));
        integrate(&mut ctx, 1.0);
        assert_eq!(ctx.position(id).x, ctx.config.arena_half_extent);
    }
}
