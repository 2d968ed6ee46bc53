//! Demo population: random movers and food, and bots that drive them.

use glam::Vec2;

use crate::ecs::components::{AbilityInput, EntityId, EntityKind, MovementStats, PlayerInput};
use crate::ecs::context::SimContext;

/// Share of the arena bots pick targets in, so they rarely pin to the wall.
const ROAM_FRACTION: f32 = 0.8;
/// Per-tick chance a bot picks a new destination.
const RETARGET_CHANCE: f32 = 1.0 / 90.0;
/// Per-tick chance a bot casts something.
const CAST_CHANCE: f32 = 1.0 / 240.0;

fn random_point(rng: &mut fastrand::Rng, half_extent: f32) -> Vec2 {
    let reach = half_extent * ROAM_FRACTION;
    Vec2::new(
        (rng.f32() * 2.0 - 1.0) * reach,
        (rng.f32() * 2.0 - 1.0) * reach,
    )
}

pub fn spawn_mover(ctx: &mut SimContext, rng: &mut fastrand::Rng) -> EntityId {
    let pos = random_point(rng, ctx.config.arena_half_extent);
    let stats = MovementStats {
        max_speed: 120.0 + rng.f32() * 80.0,
        speed_multiplier: 1.0,
    };
    let radius = 6.0 + rng.f32() * 14.0; // 6 to 20
    ctx.spawn(EntityKind::Dynamic, pos, radius, stats)
}

pub fn spawn_food(ctx: &mut SimContext, rng: &mut fastrand::Rng) -> EntityId {
    let pos = random_point(rng, ctx.config.arena_half_extent);
    let stats = MovementStats {
        max_speed: 0.0,
        speed_multiplier: 0.0,
    };
    ctx.spawn(EntityKind::Static, pos, 2.0 + rng.f32() * 2.0, stats)
}

/// Spawn the initial population.
pub fn populate(ctx: &mut SimContext, rng: &mut fastrand::Rng, movers: usize, food: usize) {
    for _ in 0..movers {
        spawn_mover(ctx, rng);
    }
    for _ in 0..food {
        spawn_food(ctx, rng);
    }
    log::info!("Spawned {movers} movers and {food} food");
}

/// Respawn eaten food up to `target`. Returns how many were added.
pub fn top_up_food(ctx: &mut SimContext, rng: &mut fastrand::Rng, target: usize) -> usize {
    let present = ctx
        .live_ids()
        .filter(|&id| ctx.kind(id) == EntityKind::Static)
        .count();
    let missing = target.saturating_sub(present);
    for _ in 0..missing {
        spawn_food(ctx, rng);
    }
    missing
}

/// Queue this tick's input for every live mover.
///
/// Bots wander between random destinations and now and then cast a random
/// ability. A bot with nothing new to do sends no input.
pub fn drive_bots(ctx: &mut SimContext, rng: &mut fastrand::Rng) {
    let half_extent = ctx.config.arena_half_extent;
    for id in 0..ctx.ids.high_water() {
        if !ctx.is_live(id) || ctx.kind(id) == EntityKind::Static {
            continue;
        }
        let retarget = rng.f32() < RETARGET_CHANCE;
        let cast = rng.f32() < CAST_CHANCE;
        if !retarget && !cast {
            continue;
        }

        let target = if retarget {
            random_point(rng, half_extent)
        } else {
            ctx.target(id)
        };
        let input = if cast {
            let aim = random_point(rng, half_extent);
            let ability = match rng.u8(0..3) {
                0 => AbilityInput::Dash { target: aim },
                1 => AbilityInput::Shield,
                _ => AbilityInput::Burst { target: aim },
            };
            PlayerInput::casting(target, ability)
        } else {
            PlayerInput::move_to(target)
        };
        ctx.push_input(id, input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn populate_and_top_up() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 16);
        let mut rng = fastrand::Rng::with_seed(7);
        populate(&mut ctx, &mut rng, 10, 5);
        assert_eq!(ctx.entity_count(), 15);

        let food = ctx
            .live_ids()
            .find(|&id| ctx.kind(id) == EntityKind::Static)
            .unwrap();
        ctx.despawn(food);
        assert_eq!(top_up_food(&mut ctx, &mut rng, 5), 1);
        assert_eq!(top_up_food(&mut ctx, &mut rng, 5), 0);
    }

    #[test]
    fn spawns_stay_inside_arena() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 64);
        let mut rng = fastrand::Rng::with_seed(1);
        populate(&mut ctx, &mut rng, 50, 10);
        let bound = ctx.config.arena_half_extent;
        for id in ctx.live_ids() {
            let p = ctx.position(id);
            assert!(p.x.abs() <= bound && p.y.abs() <= bound);
        }
    }

    #[test]
    fn bots_only_drive_movers() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 512);
        let mut rng = fastrand::Rng::with_seed(3);
        populate(&mut ctx, &mut rng, 200, 200);
        for _ in 0..30 {
            drive_bots(&mut ctx, &mut rng);
        }
        assert!(!ctx.inputs.is_empty());
        assert!(ctx
            .inputs
            .iter()
            .all(|(id, _)| ctx.kind(*id) == EntityKind::Dynamic));
    }
}
