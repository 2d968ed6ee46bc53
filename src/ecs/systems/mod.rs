pub mod combat;
pub mod movement;
pub mod skill;
pub mod spatial;

use instant::Instant;

use crate::debug::TickPhase;
use crate::ecs::context::SimContext;
use crate::net;

/// Run all simulation systems for one fixed tick.
///
/// An authoritative context runs the full pipeline. A replica (one with an
/// inbox) takes positions, velocities and components from the network and
/// only refreshes its grid locally.
pub fn tick(ctx: &mut SimContext, dt: f32) {
    let replica = ctx.inbox.is_some();

    // 1. Inbound snapshots, before anything reads the stores
    let started = Instant::now();
    if replica {
        ctx.prev_transform.copy_from(&ctx.transform);
        net::drain_inbox(ctx);
    }
    ctx.timers.record(TickPhase::Network, started);

    if !replica {
        // 2. Effect timers, then queued input
        let started = Instant::now();
        skill::tick_effects(ctx, dt);
        skill::process_inputs(ctx);
        ctx.timers.record(TickPhase::Skills, started);

        // 3. Steering + integration
        let started = Instant::now();
        movement::update(ctx, dt);
        movement::integrate(ctx, dt);
        ctx.timers.record(TickPhase::Movement, started);
    }

    // 4. Rebuild spatial hash from the new positions
    let started = Instant::now();
    spatial::rebuild(ctx);
    ctx.timers.record(TickPhase::SpatialRebuild, started);

    if !replica {
        // 5. Overlaps, verdicts, consumes
        let started = Instant::now();
        combat::collect_contacts(ctx);
        combat::apply_consumes(ctx);
        ctx.timers.record(TickPhase::Combat, started);
    }

    ctx.tick_count += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ecs::components::{AbilityInput, EntityKind, MovementStats, PlayerInput};
    use crate::flags::Status;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn mover_reaches_target() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 4);
        let id = ctx.spawn(EntityKind::Dynamic, Vec2::ZERO, 10.0, MovementStats::default());
        ctx.push_input(id, PlayerInput::move_to(Vec2::new(80.0, 0.0)));

        for _ in 0..120 {
            ctx.tick(DT);
        }
        // Hovers around the target within the deadzone plus one step.
        assert!(ctx.position(id).distance(Vec2::new(80.0, 0.0)) < 5.0);
        assert_eq!(ctx.tick_count, 120);
    }

    #[test]
    fn bigger_mover_eats_smaller_on_contact() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 4);
        let big = ctx.spawn(EntityKind::Dynamic, Vec2::ZERO, 30.0, MovementStats::default());
        let small = ctx.spawn(EntityKind::Dynamic, Vec2::new(100.0, 0.0), 10.0, MovementStats::default());
        ctx.push_input(big, PlayerInput::move_to(Vec2::new(100.0, 0.0)));

        for _ in 0..60 {
            ctx.tick(DT);
        }
        assert!(!ctx.is_live(small));
        assert!(ctx.radius(big) > 30.0);
    }

    #[test]
    fn replica_times_only_network_and_grid() {
        let (_tx, rx) = crate::net::channel::channel();
        let mut replica = SimContext::with_capacity(SimConfig::default(), 4);
        replica.inbox = Some(crate::net::Inbox::new(rx));
        replica.tick(DT);
        assert_eq!(replica.timers.runs(TickPhase::Network), 1);
        assert_eq!(replica.timers.runs(TickPhase::SpatialRebuild), 1);
        assert_eq!(replica.timers.runs(TickPhase::Skills), 0);
        assert_eq!(replica.timers.runs(TickPhase::Combat), 0);
    }

    #[test]
    fn shielded_prey_survives_a_full_tick() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 4);
        let big = ctx.spawn(EntityKind::Dynamic, Vec2::ZERO, 30.0, MovementStats::default());
        let small = ctx.spawn(EntityKind::Dynamic, Vec2::new(10.0, 0.0), 10.0, MovementStats::default());
        ctx.push_input(small, PlayerInput::casting(Vec2::new(10.0, 0.0), AbilityInput::Shield));

        ctx.tick(DT);
        assert!(ctx.flags.has(small, Status::SHIELDED));
        assert!(ctx.is_live(small));
        assert!(ctx.is_live(big));
    }
}
