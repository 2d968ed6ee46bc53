use crate::ecs::components::EntityKind;
use crate::ecs::context::SimContext;

/// Re-bucket every live dynamic entity from the Transform store.
pub fn rebuild(ctx: &mut SimContext) {
    let SimContext {
        grid,
        transform,
        ids,
        kinds,
        ..
    } = ctx;
    let movers = ids
        .iter_live()
        .filter(|&id| kinds[id as usize] == EntityKind::Dynamic);
    grid.rebuild(transform, movers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ecs::components::{EntityId, MovementStats};
    use glam::Vec2;

    #[test]
    fn rebuild_tracks_moved_entities() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 4);
        let a = ctx.spawn(EntityKind::Dynamic, Vec2::ZERO, 5.0, MovementStats::default());
        let b = ctx.spawn(EntityKind::Dynamic, Vec2::new(1000.0, 0.0), 5.0, MovementStats::default());
        rebuild(&mut ctx);
        assert_eq!(ctx.grid.query_nearby(&ctx.transform, a, 100.0).count(), 0);

        ctx.set_position(b, Vec2::new(40.0, 0.0));
        rebuild(&mut ctx);
        let near: Vec<EntityId> = ctx.grid.query_nearby(&ctx.transform, a, 100.0).collect();
        assert_eq!(near, vec![b]);
    }

    #[test]
    fn despawned_entities_drop_out() {
        let mut ctx = SimContext::with_capacity(SimConfig::default(), 4);
        let a = ctx.spawn(EntityKind::Dynamic, Vec2::ZERO, 5.0, MovementStats::default());
        let b = ctx.spawn(EntityKind::Dynamic, Vec2::new(30.0, 0.0), 5.0, MovementStats::default());
        rebuild(&mut ctx);
        ctx.despawn(b);
        rebuild(&mut ctx);
        assert_eq!(ctx.grid.query_nearby(&ctx.transform, a, 100.0).count(), 0);
    }
}
