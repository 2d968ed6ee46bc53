use crate::config::{DANGER_THRESHOLD, EAT_THRESHOLD};
use crate::ecs::components::{Contact, EntityId, EntityKind, Verdict};
use crate::ecs::context::SimContext;
use crate::flags::Status;
use crate::store::physics;

/// Decide what happens when two bodies touch, using the default thresholds.
///
/// `ratio` is predator radius over prey radius. First match wins:
/// a big enough predator eats an unguarded prey, a small enough predator
/// backs off if it is itself unguarded, anything else is contested.
/// Total over all inputs; a NaN ratio is contested.
pub fn resolve(
    ratio: f32,
    predator_shielded: bool,
    prey_shielded: bool,
    predator_charging: bool,
    prey_charging: bool,
) -> Verdict {
    resolve_with(
        DANGER_THRESHOLD,
        EAT_THRESHOLD,
        ratio,
        predator_shielded || predator_charging,
        prey_shielded || prey_charging,
    )
}

fn resolve_with(
    danger: f32,
    eat: f32,
    ratio: f32,
    predator_guarded: bool,
    prey_guarded: bool,
) -> Verdict {
    if ratio >= danger && !prey_guarded {
        Verdict::Consume
    } else if ratio <= eat && !predator_guarded {
        Verdict::Avoid
    } else {
        Verdict::Combat
    }
}

/// Resolve `predator` against `prey` with flags and thresholds from the context.
pub fn resolve_pair(ctx: &SimContext, predator: EntityId, prey: EntityId) -> Verdict {
    let ratio = ctx.radius(predator) / ctx.radius(prey);
    resolve_with(
        ctx.config.danger_threshold,
        ctx.config.eat_threshold,
        ratio,
        ctx.flags.get(predator).intersects(Status::GUARDED),
        ctx.flags.get(prey).intersects(Status::GUARDED),
    )
}

/// Find every overlapping pair once and resolve it into `ctx.contacts`.
///
/// Only dynamic entities query; statics are found as neighbors. Between two
/// movers the pair is kept from the lower id's side.
pub fn collect_contacts(ctx: &mut SimContext) {
    let mut contacts = std::mem::take(&mut ctx.contacts);
    contacts.clear();
    let range = ctx.config.contact_range();

    for a in 0..ctx.ids.high_water() {
        if !ctx.is_live(a) || ctx.kind(a) == EntityKind::Static {
            continue;
        }
        let pos_a = ctx.position(a);
        let r_a = ctx.radius(a);

        for b in ctx.grid.query_nearby(&ctx.transform, a, range) {
            if !ctx.is_live(b) || (ctx.kind(b) == EntityKind::Dynamic && b < a) {
                continue;
            }
            let r_b = ctx.radius(b);
            let reach = r_a + r_b;
            if pos_a.distance_squared(ctx.position(b)) >= reach * reach {
                continue;
            }
            let (predator, prey) = if r_a > r_b || (r_a == r_b && a < b) {
                (a, b)
            } else {
                (b, a)
            };
            contacts.push(Contact {
                predator,
                prey,
                verdict: resolve_pair(ctx, predator, prey),
            });
        }
    }
    ctx.contacts = contacts;
}

/// Apply every CONSUME contact: the predator grows by area and the prey is
/// despawned. Contacts whose entities died earlier in the pass are skipped.
/// Returns how many entities were eaten.
pub fn apply_consumes(ctx: &mut SimContext) -> usize {
    let contacts = std::mem::take(&mut ctx.contacts);
    let mut eaten = 0;

    for contact in contacts.iter().filter(|c| c.verdict == Verdict::Consume) {
        if !ctx.is_live(contact.predator) || !ctx.is_live(contact.prey) {
            continue;
        }
        let r_p = ctx.radius(contact.predator);
        let r_q = ctx.radius(contact.prey);
        let grown = (r_p * r_p + r_q * r_q).sqrt().min(ctx.config.max_radius);
        ctx.physics.write(contact.predator, physics::RADIUS, grown);
        ctx.despawn(contact.prey);
        eaten += 1;
        log::debug!(
            "entity {} ate {} (radius {r_p:.1} -> {grown:.1})",
            contact.predator,
            contact.prey
        );
    }

    ctx.contacts = contacts;
    eaten
}
