/// Movement: proposing steps, validating them, and pushing boxes.
///
/// Intent → Resolve model:
///   1. Proposals: the player's held direction and every velocity write a
///      one-cell step into `pos`; `prev` still holds the committed cell.
///   2. Resolve: each moved entity is checked against the rules. A
///      rejected step reverts `pos` to `prev` and clears velocity.
///   3. Push: every pusher that kept its step shifts the pushables it
///      walked into by the same delta. Pushed objects are not re-checked.
///
/// Resolve and push both read the occupant index as committed by the
/// previous tick; it is synced only after this module is done.

use tracing::trace;

use crate::domain::entity::EntityId;
use crate::domain::rules::{self, Mover};
use super::event::GameEvent;
use super::world::WorldState;

/// Player proposes one step in the held direction while not travelling.
pub fn resolve_player_step(world: &mut WorldState) {
    let Some(dir) = world.controls.desired() else { return };
    let p = &mut world.store[world.player];
    if !p.motion.is_inactive() || p.moved() {
        return;
    }
    p.facing = dir;
    p.pos = p.pos + dir.delta();
}

/// Entities with a velocity propose one step while not travelling.
/// Something that already moved this tick (a freshly thrown item) waits.
pub fn resolve_velocity(world: &mut WorldState) {
    for id in world.members() {
        let e = &mut world.store[id];
        if !e.enabled || e.moved() || !e.motion.is_inactive() {
            continue;
        }
        if let Some(d) = e.velocity {
            e.pos = e.pos + d;
        }
    }
}

/// Commit or revert every proposed step.
pub fn resolve_movement(world: &mut WorldState) {
    let movers: Vec<EntityId> = world.members()
        .into_iter()
        .filter(|&id| world.store.get(id).map_or(false, |e| e.enabled && e.moved()))
        .collect();

    for id in movers {
        let e = &world.store[id];
        let mover = Mover { id, is_player: e.is_player(), can_push: e.tags.can_push };
        let (from, to) = (e.prev, e.pos);
        if !rules::can_step(&world.view(), mover, from, to) {
            trace!(entity = %id, x = to.x, y = to.y, "step rejected");
            world.store[id].revert();
        }
    }
}

/// Shift pushables one cell in front of every pusher that moved.
pub fn resolve_push(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let mut shifts = vec![];
    for id in world.members() {
        let e = &world.store[id];
        if !e.enabled || !e.tags.can_push || !e.moved() {
            continue;
        }
        let delta = e.pos - e.prev;
        for &other in world.room.index.at(e.pos) {
            if other == id {
                continue;
            }
            if world.store.get(other).map_or(false, |o| o.enabled && o.tags.pushable) {
                shifts.push((other, delta));
            }
        }
    }

    for (id, delta) in shifts {
        let o = &mut world.store[id];
        o.pos = o.pos + delta;
        events.push(GameEvent::BoxPushed { id, to: o.pos });
    }
}
