/// Room transition manager.
///
/// ```text
///   Active ──request(target)──▶ Pending ──next tick start──▶ Active
///                                  │
///                                  └── further requests are ignored
/// ```
///
/// Executing a transition builds the target instance, moves the player
/// to its spawn, then tears down the previous instance and everything it
/// owns (including held mail). Nothing acts on the tick's input, but
/// held directions carry over into the new room.

use tracing::{debug, info};

use super::activation;
use super::event::GameEvent;
use super::world::WorldState;

/// Record a `ChangeRoom(target)` unless one is already pending.
pub fn request(world: &mut WorldState, target: usize) {
    if let Some(pending) = world.pending {
        debug!(pending, target, "transition already pending, request ignored");
        return;
    }
    debug!(target, "transition requested");
    world.pending = Some(target);
}

/// Execute the pending transition, if any. Returns true when one ran.
pub fn resolve_transition(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let Some(target) = world.pending.take() else { return false };
    let from = world.template().name.clone();

    let next_room = world.build_room(target);
    let mut old = std::mem::replace(&mut world.room, next_room);
    let spawn = world.rooms[target].spawn;

    let player = world.player;
    world.store[player].teleport(spawn);
    world.room.index.insert(player, spawn);

    // Held mail is a child of the old room; destroying it clears the holding fact.
    old.teardown(&mut world.store);
    activation::settle(world);

    let name = world.template().name.clone();
    info!(from = %from, to = %name, live = world.store.len(), indexed = world.room.index.len(), "room entered");
    world.set_message(&name, 120);
    events.push(GameEvent::RoomEntered { room: name });
    true
}
