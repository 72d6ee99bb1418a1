/// Movement rules, truth-table driven.
///
/// Pure functions over a read-only collision view. They decide whether a
/// proposed one-cell step is legal; they never perform it.
///
/// ## Step Truth Table
///
/// Evaluated top to bottom; the first matching row decides.
/// ┌───────────────────────────────────────────────┬─────────┐
/// │ Condition                                     │ Result  │
/// ├───────────────────────────────────────────────┼─────────┤
/// │ dest tile Solid                               │ REVERT  │
/// │ dest tile SolidPlayer, mover is player        │ REVERT  │
/// │ dest occupant blocks mover, not pushable      │ REVERT  │
/// │ dest occupant blocks mover, pushable,         │         │
/// │   mover cannot push                           │ REVERT  │
/// │ dest occupant pushable, mover can push,       │         │
/// │   beyond cell not free for it                 │ REVERT  │
/// │ Otherwise                                     │ ACCEPT  │
/// └───────────────────────────────────────────────┴─────────┘
///
/// "Blocks mover" = occupant collision is Solid, or SolidPlayer and the
/// mover is the player. The mover itself is never its own occupant.
///
/// ### Beyond cell (push admission)
/// ┌───────────────────────────────────────────────┬─────────┐
/// │ beyond tile Solid                             │ DENY    │
/// │ beyond occupant Solid                         │ DENY    │
/// │ beyond occupant Pushable (one object deep)    │ DENY    │
/// │ Otherwise                                     │ ALLOW   │
/// └───────────────────────────────────────────────┴─────────┘
///
/// All occupant queries read the index as committed by the previous tick,
/// so an object that is about to be pushed away still counts as present.

use super::entity::EntityId;
use super::grid::{Delta, GridPos};
use super::tile::Tile;

/// What the rules need to know about an entity standing in a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Occupant {
    pub id: EntityId,
    pub collision: Tile,
    pub pushable: bool,
}

/// The entity attempting a step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mover {
    pub id: EntityId,
    pub is_player: bool,
    pub can_push: bool,
}

/// Read-only view of the active room for rule queries.
pub trait CollisionMap {
    fn tile_at(&self, pos: GridPos) -> Tile;
    fn occupants_at(&self, pos: GridPos) -> Vec<Occupant>;
}

/// Is a step from `from` to `to` legal for `mover`? See truth table above.
pub fn can_step(map: &impl CollisionMap, mover: Mover, from: GridPos, to: GridPos) -> bool {
    if map.tile_at(to).blocks(mover.is_player) {
        return false;
    }
    let delta = to - from;
    for occ in map.occupants_at(to) {
        if occ.id == mover.id || !occ.collision.blocks(mover.is_player) {
            continue;
        }
        if !occ.pushable || !mover.can_push {
            return false;
        }
        if !push_admitted(map, occ.id, to, delta) {
            return false;
        }
    }
    true
}

/// Can the pushable `pushed` at `at` be shifted by `delta`? See truth table above.
pub fn push_admitted(map: &impl CollisionMap, pushed: EntityId, at: GridPos, delta: Delta) -> bool {
    let beyond = at + delta;
    if map.tile_at(beyond).blocks(false) {
        return false;
    }
    !map.occupants_at(beyond)
        .iter()
        .any(|o| o.id != pushed && (o.collision.blocks(false) || o.pushable))
}
