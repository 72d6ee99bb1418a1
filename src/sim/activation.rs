/// Activation network: weight plates → wiring → gates.
///
/// Level-triggered, recomputed from scratch every tick:
///   1. plate.active = its cell holds ≥1 enabled `Weighted` entity
///   2. for each wiring edge: active plate marks the gate, inactive clears it
///   3. gate.open = (marks ≥ 1) XOR inverted
///
/// ## Gate Truth Table
/// ┌────────────┬──────────┬────────┬───────────┬────────────┐
/// │ marks ≥ 1  │ inverted │ open   │ collision │ sprite     │
/// ├────────────┼──────────┼────────┼───────────┼────────────┤
/// │ no         │ no       │ no     │ Solid     │ Gate       │
/// │ yes        │ no       │ yes    │ None      │ GateOpened │
/// │ no         │ yes      │ yes    │ None      │ GateOpened │
/// │ yes        │ yes      │ no     │ Solid     │ Gate       │
/// └────────────┴──────────┴────────┴───────────┴────────────┘
///
/// Edges whose plate or gate no longer exists are skipped.

use tracing::debug;

use crate::domain::entity::{EntityId, Role};
use crate::domain::sprite::Sprite;
use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::world::WorldState;

pub fn resolve_activation(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    resolve_plates(world, events);
    resolve_marks(world);
    resolve_gates(world, events);
}

/// Bring plates and gates in line with the current occupancy without
/// reporting anything. Used right after a room is built.
pub fn settle(world: &mut WorldState) {
    resolve_activation(world, &mut Vec::new());
}

fn resolve_plates(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for &plate in &world.room.children {
        let Some(e) = world.store.get(plate) else { continue };
        let Role::Plate { active: was } = e.role else { continue };
        let active = world.room.index.at(e.pos).iter().any(|&o| {
            o != plate && world.store.get(o).map_or(false, |w| w.enabled && w.tags.weighted)
        });
        if active == was {
            continue;
        }
        let e = &mut world.store[plate];
        e.role = Role::Plate { active };
        e.sprite = if active { Sprite::ButtonPlatePressed } else { Sprite::ButtonPlate };
        events.push(GameEvent::PlateChanged { plate, active });
    }
}

fn resolve_marks(world: &mut WorldState) {
    for (plate, gate) in world.store.relations.edges() {
        if !world.store.contains(gate) {
            continue;
        }
        let active = matches!(
            world.store.get(plate).map(|e| e.role),
            Some(Role::Plate { active: true })
        );
        if active {
            world.store.relations.mark(gate, plate);
        } else {
            world.store.relations.unmark(gate, plate);
        }
    }
}

fn resolve_gates(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let gates: Vec<EntityId> = world.room.children.iter()
        .copied()
        .filter(|&id| matches!(world.store.get(id).map(|e| e.role), Some(Role::Gate { .. })))
        .collect();

    for gate in gates {
        let marked = world.store.relations.marks(gate) >= 1;
        let e = &mut world.store[gate];
        let open = marked != e.tags.inverted;
        e.collision = if open { Tile::None } else { Tile::Solid };
        e.sprite = if open { Sprite::GateOpened } else { Sprite::Gate };
        if e.role != (Role::Gate { open }) {
            e.role = Role::Gate { open };
            debug!(gate = %gate, open, "gate changed");
            events.push(GameEvent::GateChanged { gate, open });
        }
    }
}
