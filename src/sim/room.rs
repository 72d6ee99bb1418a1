/// Room templates and live room instances.
///
/// A `RoomTemplate` is the validated, immutable result of loading one
/// layout. A `RoomInstance` is one playthrough of it: its own copy of the
/// terrain (with cosmetic decor applied), the entities it owns and its
/// occupant index. Tearing the instance down destroys every entity it owns.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::domain::entity::EntityId;
use crate::domain::grid::GridPos;
use crate::domain::prefab::PrefabKind;
use crate::domain::rules::{CollisionMap, Occupant};
use crate::domain::tile::{Terrain, Tile};
use super::occupancy::OccupantIndex;
use super::store::EntityStore;

/// Default player spawn cell.
pub const DEFAULT_SPAWN: GridPos = GridPos::new(16, 7);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Placement {
    pub kind: PrefabKind,
    pub pos: GridPos,
}

#[derive(Clone, Debug)]
pub struct RoomTemplate {
    pub name: String,
    /// Row-major, `ROOM_CELLS` long.
    pub terrain: Vec<Terrain>,
    pub placements: Vec<Placement>,
    /// `(plate placement index, gate placement index)`.
    pub wiring: Vec<(usize, usize)>,
    pub spawn: GridPos,
    /// Index of the following template; `None` for the final room.
    pub next: Option<usize>,
}

impl RoomTemplate {
    pub fn terrain_at(&self, pos: GridPos) -> Terrain {
        self.terrain[pos.cell()]
    }

    pub fn mailbox_count(&self) -> usize {
        self.placements.iter().filter(|p| p.kind == PrefabKind::Mailbox).count()
    }
}

pub struct RoomInstance {
    /// Index of the template this instance was built from.
    pub template: usize,
    pub terrain: Vec<Terrain>,
    /// Entities parented to this instance, in placement order.
    pub children: Vec<EntityId>,
    pub index: OccupantIndex,
    /// Latched the first time every mailbox is full.
    pub solved: bool,
}

impl RoomInstance {
    /// Spawn every placement, wire plates to gates and index the children.
    pub fn build(
        template_idx: usize,
        template: &RoomTemplate,
        store: &mut EntityStore,
        rng: &mut ChaCha8Rng,
        decor_chance: f64,
    ) -> Self {
        let terrain = template
            .terrain
            .iter()
            .map(|&t| {
                if t == Terrain::Grass && rng.gen::<f64>() < decor_chance {
                    Terrain::GrassWithStone
                } else {
                    t
                }
            })
            .collect();

        let mut index = OccupantIndex::new();
        let children: Vec<EntityId> = template
            .placements
            .iter()
            .map(|p| {
                let id = store.spawn(p.kind.template().instantiate(p.pos));
                index.insert(id, p.pos);
                id
            })
            .collect();

        for &(plate, gate) in &template.wiring {
            if let (Some(&p), Some(&g)) = (children.get(plate), children.get(gate)) {
                store.relations.wire(p, g);
            }
        }

        debug!(room = %template.name, entities = children.len(), "room built");
        RoomInstance { template: template_idx, terrain, children, index, solved: false }
    }

    /// Destroy every child entity and empty the index.
    pub fn teardown(&mut self, store: &mut EntityStore) {
        let count = self.children.len();
        for id in self.children.drain(..) {
            self.index.remove(id);
            store.destroy(id);
        }
        self.index.clear();
        debug!(entities = count, "room torn down");
    }

    pub fn terrain_at(&self, pos: GridPos) -> Terrain {
        self.terrain[pos.cell()]
    }

    pub fn tile_at(&self, pos: GridPos) -> Tile {
        self.terrain_at(pos).tile()
    }
}

/// Collision view of an instance for the movement rules.
pub struct RoomView<'a> {
    pub room: &'a RoomInstance,
    pub store: &'a EntityStore,
}

impl CollisionMap for RoomView<'_> {
    fn tile_at(&self, pos: GridPos) -> Tile {
        self.room.tile_at(pos)
    }

    fn occupants_at(&self, pos: GridPos) -> Vec<Occupant> {
        self.room
            .index
            .at(pos)
            .iter()
            .filter_map(|&id| {
                let e = self.store.get(id)?;
                e.enabled.then_some(Occupant {
                    id,
                    collision: e.collision,
                    pushable: e.tags.pushable,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use crate::sim::level;

    #[test]
    fn build_then_teardown_leaves_nothing_behind() {
        let rooms = level::embedded_rooms().unwrap();
        let wired = rooms.iter().position(|r| !r.wiring.is_empty()).unwrap();
        let mut store = EntityStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut room = RoomInstance::build(wired, &rooms[wired], &mut store, &mut rng, 0.0);

        assert_eq!(room.children.len(), rooms[wired].placements.len());
        assert_eq!(room.index.len(), room.children.len());
        assert!(!store.relations.is_empty());

        room.teardown(&mut store);
        assert!(room.index.is_empty());
        assert!(room.children.is_empty());
        assert!(store.relations.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn decor_only_touches_plain_grass() {
        let rooms = level::embedded_rooms().unwrap();
        let mut store = EntityStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let room = RoomInstance::build(0, &rooms[0], &mut store, &mut rng, 1.0);
        for pos in GridPos::all() {
            let before = rooms[0].terrain_at(pos);
            let after = room.terrain_at(pos);
            if before == Terrain::Grass {
                assert_eq!(after, Terrain::GrassWithStone);
            } else {
                assert_eq!(after, before);
            }
            assert_eq!(before.tile(), after.tile());
        }
    }

    #[test]
    fn same_seed_same_decor() {
        let rooms = level::embedded_rooms().unwrap();
        let mut store = EntityStore::new();
        let a = RoomInstance::build(0, &rooms[0], &mut store, &mut ChaCha8Rng::seed_from_u64(3), 0.3);
        let b = RoomInstance::build(0, &rooms[0], &mut store, &mut ChaCha8Rng::seed_from_u64(3), 0.3);
        assert_eq!(a.terrain, b.terrain);
    }
}
