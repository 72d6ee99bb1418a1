/// Occupant index: which entities stand in which cell.
///
/// Terrain = what the cell IS. Occupancy = who is there.
///
/// One list per cell in insertion order, plus a reverse map so an entity
/// is listed in at most one cell. Disabled entities (held or delivered
/// mail) are listed nowhere.

use std::collections::BTreeMap;

use crate::domain::entity::EntityId;
use crate::domain::grid::{GridPos, ROOM_CELLS};
use super::store::EntityStore;

pub struct OccupantIndex {
    cells: Vec<Vec<EntityId>>,
    where_is: BTreeMap<EntityId, usize>,
}

impl OccupantIndex {
    pub fn new() -> Self {
        OccupantIndex {
            cells: vec![Vec::new(); ROOM_CELLS],
            where_is: BTreeMap::new(),
        }
    }

    /// Append `id` to the list at `pos`, leaving any previous cell.
    pub fn insert(&mut self, id: EntityId, pos: GridPos) {
        let cell = pos.cell();
        if self.where_is.get(&id) == Some(&cell) {
            return;
        }
        self.remove(id);
        self.cells[cell].push(id);
        self.where_is.insert(id, cell);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<GridPos> {
        let cell = self.where_is.remove(&id)?;
        self.cells[cell].retain(|&o| o != id);
        Some(GridPos::from_cell(cell))
    }

    pub fn cell_of(&self, id: EntityId) -> Option<GridPos> {
        self.where_is.get(&id).map(|&c| GridPos::from_cell(c))
    }

    pub fn at(&self, pos: GridPos) -> &[EntityId] {
        &self.cells[pos.cell()]
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.where_is.is_empty()
    }

    pub fn len(&self) -> usize {
        self.where_is.len()
    }

    pub fn clear(&mut self) {
        for list in &mut self.cells {
            list.clear();
        }
        self.where_is.clear();
    }

    /// Bring the index in line with the store for `members`: enabled
    /// entities are moved to the cell of their `pos` when it differs,
    /// disabled or destroyed ones are dropped.
    pub fn sync(&mut self, store: &EntityStore, members: impl IntoIterator<Item = EntityId>) {
        for id in members {
            match store.get(id) {
                Some(e) if e.enabled => {
                    if self.cell_of(id) != Some(e.pos) {
                        self.insert(id, e.pos);
                    }
                }
                _ => {
                    self.remove(id);
                }
            }
        }
    }
}

impl Default for OccupantIndex {
    fn default() -> Self {
        Self::new()
    }
}
