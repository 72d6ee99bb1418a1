/// Entity store: a generational arena of `Entity` records plus the
/// relational facts between them.
///
/// ## Relations
///
///   - `wired_to`     plate → gates   (static, from the layout)
///   - `activated_by` gate  → plates  (level, rewritten every tick)
///   - `holding`      holder → held   (at most one item per holder)
///
/// All maps are `BTreeMap`s so every pass that walks them visits entries
/// in the same order on every run. `destroy()` removes every entry that
/// mentions the destroyed id, on either side.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut};

use crate::domain::entity::{Entity, EntityId};

struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

#[derive(Default, Debug)]
pub struct Relations {
    wired_to: BTreeMap<EntityId, Vec<EntityId>>,
    activated_by: BTreeMap<EntityId, BTreeSet<EntityId>>,
    holding: BTreeMap<EntityId, EntityId>,
}

impl Relations {
    pub fn wire(&mut self, plate: EntityId, gate: EntityId) {
        let gates = self.wired_to.entry(plate).or_default();
        if !gates.contains(&gate) {
            gates.push(gate);
        }
    }

    /// Every `(plate, gate)` edge, in plate order then wiring order.
    pub fn edges(&self) -> Vec<(EntityId, EntityId)> {
        self.wired_to
            .iter()
            .flat_map(|(&plate, gates)| gates.iter().map(move |&gate| (plate, gate)))
            .collect()
    }

    pub fn mark(&mut self, gate: EntityId, plate: EntityId) {
        self.activated_by.entry(gate).or_default().insert(plate);
    }

    pub fn unmark(&mut self, gate: EntityId, plate: EntityId) {
        if let Some(plates) = self.activated_by.get_mut(&gate) {
            plates.remove(&plate);
            if plates.is_empty() {
                self.activated_by.remove(&gate);
            }
        }
    }

    /// Number of plates currently activating `gate`.
    pub fn marks(&self, gate: EntityId) -> usize {
        self.activated_by.get(&gate).map_or(0, BTreeSet::len)
    }

    /// Record that `holder` carries `held`. Returns false if it already carries something.
    pub fn hold(&mut self, holder: EntityId, held: EntityId) -> bool {
        if self.holding.contains_key(&holder) {
            return false;
        }
        self.holding.insert(holder, held);
        true
    }

    pub fn release(&mut self, holder: EntityId) -> Option<EntityId> {
        self.holding.remove(&holder)
    }

    pub fn held_by(&self, holder: EntityId) -> Option<EntityId> {
        self.holding.get(&holder).copied()
    }

    /// Drop every fact that mentions `id`.
    pub fn forget(&mut self, id: EntityId) {
        self.wired_to.remove(&id);
        for gates in self.wired_to.values_mut() {
            gates.retain(|&g| g != id);
        }
        self.wired_to.retain(|_, gates| !gates.is_empty());

        self.activated_by.remove(&id);
        for plates in self.activated_by.values_mut() {
            plates.remove(&id);
        }
        self.activated_by.retain(|_, plates| !plates.is_empty());

        self.holding.retain(|&holder, &mut held| holder != id && held != id);
    }

    pub fn mentions(&self, id: EntityId) -> bool {
        self.wired_to.iter().any(|(&p, gates)| p == id || gates.contains(&id))
            || self.activated_by.iter().any(|(&g, plates)| g == id || plates.contains(&id))
            || self.holding.iter().any(|(&h, &held)| h == id || held == id)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.wired_to.is_empty() && self.activated_by.is_empty() && self.holding.is_empty()
    }
}

#[derive(Default)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pub relations: Relations,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            EntityId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, entity: Some(entity) });
            EntityId { index, generation: 0 }
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Remove the entity and every relation referencing it.
    /// Stale ids are ignored.
    pub fn destroy(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.relations.forget(id);
        debug_assert!(!self.relations.mentions(id));
        Some(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.entity.as_ref().map(|e| {
                (EntityId { index: i as u32, generation: s.generation }, e)
            })
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

/// Live ids only. A stale id is a broken invariant.
impl Index<EntityId> for EntityStore {
    type Output = Entity;
    fn index(&self, id: EntityId) -> &Entity {
        match self.get(id) {
            Some(e) => e,
            None => panic!("stale entity id {id}"),
        }
    }
}

impl IndexMut<EntityId> for EntityStore {
    fn index_mut(&mut self, id: EntityId) -> &mut Entity {
        match self.get_mut(id) {
            Some(e) => e,
            None => panic!("stale entity id {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::GridPos;
    use crate::domain::prefab::PrefabKind;

    fn spawn(store: &mut EntityStore, kind: PrefabKind) -> EntityId {
        store.spawn(kind.template().instantiate(GridPos::new(2, 2)))
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut store = EntityStore::new();
        let a = spawn(&mut store, PrefabKind::Box);
        store.destroy(a);
        let b = spawn(&mut store, PrefabKind::Mail);
        assert_eq!(a.index, b.index);
        assert_ne!(a, b);
        assert!(store.get(a).is_none());
        assert!(store.destroy(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn destroy_removes_every_relation() {
        let mut store = EntityStore::new();
        let plate = spawn(&mut store, PrefabKind::Plate);
        let gate = spawn(&mut store, PrefabKind::Gate);
        let other = spawn(&mut store, PrefabKind::InvertedGate);
        store.relations.wire(plate, gate);
        store.relations.wire(plate, other);
        store.relations.mark(gate, plate);
        store.relations.mark(other, plate);

        store.destroy(gate);
        assert!(!store.relations.mentions(gate));
        assert_eq!(store.relations.edges(), vec![(plate, other)]);

        store.destroy(plate);
        assert!(store.relations.is_empty());
    }

    #[test]
    fn holder_carries_one_item() {
        let mut rel = Relations::default();
        let p = EntityId { index: 0, generation: 0 };
        let m1 = EntityId { index: 1, generation: 0 };
        let m2 = EntityId { index: 2, generation: 0 };
        assert!(rel.hold(p, m1));
        assert!(!rel.hold(p, m2));
        assert_eq!(rel.held_by(p), Some(m1));
        rel.forget(m1);
        assert_eq!(rel.held_by(p), None);
    }

    #[test]
    fn unmark_clears_empty_gate_entry() {
        let mut rel = Relations::default();
        let g = EntityId { index: 0, generation: 0 };
        let p = EntityId { index: 1, generation: 0 };
        rel.mark(g, p);
        rel.mark(g, p);
        assert_eq!(rel.marks(g), 1);
        rel.unmark(g, p);
        assert_eq!(rel.marks(g), 0);
        assert!(rel.is_empty());
    }
}
