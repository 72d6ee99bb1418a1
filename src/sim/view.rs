/// Render boundary: what the presentation layer may draw this frame.
///
/// Disabled entities (held or delivered mail) are not listed.
/// Items are ordered by depth, then top-to-bottom, then left-to-right,
/// so drawing them in order gives the right overlap.

use crate::domain::entity::EntityId;
use crate::domain::sprite::{Depth, Sprite};
use super::world::WorldState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RenderItem {
    pub id: EntityId,
    pub px: i32,
    pub py: i32,
    pub sprite: Sprite,
    pub depth: Depth,
}

pub fn render_list(world: &WorldState) -> Vec<RenderItem> {
    let mut items: Vec<RenderItem> = world.members()
        .into_iter()
        .filter_map(|id| {
            let e = world.store.get(id)?;
            e.enabled.then_some(RenderItem {
                id,
                px: e.motion.px,
                py: e.motion.py,
                sprite: e.sprite,
                depth: e.depth,
            })
        })
        .collect();
    items.sort_by_key(|i| (i.depth, i.py, i.px, i.id));
    items
}
