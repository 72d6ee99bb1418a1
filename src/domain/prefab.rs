/// Prefabs: immutable object templates copied field-by-field into a
/// fresh `Entity` at room-build time.

use super::entity::{Entity, MailState, Motion, Role, Tags};
use super::grid::{Facing, GridPos};
use super::sprite::{Depth, Sprite};
use super::tile::Tile;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PrefabKind {
    Mail,
    Mailbox,
    Box,
    Gate,
    InvertedGate,
    Plate,
}

impl PrefabKind {
    pub fn from_name(s: &str) -> Option<PrefabKind> {
        match s.to_ascii_lowercase().as_str() {
            "mail" => Some(PrefabKind::Mail),
            "mailbox" => Some(PrefabKind::Mailbox),
            "box" => Some(PrefabKind::Box),
            "gate" => Some(PrefabKind::Gate),
            "inverted_gate" | "igate" => Some(PrefabKind::InvertedGate),
            "plate" => Some(PrefabKind::Plate),
            _ => None,
        }
    }

    /// Legend character that places this prefab on a grass cell.
    pub fn from_char(c: char) -> Option<PrefabKind> {
        match c {
            'M' => Some(PrefabKind::Mail),
            'X' => Some(PrefabKind::Mailbox),
            'B' => Some(PrefabKind::Box),
            'G' => Some(PrefabKind::Gate),
            'I' => Some(PrefabKind::InvertedGate),
            'P' => Some(PrefabKind::Plate),
            _ => None,
        }
    }

    pub fn is_plate(self) -> bool {
        self == PrefabKind::Plate
    }

    pub fn is_gate(self) -> bool {
        matches!(self, PrefabKind::Gate | PrefabKind::InvertedGate)
    }

    pub fn template(self) -> &'static Prefab {
        match self {
            PrefabKind::Mail => &MAIL,
            PrefabKind::Mailbox => &MAILBOX,
            PrefabKind::Box => &BOX,
            PrefabKind::Gate => &GATE,
            PrefabKind::InvertedGate => &INVERTED_GATE,
            PrefabKind::Plate => &PLATE,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Prefab {
    pub role: Role,
    pub collision: Tile,
    pub tags: Tags,
    pub sprite: Sprite,
    pub depth: Depth,
}

const NO_TAGS: Tags = Tags { pushable: false, can_push: false, weighted: false, inverted: false };

pub static MAIL: Prefab = Prefab {
    role: Role::Mail(MailState::Free),
    collision: Tile::None,
    tags: Tags { weighted: true, ..NO_TAGS },
    sprite: Sprite::Mail,
    depth: Depth::Movable,
};

pub static MAILBOX: Prefab = Prefab {
    role: Role::Mailbox { full: false, delivered: None },
    collision: Tile::None,
    tags: NO_TAGS,
    sprite: Sprite::Mailbox,
    depth: Depth::Background,
};

pub static BOX: Prefab = Prefab {
    role: Role::Box,
    collision: Tile::Solid,
    tags: Tags { pushable: true, weighted: true, ..NO_TAGS },
    sprite: Sprite::Box,
    depth: Depth::Movable,
};

// Gates start closed; the room build settles them against their plates.
pub static GATE: Prefab = Prefab {
    role: Role::Gate { open: false },
    collision: Tile::Solid,
    tags: NO_TAGS,
    sprite: Sprite::Gate,
    depth: Depth::Background,
};

pub static INVERTED_GATE: Prefab = Prefab {
    role: Role::Gate { open: false },
    collision: Tile::Solid,
    tags: Tags { inverted: true, ..NO_TAGS },
    sprite: Sprite::Gate,
    depth: Depth::Background,
};

pub static PLATE: Prefab = Prefab {
    role: Role::Plate { active: false },
    collision: Tile::None,
    tags: NO_TAGS,
    sprite: Sprite::ButtonPlate,
    depth: Depth::Background,
};

/// The player is not placed by layouts; it is built once per world.
pub static PLAYER: Prefab = Prefab {
    role: Role::Player,
    collision: Tile::None,
    tags: Tags { can_push: true, weighted: true, ..NO_TAGS },
    sprite: Sprite::PlayerIdle(Facing::Down),
    depth: Depth::Player,
};

impl Prefab {
    pub fn instantiate(&self, pos: GridPos) -> Entity {
        Entity {
            role: self.role,
            pos,
            prev: pos,
            collision: self.collision,
            tags: self.tags,
            velocity: None,
            facing: Facing::Down,
            motion: Motion::at(pos),
            enabled: true,
            sprite: self.sprite,
            depth: self.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_are_independent_copies() {
        let a = PrefabKind::Box.template().instantiate(GridPos::new(2, 2));
        let mut b = PrefabKind::Box.template().instantiate(GridPos::new(3, 2));
        b.tags.pushable = false;
        assert!(a.tags.pushable);
        assert!(!b.tags.pushable);
        assert!(BOX.tags.pushable);
        assert_eq!(a.prev, a.pos);
    }

    #[test]
    fn names_and_legend_agree() {
        assert_eq!(PrefabKind::from_name("Inverted_Gate"), PrefabKind::from_char('I'));
        assert!(PrefabKind::from_char('P').map_or(false, PrefabKind::is_plate));
        assert!(PrefabKind::from_name("igate").map_or(false, PrefabKind::is_gate));
        assert_eq!(PrefabKind::from_name("crate"), None);
    }
}
