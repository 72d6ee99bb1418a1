/// Entities: the player, mail, mailboxes, boxes, gates and weight plates.
///
/// There is no inheritance between kinds. Every entity is one flat
/// `Entity` record; the `Role` carries the per-kind state machine and
/// the tags decide which passes look at it.

use std::fmt;

use super::grid::{Delta, Facing, GridPos, TILE_PX};
use super::sprite::{Depth, Sprite};
use super::tile::Tile;

/// Arena handle. The generation makes stale handles miss after a slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MailState {
    Free,
    Held,
    Delivered,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Player,
    Mail(MailState),
    /// `delivered` keeps the identity of the consumed mail item.
    Mailbox { full: bool, delivered: Option<EntityId> },
    Box,
    Gate { open: bool },
    Plate { active: bool },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Tags {
    pub pushable: bool,
    pub can_push: bool,
    pub weighted: bool,
    pub inverted: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MovingState {
    Inactive,
    Moving,
}

/// Presentation position in pixels, trailing the logical grid position.
/// Input and velocity are only applied while `Inactive`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Motion {
    pub px: i32,
    pub py: i32,
    pub state: MovingState,
}

impl Motion {
    pub fn at(pos: GridPos) -> Self {
        let (px, py) = pos.to_px();
        Motion { px, py, state: MovingState::Inactive }
    }

    /// Step toward `target` by at most `speed` pixels per axis.
    /// Returns true while still travelling.
    pub fn advance(&mut self, target: GridPos, speed: i32) -> bool {
        let (tx, ty) = target.to_px();
        let speed = speed.max(1);
        self.px += (tx - self.px).clamp(-speed, speed);
        self.py += (ty - self.py).clamp(-speed, speed);
        // More than a cell away means a teleport (drop, room change): snap.
        if (tx - self.px).abs() > TILE_PX || (ty - self.py).abs() > TILE_PX {
            self.px = tx;
            self.py = ty;
        }
        let arrived = self.px == tx && self.py == ty;
        self.state = if arrived { MovingState::Inactive } else { MovingState::Moving };
        !arrived
    }

    pub fn is_inactive(&self) -> bool {
        self.state == MovingState::Inactive
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub role: Role,
    /// Authoritative logical cell.
    pub pos: GridPos,
    /// Last committed cell: revert target and push-delta base.
    pub prev: GridPos,
    pub collision: Tile,
    pub tags: Tags,
    pub velocity: Option<Delta>,
    pub facing: Facing,
    pub motion: Motion,
    /// Disabled entities are in no occupant list and are not drawn.
    pub enabled: bool,
    pub sprite: Sprite,
    pub depth: Depth,
}

impl Entity {
    pub fn is_player(&self) -> bool {
        self.role == Role::Player
    }

    pub fn moved(&self) -> bool {
        self.pos != self.prev
    }

    /// Undo this tick's step and drop any pending velocity.
    pub fn revert(&mut self) {
        self.pos = self.prev;
        self.velocity = None;
    }

    /// Place at `pos` with no history and no travel.
    pub fn teleport(&mut self, pos: GridPos) {
        self.pos = pos;
        self.prev = pos;
        self.velocity = None;
        self.motion = Motion::at(pos);
    }

    pub fn is_free_mail(&self) -> bool {
        self.enabled && self.role == Role::Mail(MailState::Free)
    }
}

// ── Input intents ──

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntentKind {
    Up,
    Down,
    Left,
    Right,
    Fire,
    Restart,
}

/// One input edge: `pressed` is true on key-down, false on key-up.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InputIntent {
    pub kind: IntentKind,
    pub pressed: bool,
}

impl InputIntent {
    pub fn press(kind: IntentKind) -> Self {
        InputIntent { kind, pressed: true }
    }

    pub fn release(kind: IntentKind) -> Self {
        InputIntent { kind, pressed: false }
    }
}

/// Held directional state. Level-sensitive: a held direction keeps
/// producing a step every tick the player is `Inactive`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PlayerControls {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl PlayerControls {
    /// Record a directional edge. Returns the facing it implies, if any.
    pub fn apply(&mut self, intent: InputIntent) -> Option<Facing> {
        let (slot, facing) = match intent.kind {
            IntentKind::Up => (&mut self.up, Facing::Up),
            IntentKind::Down => (&mut self.down, Facing::Down),
            IntentKind::Left => (&mut self.left, Facing::Left),
            IntentKind::Right => (&mut self.right, Facing::Right),
            IntentKind::Fire | IntentKind::Restart => return None,
        };
        *slot = intent.pressed;
        Some(facing)
    }

    /// Direction to attempt this tick. Up wins over Down over Left over Right.
    pub fn desired(&self) -> Option<Facing> {
        if self.up {
            Some(Facing::Up)
        } else if self.down {
            Some(Facing::Down)
        } else if self.left {
            Some(Facing::Left)
        } else if self.right {
            Some(Facing::Right)
        } else {
            None
        }
    }
}
