/// Render-boundary vocabulary: which image an entity shows and how it sorts.
/// The simulation picks these; it never touches a screen.

use super::grid::Facing;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sprite {
    PlayerIdle(Facing),
    PlayerWalk(Facing),
    Mail,
    Mailbox,
    MailboxFull,
    Box,
    ButtonPlate,
    ButtonPlatePressed,
    Gate,
    GateOpened,
}

impl Sprite {
    pub fn player(facing: Facing, walking: bool) -> Sprite {
        if walking {
            Sprite::PlayerWalk(facing)
        } else {
            Sprite::PlayerIdle(facing)
        }
    }
}

/// Draw order category. Later variants draw on top.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Depth {
    Background,
    Movable,
    Player,
}
