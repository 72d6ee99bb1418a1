/// Room geometry: the fixed 20×15 cell grid, cell positions and one-cell deltas.
///
/// Every room is exactly `ROOM_WIDTH × ROOM_HEIGHT`. Level validation
/// guarantees that the border ring is solid and that every placement is
/// on an interior cell, so a single-cell step from any reachable position
/// stays in bounds. `GridPos::cell()` therefore treats an out-of-bounds
/// position as a broken invariant and panics.

use std::ops::{Add, Sub};

pub const ROOM_WIDTH: usize = 20;
pub const ROOM_HEIGHT: usize = 15;
pub const ROOM_CELLS: usize = ROOM_WIDTH * ROOM_HEIGHT;

/// Pixel edge length of one cell. Only the render boundary uses pixels.
pub const TILE_PX: i32 = 16;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

/// A one-step displacement between two grid positions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Delta {
    pub dx: i32,
    pub dy: i32,
}

impl Delta {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Delta { dx, dy }
    }
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        GridPos { x, y }
    }

    pub fn in_bounds(self) -> bool {
        self.x >= 0 && self.y >= 0
            && (self.x as usize) < ROOM_WIDTH
            && (self.y as usize) < ROOM_HEIGHT
    }

    /// Inside the bounds and not on the outer ring.
    pub fn is_interior(self) -> bool {
        self.x >= 1 && self.y >= 1
            && (self.x as usize) < ROOM_WIDTH - 1
            && (self.y as usize) < ROOM_HEIGHT - 1
    }

    pub fn is_border(self) -> bool {
        self.in_bounds() && !self.is_interior()
    }

    /// Flat cell index (`x + y * ROOM_WIDTH`).
    ///
    /// Panics when the position is outside the room.
    #[inline]
    pub fn cell(self) -> usize {
        assert!(
            self.in_bounds(),
            "grid position ({}, {}) is outside the {}x{} room",
            self.x, self.y, ROOM_WIDTH, ROOM_HEIGHT,
        );
        self.x as usize + self.y as usize * ROOM_WIDTH
    }

    pub fn from_cell(idx: usize) -> Self {
        GridPos::new((idx % ROOM_WIDTH) as i32, (idx / ROOM_WIDTH) as i32)
    }

    /// Top-left pixel of this cell.
    pub fn to_px(self) -> (i32, i32) {
        (self.x * TILE_PX, self.y * TILE_PX)
    }

    /// Iterate every cell of a room, row-major.
    pub fn all() -> impl Iterator<Item = GridPos> {
        (0..ROOM_CELLS).map(GridPos::from_cell)
    }
}

impl Add<Delta> for GridPos {
    type Output = GridPos;
    fn add(self, d: Delta) -> GridPos {
        GridPos::new(self.x + d.dx, self.y + d.dy)
    }
}

impl Sub for GridPos {
    type Output = Delta;
    fn sub(self, other: GridPos) -> Delta {
        Delta::new(self.x - other.x, self.y - other.y)
    }
}

/// Cardinal facing. Also the direction of a one-cell step.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub fn delta(self) -> Delta {
        match self {
            Facing::Up => Delta::new(0, -1),
            Facing::Down => Delta::new(0, 1),
            Facing::Left => Delta::new(-1, 0),
            Facing::Right => Delta::new(1, 0),
        }
    }
}
