/// Tile collision types and the terrain set they are drawn from.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

/// Collision type of a cell or of an entity standing in one.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    None,
    Solid,       // blocks every movable entity
    SolidPlayer, // blocks only the player (mailbox fronts)
}

impl Tile {
    /// Does this tile stop the given mover?
    pub fn blocks(self, mover_is_player: bool) -> bool {
        match self {
            Tile::None => false,
            Tile::Solid => true,
            Tile::SolidPlayer => mover_is_player,
        }
    }
}

/// Static terrain kinds a room grid is built from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Terrain {
    #[default]
    Grass,
    GrassWithStone,
    TreeTop,
    TreeBottom,
    TreeBoth,
    Wall,
    WallBottom,
    MailboxFront,
    WireLR,
    WireTB,
    WireTR,
    WireTL,
    WireBR,
    WireBL,
}

impl Terrain {
    pub fn tile(self) -> Tile {
        match self {
            Terrain::TreeTop
            | Terrain::TreeBottom
            | Terrain::TreeBoth
            | Terrain::Wall
            | Terrain::WallBottom => Tile::Solid,
            Terrain::MailboxFront => Tile::SolidPlayer,
            _ => Tile::None,
        }
    }

    /// Legend character used in room layout text.
    pub fn from_char(c: char) -> Option<Terrain> {
        let t = match c {
            '.' => Terrain::Grass,
            ',' => Terrain::GrassWithStone,
            '^' => Terrain::TreeTop,
            'v' => Terrain::TreeBottom,
            'T' => Terrain::TreeBoth,
            '#' => Terrain::Wall,
            '_' => Terrain::WallBottom,
            '=' => Terrain::MailboxFront,
            '-' => Terrain::WireLR,
            '|' => Terrain::WireTB,
            'L' => Terrain::WireTR,
            'J' => Terrain::WireTL,
            'F' => Terrain::WireBR,
            '7' => Terrain::WireBL,
            _ => return None,
        };
        Some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_player_blocks_only_player() {
        assert!(Tile::SolidPlayer.blocks(true));
        assert!(!Tile::SolidPlayer.blocks(false));
        assert!(Tile::Solid.blocks(false));
        assert!(!Tile::None.blocks(true));
    }

    #[test]
    fn decorative_terrain_is_passable() {
        assert_eq!(Terrain::Grass.tile(), Terrain::GrassWithStone.tile());
        assert_eq!(Terrain::WireBL.tile(), Tile::None);
        assert_eq!(Terrain::from_char('='), Some(Terrain::MailboxFront));
        assert_eq!(Terrain::from_char('T').map(Terrain::tile), Some(Tile::Solid));
        assert_eq!(Terrain::from_char('?'), None);
    }
}
