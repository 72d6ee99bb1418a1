/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (one room per `.txt` file, sorted by file name)
///   2. Built-in embedded rooms
///
/// ## Room format (`.txt`):
///   ```
///   # Room Name
///   > next Other Room       (optional; default = following room, `> end` = last)
///   @ spawn 16,7            (optional; default 16,7)
///   + mail 5,4              (explicit placement, indexed in file order)
///   ~ 2>3 2>4               (wiring: plate placement → gate placement)
///   <15 rows of 20 legend characters>
///   ```
///
/// Legend prefab characters stand on grass and are appended to the
/// placement list after the explicit ones, row-major.
///
/// ## Terrain legend:
///   '.' = Grass        ',' = Grass with stone
///   '^' = Tree top     'v' = Tree bottom      'T' = Tree
///   '#' = Wall         '_' = Wall bottom      '=' = Mailbox front
///   '-' '|' 'L' 'J' 'F' '7' = Wire pieces (decorative)
///
/// ## Prefab legend:
///   'M' = Mail   'X' = Mailbox   'B' = Box
///   'G' = Gate   'I' = Inverted gate   'P' = Weight plate
///
/// Every room is validated when loaded: fully enclosed by solid border
/// cells, placements and spawn on interior cells, wiring from plates to
/// gates. The simulation relies on this and never bounds-checks at runtime.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::domain::grid::{GridPos, ROOM_HEIGHT, ROOM_WIDTH};
use crate::domain::prefab::PrefabKind;
use crate::domain::tile::{Terrain, Tile};
use super::room::{Placement, RoomTemplate, DEFAULT_SPAWN};

#[derive(Error, Debug)]
pub enum LevelError {
    #[error("{room}: expected {expected} map rows, found {found}", expected = ROOM_HEIGHT)]
    RowCount { room: String, found: usize },
    #[error("{room}: map row {row} is {found} characters wide, expected {expected}", expected = ROOM_WIDTH)]
    RowWidth { room: String, row: usize, found: usize },
    #[error("{room}: unknown legend character {ch:?} at ({x}, {y})")]
    UnknownChar { room: String, ch: char, x: usize, y: usize },
    #[error("{room}: unknown prefab {name:?}")]
    UnknownPrefab { room: String, name: String },
    #[error("{room}: line {line}: cannot parse {text:?}")]
    Malformed { room: String, line: usize, text: String },
    #[error("{room}: border cell ({x}, {y}) is not solid")]
    OpenBorder { room: String, x: i32, y: i32 },
    #[error("{room}: placement {index} at ({x}, {y}) is not an interior cell")]
    PlacementOutside { room: String, index: usize, x: i32, y: i32 },
    #[error("{room}: spawn ({x}, {y}) is not a free interior cell")]
    BadSpawn { room: String, x: i32, y: i32 },
    #[error("{room}: wiring {from}>{to} refers to a missing placement")]
    WireRange { room: String, from: usize, to: usize },
    #[error("{room}: wiring {from}>{to} does not connect a plate to a gate")]
    WireKind { room: String, from: usize, to: usize },
    #[error("{room}: next room {name:?} does not exist")]
    UnknownNext { room: String, name: String },
    #[error("no rooms to play")]
    EmptyPack,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NextRef {
    Following,
    End,
    Named(String),
}

/// A parsed but not yet cross-referenced room.
#[derive(Clone, Debug)]
struct RawRoom {
    template: RoomTemplate,
    next: NextRef,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the room sequence: `levels_dir` if it holds valid rooms,
/// the embedded rooms otherwise.
pub fn load_rooms(config: &GameConfig) -> Result<Vec<RoomTemplate>, LevelError> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let texts = load_from_directory(dir);
        if !texts.is_empty() {
            let mut raws = vec![];
            for (file, text) in &texts {
                match parse_room(text) {
                    Ok(raw) => raws.push(raw),
                    Err(e) => warn!(file = %file, "skipping room: {e}"),
                }
            }
            match build_pack(raws) {
                Ok(rooms) => {
                    let mailboxes: usize = rooms.iter().map(RoomTemplate::mailbox_count).sum();
                    info!(dir = %dir.display(), rooms = rooms.len(), mailboxes, "rooms loaded");
                    return Ok(rooms);
                }
                Err(e) => warn!(dir = %dir.display(), "falling back to built-in rooms: {e}"),
            }
        }
    }
    embedded_rooms()
}

/// Parse and cross-reference a sequence of room texts.
pub fn parse_pack(texts: &[&str]) -> Result<Vec<RoomTemplate>, LevelError> {
    let raws = texts.iter().map(|t| parse_room(t)).collect::<Result<Vec<_>, _>>()?;
    build_pack(raws)
}

pub fn embedded_rooms() -> Result<Vec<RoomTemplate>, LevelError> {
    parse_pack(&[FIRST_DELIVERY, HEAVY_POST, TWO_WAYS])
}

// ══════════════════════════════════════════════════════════════
// Pack assembly
// ══════════════════════════════════════════════════════════════

fn build_pack(raws: Vec<RawRoom>) -> Result<Vec<RoomTemplate>, LevelError> {
    if raws.is_empty() {
        return Err(LevelError::EmptyPack);
    }
    let names: Vec<String> = raws.iter().map(|r| r.template.name.clone()).collect();
    let count = raws.len();
    raws.into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut t = raw.template;
            t.next = match raw.next {
                NextRef::Following => (i + 1 < count).then_some(i + 1),
                NextRef::End => None,
                NextRef::Named(name) => match names.iter().position(|n| *n == name) {
                    Some(idx) => Some(idx),
                    None => return Err(LevelError::UnknownNext { room: t.name, name }),
                },
            };
            Ok(t)
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Single-room parsing
// ══════════════════════════════════════════════════════════════

fn parse_room(content: &str) -> Result<RawRoom, LevelError> {
    let name = content
        .lines()
        .find_map(|l| l.strip_prefix("# "))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unnamed Room".to_string());

    let mut next = NextRef::Following;
    let mut spawn = DEFAULT_SPAWN;
    let mut explicit = vec![];
    let mut wiring = vec![];
    let mut rows: Vec<&str> = vec![];

    for (n, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim_end();
        let malformed = || LevelError::Malformed {
            room: name.clone(),
            line: n + 1,
            text: line.to_string(),
        };

        if line.is_empty() || line.starts_with("# ") {
            continue;
        } else if let Some(rest) = line.strip_prefix("> ") {
            let rest = rest.trim();
            next = if rest == "end" {
                NextRef::End
            } else if let Some(target) = rest.strip_prefix("next ") {
                NextRef::Named(target.trim().to_string())
            } else {
                return Err(malformed());
            };
        } else if let Some(rest) = line.strip_prefix("@ ") {
            let coords = rest.trim().strip_prefix("spawn ").ok_or_else(malformed)?;
            spawn = parse_coords(coords).ok_or_else(malformed)?;
        } else if let Some(rest) = line.strip_prefix("+ ") {
            let mut parts = rest.split_whitespace();
            let (prefab, coords) = match (parts.next(), parts.next(), parts.next()) {
                (Some(p), Some(c), None) => (p, c),
                _ => return Err(malformed()),
            };
            let kind = PrefabKind::from_name(prefab).ok_or_else(|| LevelError::UnknownPrefab {
                room: name.clone(),
                name: prefab.to_string(),
            })?;
            let pos = parse_coords(coords).ok_or_else(malformed)?;
            explicit.push(Placement { kind, pos });
        } else if let Some(rest) = line.strip_prefix("~ ") {
            for pair in rest.split_whitespace() {
                let (a, b) = pair.split_once('>').ok_or_else(malformed)?;
                let a = a.parse::<usize>().map_err(|_| malformed())?;
                let b = b.parse::<usize>().map_err(|_| malformed())?;
                wiring.push((a, b));
            }
        } else {
            rows.push(line);
        }
    }

    if rows.len() != ROOM_HEIGHT {
        return Err(LevelError::RowCount { room: name, found: rows.len() });
    }

    let mut terrain = Vec::with_capacity(ROOM_WIDTH * ROOM_HEIGHT);
    let mut placements = explicit;
    for (y, row) in rows.iter().enumerate() {
        let width = row.chars().count();
        if width != ROOM_WIDTH {
            return Err(LevelError::RowWidth { room: name, row: y, found: width });
        }
        for (x, ch) in row.chars().enumerate() {
            if let Some(t) = Terrain::from_char(ch) {
                terrain.push(t);
            } else if let Some(kind) = PrefabKind::from_char(ch) {
                terrain.push(Terrain::Grass);
                placements.push(Placement { kind, pos: GridPos::new(x as i32, y as i32) });
            } else {
                return Err(LevelError::UnknownChar { room: name, ch, x, y });
            }
        }
    }

    let template = RoomTemplate { name, terrain, placements, wiring, spawn, next: None };
    validate(&template)?;
    Ok(RawRoom { template, next })
}

fn parse_coords(s: &str) -> Option<GridPos> {
    let (x, y) = s.trim().split_once(',')?;
    Some(GridPos::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn validate(t: &RoomTemplate) -> Result<(), LevelError> {
    let room = || t.name.clone();

    if let Some(pos) = GridPos::all()
        .filter(|p| p.is_border())
        .find(|&p| t.terrain_at(p).tile() != Tile::Solid)
    {
        return Err(LevelError::OpenBorder { room: room(), x: pos.x, y: pos.y });
    }

    for (index, p) in t.placements.iter().enumerate() {
        if !p.pos.is_interior() {
            return Err(LevelError::PlacementOutside { room: room(), index, x: p.pos.x, y: p.pos.y });
        }
    }

    let s = t.spawn;
    if !s.is_interior() || t.terrain_at(s).tile().blocks(true) {
        return Err(LevelError::BadSpawn { room: room(), x: s.x, y: s.y });
    }

    for &(from, to) in &t.wiring {
        match (t.placements.get(from), t.placements.get(to)) {
            (Some(a), Some(b)) if a.kind.is_plate() && b.kind.is_gate() => {}
            (Some(_), Some(_)) => return Err(LevelError::WireKind { room: room(), from, to }),
            _ => return Err(LevelError::WireRange { room: room(), from, to }),
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

/// `(file name, contents)` of every readable `.txt` file, sorted by name.
fn load_from_directory(dir: &Path) -> Vec<(String, String)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), "cannot read levels directory: {e}");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    let filename = path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    results.push((filename, content));
                }
                Err(e) => warn!(path = %path.display(), "cannot read room file: {e}"),
            }
        }
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

// ══════════════════════════════════════════════════════════════
// Embedded rooms
// ══════════════════════════════════════════════════════════════

const FIRST_DELIVERY: &str = "\
# First Delivery
TTTTTTTTTTTTTTTTTTTT
T..................T
T..................T
T...........T......T
T....M.............T
T..........^.......T
T..........v.......T
T..................T
T...X..............T
T...=..............T
T..................T
T.......T..........T
T..................T
T..................T
TTTTTTTTTTTTTTTTTTTT
";

const HEAVY_POST: &str = "\
# Heavy Post
> next Two Ways
@ spawn 3,10
~ 3>4
####################
#........#.........#
#........#.........#
#..M.....#....X....#
#........#....=....#
#........#.........#
#...B.P--G.........#
#........#.........#
#........#.........#
#........#.........#
#........#.........#
#........#.........#
#........#.........#
#________#_________#
####################
";

const TWO_WAYS: &str = "\
# Two Ways
> end
+ mail 3,12
~ 6>2 6>3
####################
#...#........#.....#
#...#........#.....#
#.X.G........I..X..#
#...#........#.....#
#####........#######
#..................#
#..................#
#.....B....P.......#
#..........|.......#
#..........L---7...#
#.......M......|...#
#..............|...#
#..................#
####################
";
