/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The room is drawn from two sources only: the instance terrain and
/// `sim::view::render_list`. Nothing here reads entity internals.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::grid::{Facing, GridPos, ROOM_CELLS, ROOM_HEIGHT, ROOM_WIDTH, TILE_PX};
use crate::domain::sprite::Sprite;
use crate::domain::tile::Terrain;
use crate::sim::view::render_list;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 16],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Cell {
    /// Explicit background for every "empty" terminal cell, so the
    /// inter-row gap on VTE terminals matches the cell color.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 16],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell {
        ch: [b'?', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::from_char(c, fg, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    fn put_glyph(&mut self, col: usize, row: usize, glyph: Glyph, bg: Color) {
        match glyph {
            Glyph::Wide(ch) => {
                self.set(col, row, Cell::from_char_wide(ch, Color::Reset, bg));
                self.set(col + 1, row, Cell { bg: Cell::norm_bg(bg), ..Cell::WIDE_CONT });
            }
            Glyph::Pair(c0, c1, fg) => {
                self.set(col, row, Cell::from_char(c0, fg, bg));
                self.set(col + 1, row, Cell::from_char(c1, fg, bg));
            }
        }
    }
}

// ── Glyphs ──

/// What one room cell looks like: a wide emoji or two narrow characters.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Glyph {
    Wide(char),
    Pair(char, char, Color),
}

const GRASS_BG: Color = Color::Rgb { r: 34, g: 70, b: 38 };
const WALL_BG: Color = Color::Rgb { r: 70, g: 70, b: 80 };

/// Terrain glyph and the background color sprites on top of it inherit.
fn terrain_glyph(t: Terrain) -> (Glyph, Color) {
    let green = Color::Rgb { r: 90, g: 160, b: 80 };
    let wire = Color::Rgb { r: 230, g: 200, b: 60 };
    match t {
        Terrain::Grass => (Glyph::Pair(' ', ' ', green), GRASS_BG),
        Terrain::GrassWithStone => (Glyph::Pair('·', ' ', Color::Grey), GRASS_BG),
        Terrain::TreeTop => (Glyph::Pair('▲', '▲', green), GRASS_BG),
        Terrain::TreeBottom => (Glyph::Pair('█', '█', Color::Rgb { r: 110, g: 75, b: 40 }), GRASS_BG),
        Terrain::TreeBoth => (Glyph::Wide('🌲'), GRASS_BG),
        Terrain::Wall => (Glyph::Pair('█', '█', Color::Rgb { r: 120, g: 120, b: 130 }), WALL_BG),
        Terrain::WallBottom => (Glyph::Pair('▀', '▀', Color::Rgb { r: 120, g: 120, b: 130 }), WALL_BG),
        Terrain::MailboxFront => (Glyph::Pair('▔', '▔', Color::Rgb { r: 200, g: 60, b: 60 }), GRASS_BG),
        Terrain::WireLR => (Glyph::Pair('─', '─', wire), GRASS_BG),
        Terrain::WireTB => (Glyph::Pair('│', ' ', wire), GRASS_BG),
        Terrain::WireTR => (Glyph::Pair('└', '─', wire), GRASS_BG),
        Terrain::WireTL => (Glyph::Pair('┘', ' ', wire), GRASS_BG),
        Terrain::WireBR => (Glyph::Pair('┌', '─', wire), GRASS_BG),
        Terrain::WireBL => (Glyph::Pair('┐', ' ', wire), GRASS_BG),
    }
}

fn sprite_glyph(s: Sprite, tick: u64) -> Glyph {
    match s {
        Sprite::PlayerIdle(_) => Glyph::Wide('🧍'),
        // Two-frame walk: alternate the figure every few ticks
        Sprite::PlayerWalk(f) => {
            if (tick / 4) % 2 == 0 {
                Glyph::Wide('🚶')
            } else {
                let arrow = match f {
                    Facing::Up => '↑',
                    Facing::Down => '↓',
                    Facing::Left => '←',
                    Facing::Right => '→',
                };
                Glyph::Pair('☻', arrow, Color::Rgb { r: 250, g: 220, b: 170 })
            }
        }
        Sprite::Mail => Glyph::Wide('📨'),
        Sprite::Mailbox => Glyph::Wide('📪'),
        Sprite::MailboxFull => Glyph::Wide('📫'),
        Sprite::Box => Glyph::Wide('📦'),
        Sprite::ButtonPlate => Glyph::Pair('[', ']', Color::Rgb { r: 160, g: 160, b: 160 }),
        Sprite::ButtonPlatePressed => Glyph::Pair('[', ']', Color::Rgb { r: 240, g: 200, b: 60 }),
        Sprite::Gate => Glyph::Pair('▓', '▓', Color::Rgb { r: 200, g: 90, b: 40 }),
        Sprite::GateOpened => Glyph::Pair('░', '░', Color::Rgb { r: 120, g: 70, b: 40 }),
    }
}

/// Pixel position to the nearest room cell.
fn px_to_cell(px: i32) -> i32 {
    (px + TILE_PX / 2).div_euclid(TILE_PX)
}

// ── Renderer ──

/// Each room cell = 2 terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MSG_ROW: usize = MAP_ROW + ROOM_HEIGHT + 1;
const HELP_ROW: usize = MSG_ROW + 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    last_room: Option<usize>,
    /// Terminal reports key releases.
    pub keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            last_room: None,
            keyboard_enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back differs from front everywhere.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Clean repaint on phase change or room change
        let room_changed = self.last_room != Some(world.room.template);
        if self.last_phase != Some(world.phase) || room_changed {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(world.phase);
            self.last_room = Some(world.room.template);
        }

        self.front.clear();
        compose(&mut self.front, world);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

// ── Compose: build front buffer content ──

fn compose(buf: &mut FrameBuffer, w: &WorldState) {
    compose_hud(buf, w);
    compose_room(buf, w);

    if !w.message.is_empty() && MSG_ROW < buf.height {
        buf.fill_row(MSG_ROW, MSG_BG);
        buf.put_str(0, MSG_ROW, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
    }

    if HELP_ROW < buf.height {
        let help = " Arrows/WASD:Move  Space/Z:Pick up/Throw  R:Restart  Esc/Q:Quit";
        buf.put_str(0, HELP_ROW, help, Color::DarkGrey, Color::Reset);
    }

    if w.phase == Phase::Complete {
        compose_complete(buf, w);
    }
}

fn compose_hud(buf: &mut FrameBuffer, w: &WorldState) {
    let (full, total) = w.mail_progress();
    let holding = if w.held().is_some() { "✉ in hand" } else { "" };
    let hud = format!(
        " {:<16} Mailboxes {}/{}  Delivered {:<3} {} ",
        w.template().name, full, total, w.delivered, holding,
    );
    buf.fill_row(HUD_ROW, HUD_BG);
    buf.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
}

fn compose_room(buf: &mut FrameBuffer, w: &WorldState) {
    let mut under = vec![Cell::BASE_BG; ROOM_CELLS];

    for pos in GridPos::all() {
        let (glyph, bg) = terrain_glyph(w.room.terrain_at(pos));
        under[pos.cell()] = bg;
        let (col, row) = (pos.x as usize * CELL_W, MAP_ROW + pos.y as usize);
        buf.put_glyph(col, row, glyph, bg);
    }

    // Sprites, already in draw order
    for item in render_list(w) {
        let pos = GridPos::new(px_to_cell(item.px), px_to_cell(item.py));
        if !pos.in_bounds() { continue; }
        let (col, row) = (pos.x as usize * CELL_W, MAP_ROW + pos.y as usize);
        buf.put_glyph(col, row, sprite_glyph(item.sprite, w.tick), under[pos.cell()]);
    }
}

fn compose_complete(buf: &mut FrameBuffer, w: &WorldState) {
    let lines = [
        String::new(),
        "   ALL MAIL DELIVERED   ".to_string(),
        String::new(),
        format!("   {} letters in {} rooms   ", w.delivered, w.rooms.len()),
        String::new(),
        "   Esc / Q to quit   ".to_string(),
        String::new(),
    ];
    let box_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let left = (ROOM_WIDTH * CELL_W).saturating_sub(box_w) / 2;
    let top = MAP_ROW + ROOM_HEIGHT.saturating_sub(lines.len()) / 2;
    let bg = Color::Rgb { r: 30, g: 30, b: 90 };

    for (i, line) in lines.iter().enumerate() {
        for x in 0..box_w {
            buf.set(left + x, top + i, Cell::from_char(' ', Color::White, bg));
        }
        let pad = (box_w - line.chars().count()) / 2;
        buf.put_str(left + pad, top + i, line, Color::Rgb { r: 255, g: 230, b: 120 }, bg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_positions_round_to_nearest_cell() {
        assert_eq!(px_to_cell(0), 0);
        assert_eq!(px_to_cell(7), 0);
        assert_eq!(px_to_cell(8), 1);
        assert_eq!(px_to_cell(32), 2);
        assert_eq!(px_to_cell(-3), 0);
    }

    #[test]
    fn wide_glyph_writes_continuation() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.put_glyph(0, 0, Glyph::Wide('📦'), GRASS_BG);
        assert!(buf.get(0, 0).wide);
        assert!(buf.get(1, 0).cont);
        assert_eq!(buf.get(0, 0).as_str(), "📦");
    }

    #[test]
    fn put_str_clips_at_width() {
        let mut buf = FrameBuffer::new(3, 1);
        buf.put_str(1, 0, "abcdef", Color::White, Color::Reset);
        assert_eq!(buf.get(0, 0), Cell::BLANK);
        assert_eq!(buf.get(2, 0).as_str(), "b");
    }

    #[test]
    fn layout_fits_standard_terminal() {
        assert!(HELP_ROW < 24);
        assert!(ROOM_WIDTH * CELL_W <= 80);
    }
}
