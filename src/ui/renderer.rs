/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout (top to bottom): HUD, map viewport, message bar, help bar.
/// One map tile is `CELL_W * zoom` columns by `zoom` rows. The victory
/// banner is placed relative to the terminal, not the camera.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Facing;
use crate::domain::tile::Tile;
use crate::sim::world::WorldState;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 16],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // occupies 2 terminal columns
    cont: bool,    // right half of a wide char (skip render)
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, also used
    /// for Clear, so row gaps on VTE terminals match the cells.
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

    /// Differs from any real cell; filling `back` with it forces a repaint.
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
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, bg: Color) -> Self {
        let mut cell = Self::from_char(c, Color::Reset, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("")
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
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
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

    /// Wide glyph plus its continuation cell. Dropped if it would be cut.
    fn set_wide(&mut self, x: usize, y: usize, c: char, bg: Color) {
        if x + 1 < self.width {
            self.set(x, y, Cell::from_char_wide(c, bg));
            self.set(x + 1, y, Cell::WIDE_CONT);
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
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

    /// Text row: its chars, for tests and debugging.
    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y)).filter(|c| !c.cont).map(|c| c.as_str().to_string()).collect()
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const GOLD: Color = Color::Rgb { r: 255, g: 220, b: 50 };

/// Ground and wall tint per tileset index (cycled).
const TILESET_COLORS: [(Color, Color); 6] = [
    (Color::Rgb { r: 60, g: 140, b: 60 }, Color::Rgb { r: 24, g: 48, b: 24 }),   // forest
    (Color::Rgb { r: 150, g: 110, b: 70 }, Color::Rgb { r: 50, g: 38, b: 26 }),  // enclosed
    (Color::Rgb { r: 170, g: 170, b: 180 }, Color::Rgb { r: 45, g: 45, b: 55 }), // gym
    (Color::Rgb { r: 140, g: 140, b: 200 }, Color::Rgb { r: 40, g: 40, b: 70 }), // gym 2
    (Color::Rgb { r: 150, g: 220, b: 255 }, Color::Rgb { r: 30, g: 60, b: 80 }), // ice
    (Color::Rgb { r: 200, g: 240, b: 255 }, Color::Rgb { r: 50, g: 80, b: 100 }),// ice 2
];

fn tileset_colors(tileset: usize) -> (Color, Color) {
    TILESET_COLORS[tileset % TILESET_COLORS.len()]
}

// ── Renderer ──

/// Terminal columns per tile at zoom 1 (keeps tiles roughly square).
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, gap + message + gap + help below it.
const RESERVED_ROWS: usize = MAP_ROW + 4;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_game_over: Option<bool>,
    /// Terminal reports key release events (kitty keyboard protocol).
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_game_over: None,
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

    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.keyboard_enhanced = false;
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
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Victory banner on/off: repaint everything
        if self.last_game_over != Some(world.game_over) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_game_over = Some(world.game_over);
        }

        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Size the camera to the terminal and build the whole front buffer.
    fn compose(&mut self, world: &mut WorldState) {
        self.fit_camera(world);

        self.front.clear();
        self.compose_hud(world);
        self.compose_map(world);
        self.compose_bars(world);

        if world.victory_visible {
            self.compose_victory(world);
        }
        if world.paused {
            self.compose_pause_overlay(world);
        }
    }

    fn fit_camera(&mut self, world: &mut WorldState) {
        let zoom = world.zoom.max(1) as usize;
        let max_w = (self.term_w / (CELL_W * zoom)).max(1);
        let max_h = (self.term_h.saturating_sub(RESERVED_ROWS) / zoom).max(1);

        // Cap to world dimensions so we don't waste space on void
        let (map_w, map_h) = (world.map.width, world.map.height);
        let cam = &mut world.camera;
        let resized = cam.view_w != max_w.min(map_w.max(1)) || cam.view_h != max_h.min(map_h.max(1));
        cam.view_w = max_w.min(map_w.max(1));
        cam.view_h = max_h.min(map_h.max(1));

        let (tx, ty) = world.player_tile();
        if resized {
            world.camera.center_on(tx, ty, map_w, map_h);
        } else {
            world.camera.follow(tx, ty, map_w, map_h);
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Never ResetColor here: the terminal default may differ from BASE_BG
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

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState) {
        let lab = if w.game_over { w.lab_count() } else { w.lab_number() };
        let hud = format!(
            " Labyrinth {}/{}   Items {}/{}   {}",
            lab, w.lab_count().max(1),
            w.items_collected, w.items_total,
            if w.paused { "[PAUSED]" } else { "" },
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, w: &WorldState) {
        let zoom = w.zoom.max(1) as usize;
        let cam = &w.camera;

        for vy in 0..cam.view_h {
            for vx in 0..cam.view_w {
                let wx = cam.x + vx as i32;
                let wy = cam.y + vy as i32;
                let col = vx * CELL_W * zoom;
                let row = MAP_ROW + vy * zoom;
                if wx < 0 || wy < 0 || wx as usize >= w.map.width || wy as usize >= w.map.height {
                    continue; // void: BLANK already
                }
                self.compose_tile(w, wx as usize, wy as usize, col, row, zoom);
            }
        }

        // Entities on top, at the block's top-left corner
        let (hw, hh) = (CELL_W * zoom, zoom);
        for item in &w.items {
            let (tx, ty) = w.pixel_to_tile(item.x, item.y);
            if let Some((vx, vy)) = cam.world_to_view(tx, ty) {
                let (_, bg) = self.ground_colors(w, tx, ty);
                self.front.set_wide(vx * hw + (hw - 2) / 2, MAP_ROW + vy * hh + (hh - 1) / 2, '\u{1F48E}', bg);
            }
        }

        let (tx, ty) = w.player_tile();
        if let Some((vx, vy)) = cam.world_to_view(tx, ty) {
            let glyph = match w.player.facing {
                Facing::Left => '\u{1F9CD}',
                Facing::Right => '\u{1F9D1}',
            };
            let (_, bg) = self.ground_colors(w, tx, ty);
            self.front.set_wide(vx * hw + (hw - 2) / 2, MAP_ROW + vy * hh + (hh - 1) / 2, glyph, bg);
        }
    }

    fn ground_colors(&self, w: &WorldState, gx: usize, gy: usize) -> (Color, Color) {
        match w.ground.at(gx, gy).tileset() {
            Some(ts) => tileset_colors(ts),
            None => (Color::DarkGrey, Cell::BASE_BG),
        }
    }

    /// Fill one tile's block: barrier over ground over void.
    fn compose_tile(&mut self, w: &WorldState, gx: usize, gy: usize, col: usize, row: usize, zoom: usize) {
        let (ch, fg, bg) = match w.barriers.at(gx, gy) {
            Tile::Drawn { tileset, .. } => {
                let (fg, bg) = tileset_colors(tileset);
                if w.collision.is_solid(gx as i64, gy as i64) {
                    ('█', fg, bg)
                } else {
                    ('▒', fg, bg)
                }
            }
            Tile::Empty => match w.ground.at(gx, gy) {
                Tile::Drawn { tileset, .. } => {
                    let (fg, bg) = tileset_colors(tileset);
                    ('·', fg, bg)
                }
                Tile::Empty => (' ', Color::Reset, Color::Reset),
            },
        };
        for dy in 0..zoom {
            for dx in 0..CELL_W * zoom {
                self.front.set(col + dx, row + dy, Cell::from_char(ch, fg, bg));
            }
        }
    }

    fn compose_bars(&mut self, w: &WorldState) {
        let zoom = w.zoom.max(1) as usize;
        let map_rows = w.camera.view_h * zoom;

        let msg_row = MAP_ROW + map_rows + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            let msg = format!(" ◈ {} ", w.message);
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &msg, Color::Black, MSG_BG);
        }

        let help_row = MAP_ROW + map_rows + 3;
        if help_row < self.front.height {
            let help = " ←↑↓→/WASD:Move  R:Restart  F1/P:Pause  Esc/Q:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Victory banner, centered on the terminal regardless of the camera.
    fn compose_victory(&mut self, w: &WorldState) {
        let remaining = w.victory_timer
            .and_then(|h| w.scheduler.remaining(h))
            .map(|d| d.as_secs_f32().ceil() as u64)
            .unwrap_or(0);
        let lines = [
            "╔══════════════════════════════╗".to_string(),
            "║      ★  V I C T O R Y  ★     ║".to_string(),
            "╠══════════════════════════════╣".to_string(),
            format!("║  {:^26}  ║", format!("{} labyrinths cleared", w.lab_count())),
            format!("║  {:^26}  ║", format!("restarting in {}s", remaining)),
            "╚══════════════════════════════╝".to_string(),
        ];
        let box_w = lines[0].chars().count();
        let x0 = self.term_w.saturating_sub(box_w) / 2;
        let y0 = self.term_h.saturating_sub(lines.len()) / 2;
        let bg = Color::Rgb { r: 30, g: 25, b: 5 };
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x0, y0 + i, line, GOLD, bg);
        }
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let blink = (w.tick / 8) % 2 == 0;
        let zoom = w.zoom.max(1) as usize;

        let view_cols = w.camera.view_w * CELL_W * zoom;
        let view_rows = w.camera.view_h * zoom;
        let box_w = 28_usize;
        let box_h = 9_usize;
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + view_rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::Reset, dim));
            }
        }

        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        let label = if blink { "║  ▶  PAUSED  ◀  ║" } else { "║     PAUSED     ║" };
        self.front.put_str(box_x + 5, box_y, "╔════════════════╗", GOLD, dim);
        self.front.put_str(box_x + 5, box_y + 1, label, GOLD, dim);
        self.front.put_str(box_x + 5, box_y + 2, "╚════════════════╝", GOLD, dim);
        self.front.put_str(box_x + 2, box_y + 4, "F1 / P   Resume", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 5, "R        Restart", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 6, "Esc / Q  Quit", key_c, dim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::config::GameConfig;
    use crate::domain::tilemap::fixtures;
    use crate::sim::level;

    fn renderer(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new();
        r.resize(w, h);
        r
    }

    fn world() -> WorldState {
        let map = fixtures::map(
            8, 6, &[(0, 0)],
            vec![fixtures::spawn("A", 40.0, 40.0)],
            vec![fixtures::item(88.0, 40.0, Some(1))],
        );
        level::create(Rc::new(map), &GameConfig::default())
    }

    #[test]
    fn camera_is_sized_from_terminal_and_zoom() {
        let mut r = renderer(40, 20);
        let mut w = world();
        r.compose(&mut w);
        assert_eq!((w.camera.view_w, w.camera.view_h), (8, 6));

        w.zoom = 2;
        r.compose(&mut w);
        assert_eq!((w.camera.view_w, w.camera.view_h), (8, 6));
        w.zoom = 3;
        r.compose(&mut w);
        assert_eq!((w.camera.view_w, w.camera.view_h), (6, 4));
    }

    #[test]
    fn hud_shows_labyrinth_and_items() {
        let mut r = renderer(60, 20);
        let mut w = world();
        r.compose(&mut w);
        let hud = r.front.row_text(HUD_ROW);
        assert!(hud.contains("Labyrinth 1/1"), "{hud}");
        assert!(hud.contains("Items 0/1"), "{hud}");
    }

    #[test]
    fn hud_counts_at_least_one_labyrinth_without_spawns() {
        let map = fixtures::map(8, 6, &[], vec![], vec![fixtures::item(40.0, 40.0, None)]);
        let mut w = level::create(Rc::new(map), &GameConfig::default());
        let mut r = renderer(40, 20);
        r.compose(&mut w);
        let hud = r.front.row_text(HUD_ROW);
        assert!(hud.contains("Labyrinth 1/1"), "{hud}");
    }

    #[test]
    fn keyboard_enhancement_starts_off() {
        let r = Renderer::new();
        assert!(!r.keyboard_enhanced());
    }

    #[test]
    fn solid_barrier_and_entities_are_drawn() {
        let mut r = renderer(60, 20);
        let mut w = world();
        r.compose(&mut w);
        // Map fits the viewport exactly, so tile (x, y) starts at (2x, MAP_ROW + y)
        assert_eq!((w.camera.x, w.camera.y), (0, 0));
        assert_eq!(r.front.get(0, MAP_ROW).as_str(), "█");
        let text = r.front.row_text(MAP_ROW + 2);
        assert!(text.contains('\u{1F9D1}'), "{text}");
        assert!(text.contains('\u{1F48E}'), "{text}");
    }

    #[test]
    fn victory_banner_is_centered_on_screen() {
        let mut r = renderer(80, 30);
        let mut w = world();
        let mut events = vec![];
        level::next_labyrinth(&mut w, &mut events);
        r.compose(&mut w);
        let mid = r.front.row_text(30 / 2 - 3 + 1);
        assert!(mid.contains("V I C T O R Y"), "{mid}");
        let below = r.front.row_text(30 / 2 - 3 + 4);
        assert!(below.contains("restarting in 10s"), "{below}");
    }

    #[test]
    fn wide_glyph_at_right_edge_is_dropped() {
        let mut fb = FrameBuffer::new(3, 1);
        fb.set_wide(2, 0, '\u{1F48E}', Color::Reset);
        assert_eq!(fb.get(2, 0), Cell::BLANK);
        fb.set_wide(1, 0, '\u{1F48E}', Color::Reset);
        assert!(fb.get(1, 0).wide);
        assert!(fb.get(2, 0).cont);
    }
}
