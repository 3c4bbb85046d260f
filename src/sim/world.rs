/// WorldState: the complete snapshot of a running scene.
///
/// ## Layers
///
/// The map is shared and never mutated; everything derived from it at load
/// time lives here:
///   - `ground`   : decorative tiles, drawn under everything
///   - `barriers` : wall tiles as drawn
///   - `collision`: which barrier cells actually block (tileset flag)
///
/// Items are rebuilt per labyrinth, so `items` only ever holds the current
/// labyrinth's collectibles.
///
/// ## Camera / Viewport
///
/// World coordinates (pixels) and screen coordinates are separate:
///   - `camera`: viewport into the world in TILE units (top-left + size)
///   - Renderer maps: `screen(sx, sy) = tile(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Maps smaller than the viewport are centered

use std::rc::Rc;

use crate::config::{MapConfig, SpeedConfig};
use crate::domain::entity::{Item, Player, SpawnPoint};
use crate::domain::physics::WorldBounds;
use crate::domain::tile::{CollisionGrid, TileGrid};
use crate::domain::tilemap::TiledMap;
use crate::sim::timer::{Scheduler, TimerHandle};

/// Camera: a viewport into the world.
///
/// `(x, y)` is the tile coordinate of the top-left visible cell.
/// `(view_w, view_h)` is how many tiles fit in the viewport.
/// These are computed from terminal size and zoom during `render()`.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Tile X of the top-left visible cell (can be negative for centering)
    pub x: i32,
    /// Tile Y of the top-left visible cell
    pub y: i32,
    /// Number of tile columns visible
    pub view_w: usize,
    /// Number of tile rows visible
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera::default()
    }

    /// Follow a target tile within the given world size (tiles).
    /// Dead zone: the target moves freely in the inner 60% of the viewport.
    pub fn follow(&mut self, target_x: usize, target_y: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, self.view_w, target_x, world_w);
        self.y = follow_axis(self.y, self.view_h, target_y, world_h);
    }

    /// Snap directly onto a tile (no dead zone). Used on load and teleport.
    pub fn center_on(&mut self, target_x: usize, target_y: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(self.view_w, target_x, world_w);
        self.y = center_axis(self.view_h, target_y, world_h);
    }

    /// Convert a tile coordinate to a viewport coordinate.
    /// Returns None if outside the visible area.
    pub fn world_to_view(&self, wx: usize, wy: usize) -> Option<(usize, usize)> {
        let vx = wx as i32 - self.x;
        let vy = wy as i32 - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

fn follow_axis(pos: i32, view: usize, target: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    let margin = view as i32 / 5;
    let t = target as i32;
    let mut pos = pos;
    if t < pos + margin {
        pos = t - margin;
    } else if t > pos + view as i32 - margin - 1 {
        pos = t - view as i32 + margin + 1;
    }
    pos.clamp(0, world as i32 - view as i32)
}

fn center_axis(view: usize, target: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target as i32 - view as i32 / 2).clamp(0, world as i32 - view as i32)
}

pub struct WorldState {
    // ── Map ──
    pub map: Rc<TiledMap>,
    pub ground: TileGrid,
    pub barriers: TileGrid,
    pub collision: CollisionGrid,
    pub bounds: WorldBounds,

    // ── Config ──
    pub speed: SpeedConfig,
    pub map_config: MapConfig,
    pub zoom: u16,

    // ── Labyrinths ──
    /// Start points in play order. Length = number of labyrinths.
    pub spawns: Vec<SpawnPoint>,
    /// 0-based index into `spawns`. Equals `spawns.len()` after victory.
    pub current_index: usize,

    // ── Items ──
    pub items: Vec<Item>,
    pub items_total: usize,
    pub items_collected: usize,

    // ── Outcome ──
    pub game_over: bool,
    pub victory_visible: bool,
    pub victory_timer: Option<TimerHandle>,

    // ── Entities ──
    pub player: Player,

    // ── Host-owned ──
    pub camera: Camera,
    pub scheduler: Scheduler,
    pub paused: bool,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

impl WorldState {
    /// 1-based number of the labyrinth being played.
    pub fn lab_number(&self) -> usize {
        self.current_index + 1
    }

    pub fn lab_count(&self) -> usize {
        self.spawns.len()
    }

    /// Player center in tile coordinates, clamped to the map.
    pub fn player_tile(&self) -> (usize, usize) {
        self.pixel_to_tile(self.player.body.x, self.player.body.y)
    }

    pub fn pixel_to_tile(&self, x: f32, y: f32) -> (usize, usize) {
        let tw = self.collision.tile_w.max(1.0);
        let th = self.collision.tile_h.max(1.0);
        let tx = (x / tw).floor().max(0.0) as usize;
        let ty = (y / th).floor().max(0.0) as usize;
        (
            tx.min(self.map.width.saturating_sub(1)),
            ty.min(self.map.height.saturating_sub(1)),
        )
    }

    /// Snap the camera onto the player.
    pub fn center_camera(&mut self) {
        let (tx, ty) = self.player_tile();
        let (w, h) = (self.map.width, self.map.height);
        self.camera.center_on(tx, ty, w, h);
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_world_is_centered() {
        let mut cam = Camera { view_w: 20, view_h: 10, ..Camera::new() };
        cam.center_on(3, 3, 10, 6);
        assert_eq!((cam.x, cam.y), (-5, -2));
        assert_eq!(cam.world_to_view(0, 0), Some((5, 2)));
    }

    #[test]
    fn follow_scrolls_only_past_the_dead_zone() {
        let mut cam = Camera { view_w: 10, view_h: 10, ..Camera::new() };
        cam.center_on(0, 0, 100, 100);
        assert_eq!((cam.x, cam.y), (0, 0));
        cam.follow(5, 5, 100, 100);
        assert_eq!((cam.x, cam.y), (0, 0));
        cam.follow(9, 0, 100, 100);
        assert_eq!(cam.x, 2);
        cam.follow(99, 99, 100, 100);
        assert_eq!((cam.x, cam.y), (90, 90));
    }

    #[test]
    fn unsized_camera_does_not_move() {
        let mut cam = Camera::new();
        cam.center_on(50, 50, 100, 100);
        assert_eq!((cam.x, cam.y), (0, 0));
        assert_eq!(cam.world_to_view(0, 0), None);
    }
}
