/// Arcade-style physics: boxes, velocity integration, tile collision.
///
/// ## Model
///
/// Every body is an axis-aligned box stored by its CENTER and half extents,
/// in map pixels. Integration is explicit Euler per tick, one axis at a time:
///
///   1. x += vx·dt, then resolve against solid tiles and world bounds
///   2. y += vy·dt, then resolve the same way
///
/// Resolving an axis snaps the box flush against the blocking edge and
/// reflects that velocity component scaled by `bounce`. Because axes are
/// resolved separately, sliding along a wall while moving diagonally works.
///
/// Overlap between two boxes is strict (touching edges do not overlap).

use super::tile::CollisionGrid;

/// Player box relative to one tile.
pub const PLAYER_BODY_SCALE: f32 = 0.75;
/// Item box relative to one tile.
pub const ITEM_BODY_SCALE: f32 = 0.5;

/// Pixel gap kept when snapping to an edge so the box does not register
/// as overlapping the tile it was pushed out of.
const SKIN: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn centered(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Aabb { min_x: x - half_w, min_y: y - half_h, max_x: x + half_w, max_y: y + half_h }
    }

    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x
            && self.min_y < other.max_y && other.min_y < self.max_y
    }
}

/// Rectangle the body may not leave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Body {
    pub fn new(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Body { x, y, half_w, half_h, vx: 0.0, vy: 0.0 }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::centered(self.x, self.y, self.half_w, self.half_h)
    }
}

#[derive(Clone, Copy, Debug)]
enum Axis {
    X,
    Y,
}

/// Advance `body` by `dt` seconds, colliding with solid tiles and bounds.
pub fn integrate(body: &mut Body, dt: f32, grid: &CollisionGrid, bounds: WorldBounds, bounce: f32) {
    if body.vx != 0.0 {
        body.x += body.vx * dt;
        resolve_axis(body, Axis::X, grid, bounds, bounce);
    }
    if body.vy != 0.0 {
        body.y += body.vy * dt;
        resolve_axis(body, Axis::Y, grid, bounds, bounce);
    }
}

fn resolve_axis(body: &mut Body, axis: Axis, grid: &CollisionGrid, bounds: WorldBounds, bounce: f32) {
    let (vel, half, limit) = match axis {
        Axis::X => (body.vx, body.half_w, bounds.width),
        Axis::Y => (body.vy, body.half_h, bounds.height),
    };

    let mut pos = match axis { Axis::X => body.x, Axis::Y => body.y };
    let mut hit = false;

    // Tiles first: the leading edge must not be inside a solid cell
    if let Some(edge) = blocking_edge(body, axis, vel, grid) {
        pos = if vel > 0.0 { edge - half - SKIN } else { edge + half + SKIN };
        hit = true;
    }

    // World bounds
    if pos - half < 0.0 {
        pos = half;
        hit = true;
    } else if pos + half > limit {
        pos = limit - half;
        hit = true;
    }

    match axis {
        Axis::X => {
            body.x = pos;
            if hit { body.vx = -vel * bounce; }
        }
        Axis::Y => {
            body.y = pos;
            if hit { body.vy = -vel * bounce; }
        }
    }
}

/// Nearest tile edge blocking motion along `axis`, if the box currently
/// overlaps any solid cell. Returns the left/top edge of the first solid
/// column/row when moving positively, the right/bottom edge otherwise.
fn blocking_edge(body: &Body, axis: Axis, vel: f32, grid: &CollisionGrid) -> Option<f32> {
    if grid.tile_w <= 0.0 || grid.tile_h <= 0.0 { return None; }
    let b = body.aabb();
    let x0 = (b.min_x / grid.tile_w).floor() as i64;
    let x1 = ((b.max_x - SKIN) / grid.tile_w).floor() as i64;
    let y0 = (b.min_y / grid.tile_h).floor() as i64;
    let y1 = ((b.max_y - SKIN) / grid.tile_h).floor() as i64;

    let mut edge: Option<f32> = None;
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            if !grid.is_solid(tx, ty) { continue; }
            let candidate = match (axis, vel > 0.0) {
                (Axis::X, true) => tx as f32 * grid.tile_w,
                (Axis::X, false) => (tx + 1) as f32 * grid.tile_w,
                (Axis::Y, true) => ty as f32 * grid.tile_h,
                (Axis::Y, false) => (ty + 1) as f32 * grid.tile_h,
            };
            edge = Some(match edge {
                None => candidate,
                Some(e) if vel > 0.0 => e.min(candidate),
                Some(e) => e.max(candidate),
            });
        }
    }
    edge
}
