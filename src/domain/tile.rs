/// Tile grids built from the map's tile layers.
/// Properties are queried via methods, not stored per cell,
/// so tile semantics are centralized here.

use super::tilemap::{clean_gid, TiledMap};

/// What a cell in a tile layer holds.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    /// Drawn tile: global id (flags stripped) and owning tileset index.
    Drawn { gid: u32, tileset: usize },
}

impl Tile {
    pub fn is_empty(self) -> bool {
        matches!(self, Tile::Empty)
    }

    pub fn tileset(self) -> Option<usize> {
        match self {
            Tile::Drawn { tileset, .. } => Some(tileset),
            Tile::Empty => None,
        }
    }
}

/// A rectangular layer of tiles, row-major.
#[derive(Clone, Debug, Default)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Tile>,
}

impl TileGrid {
    /// Build from the named tile layer, always sized like the map. A missing
    /// or undecodable layer yields an all-empty grid.
    pub fn from_layer(map: &TiledMap, layer: &str) -> Self {
        let (width, height) = (map.width, map.height);
        let mut cells = vec![Tile::Empty; width * height];

        let Some(tiles) = map.tile_layer(layer) else {
            return TileGrid { width, height, cells };
        };
        let Some(data) = tiles.data.as_ref() else {
            return TileGrid { width, height, cells };
        };

        // Layer rows may be narrower or wider than the map; clip to the map
        let stride = if tiles.width > 0 { tiles.width } else { width };
        let rows = if tiles.height > 0 { tiles.height.min(height) } else { height };
        for y in 0..rows {
            for x in 0..stride.min(width) {
                let Some(&raw) = data.get(y * stride + x) else { continue };
                let gid = clean_gid(raw);
                if let Some(tileset) = map.tileset_index(gid) {
                    cells[y * width + x] = Tile::Drawn { gid, tileset };
                }
            }
        }

        TileGrid { width, height, cells }
    }

    /// Tile at (x, y); out of bounds reads as empty.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> Tile {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Tile::Empty
        }
    }

    pub fn drawn_count(&self) -> usize {
        self.cells.iter().filter(|t| !t.is_empty()).count()
    }
}

/// Which cells block movement. Derived from the barrier layer plus the
/// tilesets' boolean collision property.
#[derive(Clone, Debug, Default)]
pub struct CollisionGrid {
    pub width: usize,
    pub height: usize,
    pub tile_w: f32,
    pub tile_h: f32,
    solid: Vec<bool>,
}

impl CollisionGrid {
    pub fn from_barriers(map: &TiledMap, barriers: &TileGrid, property: &str) -> Self {
        let flags = map.gids_with_flag(property);
        let mut solid = vec![false; barriers.width * barriers.height];
        for y in 0..barriers.height {
            for x in 0..barriers.width {
                if let Tile::Drawn { gid, .. } = barriers.at(x, y) {
                    solid[y * barriers.width + x] = flags.get(&gid).copied().unwrap_or(false);
                }
            }
        }
        CollisionGrid {
            width: barriers.width,
            height: barriers.height,
            tile_w: map.tile_width as f32,
            tile_h: map.tile_height as f32,
            solid,
        }
    }

    /// Is cell (x, y) solid? Out-of-bounds cells are not; world bounds
    /// are enforced separately.
    #[inline]
    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 { return false; }
        let (x, y) = (x as usize, y as usize);
        x < self.width && y < self.height && self.solid[y * self.width + x]
    }

    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|s| **s).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tilemap::fixtures;

    #[test]
    fn barrier_cells_become_solid() {
        let map = fixtures::map(4, 3, &[(1, 1), (3, 2)], vec![], vec![]);
        let barriers = TileGrid::from_layer(&map, "Barreras");
        let grid = CollisionGrid::from_barriers(&map, &barriers, "collision");
        assert_eq!(barriers.drawn_count(), 2);
        assert_eq!(grid.solid_count(), 2);
        assert!(grid.is_solid(1, 1));
        assert!(grid.is_solid(3, 2));
        assert!(!grid.is_solid(0, 0));
        assert!(!grid.is_solid(-1, 0));
        assert!(!grid.is_solid(4, 0));
    }

    #[test]
    fn tiles_without_the_flag_do_not_collide() {
        let map = fixtures::map(2, 2, &[(0, 0)], vec![], vec![]);
        let barriers = TileGrid::from_layer(&map, "Barreras");
        let grid = CollisionGrid::from_barriers(&map, &barriers, "colision");
        assert_eq!(grid.solid_count(), 0);
    }

    #[test]
    fn missing_layer_is_an_empty_grid() {
        let map = fixtures::map(3, 2, &[], vec![], vec![]);
        let grid = TileGrid::from_layer(&map, "Nope");
        assert_eq!((grid.width, grid.height), (3, 2));
        assert_eq!(grid.drawn_count(), 0);
        assert_eq!(grid.at(9, 9), Tile::Empty);
    }

    #[test]
    fn ground_tiles_record_their_tileset() {
        let map = fixtures::map(2, 1, &[], vec![], vec![]);
        let ground = TileGrid::from_layer(&map, "Suelo");
        assert_eq!(ground.at(1, 0), Tile::Drawn { gid: 1, tileset: 0 });
        assert_eq!(ground.at(1, 0).tileset(), Some(0));
    }
}
