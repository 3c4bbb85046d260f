/// Tiled map model (JSON export).
///
/// Only the subset the level controller needs is modelled:
///   - `tilelayer` with uncompressed `data` arrays
///   - `objectgroup` with point/rect objects and custom properties
///   - embedded tilesets with per-tile custom properties
///
/// Anything else (group layers, image layers, external `.tsx` tilesets,
/// base64 data) deserializes into a placeholder and reads as empty.
/// Lookups never fail: a missing layer is an empty slice.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Tiled stores flip flags in the top three bits of each gid.
const GID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TiledMap {
    pub width: usize,
    pub height: usize,
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    #[serde(rename = "tilelayer")]
    Tiles(TileLayer),
    #[serde(rename = "objectgroup")]
    Objects(ObjectLayer),
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TileLayer {
    pub name: String,
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub height: usize,
    /// Missing when the layer is base64 encoded or chunked (infinite maps).
    #[serde(default)]
    pub data: Option<Vec<u32>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ObjectLayer {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MapObject {
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Tileset {
    #[serde(rename = "firstgid")]
    pub first_gid: u32,
    #[serde(default)]
    pub name: String,
    /// Set for external tilesets, whose tiles we cannot see.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tiles: Vec<TileDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TileDef {
    pub id: u32,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// Strip Tiled's flip flags from a raw gid.
#[inline]
pub fn clean_gid(raw: u32) -> u32 {
    raw & GID_MASK
}

impl MapObject {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

impl TiledMap {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn width_px(&self) -> f32 {
        (self.width as u32 * self.tile_width) as f32
    }

    pub fn height_px(&self) -> f32 {
        (self.height as u32 * self.tile_height) as f32
    }

    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Tiles(t) if t.name == name => Some(t),
            _ => None,
        })
    }

    /// Objects of the named object layer, or an empty slice if absent.
    pub fn objects(&self, layer: &str) -> &[MapObject] {
        self.layers.iter()
            .find_map(|l| match l {
                Layer::Objects(o) if o.name == layer => Some(o.objects.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Index into `tilesets` of the tileset owning `gid` (largest firstgid ≤ gid).
    pub fn tileset_index(&self, gid: u32) -> Option<usize> {
        let gid = clean_gid(gid);
        if gid == 0 { return None; }
        self.tilesets.iter()
            .enumerate()
            .filter(|(_, ts)| ts.first_gid <= gid)
            .max_by_key(|(_, ts)| ts.first_gid)
            .map(|(i, _)| i)
    }

    /// Global ids of every tile whose boolean property `property` is true.
    pub fn gids_with_flag(&self, property: &str) -> HashMap<u32, bool> {
        let mut out = HashMap::new();
        for ts in &self.tilesets {
            for tile in &ts.tiles {
                let flag = tile.properties.iter()
                    .find(|p| p.name == property)
                    .and_then(|p| p.value.as_bool());
                if let Some(flag) = flag {
                    out.insert(ts.first_gid + tile.id, flag);
                }
            }
        }
        out
    }

    /// Tilesets we could not inspect (external `.tsx` references).
    pub fn external_tilesets(&self) -> impl Iterator<Item = &str> {
        self.tilesets.iter().filter_map(|ts| ts.source.as_deref())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    use super::TiledMap;

    pub fn spawn(name: &str, x: f32, y: f32) -> Value {
        json!({ "name": name, "x": x, "y": y })
    }

    pub fn item(x: f32, y: f32, lab: Option<i64>) -> Value {
        match lab {
            Some(lab) => json!({
                "name": "", "x": x, "y": y,
                "properties": [{ "name": "lab", "type": "int", "value": lab }]
            }),
            None => json!({ "name": "", "x": x, "y": y }),
        }
    }

    /// An open `w`×`h` map of 16px tiles. `walls` lists barrier cells
    /// (gid 2 = collidable); gid 1 is plain ground everywhere.
    pub fn map(w: usize, h: usize, walls: &[(usize, usize)], spawns: Vec<Value>, items: Vec<Value>) -> TiledMap {
        let ground = vec![1u32; w * h];
        let mut barriers = vec![0u32; w * h];
        for &(x, y) in walls {
            barriers[y * w + x] = 2;
        }
        let value = json!({
            "width": w, "height": h, "tilewidth": 16, "tileheight": 16,
            "layers": [
                { "type": "tilelayer", "name": "Suelo", "width": w, "height": h, "data": ground },
                { "type": "tilelayer", "name": "Barreras", "width": w, "height": h, "data": barriers },
                { "type": "objectgroup", "name": "Spawns", "objects": spawns },
                { "type": "objectgroup", "name": "Items", "objects": items }
            ],
            "tilesets": [{
                "firstgid": 1, "name": "Bosque",
                "tiles": [{ "id": 1, "properties": [{ "name": "collision", "type": "bool", "value": true }] }]
            }]
        });
        serde_json::from_value(value).expect("fixture map")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_layers_and_ignores_unknown_kinds() {
        let text = json!({
            "width": 2, "height": 1, "tilewidth": 8, "tileheight": 8,
            "orientation": "orthogonal",
            "layers": [
                { "type": "tilelayer", "name": "Suelo", "width": 2, "height": 1, "data": [1, 1] },
                { "type": "imagelayer", "name": "Sky", "image": "sky.png" },
                { "type": "objectgroup", "name": "Spawns", "objects": [{ "name": "A", "x": 4, "y": 4, "id": 7 }] }
            ],
            "tilesets": []
        }).to_string();
        let map = TiledMap::from_json_str(&text).unwrap();
        assert_eq!(map.layers.len(), 3);
        assert!(matches!(map.layers[1], Layer::Unsupported));
        assert_eq!(map.objects("Spawns").len(), 1);
        assert_eq!(map.width_px(), 16.0);
        assert_eq!(map.tile_layer("Suelo").and_then(|l| l.data.as_ref()).map(|d| d.len()), Some(2));
    }

    #[test]
    fn missing_object_layer_is_empty() {
        let map = fixtures::map(2, 2, &[], vec![], vec![]);
        assert!(map.objects("Nope").is_empty());
        assert!(map.tile_layer("Nope").is_none());
    }

    #[test]
    fn tileset_lookup_uses_highest_firstgid() {
        let map: TiledMap = serde_json::from_value(json!({
            "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
            "tilesets": [
                { "firstgid": 1, "name": "Bosque" },
                { "firstgid": 65, "name": "Hielo" }
            ]
        })).unwrap();
        assert_eq!(map.tileset_index(0), None);
        assert_eq!(map.tileset_index(64), Some(0));
        assert_eq!(map.tileset_index(65), Some(1));
        // Horizontal flip flag set
        assert_eq!(map.tileset_index(0x8000_0000 | 70), Some(1));
    }

    #[test]
    fn collision_flags_map_to_global_ids() {
        let map = fixtures::map(1, 1, &[], vec![], vec![]);
        let flags = map.gids_with_flag("collision");
        assert_eq!(flags.get(&2), Some(&true));
        assert_eq!(flags.get(&1), None);
    }

    #[test]
    fn object_property_lookup() {
        let obj: MapObject = serde_json::from_value(fixtures::item(1.0, 2.0, Some(3))).unwrap();
        assert_eq!(obj.property("lab").and_then(|v| v.as_i64()), Some(3));
        assert!(obj.property("other").is_none());
    }
}
