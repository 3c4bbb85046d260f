/// Level controller: map loading plus the scene lifecycle.
///
/// ## Sources (priority order):
///   1. `map.path` from config (resolved against the search dirs)
///   2. Built-in embedded map (`assets/labyrinths.json`)
///
/// ## Map contract (Tiled JSON):
///   - tile layer `Suelo`      ground, drawn only
///   - tile layer `Barreras`   walls; a cell blocks when its tile has the
///                             boolean `collision` property set to true
///   - object layer `Spawns`   one named point per labyrinth, played in
///                             name order
///   - object layer `Items`    collectibles, optionally tagged `lab = N`
///
/// All names are configurable (`[map]` in config.toml).
///
/// ## Lifecycle
///
///   create ──► load items (lab 1) ──► ... all collected ──► next_labyrinth
///                                                            │
///        ┌─────────── more spawns: teleport + load items ◄───┤
///        │                                                   │
///        └─► victory banner + reset in victory_delay_ms ◄────┘ (last one)
///
/// `restart_scene` rebuilds everything from the map, keeping only what the
/// host owns (scheduler, camera viewport size, pause/tick counters).

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};

use crate::config::{GameConfig, MapConfig, SpeedConfig};
use crate::domain::entity::{Item, Player};
use crate::domain::physics::{Body, WorldBounds, ITEM_BODY_SCALE, PLAYER_BODY_SCALE};
use crate::domain::rules;
use crate::domain::tile::{CollisionGrid, TileGrid};
use crate::domain::tilemap::TiledMap;
use crate::sim::event::GameEvent;
use crate::sim::timer::{DeferredAction, Scheduler};
use crate::sim::world::{Camera, WorldState};

const EMBEDDED_MAP: &str = include_str!("../../assets/labyrinths.json");

// ══════════════════════════════════════════════════════════════
// Map loading
// ══════════════════════════════════════════════════════════════

/// Load the configured map, falling back to the embedded one.
pub fn load_map(config: &MapConfig) -> TiledMap {
    let map = match read_map_file(&config.path) {
        Ok(map) => {
            info!("loaded map {}", config.path.display());
            map
        }
        Err(e) => {
            warn!("{:#}; using the built-in map", e);
            embedded_map()
        }
    };
    let names: Vec<&str> = map.tilesets.iter().map(|ts| ts.name.as_str()).collect();
    debug!("tilesets: {}", names.join(", "));
    for source in map.external_tilesets() {
        warn!("external tileset {} not inspected; its tiles never collide", source);
    }
    map
}

/// Read and parse one Tiled JSON file.
pub fn read_map_file(path: &Path) -> anyhow::Result<TiledMap> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read map {}", path.display()))?;
    TiledMap::from_json_str(&text)
        .with_context(|| format!("cannot parse map {}", path.display()))
}

/// The map compiled into the binary. An unparsable copy degrades to an
/// empty map rather than aborting.
pub fn embedded_map() -> TiledMap {
    TiledMap::from_json_str(EMBEDDED_MAP).unwrap_or_else(|e| {
        warn!("built-in map is invalid: {}", e);
        TiledMap::default()
    })
}

// ══════════════════════════════════════════════════════════════
// Scene lifecycle
// ══════════════════════════════════════════════════════════════

/// Build a fresh scene: labyrinth 1, its items loaded, game not over.
pub fn create(map: Rc<TiledMap>, config: &GameConfig) -> WorldState {
    build(map, config.speed.clone(), config.map.clone(), config.camera.zoom)
}

fn build(map: Rc<TiledMap>, speed: SpeedConfig, map_config: MapConfig, zoom: u16) -> WorldState {
    let ground = TileGrid::from_layer(&map, &map_config.ground_layer);
    let barriers = TileGrid::from_layer(&map, &map_config.barrier_layer);
    let collision = CollisionGrid::from_barriers(&map, &barriers, &map_config.collision_property);
    let bounds = WorldBounds { width: map.width_px(), height: map.height_px() };

    let spawns = rules::sorted_spawns(map.objects(&map_config.spawn_layer));
    let (start_x, start_y) = spawns.first()
        .map(|s| (s.x, s.y))
        .unwrap_or((bounds.width / 2.0, bounds.height / 2.0));

    let half_w = map.tile_width as f32 * PLAYER_BODY_SCALE / 2.0;
    let half_h = map.tile_height as f32 * PLAYER_BODY_SCALE / 2.0;
    let player = Player::new(Body::new(start_x, start_y, half_w, half_h));

    debug!(
        "scene: {} labyrinths, {} ground / {} barrier tiles ({} solid), {}x{} px",
        spawns.len(), ground.drawn_count(), barriers.drawn_count(),
        collision.solid_count(), bounds.width, bounds.height,
    );
    if spawns.is_empty() {
        warn!("map has no spawn points in layer {:?}", map_config.spawn_layer);
    }

    let mut world = WorldState {
        map,
        ground,
        barriers,
        collision,
        bounds,
        speed,
        map_config,
        zoom,
        spawns,
        current_index: 0,
        items: vec![],
        items_total: 0,
        items_collected: 0,
        game_over: false,
        victory_visible: false,
        victory_timer: None,
        player,
        camera: Camera::new(),
        scheduler: Scheduler::new(),
        paused: false,
        tick: 0,
        message: String::new(),
        message_timer: 0,
    };

    load_items_for_current_lab(&mut world);
    world.center_camera();
    let banner = format!("Labyrinth {}/{}", world.lab_number(), world.lab_count().max(1));
    world.set_message(&banner, 60);
    world
}

/// Replace the item set with the current labyrinth's items.
pub fn load_items_for_current_lab(world: &mut WorldState) {
    world.items.clear();

    let lab_number = world.lab_number();
    let objects = world.map.objects(&world.map_config.item_layer);
    let items: Vec<Item> = rules::items_for_lab(objects, &world.map_config.lab_property, lab_number)
        .into_iter()
        .map(|o| Item::new(o.x, o.y))
        .collect();

    world.items_total = items.len();
    world.items_collected = 0;
    world.items = items;
    debug!("labyrinth {}: {} items", lab_number, world.items_total);
}

/// Move on after the current labyrinth is cleared.
pub fn next_labyrinth(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.game_over { return; }

    world.current_index += 1;

    if world.current_index >= world.spawns.len() {
        world.victory_visible = true;
        world.game_over = true;
        let delay = Duration::from_millis(world.speed.victory_delay_ms);
        world.victory_timer = Some(world.scheduler.schedule(delay, DeferredAction::ResetScene));
        world.player.stop();
        info!("all labyrinths cleared; resetting in {:?}", delay);
        events.push(GameEvent::Victory);
        return;
    }

    let spawn = &world.spawns[world.current_index];
    let (x, y) = (spawn.x, spawn.y);
    world.player.place_at(x, y);
    world.center_camera();
    load_items_for_current_lab(world);

    let lab = world.lab_number();
    info!("entering labyrinth {}/{}", lab, world.lab_count());
    let banner = format!("Labyrinth {}/{}", lab, world.lab_count());
    world.set_message(&banner, 60);
    events.push(GameEvent::LabyrinthEntered { lab });
}

/// Rebuild the scene from the same map. The victory reset is cancelled by
/// handle, any other pending call is dropped, and the generation retired.
pub fn restart_scene(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let mut scheduler = std::mem::take(&mut world.scheduler);
    if let Some(handle) = world.victory_timer.take() {
        if scheduler.cancel(handle) {
            debug!("victory reset cancelled");
        }
    }
    scheduler.cancel_all();
    let generation = scheduler.next_generation();

    let mut fresh = build(
        Rc::clone(&world.map),
        world.speed.clone(),
        world.map_config.clone(),
        world.zoom,
    );
    fresh.scheduler = scheduler;
    fresh.camera.view_w = world.camera.view_w;
    fresh.camera.view_h = world.camera.view_h;
    fresh.center_camera();
    fresh.paused = world.paused;
    fresh.tick = world.tick;

    *world = fresh;
    info!("scene reset (generation {})", generation);
    events.push(GameEvent::SceneReset);
}

/// Half extents of an item's pickup box.
pub fn item_half_extents(map: &TiledMap) -> (f32, f32) {
    (
        map.tile_width as f32 * ITEM_BODY_SCALE / 2.0,
        map.tile_height as f32 * ITEM_BODY_SCALE / 2.0,
    )
}
