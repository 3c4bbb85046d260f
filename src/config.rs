/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems found while loading are kept in `load_warnings` so they can
/// be logged once the logger is up.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub camera: CameraConfig,
    pub map: MapConfig,
    pub gamepad: GamepadConfig,
    pub general: GeneralConfig,
    pub load_warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub player_speed: f32,     // px per second on each axis
    pub bounce: f32,           // velocity kept (reversed) after hitting a wall
    pub victory_delay_ms: u64, // victory banner → scene reset
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub zoom: u16,
}

/// Names the controller looks up inside the Tiled map.
#[derive(Clone, Debug, PartialEq)]
pub struct MapConfig {
    pub path: PathBuf,
    pub ground_layer: String,
    pub barrier_layer: String,
    pub spawn_layer: String,
    pub item_layer: String,
    pub collision_property: String,
    pub lab_property: String,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub restart: Vec<String>,
    pub pause: Vec<String>,
    pub quit: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub log_file: String,
    pub log_level: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    camera: TomlCamera,
    #[serde(default)]
    map: TomlMap,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_bounce")]
    bounce: f32,
    #[serde(default = "default_victory_delay")]
    victory_delay_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlCamera {
    #[serde(default = "default_zoom")]
    zoom: u16,
}

#[derive(Deserialize, Debug)]
struct TomlMap {
    #[serde(default = "default_map_path")]
    path: String,
    #[serde(default = "default_ground_layer")]
    ground_layer: String,
    #[serde(default = "default_barrier_layer")]
    barrier_layer: String,
    #[serde(default = "default_spawn_layer")]
    spawn_layer: String,
    #[serde(default = "default_item_layer")]
    item_layer: String,
    #[serde(default = "default_collision_property")]
    collision_property: String,
    #[serde(default = "default_lab_property")]
    lab_property: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_restart")]
    restart: Vec<String>,
    #[serde(default = "default_pad_pause")]
    pause: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 33 }
fn default_player_speed() -> f32 { 80.0 }
fn default_bounce() -> f32 { 0.1 }
fn default_victory_delay() -> u64 { 10_000 }
fn default_zoom() -> u16 { 1 }

fn default_map_path() -> String { "assets/labyrinths.json".into() }
fn default_ground_layer() -> String { "Suelo".into() }
fn default_barrier_layer() -> String { "Barreras".into() }
fn default_spawn_layer() -> String { "Spawns".into() }
fn default_item_layer() -> String { "Items".into() }
fn default_collision_property() -> String { "collision".into() }
fn default_lab_property() -> String { "lab".into() }

fn default_pad_restart() -> Vec<String> { vec!["Y".into()] }
fn default_pad_pause() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

fn default_log_file() -> String { "labyrinths.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            player_speed: default_player_speed(),
            bounce: default_bounce(),
            victory_delay_ms: default_victory_delay(),
        }
    }
}

impl Default for TomlCamera {
    fn default() -> Self {
        TomlCamera { zoom: default_zoom() }
    }
}

impl Default for TomlMap {
    fn default() -> Self {
        TomlMap {
            path: default_map_path(),
            ground_layer: default_ground_layer(),
            barrier_layer: default_barrier_layer(),
            spawn_layer: default_spawn_layer(),
            item_layer: default_item_layer(),
            collision_property: default_collision_property(),
            lab_property: default_lab_property(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            restart: default_pad_restart(),
            pause: default_pad_pause(),
            quit: default_pad_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        TomlSpeed::default().into()
    }
}

impl From<TomlSpeed> for SpeedConfig {
    fn from(s: TomlSpeed) -> Self {
        SpeedConfig {
            tick_rate_ms: s.tick_rate_ms.max(1),
            player_speed: s.player_speed,
            bounce: s.bounce.clamp(0.0, 1.0),
            victory_delay_ms: s.victory_delay_ms,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        let m = TomlMap::default();
        MapConfig {
            path: PathBuf::from(m.path),
            ground_layer: m.ground_layer,
            barrier_layer: m.barrier_layer,
            spawn_layer: m.spawn_layer,
            item_layer: m.item_layer,
            collision_property: m.collision_property,
            lab_property: m.lab_property,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        Self::from_toml(toml_cfg, &search_dirs, warnings)
    }

    /// Parse a config from TOML text without touching the filesystem.
    pub fn from_toml_str(text: &str) -> Self {
        let mut warnings = vec![];
        let toml_cfg = parse_toml(text, &mut warnings);
        Self::from_toml(toml_cfg, &[], warnings)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf], load_warnings: Vec<String>) -> Self {
        // Resolve the map file against the search dirs; keep as-is when absolute or not found
        let map_path_str = &toml_cfg.map.path;
        let map_path = if PathBuf::from(map_path_str).is_absolute() {
            PathBuf::from(map_path_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(map_path_str))
                .find(|p| p.is_file())
                .unwrap_or_else(|| PathBuf::from(map_path_str))
        };

        GameConfig {
            speed: toml_cfg.speed.into(),
            camera: CameraConfig {
                zoom: toml_cfg.camera.zoom.clamp(1, 8),
            },
            map: MapConfig {
                path: map_path,
                ground_layer: toml_cfg.map.ground_layer,
                barrier_layer: toml_cfg.map.barrier_layer,
                spawn_layer: toml_cfg.map.spawn_layer,
                item_layer: toml_cfg.map.item_layer,
                collision_property: toml_cfg.map.collision_property,
                lab_property: toml_cfg.map.lab_property,
            },
            gamepad: GamepadConfig {
                restart: toml_cfg.gamepad.restart,
                pause: toml_cfg.gamepad.pause,
                quit: toml_cfg.gamepad.quit,
            },
            general: GeneralConfig {
                log_file: toml_cfg.general.log_file,
                log_level: toml_cfg.general.log_level,
            },
            load_warnings,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[], vec![])
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/labyrinths)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/labyrinths");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/labyrinths");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text, warnings),
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("config.toml parse error, using defaults: {e}"));
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = GameConfig::from_toml_str("");
        assert_eq!(cfg.speed, SpeedConfig::default());
        assert_eq!(cfg.speed.player_speed, 80.0);
        assert_eq!(cfg.speed.victory_delay_ms, 10_000);
        assert_eq!(cfg.map, MapConfig::default());
        assert_eq!(cfg.map.spawn_layer, "Spawns");
        assert_eq!(cfg.camera.zoom, 1);
        assert!(cfg.load_warnings.is_empty());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[speed]\nplayer_speed = 120.0\n\n[map]\nitem_layer = \"Pickups\"\n",
        );
        assert_eq!(cfg.speed.player_speed, 120.0);
        assert_eq!(cfg.speed.tick_rate_ms, 33);
        assert_eq!(cfg.map.item_layer, "Pickups");
        assert_eq!(cfg.map.barrier_layer, "Barreras");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = GameConfig::from_toml_str("[speed]\nbounce = 3.0\ntick_rate_ms = 0\n[camera]\nzoom = 0\n");
        assert_eq!(cfg.speed.bounce, 1.0);
        assert_eq!(cfg.speed.tick_rate_ms, 1);
        assert_eq!(cfg.camera.zoom, 1);
    }

    #[test]
    fn parse_error_is_reported_and_defaults_used() {
        let cfg = GameConfig::from_toml_str("[speed\nplayer_speed = ");
        assert_eq!(cfg.load_warnings.len(), 1);
        assert_eq!(cfg.speed, SpeedConfig::default());
    }
}
