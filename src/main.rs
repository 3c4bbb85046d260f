/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use config::{GameConfig, GeneralConfig};
use sim::event::GameEvent;
use sim::level;
use sim::step;
use sim::world::WorldState;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Totals for the goodbye line.
#[derive(Default)]
struct RunStats {
    items: usize,
    labyrinths: usize,
    victories: usize,
}

fn main() {
    let config = GameConfig::load();
    init_logging(&config.general);
    for w in &config.load_warnings {
        warn!("config: {}", w);
    }

    let map = Rc::new(level::load_map(&config.map));
    let mut world = level::create(map, &config);
    info!(
        "starting: {} labyrinths, {} items in the first",
        world.lab_count(), world.items_total,
    );

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        error!("terminal init failed: {e}");
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let mut stats = RunStats::default();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config, &mut stats);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Labyrinths!");
    println!(
        "Items collected: {}  Labyrinths cleared: {}  Victories: {}",
        stats.items, stats.labyrinths, stats.victories,
    );
}

/// Logs go to a file: stderr would scribble over the alternate screen.
/// `RUST_LOG` overrides the configured level.
fn init_logging(general: &GeneralConfig) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(general.log_level.as_str()),
    );
    match File::create(&general.log_file) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            // Stderr is not an option under raw mode: discard instead
            eprintln!("cannot open log file {}: {e}", general.log_file);
            builder.target(env_logger::Target::Pipe(Box::new(std::io::sink())));
        }
    }
    builder.init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    stats: &mut RunStats,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    if kb.honor_release {
        info!("terminal reports key releases");
    }
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad detected");
    }
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    // Edge-triggered restart must survive until the next tick
    let mut pending_restart = false;

    loop {
        kb.drain_events();
        gp.update();

        if handle_meta(world, &kb, &gp) {
            break;
        }

        let mut input = kb.frame_input();
        gp.merge_into(&mut input);
        pending_restart |= input.restart;

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().min(tick_rate * 4);
            last_tick = Instant::now();

            if world.paused && !pending_restart {
                world.tick = world.tick.wrapping_add(1);
            } else {
                world.paused = false;
                input.restart = std::mem::take(&mut pending_restart);
                let events = step::update(world, input, dt);
                process_events(sound, &events, stats);
            }
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_events(sound: Option<&SoundEngine>, events: &[GameEvent], stats: &mut RunStats) {
    for event in events {
        match event {
            GameEvent::ItemCollected { .. } => stats.items += 1,
            GameEvent::LabyrinthCleared { lab } => {
                info!("labyrinth {} cleared", lab);
                stats.labyrinths += 1;
            }
            GameEvent::Victory => stats.victories += 1,
            GameEvent::LabyrinthEntered { .. } | GameEvent::SceneReset => {}
        }
        if let Some(sfx) = sound {
            sfx.play_event(event);
        }
    }
}

/// Quit and pause keys. Returns true when the player wants out.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState) -> bool {
    if kb.quit_pressed() || gp.quit_pressed() {
        info!("quit requested");
        return true;
    }
    if kb.pause_pressed() || gp.pause_pressed() {
        world.paused = !world.paused;
        info!("{}", if world.paused { "paused" } else { "resumed" });
    }
    false
}
