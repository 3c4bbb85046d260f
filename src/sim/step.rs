/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Restart (edge-triggered): rebuilds the scene and ends the tick
///   2. Deferred calls (victory reset)
///   3. Game-over lock
///   4. Velocity from held directions
///   5. Physics integration (X then Y, barriers + world bounds)
///   6. Item collection
///   7. Labyrinth transition
///
/// Collection only accumulates; the transition reads the tally afterwards,
/// so one tick advances at most one labyrinth no matter how many items
/// were picked up together.

use std::time::Duration;

use crate::domain::entity::{Facing, FrameInput};
use crate::domain::physics::{self, Aabb};
use crate::domain::rules;
use super::event::GameEvent;
use super::level;
use super::timer::DeferredAction;
use super::world::WorldState;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn update(world: &mut WorldState, input: FrameInput, dt: Duration) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    if input.restart {
        level::restart_scene(world, &mut events);
        return events;
    }

    if resolve_deferred(world, dt, &mut events) { return events; }

    if world.game_over {
        world.player.stop();
        return events;
    }

    resolve_velocity(world, input);
    resolve_physics(world, dt);
    let picked = resolve_collection(world, &mut events);
    resolve_transition(world, picked, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Steps
// ══════════════════════════════════════════════════════════════

/// Run due deferred calls. Returns true if the scene was replaced.
fn resolve_deferred(world: &mut WorldState, dt: Duration, events: &mut Vec<GameEvent>) -> bool {
    for action in world.scheduler.advance(dt) {
        match action {
            DeferredAction::ResetScene => {
                level::restart_scene(world, events);
                return true;
            }
        }
    }
    false
}

fn resolve_velocity(world: &mut WorldState, input: FrameInput) {
    let (vx, vy) = rules::velocity_for(&input, world.speed.player_speed);
    let p = &mut world.player;
    p.body.vx = vx;
    p.body.vy = vy;
    if vx < 0.0 {
        p.facing = Facing::Left;
    } else if vx > 0.0 {
        p.facing = Facing::Right;
    }
}

fn resolve_physics(world: &mut WorldState, dt: Duration) {
    physics::integrate(
        &mut world.player.body,
        dt.as_secs_f32(),
        &world.collision,
        world.bounds,
        world.speed.bounce,
    );
    let (tx, ty) = world.player_tile();
    let (w, h) = (world.map.width, world.map.height);
    world.camera.follow(tx, ty, w, h);
}

/// Mark, remove and count every live item the player overlaps.
/// Returns how many were picked up this tick.
fn resolve_collection(world: &mut WorldState, events: &mut Vec<GameEvent>) -> usize {
    let player = world.player.body.aabb();
    let (hw, hh) = level::item_half_extents(&world.map);

    let mut picked = 0;
    for item in world.items.iter_mut() {
        if item.collected { continue; }
        if player.overlaps(&Aabb::centered(item.x, item.y, hw, hh)) {
            item.collected = true;
            picked += 1;
            events.push(GameEvent::ItemCollected { x: item.x, y: item.y });
        }
    }
    world.items.retain(|i| !i.collected);
    world.items_collected = (world.items_collected + picked).min(world.items_total);
    picked
}

fn resolve_transition(world: &mut WorldState, picked: usize, events: &mut Vec<GameEvent>) {
    if picked == 0 || world.items_collected != world.items_total { return; }
    events.push(GameEvent::LabyrinthCleared { lab: world.lab_number() });
    level::next_labyrinth(world, events);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::config::GameConfig;
    use crate::domain::tilemap::{fixtures, TiledMap};

    const TICK: Duration = Duration::from_millis(33);

    fn map() -> Rc<TiledMap> {
        // Three labyrinths; lab 1 items sit right on top of spawn A
        Rc::new(fixtures::map(
            20, 20, &[(6, 1)],
            vec![
                fixtures::spawn("A", 24.0, 24.0),
                fixtures::spawn("B", 24.0, 120.0),
                fixtures::spawn("C", 120.0, 120.0),
            ],
            vec![
                fixtures::item(24.0, 24.0, Some(1)),
                fixtures::item(26.0, 24.0, Some(1)),
                fixtures::item(200.0, 120.0, Some(2)),
                fixtures::item(120.0, 120.0, Some(3)),
            ],
        ))
    }

    fn scene() -> WorldState {
        level::create(map(), &GameConfig::default())
    }

    fn held(f: impl FnOnce(&mut FrameInput)) -> FrameInput {
        let mut input = FrameInput::default();
        f(&mut input);
        input
    }

    #[test]
    fn held_direction_moves_player() {
        let mut world = scene();
        // Step away from lab 1's items first so nothing is collected
        world.items.clear();
        update(&mut world, held(|i| i.down = true), Duration::from_millis(100));
        assert_eq!(world.player.body.vy, 80.0);
        assert!((world.player.body.y - 32.0).abs() < 1e-3);
        assert_eq!(world.player.body.x, 24.0);
    }

    #[test]
    fn releasing_keys_stops_player() {
        let mut world = scene();
        world.items.clear();
        update(&mut world, held(|i| i.left = true), TICK);
        assert_eq!(world.player.facing, Facing::Left);
        update(&mut world, FrameInput::default(), TICK);
        assert_eq!((world.player.body.vx, world.player.body.vy), (0.0, 0.0));
    }

    #[test]
    fn walls_block_movement() {
        let mut world = scene();
        world.items.clear();
        // Barrier at tile (6, 1) = pixels 96..112
        for _ in 0..60 {
            update(&mut world, held(|i| i.right = true), TICK);
        }
        let b = world.player.body;
        assert!(b.x + b.half_w <= 96.0);
    }

    #[test]
    fn overlapping_items_are_collected_in_one_tick() {
        let mut world = scene();
        assert_eq!(world.items_total, 2);
        let events = update(&mut world, FrameInput::default(), TICK);

        let picked = events.iter()
            .filter(|e| matches!(e, GameEvent::ItemCollected { .. }))
            .count();
        assert_eq!(picked, 2);
        assert!(events.contains(&GameEvent::LabyrinthCleared { lab: 1 }));
        assert!(events.contains(&GameEvent::LabyrinthEntered { lab: 2 }));
        // Exactly one advance
        assert_eq!(world.current_index, 1);
        assert_eq!((world.player.body.x, world.player.body.y), (24.0, 120.0));
        assert_eq!(world.items_total, 1);
        assert_eq!(world.items_collected, 0);
    }

    #[test]
    fn collected_never_exceeds_total() {
        let mut world = scene();
        for _ in 0..5 {
            update(&mut world, held(|i| i.right = true), TICK);
            assert!(world.items_collected <= world.items_total);
        }
    }

    #[test]
    fn empty_labyrinth_does_not_advance_by_itself() {
        let mut world = scene();
        world.items.clear();
        world.items_total = 0;
        update(&mut world, FrameInput::default(), TICK);
        assert_eq!(world.current_index, 0);
    }

    #[test]
    fn clearing_last_labyrinth_locks_input_until_reset() {
        let mut world = scene();
        update(&mut world, FrameInput::default(), TICK); // lab 1 -> 2
        let lab2 = world.items[0].clone();
        world.player.place_at(lab2.x, lab2.y);
        update(&mut world, FrameInput::default(), TICK); // lab 2 -> 3
        assert_eq!(world.current_index, 2);
        let events = update(&mut world, FrameInput::default(), TICK); // lab 3 -> victory
        assert!(events.contains(&GameEvent::Victory));
        assert!(world.game_over);

        let (x, y) = (world.player.body.x, world.player.body.y);
        update(&mut world, held(|i| i.left = true), TICK);
        assert_eq!((world.player.body.x, world.player.body.y), (x, y));
        assert_eq!((world.player.body.vx, world.player.body.vy), (0.0, 0.0));
    }

    #[test]
    fn victory_resets_scene_after_delay() {
        let mut world = scene();
        world.current_index = 2;
        let mut events = vec![];
        level::next_labyrinth(&mut world, &mut events);

        let almost = Duration::from_millis(world.speed.victory_delay_ms - 1);
        assert!(update(&mut world, FrameInput::default(), almost).is_empty());
        assert!(world.game_over);

        let events = update(&mut world, FrameInput::default(), Duration::from_millis(1));
        assert_eq!(events, vec![GameEvent::SceneReset]);
        assert!(!world.game_over);
        assert!(!world.victory_visible);
        assert_eq!(world.current_index, 0);
    }

    #[test]
    fn manual_restart_cancels_pending_victory_reset() {
        let mut world = scene();
        world.current_index = 2;
        let mut events = vec![];
        level::next_labyrinth(&mut world, &mut events);

        update(&mut world, held(|i| i.restart = true), TICK);
        assert!(!world.game_over);
        world.items.clear();
        // Play on past the old deadline: no second reset
        let events = update(&mut world, FrameInput::default(), Duration::from_secs(11));
        assert!(!events.contains(&GameEvent::SceneReset));
    }

    #[test]
    fn restart_mid_level_returns_to_first_labyrinth() {
        let mut world = scene();
        update(&mut world, FrameInput::default(), TICK);
        assert_eq!(world.current_index, 1);

        let events = update(&mut world, held(|i| i.restart = true), TICK);
        assert_eq!(events, vec![GameEvent::SceneReset]);
        assert_eq!(world.current_index, 0);
        assert_eq!(world.items_total, 2);
        assert!(!world.game_over);
        assert_eq!((world.player.body.x, world.player.body.y), (24.0, 24.0));
    }
}
