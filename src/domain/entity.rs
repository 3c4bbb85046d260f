/// Entities: SpawnPoint, Item, Player, plus the per-frame input snapshot.

use super::physics::Body;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Named start location for one labyrinth. Immutable after load.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnPoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

/// Collectible for the current labyrinth, centered on (x, y).
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub x: f32,
    pub y: f32,
    pub collected: bool,
}

impl Item {
    pub fn new(x: f32, y: f32) -> Self {
        Item { x, y, collected: false }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub facing: Facing,
}

impl Player {
    pub fn new(body: Body) -> Self {
        Player { body, facing: Facing::Right }
    }

    /// Instant teleport, no interpolation. Velocity is dropped.
    pub fn place_at(&mut self, x: f32, y: f32) {
        self.body.x = x;
        self.body.y = y;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
    }

    pub fn stop(&mut self) {
        self.body.vx = 0.0;
        self.body.vy = 0.0;
    }
}

/// Frame input. Directions are held state; restart is edge-triggered
/// (true only on the frame the key went down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub restart: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_at_teleports_and_stops() {
        let mut p = Player::new(Body::new(0.0, 0.0, 6.0, 6.0));
        p.body.vx = 80.0;
        p.body.vy = -80.0;
        p.place_at(40.0, 72.0);
        assert_eq!((p.body.x, p.body.y), (40.0, 72.0));
        assert_eq!((p.body.vx, p.body.vy), (0.0, 0.0));
    }

    #[test]
    fn new_item_is_not_collected() {
        let item = Item::new(3.0, 4.0);
        assert!(!item.collected);
    }
}
