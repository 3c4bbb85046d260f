/// Level rules: pure functions, no side effects.
///
/// These encode "what belongs where" without touching world state:
///   - labyrinth order (spawn points collated by name)
///   - which item objects belong to a labyrinth
///   - which velocity the held directions produce
///
/// ## Item filter
///
/// ┌───────────────────────────────────────┬──────────┐
/// │ Object properties                      │ Include? │
/// ├───────────────────────────────────────┼──────────┤
/// │ no `lab` property at all               │ YES      │ appears in every labyrinth
/// │ `lab` == current labyrinth (1-based)   │ YES      │
/// │ `lab` == any other value / non-number  │ NO       │
/// └───────────────────────────────────────┴──────────┘
///
/// ## Velocity
///
/// Each axis picks at most one direction. Left wins over right, up wins
/// over down. Axes are independent, so diagonals are allowed.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use log::warn;

use super::entity::{FrameInput, SpawnPoint};
use super::tilemap::MapObject;

// ── Labyrinth order ──

/// Name ordering for spawn points: Unicode collation, root locale,
/// tertiary strength. Base letters decide first, then accents, then case
/// (`este < Éste < Fin`, `a < A`); punctuation and digits sort before
/// letters (`Lab_1 < Lab-2 < Lab1`).
pub struct NameOrder {
    collator: Option<Collator>,
}

impl NameOrder {
    pub fn new() -> Self {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);
        let collator = match Collator::try_new(&Default::default(), options) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("collation data unavailable ({:?}); spawn names sort case-insensitively", e);
                None
            }
        };
        NameOrder { collator }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(c) => c.compare(a, b),
            None => fold_case_compare(a, b),
        }
    }
}

/// Fallback: letters compare case-insensitively; on a tie lowercase sorts
/// first.
fn fold_case_compare(a: &str, b: &str) -> Ordering {
    let primary = a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    primary.then_with(|| {
        a.chars()
            .map(|c| c.is_uppercase())
            .cmp(b.chars().map(|c| c.is_uppercase()))
    })
}

/// Spawn points in labyrinth order. The sort is stable, so objects with
/// equal names keep their map order.
pub fn sorted_spawns(objects: &[MapObject]) -> Vec<SpawnPoint> {
    let order = NameOrder::new();
    let mut spawns: Vec<SpawnPoint> = objects.iter()
        .map(|o| SpawnPoint { name: o.name.clone(), x: o.x, y: o.y })
        .collect();
    spawns.sort_by(|a, b| order.compare(&a.name, &b.name));
    spawns
}

// ── Item filter ──

/// Does `obj` belong to labyrinth `lab_number` (1-based)?
pub fn item_in_lab(obj: &MapObject, lab_property: &str, lab_number: usize) -> bool {
    match obj.property(lab_property) {
        None => true,
        Some(value) => value.as_f64().map_or(false, |v| v == lab_number as f64),
    }
}

/// All item objects that belong to labyrinth `lab_number`, in map order.
pub fn items_for_lab<'a>(
    objects: &'a [MapObject],
    lab_property: &str,
    lab_number: usize,
) -> Vec<&'a MapObject> {
    objects.iter()
        .filter(|o| item_in_lab(o, lab_property, lab_number))
        .collect()
}

// ── Velocity ──

/// Velocity produced by the held directions at the given speed.
pub fn velocity_for(input: &FrameInput, speed: f32) -> (f32, f32) {
    let vx = if input.left {
        -speed
    } else if input.right {
        speed
    } else {
        0.0
    };
    let vy = if input.up {
        -speed
    } else if input.down {
        speed
    } else {
        0.0
    };
    (vx, vy)
}
