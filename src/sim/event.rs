/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and messages.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    ItemCollected { x: f32, y: f32 },
    /// Every item of the labyrinth is collected.
    LabyrinthCleared { lab: usize },
    /// Player moved to the next labyrinth (1-based number).
    LabyrinthEntered { lab: usize },
    /// Last labyrinth cleared: banner shown, reset scheduled.
    Victory,
    /// Scene rebuilt from scratch (manual restart or victory timeout).
    SceneReset,
}
