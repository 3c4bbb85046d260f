/// Deferred calls: one-shot timers advanced by the fixed tick.
///
/// Each pending call records the scheduler generation at the time it was
/// scheduled. `next_generation()` (called on every scene restart) makes all
/// older calls stale: they are dropped instead of firing, so a timer set by
/// one scene can never act on the scene that replaced it.
///
/// Calls fire at most once, in scheduling order, and can be cancelled by
/// handle until they do.

use std::time::Duration;

/// What a deferred call does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredAction {
    ResetScene,
}

/// Ticket returned by `schedule`, used to cancel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Clone, Debug)]
struct Pending {
    handle: TimerHandle,
    generation: u64,
    remaining: Duration,
    action: DeferredAction,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    pending: Vec<Pending>,
    next_id: u64,
    generation: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of calls that may still fire in the current generation.
    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|p| p.generation == self.generation).count()
    }

    /// Time left on a live call.
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.pending.iter()
            .find(|p| p.handle == handle && p.generation == self.generation)
            .map(|p| p.remaining)
    }

    pub fn schedule(&mut self, delay: Duration, action: DeferredAction) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            generation: self.generation,
            remaining: delay,
            action,
        });
        handle
    }

    /// Cancel a pending call. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Start a new generation; everything scheduled earlier is stale.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending.retain(|p| p.generation == self.generation);
        self.generation
    }

    /// Advance all calls by `dt`. Returns the actions that came due, in
    /// the order they were scheduled.
    pub fn advance(&mut self, dt: Duration) -> Vec<DeferredAction> {
        let generation = self.generation;
        let mut fired = vec![];
        self.pending.retain_mut(|p| {
            if p.generation != generation {
                return false;
            }
            p.remaining = p.remaining.saturating_sub(dt);
            if p.remaining.is_zero() {
                fired.push(p.action);
                false
            } else {
                true
            }
        });
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_once_when_due() {
        let mut s = Scheduler::new();
        s.schedule(ms(100), DeferredAction::ResetScene);
        assert!(s.advance(ms(60)).is_empty());
        assert_eq!(s.advance(ms(40)), vec![DeferredAction::ResetScene]);
        assert!(s.advance(ms(1000)).is_empty());
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let mut s = Scheduler::new();
        s.schedule(Duration::ZERO, DeferredAction::ResetScene);
        assert_eq!(s.advance(Duration::ZERO).len(), 1);
    }

    #[test]
    fn cancelled_call_never_fires() {
        let mut s = Scheduler::new();
        let h = s.schedule(ms(10), DeferredAction::ResetScene);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(s.advance(ms(50)).is_empty());
    }

    #[test]
    fn new_generation_drops_stale_calls() {
        let mut s = Scheduler::new();
        let old = s.schedule(ms(10), DeferredAction::ResetScene);
        assert_eq!(s.next_generation(), 1);
        assert_eq!(s.remaining(old), None);
        let fresh = s.schedule(ms(10), DeferredAction::ResetScene);
        assert_eq!(s.remaining(fresh), Some(ms(10)));
        assert_eq!(s.advance(ms(10)), vec![DeferredAction::ResetScene]);
    }

    #[test]
    fn handles_are_unique_across_generations() {
        let mut s = Scheduler::new();
        let a = s.schedule(ms(1), DeferredAction::ResetScene);
        s.next_generation();
        let b = s.schedule(ms(1), DeferredAction::ResetScene);
        assert_ne!(a, b);
    }
}
