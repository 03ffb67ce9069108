//! Move input with change detection, plus a random "wander" input source
//! for headless clients.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Direction, Message, MoveMask};

/// A direction key going down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub direction: Direction,
    pub start: bool,
}

impl InputEvent {
    pub fn press(direction: Direction) -> Self {
        Self {
            direction,
            start: true,
        }
    }

    pub fn release(direction: Direction) -> Self {
        Self {
            direction,
            start: false,
        }
    }
}

/// Tracks which directions are held and turns real changes into
/// `AmmaMoving` messages. Repeated presses of a held key produce nothing.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: MoveMask,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> MoveMask {
        self.held
    }

    pub fn apply(&mut self, event: InputEvent) -> Option<Message> {
        if self.held.contains(event.direction) == event.start {
            return None;
        }
        self.held.set(event.direction, event.start);
        Some(Message::AmmaMoving {
            start: event.start,
            direction: event.direction,
        })
    }
}

/// Releases whatever it held last time and usually presses a new random
/// direction. Sometimes it just stands still.
pub struct Wanderer {
    rng: StdRng,
    current: Option<Direction>,
}

impl Wanderer {
    const IDLE_CHANCE: f64 = 0.2;

    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng, current: None }
    }

    pub fn next_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(previous) = self.current.take() {
            events.push(InputEvent::release(previous));
        }
        if !self.rng.gen_bool(Self::IDLE_CHANCE) {
            let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            events.push(InputEvent::press(direction));
            self.current = Some(direction);
        }
        events
    }
}

impl Default for Wanderer {
    fn default() -> Self {
        Self::new()
    }
}
