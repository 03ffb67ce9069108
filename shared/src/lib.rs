//! Wire protocol, movement model and player state shared by client and server.

pub mod codec;
pub mod error;
pub mod latency;
pub mod message;
pub mod movement;
pub mod registry;

pub use error::{CodecError, ProtocolError};
pub use latency::{Clock, LatencyTracker};
pub use message::{Message, MessageKind};
pub use movement::{Direction, MoveMask};
pub use registry::PlayerRegistry;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_SIZE: f32 = 30.0;
pub const PLAYER_SPEED: f32 = 500.0;

pub const SERVER_PORT: u16 = 6970;
pub const SERVER_FPS: u32 = 60;

/// Connection-scoped player identifier, unique among live connections.
pub type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub moving: MoveMask,
    /// Wire-scale hue; see [`hue_degrees`].
    pub hue: u8,
}

impl Player {
    pub fn new(id: PlayerId, x: f32, y: f32, hue: u8) -> Self {
        Self {
            id,
            x,
            y,
            moving: MoveMask::EMPTY,
            hue,
        }
    }

    /// Advances the position by `dt` seconds of the current move intent.
    pub fn advance(&mut self, dt: f32) {
        let (x, y) = movement::advance(self.x, self.y, self.moving, dt);
        self.x = x;
        self.y = y;
    }

    pub fn hue_degrees(&self) -> f32 {
        hue_degrees(self.hue)
    }
}

/// Rescales an 8-bit wire hue to degrees in `[0, 360)`.
pub fn hue_degrees(wire: u8) -> f32 {
    wire as f32 / 256.0 * 360.0
}
