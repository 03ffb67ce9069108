//! Authoritative world state and the join/leave/move rules.
//!
//! Every rule returns the protocol messages it produces as an ordered list of
//! [`Outbound`] items addressed by player id. The caller queues them in that
//! order, which is what gives the join sequence its ordering guarantee.

use log::{debug, info};
use rand::Rng;
use shared::{
    Direction, Message, Player, PlayerId, PlayerRegistry, ProtocolError, PLAYER_SIZE,
    WORLD_HEIGHT, WORLD_WIDTH,
};

/// A message produced by the game rules, addressed by player id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outbound {
    Send {
        to: PlayerId,
        message: Message,
    },
    /// Goes to every joined connection except `exclude`.
    Broadcast {
        message: Message,
        exclude: Option<PlayerId>,
    },
}

#[derive(Debug, Default)]
pub struct GameState {
    pub tick: u64,
    players: PlayerRegistry,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// A fresh player at a random spot inside the clamp box with a random hue.
    pub fn spawn<R: Rng + ?Sized>(id: PlayerId, rng: &mut R) -> Player {
        let x = rng.gen_range(0.0..=WORLD_WIDTH - PLAYER_SIZE);
        let y = rng.gen_range(0.0..=WORLD_HEIGHT - PLAYER_SIZE);
        Player::new(id, x, y, rng.gen())
    }

    /// Adds `player` and returns, in order: its `Hello`, the `PlayerJoined`
    /// broadcast to everyone else, then one `PlayerJoined` per existing player
    /// for the newcomer.
    pub fn join(&mut self, player: Player) -> Vec<Outbound> {
        let mut outbound = Vec::with_capacity(self.players.len() + 2);

        outbound.push(Outbound::Send {
            to: player.id,
            message: Message::hello(&player),
        });
        outbound.push(Outbound::Broadcast {
            message: Message::player_joined(&player),
            exclude: Some(player.id),
        });
        for existing in self.players.snapshot() {
            if existing.id != player.id {
                outbound.push(Outbound::Send {
                    to: player.id,
                    message: Message::player_joined(&existing),
                });
            }
        }

        info!(
            "Added player {} at ({:.1}, {:.1}) hue {:.0}",
            player.id,
            player.x,
            player.y,
            player.hue_degrees()
        );
        self.players.upsert(player);
        outbound
    }

    /// Removes the player and announces it. Unknown ids produce nothing, so a
    /// player is announced as gone at most once.
    pub fn leave(&mut self, id: PlayerId) -> Vec<Outbound> {
        match self.players.remove(id) {
            Some(_) => {
                info!("Removed player {}", id);
                vec![Outbound::Broadcast {
                    message: Message::PlayerLeft { id },
                    exclude: None,
                }]
            }
            None => Vec::new(),
        }
    }

    /// Applies a move intent and broadcasts the authoritative result to all
    /// joined connections, the origin included.
    pub fn set_moving(
        &mut self,
        id: PlayerId,
        start: bool,
        direction: Direction,
    ) -> Result<Vec<Outbound>, ProtocolError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or(ProtocolError::UnknownPlayer(id))?;
        player.moving.set(direction, start);
        debug!(
            "Player {} {} {:?} -> mask {:04b}",
            id,
            if start { "pressed" } else { "released" },
            direction,
            player.moving.bits()
        );

        Ok(vec![Outbound::Broadcast {
            message: Message::player_moving(player),
            exclude: None,
        }])
    }

    pub fn step(&mut self, dt: f32) {
        self.players.advance_all(dt);
        self.tick += 1;
    }
}
