//! Client-side copy of the world: players as last reported by the server,
//! advanced locally between updates.

use log::{debug, info};
use shared::{Message, Player, PlayerId, PlayerRegistry, ProtocolError};

/// Snapshot handed to whatever presents the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldView {
    pub me: Option<PlayerId>,
    /// Ordered by id.
    pub players: Vec<Player>,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientGameState {
    me: Option<PlayerId>,
    players: PlayerRegistry,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Our own id, known once `Hello` has arrived.
    pub fn me(&self) -> Option<PlayerId> {
        self.me
    }

    pub fn is_joined(&self) -> bool {
        self.me.is_some()
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.me.and_then(|id| self.players.get(id))
    }

    /// Applies one server message.
    ///
    /// Nothing but `Hello` is accepted until `Hello` has been seen, and it is
    /// accepted only once. `PlayerMoving` overwrites the local prediction with
    /// the server's position and intent.
    pub fn apply(&mut self, message: Message) -> Result<(), ProtocolError> {
        let me = match (self.me, message) {
            (None, Message::Hello { id, x, y, hue }) => {
                self.me = Some(id);
                self.players.upsert(Player::new(id, x, y, hue));
                info!("Joined as player {} at ({:.1}, {:.1})", id, x, y);
                return Ok(());
            }
            (None, other) => return Err(ProtocolError::NotJoined { kind: other.kind() }),
            (Some(me), _) => me,
        };

        match message {
            Message::Hello { .. } => Err(ProtocolError::DuplicateHello),
            Message::PlayerJoined {
                id,
                x,
                y,
                moving,
                hue,
            } => {
                if id == me {
                    return Err(ProtocolError::SelfJoined(id));
                }
                let mut player = Player::new(id, x, y, hue);
                player.moving = moving;
                self.players.upsert(player);
                info!("Player {} joined", id);
                Ok(())
            }
            Message::PlayerLeft { id } => {
                self.players
                    .remove(id)
                    .ok_or(ProtocolError::UnknownPlayer(id))?;
                info!("Player {} left", id);
                Ok(())
            }
            Message::PlayerMoving { id, x, y, moving } => {
                let player = self
                    .players
                    .get_mut(id)
                    .ok_or(ProtocolError::UnknownPlayer(id))?;
                player.x = x;
                player.y = y;
                player.moving = moving;
                debug!("Player {} now moving {:04b}", id, moving.bits());
                Ok(())
            }
            other @ (Message::AmmaMoving { .. } | Message::Ping { .. } | Message::Pong { .. }) => {
                Err(ProtocolError::UnexpectedMessage { kind: other.kind() })
            }
        }
    }

    /// Local prediction for every player.
    pub fn advance(&mut self, dt: f32) {
        self.players.advance_all(dt);
    }

    pub fn view(&self, latency_ms: Option<f64>) -> WorldView {
        WorldView {
            me: self.me,
            players: self.players.snapshot(),
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Direction, MessageKind, MoveMask, PLAYER_SPEED};
    use tokio_test::{assert_err, assert_ok};

    fn hello(id: PlayerId) -> Message {
        Message::Hello {
            id,
            x: 100.0,
            y: 100.0,
            hue: 10,
        }
    }

    fn joined(id: PlayerId, moving: MoveMask) -> Message {
        Message::PlayerJoined {
            id,
            x: 200.0,
            y: 200.0,
            moving,
            hue: 20,
        }
    }

    fn joined_state(me: PlayerId) -> ClientGameState {
        let mut state = ClientGameState::new();
        assert_ok!(state.apply(hello(me)));
        state
    }

    #[test]
    fn test_hello_sets_identity() {
        let state = joined_state(4);
        assert_eq!(state.me(), Some(4));
        assert!(state.is_joined());
        let me = state.local_player().unwrap();
        assert_eq!((me.x, me.y, me.hue), (100.0, 100.0, 10));
        assert!(me.moving.is_empty());
    }

    #[test]
    fn test_messages_before_hello_rejected() {
        let mut state = ClientGameState::new();
        assert_eq!(
            state.apply(joined(2, MoveMask::EMPTY)),
            Err(ProtocolError::NotJoined {
                kind: MessageKind::PlayerJoined
            })
        );
        assert_eq!(
            state.apply(Message::Pong { timestamp: 1.0 }),
            Err(ProtocolError::NotJoined {
                kind: MessageKind::Pong
            })
        );
        assert!(!state.is_joined());
    }

    #[test]
    fn test_second_hello_rejected() {
        let mut state = joined_state(1);
        assert_eq!(state.apply(hello(2)), Err(ProtocolError::DuplicateHello));
        assert_eq!(state.me(), Some(1));
    }

    #[test]
    fn test_joined_carries_intent() {
        let mut state = joined_state(1);
        let moving: MoveMask = [Direction::Up, Direction::Left].into_iter().collect();
        assert_ok!(state.apply(joined(2, moving)));

        let other = state.players().get(2).unwrap();
        assert_eq!(other.moving, moving);
        assert_eq!(other.hue, 20);
        assert_eq!(state.players().len(), 2);
    }

    #[test]
    fn test_self_joined_rejected() {
        let mut state = joined_state(1);
        assert_eq!(
            state.apply(joined(1, MoveMask::EMPTY)),
            Err(ProtocolError::SelfJoined(1))
        );
    }

    #[test]
    fn test_player_left() {
        let mut state = joined_state(1);
        assert_ok!(state.apply(joined(2, MoveMask::EMPTY)));
        assert_ok!(state.apply(Message::PlayerLeft { id: 2 }));
        assert!(!state.players().contains(2));
        assert_eq!(
            state.apply(Message::PlayerLeft { id: 2 }),
            Err(ProtocolError::UnknownPlayer(2))
        );
    }

    #[test]
    fn test_player_moving_overwrites_prediction() {
        let mut state = joined_state(1);
        assert_ok!(state.apply(joined(2, MoveMask::EMPTY)));

        let moving: MoveMask = [Direction::Right].into_iter().collect();
        assert_ok!(state.apply(Message::PlayerMoving {
            id: 2,
            x: 300.0,
            y: 50.0,
            moving,
        }));
        let other = state.players().get(2).unwrap();
        assert_eq!((other.x, other.y, other.moving), (300.0, 50.0, moving));

        state.advance(0.1);
        assert_approx_eq!(state.players().get(2).unwrap().x, 300.0 + PLAYER_SPEED * 0.1, 1e-3);
        assert_eq!(state.players().get(1).unwrap().x, 100.0);
    }

    #[test]
    fn test_player_moving_unknown_rejected() {
        let mut state = joined_state(1);
        assert_err!(state.apply(Message::PlayerMoving {
            id: 9,
            x: 0.0,
            y: 0.0,
            moving: MoveMask::EMPTY,
        }));
    }

    #[test]
    fn test_server_bound_kinds_rejected() {
        let mut state = joined_state(1);
        for message in [
            Message::Ping { timestamp: 5.0 },
            Message::AmmaMoving {
                start: true,
                direction: Direction::Down,
            },
        ] {
            assert_eq!(
                state.apply(message),
                Err(ProtocolError::UnexpectedMessage {
                    kind: message.kind()
                })
            );
        }
    }

    #[test]
    fn test_view_snapshot() {
        let mut state = joined_state(3);
        assert_ok!(state.apply(joined(1, MoveMask::EMPTY)));

        let view = state.view(Some(42.5));
        assert_eq!(view.me, Some(3));
        assert_eq!(view.latency_ms, Some(42.5));
        let ids: Vec<_> = view.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
