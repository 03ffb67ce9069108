//! Typed protocol messages on top of the [`codec`](crate::codec) schemas.

use crate::codec::{
    self, amma_moving, hello, ping_pong, player_joined, player_left, player_moving, read_f32,
    read_f64, read_u32, read_u8, write, Layout, Value, KIND,
};
use crate::error::CodecError;
use crate::movement::{Direction, MoveMask};
use crate::{Player, PlayerId};

/// Discriminator byte of every message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Hello = 0,
    PlayerJoined = 1,
    PlayerLeft = 2,
    PlayerMoving = 3,
    AmmaMoving = 4,
    Ping = 5,
    Pong = 6,
}

impl MessageKind {
    pub const ALL: [MessageKind; 7] = [
        MessageKind::Hello,
        MessageKind::PlayerJoined,
        MessageKind::PlayerLeft,
        MessageKind::PlayerMoving,
        MessageKind::AmmaMoving,
        MessageKind::Ping,
        MessageKind::Pong,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn layout(self) -> &'static Layout {
        match self {
            MessageKind::Hello => &hello::LAYOUT,
            MessageKind::PlayerJoined => &player_joined::LAYOUT,
            MessageKind::PlayerLeft => &player_left::LAYOUT,
            MessageKind::PlayerMoving => &player_moving::LAYOUT,
            MessageKind::AmmaMoving => &amma_moving::LAYOUT,
            MessageKind::Ping => &ping_pong::PING,
            MessageKind::Pong => &ping_pong::PONG,
        }
    }

    /// Total encoded size in bytes.
    pub fn size(self) -> usize {
        self.layout().size
    }

    /// Kinds a client may send. Everything else travels server to client.
    pub fn is_server_bound(self) -> bool {
        matches!(self, MessageKind::AmmaMoving | MessageKind::Ping)
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    /// Sent once to a freshly joined connection describing its own player.
    Hello {
        id: PlayerId,
        x: f32,
        y: f32,
        hue: u8,
    },
    PlayerJoined {
        id: PlayerId,
        x: f32,
        y: f32,
        moving: MoveMask,
        hue: u8,
    },
    PlayerLeft {
        id: PlayerId,
    },
    /// Authoritative position and intent after a move-intent change.
    PlayerMoving {
        id: PlayerId,
        x: f32,
        y: f32,
        moving: MoveMask,
    },
    /// Client move intent: `start` presses, `!start` releases `direction`.
    AmmaMoving {
        start: bool,
        direction: Direction,
    },
    /// `timestamp` is the sender's clock in milliseconds.
    Ping {
        timestamp: f64,
    },
    /// Echoes a ping's timestamp unchanged.
    Pong {
        timestamp: f64,
    },
}

impl Message {
    pub fn hello(player: &Player) -> Self {
        Message::Hello {
            id: player.id,
            x: player.x,
            y: player.y,
            hue: player.hue,
        }
    }

    pub fn player_joined(player: &Player) -> Self {
        Message::PlayerJoined {
            id: player.id,
            x: player.x,
            y: player.y,
            moving: player.moving,
            hue: player.hue,
        }
    }

    pub fn player_moving(player: &Player) -> Self {
        Message::PlayerMoving {
            id: player.id,
            x: player.x,
            y: player.y,
            moving: player.moving,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Hello { .. } => MessageKind::Hello,
            Message::PlayerJoined { .. } => MessageKind::PlayerJoined,
            Message::PlayerLeft { .. } => MessageKind::PlayerLeft,
            Message::PlayerMoving { .. } => MessageKind::PlayerMoving,
            Message::AmmaMoving { .. } => MessageKind::AmmaMoving,
            Message::Ping { .. } => MessageKind::Ping,
            Message::Pong { .. } => MessageKind::Pong,
        }
    }

    /// Encodes into the front of `buf`, returning the number of bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let layout = self.kind().layout();
        if buf.len() < layout.size {
            return Err(CodecError::BufferTooSmall {
                needed: layout.size,
                available: buf.len(),
            });
        }
        let buf = &mut buf[..layout.size];
        write(buf, &KIND, Value::U8(layout.kind as u8))?;

        match *self {
            Message::Hello { id, x, y, hue } => {
                write(buf, &hello::ID, Value::U32(id))?;
                write(buf, &hello::X, Value::F32(x))?;
                write(buf, &hello::Y, Value::F32(y))?;
                write(buf, &hello::HUE, Value::U8(hue))?;
            }
            Message::PlayerJoined {
                id,
                x,
                y,
                moving,
                hue,
            } => {
                write(buf, &player_joined::ID, Value::U32(id))?;
                write(buf, &player_joined::X, Value::F32(x))?;
                write(buf, &player_joined::Y, Value::F32(y))?;
                write(buf, &player_joined::MOVING, Value::U8(moving.bits()))?;
                write(buf, &player_joined::HUE, Value::U8(hue))?;
            }
            Message::PlayerLeft { id } => {
                write(buf, &player_left::ID, Value::U32(id))?;
            }
            Message::PlayerMoving { id, x, y, moving } => {
                write(buf, &player_moving::ID, Value::U32(id))?;
                write(buf, &player_moving::X, Value::F32(x))?;
                write(buf, &player_moving::Y, Value::F32(y))?;
                write(buf, &player_moving::MOVING, Value::U8(moving.bits()))?;
            }
            Message::AmmaMoving { start, direction } => {
                write(buf, &amma_moving::START, Value::U8(start as u8))?;
                write(buf, &amma_moving::DIRECTION, Value::U8(direction as u8))?;
            }
            Message::Ping { timestamp } | Message::Pong { timestamp } => {
                write(buf, &ping_pong::TIMESTAMP, Value::F64(timestamp))?;
            }
        }

        Ok(layout.size)
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = vec![0u8; self.kind().size()];
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Tries every known layout and decodes the one that verifies.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let layout = codec::identify(buf).ok_or(CodecError::UnknownMessage {
            len: buf.len(),
            kind: buf.first().copied(),
        })?;

        let message = match layout.kind {
            MessageKind::Hello => Message::Hello {
                id: read_u32(buf, &hello::ID)?,
                x: read_f32(buf, &hello::X)?,
                y: read_f32(buf, &hello::Y)?,
                hue: read_u8(buf, &hello::HUE)?,
            },
            MessageKind::PlayerJoined => Message::PlayerJoined {
                id: read_u32(buf, &player_joined::ID)?,
                x: read_f32(buf, &player_joined::X)?,
                y: read_f32(buf, &player_joined::Y)?,
                moving: decode_mask(read_u8(buf, &player_joined::MOVING)?)?,
                hue: read_u8(buf, &player_joined::HUE)?,
            },
            MessageKind::PlayerLeft => Message::PlayerLeft {
                id: read_u32(buf, &player_left::ID)?,
            },
            MessageKind::PlayerMoving => Message::PlayerMoving {
                id: read_u32(buf, &player_moving::ID)?,
                x: read_f32(buf, &player_moving::X)?,
                y: read_f32(buf, &player_moving::Y)?,
                moving: decode_mask(read_u8(buf, &player_moving::MOVING)?)?,
            },
            MessageKind::AmmaMoving => Message::AmmaMoving {
                start: decode_bool(read_u8(buf, &amma_moving::START)?)?,
                direction: Direction::try_from(read_u8(buf, &amma_moving::DIRECTION)?)?,
            },
            MessageKind::Ping => Message::Ping {
                timestamp: read_f64(buf, &ping_pong::TIMESTAMP)?,
            },
            MessageKind::Pong => Message::Pong {
                timestamp: read_f64(buf, &ping_pong::TIMESTAMP)?,
            },
        };
        Ok(message)
    }
}

fn decode_bool(byte: u8) -> Result<bool, CodecError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidBool(other)),
    }
}

fn decode_mask(byte: u8) -> Result<MoveMask, CodecError> {
    MoveMask::from_bits(byte).ok_or(CodecError::InvalidMoveMask(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: Message) -> Message {
        let bytes = message.encode().unwrap();
        assert_eq!(bytes.len(), message.kind().size());
        assert_eq!(bytes[0], message.kind() as u8);
        Message::decode(&bytes).unwrap()
    }

    #[test]
    fn test_kind_from_u8() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(MessageKind::from_u8(7), None);
        assert_eq!(MessageKind::from_u8(255), None);
    }

    #[test]
    fn test_server_bound_kinds() {
        let bound: Vec<_> = MessageKind::ALL
            .into_iter()
            .filter(|k| k.is_server_bound())
            .collect();
        assert_eq!(bound, vec![MessageKind::AmmaMoving, MessageKind::Ping]);
    }

    #[test]
    fn test_hello_roundtrip_extremes() {
        for id in [0, 1, u32::MAX] {
            for hue in [0, 128, u8::MAX] {
                let message = Message::Hello {
                    id,
                    x: 770.0,
                    y: 0.0,
                    hue,
                };
                assert_eq!(roundtrip(message), message);
            }
        }
    }

    #[test]
    fn test_player_joined_roundtrip_all_masks() {
        for bits in 0..=MoveMask::ALL_BITS {
            let message = Message::PlayerJoined {
                id: 42,
                x: 123.25,
                y: 456.5,
                moving: MoveMask::from_bits(bits).unwrap(),
                hue: 17,
            };
            assert_eq!(roundtrip(message), message);
        }
    }

    #[test]
    fn test_player_left_and_moving_roundtrip() {
        let left = Message::PlayerLeft { id: 9 };
        assert_eq!(roundtrip(left), left);

        let moving = Message::PlayerMoving {
            id: u32::MAX,
            x: -0.0,
            y: f32::MAX,
            moving: [Direction::Left, Direction::Down].into_iter().collect(),
        };
        assert_eq!(roundtrip(moving), moving);
    }

    #[test]
    fn test_amma_moving_roundtrip_every_direction() {
        for direction in Direction::ALL {
            for start in [true, false] {
                let message = Message::AmmaMoving { start, direction };
                assert_eq!(roundtrip(message), message);
            }
        }
    }

    #[test]
    fn test_ping_pong_roundtrip_keeps_kind() {
        for timestamp in [0.0, 50.125, 1.0e9 + 0.001] {
            let ping = Message::Ping { timestamp };
            let pong = Message::Pong { timestamp };
            assert_eq!(roundtrip(ping), ping);
            assert_eq!(roundtrip(pong), pong);
            assert_ne!(ping.encode().unwrap(), pong.encode().unwrap());
        }
    }

    #[test]
    fn test_decode_unknown_message() {
        assert_eq!(
            Message::decode(&[]),
            Err(CodecError::UnknownMessage { len: 0, kind: None })
        );
        assert_eq!(
            Message::decode(&[0xFF, 0, 0]),
            Err(CodecError::UnknownMessage {
                len: 3,
                kind: Some(0xFF)
            })
        );
        // Right discriminator, wrong length for it.
        assert_eq!(
            Message::decode(&[MessageKind::Hello as u8, 0, 0, 0, 0]),
            Err(CodecError::UnknownMessage {
                len: 5,
                kind: Some(0)
            })
        );
    }

    #[test]
    fn test_decode_rejects_bad_fields() {
        assert_eq!(
            Message::decode(&[MessageKind::AmmaMoving as u8, 1, 4]),
            Err(CodecError::InvalidDirection(4))
        );
        assert_eq!(
            Message::decode(&[MessageKind::AmmaMoving as u8, 2, 0]),
            Err(CodecError::InvalidBool(2))
        );

        let mut bytes = Message::PlayerMoving {
            id: 1,
            x: 0.0,
            y: 0.0,
            moving: MoveMask::EMPTY,
        }
        .encode()
        .unwrap();
        bytes[13] = 0x10;
        assert_eq!(Message::decode(&bytes), Err(CodecError::InvalidMoveMask(0x10)));
    }

    #[test]
    fn test_encode_into_caller_buffer() {
        let mut buf = [0xAAu8; 32];
        let written = Message::PlayerLeft { id: 0x0102_0304 }
            .encode_into(&mut buf)
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(&buf[..5], &[2, 4, 3, 2, 1]);
        assert_eq!(buf[5], 0xAA);
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let mut buf = [0u8; 4];
        let err = Message::Hello {
            id: 1,
            x: 0.0,
            y: 0.0,
            hue: 0,
        }
        .encode_into(&mut buf)
        .unwrap_err();
        assert_eq!(
            err,
            CodecError::BufferTooSmall {
                needed: 14,
                available: 4
            }
        );
    }

    #[test]
    fn test_amma_moving_wire_bytes() {
        let bytes = Message::AmmaMoving {
            start: true,
            direction: Direction::Down,
        }
        .encode()
        .unwrap();
        assert_eq!(bytes, vec![4, 1, 3]);
    }

    #[test]
    fn test_player_joined_matches_bincode_reference() {
        let moving: MoveMask = [Direction::Right, Direction::Up].into_iter().collect();
        let reference =
            bincode::serialize(&(1u8, 7u32, 10.0f32, 20.0f32, moving.bits(), 99u8)).unwrap();
        let bytes = Message::PlayerJoined {
            id: 7,
            x: 10.0,
            y: 20.0,
            moving,
            hue: 99,
        }
        .encode()
        .unwrap();
        assert_eq!(bytes, reference);
    }

    #[test]
    fn test_constructors_from_player() {
        let mut player = Player::new(3, 10.0, 20.0, 64);
        player.moving.set(Direction::Up, true);

        assert_eq!(
            Message::hello(&player),
            Message::Hello {
                id: 3,
                x: 10.0,
                y: 20.0,
                hue: 64
            }
        );
        assert_eq!(
            Message::player_joined(&player),
            Message::PlayerJoined {
                id: 3,
                x: 10.0,
                y: 20.0,
                moving: player.moving,
                hue: 64
            }
        );
        assert_eq!(
            Message::player_moving(&player),
            Message::PlayerMoving {
                id: 3,
                x: 10.0,
                y: 20.0,
                moving: player.moving
            }
        );
    }
}
