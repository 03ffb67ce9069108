//! Error types for the wire codec and the message-level protocol.

use crate::codec::FieldType;
use crate::message::MessageKind;
use crate::PlayerId;
use thiserror::Error;

/// Failures while reading or writing a single binary message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// No layout verified against the buffer.
    #[error("{len}-byte buffer matches no known message (kind byte {kind:?})")]
    UnknownMessage { len: usize, kind: Option<u8> },

    #[error("field `{field}` at offset {offset} overruns {len}-byte buffer")]
    FieldOutOfBounds {
        field: &'static str,
        offset: usize,
        len: usize,
    },

    #[error("field `{field}` holds {expected:?}, got {actual:?}")]
    FieldTypeMismatch {
        field: &'static str,
        expected: FieldType,
        actual: FieldType,
    },

    #[error("buffer too small: need {needed}, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("invalid direction {0}")]
    InvalidDirection(u8),

    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),

    #[error("invalid movement mask 0b{0:08b}")]
    InvalidMoveMask(u8),
}

/// A message that decoded cleanly but is not acceptable in the current
/// connection state. Always fatal to the connection that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("unexpected {kind:?} message")]
    UnexpectedMessage { kind: MessageKind },

    #[error("message references unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("{kind:?} arrived before Hello")]
    NotJoined { kind: MessageKind },

    #[error("second Hello on an established session")]
    DuplicateHello,

    #[error("PlayerJoined announced our own id {0}")]
    SelfJoined(PlayerId),
}
