//! Fixed-layout binary schemas for every message kind.
//!
//! Each kind is described by a [`Layout`]: a discriminator, a total size and a
//! table of [`Field`]s (name, byte offset, numeric type). The free functions
//! [`read`], [`write`] and [`verify`] operate on those tables over a
//! caller-owned byte buffer; the descriptors themselves carry no behaviour.
//!
//! All multi-byte fields are little-endian on both client and server. The
//! layouts are exactly the fixed-int little-endian encoding of the same field
//! tuple, so any peer can reproduce them without this crate.

use crate::error::CodecError;
use crate::message::MessageKind;
use std::ops::Range;

/// Byte order of every multi-byte field on the wire.
pub const BYTE_ORDER: &str = "little-endian";

/// Numeric type of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    U8,
    U16,
    U32,
    F32,
    F64,
}

impl FieldType {
    /// Width in bytes.
    pub const fn width(self) -> usize {
        match self {
            FieldType::U8 => 1,
            FieldType::U16 => 2,
            FieldType::U32 | FieldType::F32 => 4,
            FieldType::F64 => 8,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn ty(self) -> FieldType {
        match self {
            Value::U8(_) => FieldType::U8,
            Value::U16(_) => FieldType::U16,
            Value::U32(_) => FieldType::U32,
            Value::F32(_) => FieldType::F32,
            Value::F64(_) => FieldType::F64,
        }
    }
}

/// One entry of a message schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub ty: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, ty: FieldType) -> Self {
        Self { name, offset, ty }
    }

    /// Offset one past the last byte of this field.
    pub const fn end(&self) -> usize {
        self.offset + self.ty.width()
    }
}

/// Schema of one message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub kind: MessageKind,
    pub size: usize,
    pub fields: &'static [Field],
}

/// Discriminator byte, first field of every layout.
pub const KIND: Field = Field::new("kind", 0, FieldType::U8);

pub mod hello {
    use super::{Field, FieldType, Layout, KIND};
    use crate::message::MessageKind;

    pub const ID: Field = Field::new("id", 1, FieldType::U32);
    pub const X: Field = Field::new("x", 5, FieldType::F32);
    pub const Y: Field = Field::new("y", 9, FieldType::F32);
    pub const HUE: Field = Field::new("hue", 13, FieldType::U8);

    pub const LAYOUT: Layout = Layout {
        kind: MessageKind::Hello,
        size: 14,
        fields: &[KIND, ID, X, Y, HUE],
    };
}

pub mod player_joined {
    use super::{Field, FieldType, Layout, KIND};
    use crate::message::MessageKind;

    pub const ID: Field = Field::new("id", 1, FieldType::U32);
    pub const X: Field = Field::new("x", 5, FieldType::F32);
    pub const Y: Field = Field::new("y", 9, FieldType::F32);
    pub const MOVING: Field = Field::new("moving", 13, FieldType::U8);
    pub const HUE: Field = Field::new("hue", 14, FieldType::U8);

    pub const LAYOUT: Layout = Layout {
        kind: MessageKind::PlayerJoined,
        size: 15,
        fields: &[KIND, ID, X, Y, MOVING, HUE],
    };
}

pub mod player_left {
    use super::{Field, FieldType, Layout, KIND};
    use crate::message::MessageKind;

    pub const ID: Field = Field::new("id", 1, FieldType::U32);

    pub const LAYOUT: Layout = Layout {
        kind: MessageKind::PlayerLeft,
        size: 5,
        fields: &[KIND, ID],
    };
}

pub mod player_moving {
    use super::{Field, FieldType, Layout, KIND};
    use crate::message::MessageKind;

    pub const ID: Field = Field::new("id", 1, FieldType::U32);
    pub const X: Field = Field::new("x", 5, FieldType::F32);
    pub const Y: Field = Field::new("y", 9, FieldType::F32);
    pub const MOVING: Field = Field::new("moving", 13, FieldType::U8);

    pub const LAYOUT: Layout = Layout {
        kind: MessageKind::PlayerMoving,
        size: 14,
        fields: &[KIND, ID, X, Y, MOVING],
    };
}

pub mod amma_moving {
    use super::{Field, FieldType, Layout, KIND};
    use crate::message::MessageKind;

    pub const START: Field = Field::new("start", 1, FieldType::U8);
    pub const DIRECTION: Field = Field::new("direction", 2, FieldType::U8);

    pub const LAYOUT: Layout = Layout {
        kind: MessageKind::AmmaMoving,
        size: 3,
        fields: &[KIND, START, DIRECTION],
    };
}

/// `Ping` and `Pong` share this field table and differ only in discriminator.
/// The timestamp is the sender's clock in fractional milliseconds.
pub mod ping_pong {
    use super::{Field, FieldType, Layout, KIND};
    use crate::message::MessageKind;

    pub const TIMESTAMP: Field = Field::new("timestamp", 1, FieldType::F64);

    pub const FIELDS: &[Field] = &[KIND, TIMESTAMP];

    pub const PING: Layout = Layout {
        kind: MessageKind::Ping,
        size: 9,
        fields: FIELDS,
    };

    pub const PONG: Layout = Layout {
        kind: MessageKind::Pong,
        size: 9,
        fields: FIELDS,
    };
}

/// Every known layout, in discriminator order.
pub const LAYOUTS: &[Layout] = &[
    hello::LAYOUT,
    player_joined::LAYOUT,
    player_left::LAYOUT,
    player_moving::LAYOUT,
    amma_moving::LAYOUT,
    ping_pong::PING,
    ping_pong::PONG,
];

/// True when `buf` has exactly this layout's size and its discriminator.
pub fn verify(layout: &Layout, buf: &[u8]) -> bool {
    buf.len() == layout.size && buf.first() == Some(&(layout.kind as u8))
}

/// Finds the one layout that verifies against `buf`, if any.
pub fn identify(buf: &[u8]) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|layout| verify(layout, buf))
}

fn span(field: &Field, len: usize) -> Result<Range<usize>, CodecError> {
    if field.end() > len {
        return Err(CodecError::FieldOutOfBounds {
            field: field.name,
            offset: field.offset,
            len,
        });
    }
    Ok(field.offset..field.end())
}

/// Reads a field, bounds-checked against the buffer.
pub fn read(buf: &[u8], field: &Field) -> Result<Value, CodecError> {
    let bytes = &buf[span(field, buf.len())?];
    let value = match field.ty {
        FieldType::U8 => Value::U8(bytes[0]),
        FieldType::U16 => Value::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
        FieldType::U32 => Value::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        FieldType::F32 => Value::F32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        FieldType::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Value::F64(f64::from_le_bytes(raw))
        }
    };
    Ok(value)
}

/// Writes a field. The value's type must match the field's declared type.
pub fn write(buf: &mut [u8], field: &Field, value: Value) -> Result<(), CodecError> {
    if value.ty() != field.ty {
        return Err(CodecError::FieldTypeMismatch {
            field: field.name,
            expected: field.ty,
            actual: value.ty(),
        });
    }
    let range = span(field, buf.len())?;
    let dst = &mut buf[range];
    match value {
        Value::U8(v) => dst[0] = v,
        Value::U16(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::U32(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::F32(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::F64(v) => dst.copy_from_slice(&v.to_le_bytes()),
    }
    Ok(())
}

macro_rules! typed_read {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(buf: &[u8], field: &Field) -> Result<$ty, CodecError> {
            match read(buf, field)? {
                Value::$variant(v) => Ok(v),
                other => Err(CodecError::FieldTypeMismatch {
                    field: field.name,
                    expected: field.ty,
                    actual: other.ty(),
                }),
            }
        }
    };
}

typed_read!(read_u8, U8, u8);
typed_read!(read_u16, U16, u16);
typed_read!(read_u32, U32, u32);
typed_read!(read_f32, F32, f32);
typed_read!(read_f64, F64, f64);
