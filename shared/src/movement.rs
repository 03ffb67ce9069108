//! Movement model shared by the authoritative server tick and client-side
//! prediction. Both sides must call [`advance`] with the same inputs to end up
//! at the same position.

use crate::error::CodecError;
use crate::{PLAYER_SIZE, PLAYER_SPEED, WORLD_HEIGHT, WORLD_WIDTH};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Unit vector in screen coordinates (y grows downwards).
    pub fn vector(self) -> (f32, f32) {
        match self {
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
        }
    }

    pub fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl TryFrom<u8> for Direction {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(value as usize)
            .copied()
            .ok_or(CodecError::InvalidDirection(value))
    }
}

/// Set of currently held directions, one bit per [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoveMask(u8);

impl MoveMask {
    pub const EMPTY: MoveMask = MoveMask(0);
    pub const ALL_BITS: u8 = 0b1111;

    /// Rejects bytes with anything above the four direction bits.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL_BITS == 0 {
            Some(MoveMask(bits))
        } else {
            None
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn set(&mut self, direction: Direction, held: bool) {
        if held {
            self.0 |= direction.bit();
        } else {
            self.0 &= !direction.bit();
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Direction> for MoveMask {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut mask = MoveMask::EMPTY;
        for direction in iter {
            mask.set(direction, true);
        }
        mask
    }
}

/// Velocity in world units per second.
///
/// Held directions are summed without normalisation, so opposite keys cancel
/// and diagonals move `sqrt(2)` times faster than a single axis.
pub fn velocity(moving: MoveMask) -> (f32, f32) {
    let (dx, dy) = moving
        .directions()
        .map(Direction::vector)
        .fold((0.0, 0.0), |(ax, ay), (vx, vy)| (ax + vx, ay + vy));
    (dx * PLAYER_SPEED, dy * PLAYER_SPEED)
}

/// Position after `dt` seconds, clamped to the world box.
pub fn advance(x: f32, y: f32, moving: MoveMask, dt: f32) -> (f32, f32) {
    let (vx, vy) = velocity(moving);
    let nx = (x + vx * dt).clamp(0.0, WORLD_WIDTH - PLAYER_SIZE);
    let ny = (y + vy * dt).clamp(0.0, WORLD_HEIGHT - PLAYER_SIZE);
    (nx, ny)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn mask(directions: &[Direction]) -> MoveMask {
        directions.iter().copied().collect()
    }

    #[test]
    fn test_direction_bits() {
        assert_eq!(Direction::Left.bit(), 0b0001);
        assert_eq!(Direction::Right.bit(), 0b0010);
        assert_eq!(Direction::Up.bit(), 0b0100);
        assert_eq!(Direction::Down.bit(), 0b1000);
    }

    #[test]
    fn test_direction_try_from() {
        assert_eq!(Direction::try_from(2u8), Ok(Direction::Up));
        assert_eq!(Direction::try_from(4u8), Err(CodecError::InvalidDirection(4)));
    }

    #[test]
    fn test_mask_set_and_clear() {
        let mut moving = MoveMask::EMPTY;
        moving.set(Direction::Up, true);
        moving.set(Direction::Left, true);
        assert!(moving.contains(Direction::Up));
        assert!(moving.contains(Direction::Left));
        assert!(!moving.contains(Direction::Down));

        moving.set(Direction::Up, false);
        assert_eq!(moving, mask(&[Direction::Left]));

        moving.set(Direction::Left, false);
        assert!(moving.is_empty());
    }

    #[test]
    fn test_mask_from_bits_rejects_high_bits() {
        assert_eq!(MoveMask::from_bits(0b1111).map(MoveMask::bits), Some(0b1111));
        assert_eq!(MoveMask::from_bits(0b1_0000), None);
        assert_eq!(MoveMask::from_bits(0xFF), None);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let (x, y) = advance(0.0, 0.0, mask(&[Direction::Left, Direction::Right]), 1.0);
        assert_eq!((x, y), (0.0, 0.0));

        let (x, y) = advance(100.0, 100.0, mask(&[Direction::Up, Direction::Down]), 1.0);
        assert_eq!((x, y), (100.0, 100.0));
    }

    #[test]
    fn test_right_edge_stays_clamped() {
        let edge = WORLD_WIDTH - PLAYER_SIZE;
        for dt in [0.0, 1.0 / 60.0, 0.5, 10.0] {
            let (x, _) = advance(edge, 50.0, mask(&[Direction::Right]), dt);
            assert_eq!(x, edge);
        }
    }

    #[test]
    fn test_clamps_every_edge() {
        let all_out = 100.0;
        let (x, y) = advance(10.0, 10.0, mask(&[Direction::Left, Direction::Up]), all_out);
        assert_eq!((x, y), (0.0, 0.0));

        let (x, y) = advance(10.0, 10.0, mask(&[Direction::Right, Direction::Down]), all_out);
        assert_eq!((x, y), (WORLD_WIDTH - PLAYER_SIZE, WORLD_HEIGHT - PLAYER_SIZE));
    }

    #[test]
    fn test_axis_speed() {
        let (x, y) = advance(100.0, 100.0, mask(&[Direction::Right]), 0.1);
        assert_approx_eq!(x, 100.0 + PLAYER_SPEED * 0.1, 1e-3);
        assert_eq!(y, 100.0);

        let (x, y) = advance(100.0, 300.0, mask(&[Direction::Up]), 0.1);
        assert_eq!(x, 100.0);
        assert_approx_eq!(y, 300.0 - PLAYER_SPEED * 0.1, 1e-3);
    }

    #[test]
    fn test_diagonal_is_not_normalised() {
        let (vx, vy) = velocity(mask(&[Direction::Right, Direction::Down]));
        assert_approx_eq!(vx, PLAYER_SPEED);
        assert_approx_eq!(vy, PLAYER_SPEED);
        let speed = (vx * vx + vy * vy).sqrt();
        assert_approx_eq!(speed, PLAYER_SPEED * std::f32::consts::SQRT_2, 1e-2);
    }

    #[test]
    fn test_no_intent_no_motion() {
        assert_eq!(velocity(MoveMask::EMPTY), (0.0, 0.0));
        assert_eq!(advance(12.0, 34.0, MoveMask::EMPTY, 5.0), (12.0, 34.0));
    }
}
