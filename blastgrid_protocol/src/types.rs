// Core domain types shared by server and client.
//
// These are the building blocks of every message: compact integer ids, grid
// positions, and the bare records (`Bomb`, `Player`) that appear nested
// inside messages without a tag of their own. All positions live on a
// `size_x × size_y` grid with the origin at (0,0), x increasing east and
// y increasing north.

use std::io::Read;

use crate::buffer::StreamBuffer;
use crate::codec::{Decode, Encode};
use crate::error::WireError;

/// Maximum payload of a single UDP datagram on the display link:
/// 65535 minus a 20-byte IP header and an 8-byte UDP header.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Server-assigned player id, contiguous from 0 in admission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u8);

/// Server-assigned bomb id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BombId(pub u32);

/// A movement direction. The wire value is the discriminant; anything
/// above 3 fails to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// The unit step of this direction, in (dx, dy) with +y pointing north.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Right => (1, 0),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    pub fn from_wire(value: u8) -> Result<Self, WireError> {
        match value {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            other => Err(WireError::InvalidDirection(other)),
        }
    }
}

/// A cell on the grid. Ordering is lexicographic (x, y), which is the
/// order explosion cells are presented to the display in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// The neighboring cell in `direction`, or `None` if the step would
    /// leave a `size_x × size_y` board.
    pub fn step(self, direction: Direction, size_x: u16, size_y: u16) -> Option<Position> {
        let (dx, dy) = direction.offset();
        let x = i32::from(self.x) + dx;
        let y = i32::from(self.y) + dy;
        if x < 0 || x >= i32::from(size_x) || y < 0 || y >= i32::from(size_y) {
            return None;
        }
        Some(Position::new(x as u16, y as u16))
    }
}

/// A live bomb as the display sees it: where it is and how many turns are
/// left on its fuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bomb {
    pub position: Position,
    pub timer: u16,
}

/// Public identity of an admitted player. `address` is the server's string
/// rendering of the TCP peer endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub address: String,
}

impl Encode for PlayerId {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        self.0.encode(out)
    }
}

impl Decode for PlayerId {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        Ok(PlayerId(u8::decode(buf)?))
    }
}

impl Encode for BombId {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        self.0.encode(out)
    }
}

impl Decode for BombId {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        Ok(BombId(u32::decode(buf)?))
    }
}

impl Encode for Direction {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        self.to_wire().encode(out)
    }
}

impl Decode for Direction {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        Direction::from_wire(u8::decode(buf)?)
    }
}

impl Encode for Position {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        self.x.encode(out)?;
        self.y.encode(out)
    }
}

impl Decode for Position {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        let x = u16::decode(buf)?;
        let y = u16::decode(buf)?;
        Ok(Position { x, y })
    }
}

impl Encode for Bomb {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        self.position.encode(out)?;
        self.timer.encode(out)
    }
}

impl Decode for Bomb {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        let position = Position::decode(buf)?;
        let timer = u16::decode(buf)?;
        Ok(Bomb { position, timer })
    }
}

impl Encode for Player {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        self.name.encode(out)?;
        self.address.encode(out)
    }
}

impl Decode for Player {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        let name = String::decode(buf)?;
        let address = String::decode(buf)?;
        Ok(Player { name, address })
    }
}
