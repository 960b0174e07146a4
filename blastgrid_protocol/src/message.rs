// The five message families exchanged between client, server, and display.
//
// - `ClientMessage`: game client → server, over TCP.
// - `ServerMessage`: server → game client, over TCP.
// - `Event`: a world-state change, nested inside `ServerMessage::Turn`.
// - `DrawMessage`: game client → display, one UDP datagram each.
// - `InputMessage`: display → game client, one UDP datagram each.
//
// Each enum is a tagged union on the wire: one byte equal to the variant's
// index, then the variant's fields in declaration order. The declaration
// order below is therefore authoritative; reordering a variant or a field
// changes the wire format. Decoding an unknown tag fails with
// `UnknownMessageId` and consumes nothing beyond the tag byte.

use std::collections::BTreeMap;
use std::io::Read;

use crate::buffer::StreamBuffer;
use crate::codec::{Decode, Encode};
use crate::error::WireError;
use crate::types::{Bomb, BombId, Direction, Player, PlayerId, Position};

/// Messages sent by a game client to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Ask to be admitted to the lobby under `name`.
    Join { name: String },
    /// Place a bomb at the current position (reserved; inert server-side).
    PlaceBomb,
    /// Place a block at the current position (reserved; inert server-side).
    PlaceBlock,
    /// Move one cell in `direction`.
    Move { direction: Direction },
}

/// Messages sent by the server to every game client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// First message on every connection: the static game parameters.
    Hello {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
    },
    /// A player was admitted to the lobby.
    AcceptedPlayer { player_id: PlayerId, player: Player },
    /// The lobby filled; the game begins with this roster.
    GameStarted {
        players: BTreeMap<PlayerId, Player>,
    },
    /// One simulation step: the ordered events of turn `turn`.
    Turn { turn: u16, events: Vec<Event> },
    /// The game is over; final score per player.
    GameEnded {
        scores: BTreeMap<PlayerId, u32>,
    },
}

/// An authoritative world-state change, carried inside a `Turn`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    BombPlaced {
        bomb_id: BombId,
        position: Position,
    },
    BombExploded {
        bomb_id: BombId,
        robots_destroyed: Vec<PlayerId>,
        blocks_destroyed: Vec<Position>,
    },
    PlayerMoved {
        player_id: PlayerId,
        position: Position,
    },
    BlockPlaced {
        position: Position,
    },
}

/// Snapshot datagrams the game client sends to the display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawMessage {
    Lobby {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
        players: BTreeMap<PlayerId, Player>,
    },
    Game {
        server_name: String,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        turn: u16,
        players: BTreeMap<PlayerId, Player>,
        player_positions: BTreeMap<PlayerId, Position>,
        blocks: Vec<Position>,
        bombs: Vec<Bomb>,
        explosions: Vec<Position>,
        scores: BTreeMap<PlayerId, u32>,
    },
}

/// Input datagrams the display sends to the game client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputMessage {
    PlaceBomb,
    PlaceBlock,
    Move { direction: Direction },
}

impl Encode for ClientMessage {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            ClientMessage::Join { name } => {
                out.push(0);
                name.encode(out)
            }
            ClientMessage::PlaceBomb => {
                out.push(1);
                Ok(())
            }
            ClientMessage::PlaceBlock => {
                out.push(2);
                Ok(())
            }
            ClientMessage::Move { direction } => {
                out.push(3);
                direction.encode(out)
            }
        }
    }
}

impl Decode for ClientMessage {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        match u8::decode(buf)? {
            0 => Ok(ClientMessage::Join {
                name: String::decode(buf)?,
            }),
            1 => Ok(ClientMessage::PlaceBomb),
            2 => Ok(ClientMessage::PlaceBlock),
            3 => Ok(ClientMessage::Move {
                direction: Direction::decode(buf)?,
            }),
            tag => Err(WireError::UnknownMessageId(tag)),
        }
    }
}

impl Encode for ServerMessage {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            ServerMessage::Hello {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
            } => {
                out.push(0);
                server_name.encode(out)?;
                players_count.encode(out)?;
                size_x.encode(out)?;
                size_y.encode(out)?;
                game_length.encode(out)?;
                explosion_radius.encode(out)?;
                bomb_timer.encode(out)
            }
            ServerMessage::AcceptedPlayer { player_id, player } => {
                out.push(1);
                player_id.encode(out)?;
                player.encode(out)
            }
            ServerMessage::GameStarted { players } => {
                out.push(2);
                players.encode(out)
            }
            ServerMessage::Turn { turn, events } => {
                out.push(3);
                turn.encode(out)?;
                events.encode(out)
            }
            ServerMessage::GameEnded { scores } => {
                out.push(4);
                scores.encode(out)
            }
        }
    }
}

impl Decode for ServerMessage {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        match u8::decode(buf)? {
            0 => Ok(ServerMessage::Hello {
                server_name: String::decode(buf)?,
                players_count: u8::decode(buf)?,
                size_x: u16::decode(buf)?,
                size_y: u16::decode(buf)?,
                game_length: u16::decode(buf)?,
                explosion_radius: u16::decode(buf)?,
                bomb_timer: u16::decode(buf)?,
            }),
            1 => Ok(ServerMessage::AcceptedPlayer {
                player_id: PlayerId::decode(buf)?,
                player: Player::decode(buf)?,
            }),
            2 => Ok(ServerMessage::GameStarted {
                players: BTreeMap::decode(buf)?,
            }),
            3 => Ok(ServerMessage::Turn {
                turn: u16::decode(buf)?,
                events: Vec::decode(buf)?,
            }),
            4 => Ok(ServerMessage::GameEnded {
                scores: BTreeMap::decode(buf)?,
            }),
            tag => Err(WireError::UnknownMessageId(tag)),
        }
    }
}

impl Encode for Event {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            Event::BombPlaced { bomb_id, position } => {
                out.push(0);
                bomb_id.encode(out)?;
                position.encode(out)
            }
            Event::BombExploded {
                bomb_id,
                robots_destroyed,
                blocks_destroyed,
            } => {
                out.push(1);
                bomb_id.encode(out)?;
                robots_destroyed.encode(out)?;
                blocks_destroyed.encode(out)
            }
            Event::PlayerMoved {
                player_id,
                position,
            } => {
                out.push(2);
                player_id.encode(out)?;
                position.encode(out)
            }
            Event::BlockPlaced { position } => {
                out.push(3);
                position.encode(out)
            }
        }
    }
}

impl Decode for Event {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        match u8::decode(buf)? {
            0 => Ok(Event::BombPlaced {
                bomb_id: BombId::decode(buf)?,
                position: Position::decode(buf)?,
            }),
            1 => Ok(Event::BombExploded {
                bomb_id: BombId::decode(buf)?,
                robots_destroyed: Vec::decode(buf)?,
                blocks_destroyed: Vec::decode(buf)?,
            }),
            2 => Ok(Event::PlayerMoved {
                player_id: PlayerId::decode(buf)?,
                position: Position::decode(buf)?,
            }),
            3 => Ok(Event::BlockPlaced {
                position: Position::decode(buf)?,
            }),
            tag => Err(WireError::UnknownMessageId(tag)),
        }
    }
}

impl Encode for DrawMessage {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            DrawMessage::Lobby {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
                players,
            } => {
                out.push(0);
                server_name.encode(out)?;
                players_count.encode(out)?;
                size_x.encode(out)?;
                size_y.encode(out)?;
                game_length.encode(out)?;
                explosion_radius.encode(out)?;
                bomb_timer.encode(out)?;
                players.encode(out)
            }
            DrawMessage::Game {
                server_name,
                size_x,
                size_y,
                game_length,
                turn,
                players,
                player_positions,
                blocks,
                bombs,
                explosions,
                scores,
            } => {
                out.push(1);
                server_name.encode(out)?;
                size_x.encode(out)?;
                size_y.encode(out)?;
                game_length.encode(out)?;
                turn.encode(out)?;
                players.encode(out)?;
                player_positions.encode(out)?;
                blocks.encode(out)?;
                bombs.encode(out)?;
                explosions.encode(out)?;
                scores.encode(out)
            }
        }
    }
}

impl Decode for DrawMessage {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        match u8::decode(buf)? {
            0 => Ok(DrawMessage::Lobby {
                server_name: String::decode(buf)?,
                players_count: u8::decode(buf)?,
                size_x: u16::decode(buf)?,
                size_y: u16::decode(buf)?,
                game_length: u16::decode(buf)?,
                explosion_radius: u16::decode(buf)?,
                bomb_timer: u16::decode(buf)?,
                players: BTreeMap::decode(buf)?,
            }),
            1 => Ok(DrawMessage::Game {
                server_name: String::decode(buf)?,
                size_x: u16::decode(buf)?,
                size_y: u16::decode(buf)?,
                game_length: u16::decode(buf)?,
                turn: u16::decode(buf)?,
                players: BTreeMap::decode(buf)?,
                player_positions: BTreeMap::decode(buf)?,
                blocks: Vec::decode(buf)?,
                bombs: Vec::decode(buf)?,
                explosions: Vec::decode(buf)?,
                scores: BTreeMap::decode(buf)?,
            }),
            tag => Err(WireError::UnknownMessageId(tag)),
        }
    }
}

impl Encode for InputMessage {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            InputMessage::PlaceBomb => {
                out.push(0);
                Ok(())
            }
            InputMessage::PlaceBlock => {
                out.push(1);
                Ok(())
            }
            InputMessage::Move { direction } => {
                out.push(2);
                direction.encode(out)
            }
        }
    }
}

impl Decode for InputMessage {
    fn decode<R: Read>(buf: &mut StreamBuffer<R>) -> Result<Self, WireError> {
        match u8::decode(buf)? {
            0 => Ok(InputMessage::PlaceBomb),
            1 => Ok(InputMessage::PlaceBlock),
            2 => Ok(InputMessage::Move {
                direction: Direction::decode(buf)?,
            }),
            tag => Err(WireError::UnknownMessageId(tag)),
        }
    }
}
