// blastgrid_protocol — wire protocol for the bomb game.
//
// This crate defines the binary message format shared by the game server,
// the game client, and the display link. It is the only place that knows
// how bytes are laid out; the server and client crates consume it and never
// touch raw encodings themselves.
//
// Module overview:
// - `types.rs`:   domain primitives — `PlayerId`, `BombId`, `Direction`,
//                 `Position`, `Bomb`, `Player`.
// - `codec.rs`:   the structural encoding rules (`Encode`/`Decode`):
//                 big-endian integers, length-prefixed strings, counted
//                 sequences and mappings.
// - `message.rs`: the five message families as tagged unions.
// - `buffer.rs`:  `StreamBuffer` — fixed (datagram) and streaming (TCP)
//                 decode buffers.
// - `error.rs`:   `WireError`.
//
// Design decisions:
// - **Self-delimiting messages.** There is no outer length frame on TCP;
//   message boundaries fall out of decoding. The streaming buffer refills
//   exactly the bytes the decoder still needs.
// - **No async runtime.** Decoding is generic over `std::io::Read`, so it
//   works against blocking `TcpStream`s, in-memory cursors, and datagrams
//   alike.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod message;
pub mod types;

pub use buffer::StreamBuffer;
pub use codec::{encode_to_vec, Decode, Encode};
pub use error::WireError;
pub use message::{ClientMessage, DrawMessage, Event, InputMessage, ServerMessage};
pub use types::{Bomb, BombId, Direction, Player, PlayerId, Position, MAX_UDP_PAYLOAD};
