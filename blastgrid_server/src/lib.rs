// blastgrid_server — the authoritative game server.
//
// Module overview:
// - `rng.rs`:     deterministic MINSTD generator for board setup.
// - `game.rs`:    the pure turn-based simulation (lobby, admission, intent
//                 resolution, turn numbering). No sockets.
// - `session.rs`: connected-client map, broadcasts, and the game lifecycle,
//                 mutated only from the owner thread.
// - `server.rs`:  listener/reader threads, the owner event loop driving the
//                 turn timer, and the `start_server` control surface.
//
// The binary in `main.rs` is a thin shell: parse arguments, start the
// server, run until killed.

pub mod game;
pub mod rng;
pub mod server;
pub mod session;

pub use server::{start_server, ServerConfig, ServerHandle};
