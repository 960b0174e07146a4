// Connected-client bookkeeping and the game lifecycle, driven by the owner
// thread in `server.rs`.
//
// `Session` owns the client map and the `Game`. All mutation happens through
// methods called from the server's single-threaded event loop — no internal
// locking. Because broadcasts also happen here, on the same thread, every
// client's byte stream stays well-formed and a `Turn` can never interleave
// with an `AcceptedPlayer`.
//
// Writing to client streams: `Session` keeps the accepted `TcpStream`s and
// writes whole pre-encoded messages to them. A write error on one client is
// logged and that connection dropped; the remaining clients are unaffected
// and the game loop never stalls on a dead peer.
//
// Disconnects during a game remove only the connection. The player keeps
// their slot in the simulation and simply stops producing intents; the
// game runs to completion with ghost players.

use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, error, info, warn};

use blastgrid_protocol::{encode_to_vec, ClientMessage, PlayerId, ServerMessage, WireError};

use crate::game::{Game, Intent, Phase};
use crate::server::ServerConfig;

struct ClientConn {
    stream: TcpStream,
    player_id: Option<PlayerId>,
}

/// All server-side state: connected clients plus the simulation.
pub struct Session {
    config: ServerConfig,
    game: Game,
    clients: HashMap<SocketAddr, ClientConn>,
    // Hello is identical for every connection, so it is encoded once.
    hello: Vec<u8>,
}

impl Session {
    pub fn new(config: ServerConfig) -> Result<Self, WireError> {
        let hello = encode_to_vec(&config.hello())?;
        let game = Game::new(config.rules(), config.seed);
        Ok(Self {
            config,
            game,
            clients: HashMap::new(),
            hello,
        })
    }

    pub fn is_playing(&self) -> bool {
        self.game.phase() == Phase::Playing
    }

    pub fn turn_duration(&self) -> Duration {
        Duration::from_millis(self.config.turn_duration)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Enroll a freshly accepted connection. Hello is written before the
    /// client enters the map, so it precedes anything broadcast to them.
    /// Returns false (and drops the socket) if Hello cannot be delivered.
    pub fn client_connected(&mut self, stream: TcpStream, peer: SocketAddr) -> bool {
        if let Err(e) = (&stream).write_all(&self.hello) {
            warn!("unable to send hello to {peer}: {e}");
            return false;
        }
        info!("connected: {peer}");
        self.clients.insert(
            peer,
            ClientConn {
                stream,
                player_id: None,
            },
        );
        true
    }

    /// Remove a connection and shut its socket down. The simulation is
    /// untouched.
    pub fn client_closed(&mut self, peer: SocketAddr) {
        if let Some(conn) = self.clients.remove(&peer) {
            info!("disconnected: {peer}");
            let _ = conn.stream.shutdown(Shutdown::Both);
        }
    }

    pub fn handle_message(&mut self, peer: SocketAddr, message: ClientMessage) {
        match message {
            ClientMessage::Join { name } => self.handle_join(peer, name),
            ClientMessage::PlaceBomb => self.latch(peer, Intent::PlaceBomb),
            ClientMessage::PlaceBlock => self.latch(peer, Intent::PlaceBlock),
            ClientMessage::Move { direction } => self.latch(peer, Intent::Move(direction)),
        }
    }

    /// Resolve the next turn and broadcast it; finish the game after the
    /// last one. Called by the owner loop when the turn timer fires.
    pub fn advance_turn(&mut self) {
        let (turn, events) = self.game.next_turn();
        debug!("broadcasting turn {turn}");
        self.broadcast(&ServerMessage::Turn { turn, events });
        if self.game.is_final_turn() {
            self.finish_game();
        }
    }

    fn handle_join(&mut self, peer: SocketAddr, name: String) {
        if self.game.phase() != Phase::Lobby {
            // Late join: this client only gets the current roster. Past
            // turns are retained in the game's log but never replayed.
            self.send_roster(peer);
            return;
        }
        let Some(conn) = self.clients.get(&peer) else {
            return;
        };
        if conn.player_id.is_some() {
            return;
        }
        let Some((player_id, player)) = self.game.admit(name, peer.to_string()) else {
            self.send_roster(peer);
            return;
        };
        if let Some(conn) = self.clients.get_mut(&peer) {
            conn.player_id = Some(player_id);
        }
        info!("{peer} joins as player {}", player_id.0);
        self.broadcast(&ServerMessage::AcceptedPlayer { player_id, player });
        if self.game.is_full() {
            self.start_game();
        }
    }

    fn latch(&mut self, peer: SocketAddr, intent: Intent) {
        if self.game.phase() != Phase::Playing {
            return;
        }
        let Some(conn) = self.clients.get(&peer) else {
            return;
        };
        if let Some(player_id) = conn.player_id {
            self.game.latch_intent(player_id, intent);
        }
    }

    fn start_game(&mut self) {
        info!("lobby full, generating new board");
        let events = self.game.begin();
        self.broadcast(&ServerMessage::GameStarted {
            players: self.game.roster(),
        });
        if self.config.game_length == 0 {
            self.finish_game();
            return;
        }
        self.broadcast(&ServerMessage::Turn { turn: 0, events });
        if self.game.is_final_turn() {
            self.finish_game();
        }
    }

    fn finish_game(&mut self) {
        info!("game over");
        for conn in self.clients.values_mut() {
            conn.player_id = None;
        }
        let scores = self.game.finish();
        self.broadcast(&ServerMessage::GameEnded { scores });
    }

    fn send_roster(&mut self, peer: SocketAddr) {
        for (player_id, player) in self.game.roster() {
            self.send_to(peer, &ServerMessage::AcceptedPlayer { player_id, player });
        }
    }

    fn send_to(&mut self, peer: SocketAddr, message: &ServerMessage) {
        let bytes = match encode_to_vec(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("unable to encode message: {e}");
                return;
            }
        };
        let failed = match self.clients.get(&peer) {
            Some(conn) => (&conn.stream).write_all(&bytes).is_err(),
            None => false,
        };
        if failed {
            warn!("write to {peer} failed");
            self.client_closed(peer);
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let bytes = match encode_to_vec(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("unable to encode broadcast: {e}");
                return;
            }
        };
        let mut failed = Vec::new();
        for (peer, conn) in &self.clients {
            if let Err(e) = (&conn.stream).write_all(&bytes) {
                warn!("write to {peer} failed: {e}");
                failed.push(*peer);
            }
        }
        for peer in failed {
            self.client_closed(peer);
        }
    }
}
