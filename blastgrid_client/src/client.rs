// The client runtime: one TCP connection to the game server, one UDP
// socket facing the display, and two loops.
//
// - **Forwarder** (background thread): blocks on UDP `recv`, decodes one
//   `InputMessage` per datagram, and writes the corresponding
//   `ClientMessage` to the server. While the session is in the lobby every
//   input turns into `Join(player_name)`. Malformed datagrams — bad tag,
//   direction above 3, short payload, trailing bytes — are logged and
//   dropped without closing anything.
// - **Mirror** (calling thread): streaming-decodes `ServerMessage`s,
//   updates the `WorldView`, and emits snapshot datagrams to the display.
//
// The loops share a single atomic phase flag (Lobby / Playing / Finish).
// Finish is a one-shot latch: either loop may set it, and once set no
// Lobby/Playing transition can overwrite it, so both loops wind down. The
// forwarder may still be parked in `recv` when the mirror returns; process
// exit reaps it, as there is no portable way to interrupt a UDP receive.

use std::io::{self, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use thiserror::Error;

use blastgrid_protocol::{
    encode_to_vec, ClientMessage, Decode, DrawMessage, InputMessage, ServerMessage, StreamBuffer,
    WireError, MAX_UDP_PAYLOAD,
};

use crate::addr::{self, AddrError};
use crate::view::WorldView;

/// Everything the client needs from the command line.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub gui_address: String,
    pub player_name: String,
    pub port: u16,
    pub server_address: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Addr(#[from] AddrError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// How a session came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server connection closed or a transport error occurred.
    ServerClosed,
    /// The server sent a malformed message; the process should exit 1.
    ProtocolError,
}

const PHASE_LOBBY: u8 = 0;
const PHASE_PLAYING: u8 = 1;
const PHASE_FINISH: u8 = 2;

/// The lobby/playing/finish flag shared by the two loops. Finish latches.
#[derive(Clone)]
struct SharedPhase(Arc<AtomicU8>);

impl SharedPhase {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(PHASE_LOBBY)))
    }

    fn is_lobby(&self) -> bool {
        self.0.load(Ordering::SeqCst) == PHASE_LOBBY
    }

    fn is_finished(&self) -> bool {
        self.0.load(Ordering::SeqCst) == PHASE_FINISH
    }

    fn set_lobby(&self) {
        self.transition(PHASE_LOBBY);
    }

    fn set_playing(&self) {
        self.transition(PHASE_PLAYING);
    }

    fn finish(&self) {
        self.0.store(PHASE_FINISH, Ordering::SeqCst);
    }

    fn transition(&self, to: u8) {
        // Never overwrite Finish, even if the other loop latches it
        // between our load and store.
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != PHASE_FINISH).then_some(to)
            });
    }
}

/// A connected client, ready to run its two loops.
pub struct Client {
    server: TcpStream,
    display: UdpSocket,
    display_addr: SocketAddr,
    player_name: String,
}

impl Client {
    /// Resolve both endpoints, connect to the server, and bind the display
    /// socket. The UDP socket's address family follows the resolved
    /// display address so datagrams can actually reach it.
    pub fn connect(config: &ClientConfig) -> Result<Client, ClientError> {
        let server_addr = addr::resolve(&config.server_address)?;
        let display_addr = addr::resolve(&config.gui_address)?;

        let server = TcpStream::connect(server_addr)?;
        server.set_nodelay(true)?;
        info!("connected to server at {server_addr}");

        let bind_addr: SocketAddr = if display_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, config.port).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, config.port).into()
        };
        let display = UdpSocket::bind(bind_addr)?;

        Ok(Client {
            server,
            display,
            display_addr,
            player_name: config.player_name.clone(),
        })
    }

    /// The local address of the display-facing UDP socket (the display
    /// sends its input datagrams here).
    pub fn display_socket_addr(&self) -> io::Result<SocketAddr> {
        self.display.local_addr()
    }

    /// Run until the session ends. The forwarder runs on a background
    /// thread; the mirror runs on the calling thread.
    pub fn run(self) -> Result<SessionEnd, ClientError> {
        let Client {
            server,
            display,
            display_addr,
            player_name,
        } = self;
        let phase = SharedPhase::new();

        let forward_udp = display.try_clone()?;
        let forward_tcp = server.try_clone()?;
        let forward_phase = phase.clone();
        thread::spawn(move || {
            forward_display_input(forward_udp, forward_tcp, forward_phase, player_name);
        });

        mirror_server(server, &display, display_addr, &phase)
    }
}

/// Decode exactly one input message from a datagram; trailing bytes make
/// the whole datagram invalid.
pub fn decode_datagram(data: &[u8]) -> Result<InputMessage, WireError> {
    let mut buf = StreamBuffer::fixed(data);
    let input = InputMessage::decode(&mut buf)?;
    buf.finish()?;
    Ok(input)
}

fn to_server_message(input: InputMessage) -> ClientMessage {
    match input {
        InputMessage::PlaceBomb => ClientMessage::PlaceBomb,
        InputMessage::PlaceBlock => ClientMessage::PlaceBlock,
        InputMessage::Move { direction } => ClientMessage::Move { direction },
    }
}

/// Display → server loop.
fn forward_display_input(
    display: UdpSocket,
    mut server: TcpStream,
    phase: SharedPhase,
    player_name: String,
) {
    let mut datagram = vec![0u8; MAX_UDP_PAYLOAD];
    while !phase.is_finished() {
        let len = match display.recv(&mut datagram) {
            Ok(len) => len,
            Err(e) => {
                error!("display socket read failed: {e}");
                phase.finish();
                return;
            }
        };

        let input = match decode_datagram(&datagram[..len]) {
            Ok(input) => input,
            Err(e) => {
                warn!("dropping display datagram: {e}");
                continue;
            }
        };

        let message = if phase.is_lobby() {
            ClientMessage::Join {
                name: player_name.clone(),
            }
        } else {
            to_server_message(input)
        };

        let bytes = match encode_to_vec(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("unable to encode {message:?}: {e}");
                continue;
            }
        };
        if let Err(e) = server.write_all(&bytes) {
            error!("server write failed: {e}");
            phase.finish();
            return;
        }
    }
}

/// Server → display loop. Returns how the session ended.
fn mirror_server(
    server: TcpStream,
    display: &UdpSocket,
    display_addr: SocketAddr,
    phase: &SharedPhase,
) -> Result<SessionEnd, ClientError> {
    let mut stream = StreamBuffer::streaming(server);
    let mut view = WorldView::new();

    while !phase.is_finished() {
        eprintln!("DEBUG mirror: waiting for message");
        let message = match ServerMessage::decode(&mut stream) {
            Ok(message) => message,
            Err(e) if e.is_transport() => {
                info!("server connection closed: {e}");
                phase.finish();
                return Ok(SessionEnd::ServerClosed);
            }
            Err(e) => {
                error!("invalid message from server: {e}");
                phase.finish();
                return Ok(SessionEnd::ProtocolError);
            }
        };
        eprintln!("DEBUG mirror: got message {message:?}");

        let snapshot = match message {
            ServerMessage::Hello {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
            } => {
                debug!("hello from {server_name:?}");
                view.apply_hello(
                    server_name,
                    players_count,
                    size_x,
                    size_y,
                    game_length,
                    explosion_radius,
                    bomb_timer,
                );
                Some(view.lobby_snapshot())
            }
            ServerMessage::AcceptedPlayer { player_id, player } => {
                info!("player {} accepted: {}", player_id.0, player.name);
                view.apply_accepted_player(player_id, player);
                Some(view.lobby_snapshot())
            }
            ServerMessage::GameStarted { players } => {
                info!("game started with {} players", players.len());
                view.apply_game_started(players);
                phase.set_playing();
                None
            }
            ServerMessage::Turn { turn, events } => {
                debug!("turn {turn}: {} events", events.len());
                view.apply_turn(turn, events);
                let snapshot = view.game_snapshot();
                view.clear_explosions();
                Some(snapshot)
            }
            ServerMessage::GameEnded { scores } => {
                info!("game ended: {scores:?}");
                view.apply_game_ended(scores);
                phase.set_lobby();
                Some(view.lobby_snapshot())
            }
        };

        if let Some(snapshot) = snapshot {
            eprintln!("DEBUG mirror: sending snapshot {snapshot:?} to {display_addr}");
            if let Err(e) = send_snapshot(display, display_addr, &snapshot) {
                error!("display send failed: {e}");
                eprintln!("DEBUG mirror: send failed {e}");
                phase.finish();
                return Ok(SessionEnd::ServerClosed);
            }
            eprintln!("DEBUG mirror: sent ok");
        }
    }

    Ok(SessionEnd::ServerClosed)
}

fn send_snapshot(
    display: &UdpSocket,
    display_addr: SocketAddr,
    snapshot: &DrawMessage,
) -> Result<(), ClientError> {
    let bytes = encode_to_vec(snapshot)?;
    display.send_to(&bytes, display_addr)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use blastgrid_protocol::Direction;

    use super::*;

    #[test]
    fn valid_datagrams_decode() {
        assert_eq!(decode_datagram(&[0]).unwrap(), InputMessage::PlaceBomb);
        assert_eq!(decode_datagram(&[1]).unwrap(), InputMessage::PlaceBlock);
        assert_eq!(
            decode_datagram(&[2, 3]).unwrap(),
            InputMessage::Move {
                direction: Direction::Left,
            }
        );
    }

    #[test]
    fn trailing_bytes_invalidate_the_datagram() {
        let err = decode_datagram(&[2, 0, 9]).unwrap_err();
        assert!(matches!(err, WireError::TrailingBytes(1)));
    }

    #[test]
    fn short_datagram_is_incomplete() {
        let err = decode_datagram(&[2]).unwrap_err();
        assert!(matches!(err, WireError::Incomplete { .. }));
    }

    #[test]
    fn unknown_input_tag_is_rejected() {
        let err = decode_datagram(&[9]).unwrap_err();
        assert!(matches!(err, WireError::UnknownMessageId(9)));
    }

    #[test]
    fn direction_above_three_is_dropped() {
        let err = decode_datagram(&[2, 7]).unwrap_err();
        assert!(matches!(err, WireError::InvalidDirection(7)));
    }

    #[test]
    fn inputs_map_onto_client_messages() {
        assert_eq!(
            to_server_message(InputMessage::PlaceBomb),
            ClientMessage::PlaceBomb
        );
        assert_eq!(
            to_server_message(InputMessage::PlaceBlock),
            ClientMessage::PlaceBlock
        );
        assert_eq!(
            to_server_message(InputMessage::Move {
                direction: Direction::Up,
            }),
            ClientMessage::Move {
                direction: Direction::Up,
            }
        );
    }

    #[test]
    fn finish_latch_cannot_be_overwritten() {
        let phase = SharedPhase::new();
        assert!(phase.is_lobby());
        phase.set_playing();
        assert!(!phase.is_lobby());
        phase.finish();
        phase.set_lobby();
        phase.set_playing();
        assert!(phase.is_finished());
    }
}
