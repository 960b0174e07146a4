// TCP server and owner event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections, sets `TCP_NODELAY`, and sends `ServerEvent::Accepted` to
//   the owner thread.
// - **Reader threads** (one per client): streaming-decode `ClientMessage`s
//   and send `ServerEvent::Message` to the owner. On a decode or transport
//   error they send `ServerEvent::Closed` and stop. A `Move` with a
//   direction above 3 fails at decode, so a malformed client is
//   disconnected without ever reaching the simulation.
// - **Owner thread**: owns the `Session`, receives events from the channel,
//   and performs every broadcast. `recv_timeout` against the next turn
//   deadline doubles as the turn timer, so there is no separate timer
//   thread and intents arriving mid-broadcast land in a later turn by
//   construction.
//
// The owner thread is the only writer to client sockets; reader threads
// only read. Shutdown: `ServerHandle::stop` clears the `keep_running` flag,
// and both the listener (nonblocking accept) and the owner (bounded waits)
// notice within tens of milliseconds.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use blastgrid_protocol::{ClientMessage, Decode, ServerMessage, StreamBuffer};

use crate::game::GameRules;
use crate::session::Session;

/// Events sent from the listener and reader threads to the owner thread.
enum ServerEvent {
    Accepted {
        stream: TcpStream,
        peer: SocketAddr,
    },
    Message {
        peer: SocketAddr,
        message: ClientMessage,
    },
    Closed {
        peer: SocketAddr,
    },
}

/// Full server configuration, straight from the CLI.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_name: String,
    pub port: u16,
    pub bomb_timer: u16,
    pub players_count: u8,
    pub turn_duration: u64,
    pub explosion_radius: u16,
    pub initial_blocks: u16,
    pub game_length: u16,
    pub size_x: u16,
    pub size_y: u16,
    pub seed: u32,
}

impl ServerConfig {
    pub(crate) fn rules(&self) -> GameRules {
        GameRules {
            players_count: self.players_count,
            size_x: self.size_x,
            size_y: self.size_y,
            game_length: self.game_length,
            initial_blocks: self.initial_blocks,
        }
    }

    /// The greeting every connection receives first.
    pub fn hello(&self) -> ServerMessage {
        ServerMessage::Hello {
            server_name: self.server_name.clone(),
            players_count: self.players_count,
            size_x: self.size_x,
            size_y: self.size_y,
            game_length: self.game_length,
            explosion_radius: self.explosion_radius,
            bomb_timer: self.bomb_timer,
        }
    }
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for the owner thread to exit.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping
/// it and the actual bound address (useful when port 0 lets the OS pick).
pub fn start_server(config: ServerConfig) -> io::Result<(ServerHandle, SocketAddr)> {
    let port = config.port;
    let session = Session::new(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let listener = TcpListener::bind(("0.0.0.0", port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_owner = keep_running.clone();

    let thread = thread::spawn(move || {
        run_server(listener, session, keep_running_owner);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Owner loop. Runs until `keep_running` is cleared.
fn run_server(listener: TcpListener, mut session: Session, keep_running: Arc<AtomicBool>) {
    let (tx, rx): (Sender<ServerEvent>, Receiver<ServerEvent>) = mpsc::channel();

    // Nonblocking accept so the listener thread can observe shutdown.
    listener.set_nonblocking(true).ok();
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false).ok();
                    stream.set_nodelay(true).ok();
                    let _ = tx_listener.send(ServerEvent::Accepted { stream, peer });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    // How long to block for events while no game is running.
    let idle = Duration::from_millis(50);
    let mut next_turn_at: Option<Instant> = None;

    while keep_running.load(Ordering::SeqCst) {
        if let Some(deadline) = next_turn_at {
            if Instant::now() >= deadline {
                session.advance_turn();
                next_turn_at = if session.is_playing() {
                    Some(Instant::now() + session.turn_duration())
                } else {
                    None
                };
                continue;
            }
        }

        let timeout = match next_turn_at {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => idle,
        };
        match rx.recv_timeout(timeout) {
            Ok(event) => {
                let was_playing = session.is_playing();
                handle_event(&mut session, event, &tx, &keep_running);
                // A Join that filled the lobby just started the game.
                if !was_playing && session.is_playing() {
                    next_turn_at = Some(Instant::now() + session.turn_duration());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn handle_event(
    session: &mut Session,
    event: ServerEvent,
    tx: &Sender<ServerEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        ServerEvent::Accepted { stream, peer } => {
            let read_half = match stream.try_clone() {
                Ok(clone) => clone,
                Err(e) => {
                    warn!("unable to clone socket for {peer}: {e}");
                    return;
                }
            };
            if !session.client_connected(stream, peer) {
                return;
            }
            let tx_reader = tx.clone();
            let keep_running_reader = keep_running.clone();
            thread::spawn(move || {
                reader_loop(read_half, peer, tx_reader, keep_running_reader);
            });
        }
        ServerEvent::Message { peer, message } => {
            session.handle_message(peer, message);
        }
        ServerEvent::Closed { peer } => {
            session.client_closed(peer);
        }
    }
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(
    stream: TcpStream,
    peer: SocketAddr,
    tx: Sender<ServerEvent>,
    keep_running: Arc<AtomicBool>,
) {
    let mut buf = StreamBuffer::streaming(stream);
    while keep_running.load(Ordering::SeqCst) {
        match ClientMessage::decode(&mut buf) {
            Ok(message) => {
                if tx.send(ServerEvent::Message { peer, message }).is_err() {
                    break;
                }
            }
            Err(e) => {
                if e.is_transport() {
                    debug!("read from {peer} ended: {e}");
                } else {
                    warn!("protocol error from {peer}: {e}");
                }
                let _ = tx.send(ServerEvent::Closed { peer });
                break;
            }
        }
    }
}
