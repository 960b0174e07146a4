// Test-only game client for end-to-end tests.
//
// `TestPlayer` speaks the real wire protocol over a real TCP connection,
// but synchronously: `recv` blocks (with a timeout, so a missing message
// fails the test instead of hanging it) and decoding uses the same
// `StreamBuffer` the production client uses. The only test-specific code is
// the panicking convenience wrappers.
//
// See `tests/full_game.rs` for the scenarios built on top of this.

use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use blastgrid_protocol::{
    encode_to_vec, ClientMessage, Decode, ServerMessage, StreamBuffer, WireError,
};

/// How long a blocking `recv` waits before failing the test.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A synchronous protocol-level client for driving a real server.
pub struct TestPlayer {
    stream: TcpStream,
    inbox: StreamBuffer<TcpStream>,
}

impl TestPlayer {
    /// Connect to a server listening on `port` on localhost.
    pub fn connect(port: u16) -> TestPlayer {
        let stream = TcpStream::connect(("127.0.0.1", port)).expect("connect failed");
        stream.set_nodelay(true).expect("set_nodelay failed");
        let read_half = stream.try_clone().expect("clone failed");
        read_half
            .set_read_timeout(Some(RECV_TIMEOUT))
            .expect("set_read_timeout failed");
        TestPlayer {
            stream,
            inbox: StreamBuffer::streaming(read_half),
        }
    }

    pub fn send(&mut self, message: &ClientMessage) {
        let bytes = encode_to_vec(message).expect("encode failed");
        self.stream.write_all(&bytes).expect("send failed");
    }

    /// Write arbitrary bytes, for protocol-violation scenarios the typed
    /// API cannot express.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("send_raw failed");
    }

    pub fn join(&mut self, name: &str) {
        self.send(&ClientMessage::Join { name: name.into() });
    }

    /// Blocking receive; panics if the connection errors or times out.
    pub fn recv(&mut self) -> ServerMessage {
        self.try_recv().expect("recv failed")
    }

    /// Blocking receive that surfaces errors, for scenarios where the
    /// server is expected to drop the connection.
    pub fn try_recv(&mut self) -> Result<ServerMessage, WireError> {
        ServerMessage::decode(&mut self.inbox)
    }

    /// Read one message and require it to be the Hello greeting.
    pub fn expect_hello(&mut self) {
        match self.recv() {
            ServerMessage::Hello { .. } => {}
            other => panic!("expected Hello, got {other:?}"),
        }
    }
}
