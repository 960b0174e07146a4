// blastgrid_client — the per-player game client.
//
// The client is a thin state mirror and forwarding shim between three
// endpoints: a TCP connection to the authoritative server, and a UDP
// socket exchanged with the local display process.
//
// Module overview:
// - `addr.rs`:   `host:port` splitting (last colon) and resolution.
// - `view.rs`:   `WorldView`, the client-side reconstruction of the world
//                from server turn events, including explosion geometry.
// - `client.rs`: the two loops (display→server forwarder, server→display
//                mirror), the shared phase latch, and `Client`.

pub mod addr;
pub mod client;
pub mod view;

pub use client::{Client, ClientConfig, ClientError, SessionEnd};
pub use view::WorldView;
