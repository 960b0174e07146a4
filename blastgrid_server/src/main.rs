// CLI entry point for the blastgrid game server.
//
// Starts the authoritative server: clients connect over TCP, the lobby
// fills to --players-count, and the server then broadcasts --game-length
// turns at --turn-duration millisecond cadence before reopening the lobby.
// See `server.rs` for the threading architecture and `session.rs` for the
// game lifecycle.

use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::error::ErrorKind;
use clap::Parser;
use log::info;

use blastgrid_server::{start_server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "blastgrid-server", about = "Authoritative blastgrid game server")]
struct Args {
    /// Turns a bomb ticks before exploding.
    #[arg(short = 'b', long)]
    bomb_timer: u16,

    /// Players required to start a game.
    #[arg(short = 'c', long)]
    players_count: u8,

    /// Milliseconds between turns.
    #[arg(short = 'd', long)]
    turn_duration: u64,

    /// Reach of an explosion arm, in cells.
    #[arg(short = 'e', long)]
    explosion_radius: u16,

    /// Blocks scattered on the board at game start.
    #[arg(short = 'k', long)]
    initial_blocks: u16,

    /// Number of turns per game.
    #[arg(short = 'l', long)]
    game_length: u16,

    /// Name announced in the Hello message.
    #[arg(short = 'n', long)]
    server_name: String,

    /// TCP port to listen on.
    #[arg(short = 'p', long)]
    port: u16,

    /// Board generation seed (default: wall clock).
    #[arg(short = 's', long)]
    seed: Option<u32>,

    /// Board width.
    #[arg(short = 'x', long)]
    size_x: u16,

    /// Board height.
    #[arg(short = 'y', long)]
    size_y: u16,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    let seed = args.seed.unwrap_or_else(wall_clock_seed);
    let config = ServerConfig {
        server_name: args.server_name,
        port: args.port,
        bomb_timer: args.bomb_timer,
        players_count: args.players_count,
        turn_duration: args.turn_duration,
        explosion_radius: args.explosion_radius,
        initial_blocks: args.initial_blocks,
        game_length: args.game_length,
        size_x: args.size_x,
        size_y: args.size_y,
        seed,
    };

    let (_handle, addr) = match start_server(config) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("failed to start server: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on {addr}");

    // The server runs until the process is killed; SIGINT/SIGTERM tear the
    // worker threads down with it.
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn wall_clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u32)
        .unwrap_or(1)
}
