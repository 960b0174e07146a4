// CLI entry point for the blastgrid game client.
//
// Connects to the game server over TCP, binds a local UDP port for the
// display, and shuttles messages between the two until the server goes
// away. Exit code 0 on a clean end, 1 on argument/resolution failure or a
// protocol error from the server.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use blastgrid_client::{Client, ClientConfig, SessionEnd};

#[derive(Parser, Debug)]
#[command(name = "blastgrid-client", about = "Blastgrid game client")]
struct Args {
    /// Display endpoint, as host:port.
    #[arg(short = 'd', long)]
    gui_address: String,

    /// Name to join games under.
    #[arg(short = 'n', long)]
    player_name: String,

    /// Local UDP port to receive display input on.
    #[arg(short = 'p', long)]
    port: u16,

    /// Game server endpoint, as host:port.
    #[arg(short = 's', long)]
    server_address: String,
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

    let config = ClientConfig {
        gui_address: args.gui_address,
        player_name: args.player_name,
        port: args.port,
        server_address: args.server_address,
    };

    let client = match Client::connect(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match client.run() {
        Ok(SessionEnd::ServerClosed) => ExitCode::SUCCESS,
        Ok(SessionEnd::ProtocolError) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
