// End-to-end tests for the server and client over real sockets.
//
// Each test starts a real server on an ephemeral port, connects
// `TestPlayer`s (and, in the last scenario, the real `Client` with a
// scripted display socket), and verifies the observable message sequences.
//
// Sequencing note: a connection is only guaranteed to see a broadcast once
// its Hello has arrived: Hello is written when the owner thread enrolls
// the connection, so reading it is the synchronization point the tests use
// before sending Joins.

use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use blastgrid_client::{Client, ClientConfig, SessionEnd};
use blastgrid_protocol::{
    encode_to_vec, ClientMessage, Decode, Direction, DrawMessage, Event, InputMessage, PlayerId,
    Position, ServerMessage, StreamBuffer, MAX_UDP_PAYLOAD,
};
use blastgrid_server::{start_server, ServerConfig, ServerHandle};
use blastgrid_tests::TestPlayer;

fn start_test_server(
    players_count: u8,
    game_length: u16,
    size_x: u16,
    size_y: u16,
    turn_duration: u64,
) -> (ServerHandle, u16) {
    let config = ServerConfig {
        server_name: "integration".into(),
        port: 0,
        bomb_timer: 3,
        players_count,
        turn_duration,
        explosion_radius: 2,
        initial_blocks: 0,
        game_length,
        size_x,
        size_y,
        seed: 0,
    };
    let (handle, addr) = start_server(config).expect("server failed to start");
    (handle, addr.port())
}

/// Scenario: two clients fill the lobby of a one-turn game on a 1x1 board
/// and observe the exact message sequence from Hello to GameEnded.
#[test]
fn lobby_fill_runs_a_single_turn_game() {
    let (handle, port) = start_test_server(2, 1, 1, 1, 1000);

    let mut a = TestPlayer::connect(port);
    a.expect_hello();
    let mut b = TestPlayer::connect(port);
    b.expect_hello();

    a.join("a");
    // Wait for a's admission to land before b joins, so ids are fixed.
    match a.recv() {
        ServerMessage::AcceptedPlayer { player_id, player } => {
            assert_eq!(player_id, PlayerId(0));
            assert_eq!(player.name, "a");
        }
        other => panic!("expected AcceptedPlayer, got {other:?}"),
    }
    b.join("b");

    for (name, player) in [("a", &mut a), ("b", &mut b)] {
        if name == "b" {
            assert!(matches!(
                player.recv(),
                ServerMessage::AcceptedPlayer {
                    player_id: PlayerId(0),
                    ..
                }
            ));
        }
        assert!(matches!(
            player.recv(),
            ServerMessage::AcceptedPlayer {
                player_id: PlayerId(1),
                ..
            }
        ));
        match player.recv() {
            ServerMessage::GameStarted { players } => {
                assert_eq!(players.len(), 2);
                assert_eq!(players[&PlayerId(0)].name, "a");
                assert_eq!(players[&PlayerId(1)].name, "b");
            }
            other => panic!("{name}: expected GameStarted, got {other:?}"),
        }
        match player.recv() {
            ServerMessage::Turn { turn, events } => {
                assert_eq!(turn, 0);
                assert_eq!(
                    events,
                    vec![
                        Event::PlayerMoved {
                            player_id: PlayerId(0),
                            position: Position::new(0, 0),
                        },
                        Event::PlayerMoved {
                            player_id: PlayerId(1),
                            position: Position::new(0, 0),
                        },
                    ]
                );
            }
            other => panic!("{name}: expected Turn, got {other:?}"),
        }
        match player.recv() {
            ServerMessage::GameEnded { scores } => {
                assert_eq!(scores.len(), 2);
                assert_eq!(scores[&PlayerId(0)], 0);
                assert_eq!(scores[&PlayerId(1)], 0);
            }
            other => panic!("{name}: expected GameEnded, got {other:?}"),
        }
    }

    handle.stop();
}

/// Scenario: a Move with direction 7 gets its sender disconnected while
/// the other client keeps receiving turns.
#[test]
fn invalid_direction_disconnects_only_the_sender() {
    let (handle, port) = start_test_server(2, 6, 1, 1, 50);

    let mut a = TestPlayer::connect(port);
    a.expect_hello();
    let mut b = TestPlayer::connect(port);
    b.expect_hello();
    a.join("a");
    assert!(matches!(a.recv(), ServerMessage::AcceptedPlayer { .. }));
    b.join("b");

    // Drain both clients through turn 0.
    for player in [&mut a, &mut b] {
        loop {
            if let ServerMessage::Turn { turn: 0, .. } = player.recv() {
                break;
            }
        }
    }

    // ClientMessage::Move tag, then a direction no client would produce.
    a.send_raw(&[3, 7]);

    // The server drops a; within a few pending broadcasts the read fails.
    let mut disconnected = false;
    for _ in 0..16 {
        if a.try_recv().is_err() {
            disconnected = true;
            break;
        }
    }
    assert!(disconnected, "sender of an invalid direction must be dropped");

    // b is unaffected and sees the turn numbers keep ascending.
    let mut last_turn = 0;
    for _ in 0..2 {
        match b.recv() {
            ServerMessage::Turn { turn, .. } => {
                assert_eq!(turn, last_turn + 1);
                last_turn = turn;
            }
            other => panic!("expected Turn, got {other:?}"),
        }
    }

    handle.stop();
}

/// Scenario: an out-of-bounds move produces no event in the next turn.
#[test]
fn out_of_bounds_move_produces_an_empty_turn() {
    let (handle, port) = start_test_server(1, 3, 1, 1, 200);

    let mut a = TestPlayer::connect(port);
    a.expect_hello();
    a.join("a");
    assert!(matches!(a.recv(), ServerMessage::AcceptedPlayer { .. }));
    assert!(matches!(a.recv(), ServerMessage::GameStarted { .. }));
    match a.recv() {
        ServerMessage::Turn { turn, events } => {
            assert_eq!(turn, 0);
            assert_eq!(events.len(), 1);
        }
        other => panic!("expected Turn, got {other:?}"),
    }

    // On a 1x1 board every direction leaves the board.
    a.send(&ClientMessage::Move {
        direction: Direction::Down,
    });
    match a.recv() {
        ServerMessage::Turn { turn, events } => {
            assert_eq!(turn, 1);
            assert!(events.is_empty(), "blocked move must emit no event");
        }
        other => panic!("expected Turn, got {other:?}"),
    }

    handle.stop();
}

/// Scenario: an in-bounds move advances the player in the next turn. With
/// seed 0 on a 2x1 board the single player deterministically spawns at
/// (1, 0), so moving left lands on the origin.
#[test]
fn in_bounds_move_advances_the_player() {
    let (handle, port) = start_test_server(1, 2, 2, 1, 200);

    let mut a = TestPlayer::connect(port);
    a.expect_hello();
    a.join("a");
    assert!(matches!(a.recv(), ServerMessage::AcceptedPlayer { .. }));
    assert!(matches!(a.recv(), ServerMessage::GameStarted { .. }));
    match a.recv() {
        ServerMessage::Turn { turn, events } => {
            assert_eq!(turn, 0);
            assert_eq!(
                events,
                vec![Event::PlayerMoved {
                    player_id: PlayerId(0),
                    position: Position::new(1, 0),
                }]
            );
        }
        other => panic!("expected Turn, got {other:?}"),
    }

    a.send(&ClientMessage::Move {
        direction: Direction::Left,
    });
    match a.recv() {
        ServerMessage::Turn { turn, events } => {
            assert_eq!(turn, 1);
            assert_eq!(
                events,
                vec![Event::PlayerMoved {
                    player_id: PlayerId(0),
                    position: Position::new(0, 0),
                }]
            );
        }
        other => panic!("expected Turn, got {other:?}"),
    }

    handle.stop();
}

/// Scenario: a connection arriving after the lobby filled gets Hello, the
/// current roster, and ongoing turns, never GameStarted or past turns.
#[test]
fn late_joiner_sees_roster_and_future_turns_only() {
    let (handle, port) = start_test_server(1, 4, 1, 1, 300);

    let mut a = TestPlayer::connect(port);
    a.expect_hello();
    a.join("a");
    assert!(matches!(a.recv(), ServerMessage::AcceptedPlayer { .. }));
    assert!(matches!(a.recv(), ServerMessage::GameStarted { .. }));
    assert!(matches!(a.recv(), ServerMessage::Turn { turn: 0, .. }));

    // The game is running; a third party connects and asks to join.
    let mut late = TestPlayer::connect(port);
    late.expect_hello();
    late.join("late");

    let mut saw_roster = false;
    let mut turns = Vec::new();
    loop {
        match late.recv() {
            ServerMessage::AcceptedPlayer { player_id, player } => {
                assert_eq!(player_id, PlayerId(0));
                assert_eq!(player.name, "a");
                saw_roster = true;
            }
            ServerMessage::Turn { turn, .. } => {
                assert_ne!(turn, 0, "late joiner must not receive past turns");
                turns.push(turn);
            }
            ServerMessage::GameEnded { .. } => break,
            ServerMessage::GameStarted { .. } => {
                panic!("late joiner must not receive GameStarted");
            }
            other => panic!("unexpected message for late joiner: {other:?}"),
        }
    }
    assert!(saw_roster, "late joiner never received the roster");
    assert!(!turns.is_empty(), "late joiner never received a turn");
    assert!(
        turns.windows(2).all(|pair| pair[0] < pair[1]),
        "turn numbers must ascend: {turns:?}"
    );

    handle.stop();
}

/// Scenario: after GameEnded the lobby reopens and the same connection can
/// play a second game, with player ids assigned from zero again.
#[test]
fn lobby_reopens_after_a_game() {
    let (handle, port) = start_test_server(1, 1, 1, 1, 1000);

    let mut a = TestPlayer::connect(port);
    a.expect_hello();

    for round in 0..2 {
        a.join("a");
        match a.recv() {
            ServerMessage::AcceptedPlayer { player_id, .. } => {
                assert_eq!(player_id, PlayerId(0), "round {round}");
            }
            other => panic!("round {round}: expected AcceptedPlayer, got {other:?}"),
        }
        assert!(matches!(a.recv(), ServerMessage::GameStarted { .. }));
        assert!(matches!(a.recv(), ServerMessage::Turn { turn: 0, .. }));
        assert!(matches!(a.recv(), ServerMessage::GameEnded { .. }));
    }

    handle.stop();
}

// ---------------------------------------------------------------------------
// Client-in-the-loop: a real `Client` between a real server and a scripted
// display socket.
// ---------------------------------------------------------------------------

fn recv_draw(display: &UdpSocket) -> DrawMessage {
    eprintln!("DEBUG recv_draw: start, timeout={:?}", display.read_timeout());
    let start = std::time::Instant::now();
    let mut datagram = vec![0u8; MAX_UDP_PAYLOAD];
    let result = display.recv_from(&mut datagram);
    eprintln!("DEBUG recv_draw: elapsed={:?} result={:?}", start.elapsed(), result.as_ref().map(|(l, a)| (*l, *a)));
    let (len, _) = result.expect("display recv failed");
    let mut buf = StreamBuffer::fixed(&datagram[..len]);
    let message = DrawMessage::decode(&mut buf).expect("bad draw message");
    buf.finish().expect("trailing bytes in draw message");
    message
}

fn lobby_player_count(message: &DrawMessage) -> usize {
    match message {
        DrawMessage::Lobby { players, .. } => players.len(),
        other => panic!("expected a lobby snapshot, got {other:?}"),
    }
}

#[test]
fn full_client_round_trip_with_a_scripted_display() {
    eprintln!("DEBUG: starting server");
    let (handle, port) = start_test_server(1, 1, 1, 1, 1000);
    eprintln!("DEBUG: server started on port {port}");

    let display = UdpSocket::bind("127.0.0.1:0").expect("display bind failed");
    display
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set_read_timeout failed");
    let display_addr = display.local_addr().expect("local_addr failed");
    eprintln!("DEBUG: display bound at {display_addr}");

    let config = ClientConfig {
        gui_address: display_addr.to_string(),
        player_name: "pilot".into(),
        port: 0,
        server_address: format!("127.0.0.1:{port}"),
    };
    eprintln!("DEBUG: connecting client");
    let client = Client::connect(&config).expect("client connect failed");
    eprintln!("DEBUG: client connected");
    let input_port = client
        .display_socket_addr()
        .expect("client socket addr failed")
        .port();
    eprintln!("DEBUG: input port {input_port}, spawning runner");
    let runner = thread::spawn(move || client.run());
    eprintln!("DEBUG: runner spawned, waiting for first draw");

    // Hello produces the first lobby snapshot, with an empty roster.
    assert_eq!(lobby_player_count(&recv_draw(&display)), 0);
    eprintln!("DEBUG: got first draw");

    // A datagram with trailing garbage is dropped: no Join reaches the
    // server, so no further snapshot may arrive.
    display
        .send_to(&[2, 0, 99], ("127.0.0.1", input_port))
        .expect("send failed");
    display
        .set_read_timeout(Some(Duration::from_millis(300)))
        .expect("set_read_timeout failed");
    let mut scratch = [0u8; 16];
    assert!(
        display.recv_from(&mut scratch).is_err(),
        "a malformed datagram must not produce any traffic"
    );
    eprintln!("DEBUG: malformed datagram check done");
    display
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set_read_timeout failed");

    // A valid input while the client is in the lobby becomes a Join.
    let input = encode_to_vec(&InputMessage::Move {
        direction: Direction::Up,
    })
    .expect("encode failed");
    display
        .send_to(&input, ("127.0.0.1", input_port))
        .expect("send failed");
    eprintln!("DEBUG: sent move input, waiting for accepted draw");

    // AcceptedPlayer: lobby snapshot with one player.
    assert_eq!(lobby_player_count(&recv_draw(&display)), 1);
    eprintln!("DEBUG: got accepted draw, waiting for game snapshot");

    // GameStarted emits no snapshot; the next datagram is turn 0's game
    // snapshot.
    match recv_draw(&display) {
        DrawMessage::Game {
            turn,
            player_positions,
            explosions,
            scores,
            ..
        } => {
            assert_eq!(turn, 0);
            assert_eq!(player_positions[&PlayerId(0)], Position::new(0, 0));
            assert!(explosions.is_empty());
            assert_eq!(scores[&PlayerId(0)], 0);
        }
        other => panic!("expected a game snapshot, got {other:?}"),
    }

    // GameEnded: back to an empty lobby.
    assert_eq!(lobby_player_count(&recv_draw(&display)), 0);

    // Stopping the server closes the connection; the client winds down
    // cleanly.
    eprintln!("DEBUG: calling handle.stop()");
    handle.stop();
    eprintln!("DEBUG: handle.stop() returned, joining runner");
    let outcome = runner.join().expect("client thread panicked");
    eprintln!("DEBUG: runner joined: {outcome:?}");
    assert_eq!(outcome.expect("client errored"), SessionEnd::ServerClosed);
}
