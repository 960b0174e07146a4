// Client-side mirror of the server's world.
//
// `WorldView` is pure state: the server→display mirror loop feeds it one
// `ServerMessage` at a time and asks it for `DrawMessage` snapshots. It
// never touches a socket, which keeps the derivation rules (bomb timers,
// kill scoring, explosion geometry) directly testable.
//
// Beyond the roster and positions mirrored from server events, the view
// keeps client-only bookkeeping: which players were killed this turn (for
// scoring), which blocks an explosion destroyed (removed only at end of
// turn), the bomb id → position bindings (the server never repeats a bomb's
// position in the explosion event), and the explosion cells of the current
// turn, cleared after every game snapshot.

use std::collections::{BTreeMap, BTreeSet};

use blastgrid_protocol::{
    Bomb, BombId, Direction, DrawMessage, Event, Player, PlayerId, Position,
};

#[derive(Default)]
pub struct WorldView {
    server_name: String,
    players_count: u8,
    size_x: u16,
    size_y: u16,
    game_length: u16,
    explosion_radius: u16,
    bomb_timer: u16,
    turn: u16,
    players: BTreeMap<PlayerId, Player>,
    killed: BTreeSet<PlayerId>,
    player_positions: BTreeMap<PlayerId, Position>,
    blocks: Vec<Position>,
    blocks_destroyed: BTreeSet<Position>,
    bombs: Vec<Bomb>,
    bomb_positions: BTreeMap<BombId, Position>,
    explosions: Vec<Position>,
    scores: BTreeMap<PlayerId, u32>,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the static game parameters from `Hello`.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_hello(
        &mut self,
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
    ) {
        self.server_name = server_name;
        self.players_count = players_count;
        self.size_x = size_x;
        self.size_y = size_y;
        self.game_length = game_length;
        self.explosion_radius = explosion_radius;
        self.bomb_timer = bomb_timer;
    }

    /// A player was admitted to the lobby; they start with zero points.
    pub fn apply_accepted_player(&mut self, player_id: PlayerId, player: Player) {
        self.players.insert(player_id, player);
        self.scores.insert(player_id, 0);
    }

    /// The game begins: adopt the authoritative roster and zero its scores.
    pub fn apply_game_started(&mut self, players: BTreeMap<PlayerId, Player>) {
        for player_id in players.keys() {
            self.scores.insert(*player_id, 0);
        }
        self.players = players;
    }

    /// Apply one turn: tick bomb fuses down, apply the events in order,
    /// settle kills and destroyed blocks, and normalize the explosion set.
    pub fn apply_turn(&mut self, turn: u16, events: Vec<Event>) {
        for bomb in &mut self.bombs {
            bomb.timer = bomb.timer.saturating_sub(1);
        }

        for event in events {
            self.apply_event(event);
        }

        // One point per player per turn, however many explosions got them.
        for player_id in std::mem::take(&mut self.killed) {
            *self.scores.entry(player_id).or_insert(0) += 1;
        }

        let destroyed = std::mem::take(&mut self.blocks_destroyed);
        self.blocks.retain(|block| !destroyed.contains(block));

        self.turn = turn;
        self.explosions.sort();
        self.explosions.dedup();
    }

    /// The game is over: drop all turn-scoped state and adopt the final
    /// score map.
    pub fn apply_game_ended(&mut self, scores: BTreeMap<PlayerId, u32>) {
        self.turn = 0;
        self.players.clear();
        self.killed.clear();
        self.player_positions.clear();
        self.blocks.clear();
        self.bombs.clear();
        self.bomb_positions.clear();
        self.scores = scores;
    }

    fn apply_event(&mut self, event: Event) {
        match event {
            Event::BombPlaced { bomb_id, position } => {
                self.bombs.push(Bomb {
                    position,
                    timer: self.bomb_timer,
                });
                self.bomb_positions.insert(bomb_id, position);
            }
            Event::BombExploded {
                bomb_id,
                robots_destroyed,
                blocks_destroyed,
            } => {
                if let Some(origin) = self.bomb_positions.remove(&bomb_id) {
                    self.spread_explosion(origin);
                    if let Some(index) =
                        self.bombs.iter().position(|bomb| bomb.position == origin)
                    {
                        self.bombs.remove(index);
                    }
                }
                for player_id in robots_destroyed {
                    self.killed.insert(player_id);
                }
                for position in blocks_destroyed {
                    self.blocks_destroyed.insert(position);
                }
            }
            Event::PlayerMoved {
                player_id,
                position,
            } => {
                self.player_positions.insert(player_id, position);
            }
            Event::BlockPlaced { position } => {
                self.blocks.push(position);
            }
        }
    }

    /// Derive the cells lit by a bomb at `origin`. The server transmits
    /// only the bomb's id; every participant reconstructs the shape from
    /// the position, the radius, and the block set as of this event.
    fn spread_explosion(&mut self, origin: Position) {
        self.explosions.push(origin);
        if self.blocks.contains(&origin) {
            // A bomb sitting on a block burns only its own cell.
            return;
        }
        for direction in [
            Direction::Up,
            Direction::Down,
            Direction::Right,
            Direction::Left,
        ] {
            let mut cell = origin;
            for _ in 0..self.explosion_radius {
                let Some(next) = cell.step(direction, self.size_x, self.size_y) else {
                    break;
                };
                cell = next;
                self.explosions.push(cell);
                if self.blocks.contains(&cell) {
                    break;
                }
            }
        }
    }

    /// Forget the current turn's explosion cells. Called after each game
    /// snapshot has been emitted.
    pub fn clear_explosions(&mut self) {
        self.explosions.clear();
    }

    pub fn lobby_snapshot(&self) -> DrawMessage {
        DrawMessage::Lobby {
            server_name: self.server_name.clone(),
            players_count: self.players_count,
            size_x: self.size_x,
            size_y: self.size_y,
            game_length: self.game_length,
            explosion_radius: self.explosion_radius,
            bomb_timer: self.bomb_timer,
            players: self.players.clone(),
        }
    }

    pub fn game_snapshot(&self) -> DrawMessage {
        DrawMessage::Game {
            server_name: self.server_name.clone(),
            size_x: self.size_x,
            size_y: self.size_y,
            game_length: self.game_length,
            turn: self.turn,
            players: self.players.clone(),
            player_positions: self.player_positions.clone(),
            blocks: self.blocks.clone(),
            bombs: self.bombs.clone(),
            explosions: self.explosions.clone(),
            scores: self.scores.clone(),
        }
    }
}
