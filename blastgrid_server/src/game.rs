// Authoritative turn-based simulation, free of any I/O.
//
// `Game` is a state machine over three phases:
// - Lobby: players are admitted one by one up to the configured count.
// - Maintenance: the transient board setup when the lobby fills — random
//   starting positions and initial blocks, bundled as turn 0's events.
// - Playing: one `next_turn` per tick until `game_length` turns have been
//   produced, then `finish` returns the state to Lobby.
//
// The session layer drives this struct from the owner thread and turns its
// return values into broadcasts. Keeping it socket-free is what makes the
// simulation invariants (in-bounds positions, contiguous ids, turn count)
// directly testable.

use std::collections::BTreeMap;

use blastgrid_protocol::{Direction, Event, Player, PlayerId, Position};

use crate::rng::Lcg;

/// Where the simulation is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Maintenance,
    Playing,
}

/// A player's last declared action, latched between turns and consumed when
/// the next turn is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    PlaceBomb,
    PlaceBlock,
    Move(Direction),
}

struct PlayerSlot {
    player: Player,
    position: Position,
    intent: Option<Intent>,
}

/// Board parameters the simulation needs.
#[derive(Clone, Debug)]
pub struct GameRules {
    pub players_count: u8,
    pub size_x: u16,
    pub size_y: u16,
    pub game_length: u16,
    pub initial_blocks: u16,
}

pub struct Game {
    rules: GameRules,
    rng: Lcg,
    phase: Phase,
    players: BTreeMap<PlayerId, PlayerSlot>,
    turn: u16,
    turn_log: Vec<(u16, Vec<Event>)>,
}

impl Game {
    pub fn new(rules: GameRules, seed: u32) -> Self {
        Self {
            rules,
            rng: Lcg::new(seed),
            phase: Phase::Lobby,
            players: BTreeMap::new(),
            turn: 0,
            turn_log: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> u16 {
        self.turn
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= usize::from(self.rules.players_count)
    }

    /// True once the current turn is the game's last.
    pub fn is_final_turn(&self) -> bool {
        self.turn + 1 >= self.rules.game_length
    }

    /// The current roster, as broadcast in `GameStarted` and replayed to
    /// late joiners.
    pub fn roster(&self) -> BTreeMap<PlayerId, Player> {
        self.players
            .iter()
            .map(|(id, slot)| (*id, slot.player.clone()))
            .collect()
    }

    /// Admit a player during the lobby. Ids are assigned contiguously from
    /// 0 in admission order. Returns `None` outside the lobby or once the
    /// roster is full.
    pub fn admit(&mut self, name: String, address: String) -> Option<(PlayerId, Player)> {
        if self.phase != Phase::Lobby || self.is_full() {
            return None;
        }
        let id = PlayerId(self.players.len() as u8);
        let player = Player { name, address };
        self.players.insert(
            id,
            PlayerSlot {
                player: player.clone(),
                position: Position::default(),
                intent: None,
            },
        );
        Some((id, player))
    }

    /// The maintenance transition: draw a starting position for every
    /// player in id order, then scatter the initial blocks. Duplicates are
    /// not de-duplicated; overlapping blocks and players starting on a
    /// block are intentional. Returns the event list of turn 0 and enters
    /// the playing phase.
    pub fn begin(&mut self) -> Vec<Event> {
        self.phase = Phase::Maintenance;
        let mut events = Vec::new();

        for (id, slot) in &mut self.players {
            let position = Position::new(
                self.rng.next_mod(self.rules.size_x),
                self.rng.next_mod(self.rules.size_y),
            );
            slot.position = position;
            events.push(Event::PlayerMoved {
                player_id: *id,
                position,
            });
        }

        for _ in 0..self.rules.initial_blocks {
            let position = Position::new(
                self.rng.next_mod(self.rules.size_x),
                self.rng.next_mod(self.rules.size_y),
            );
            events.push(Event::BlockPlaced { position });
        }

        self.turn = 0;
        self.turn_log.push((0, events.clone()));
        self.phase = Phase::Playing;
        events
    }

    /// Latch a player's intent for the upcoming turn. Later intents in the
    /// same turn window overwrite earlier ones. Ignored outside Playing and
    /// for unknown players.
    pub fn latch_intent(&mut self, player_id: PlayerId, intent: Intent) {
        if self.phase != Phase::Playing {
            return;
        }
        if let Some(slot) = self.players.get_mut(&player_id) {
            slot.intent = Some(intent);
        }
    }

    /// Build the next turn: consume every latched intent in ascending id
    /// order and resolve each to at most one event. Returns the turn number
    /// and its events; the pair is also appended to the retained turn log.
    pub fn next_turn(&mut self) -> (u16, Vec<Event>) {
        self.turn += 1;
        let mut events = Vec::new();
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            if let Some(event) = self.resolve_intent(id) {
                events.push(event);
            }
        }
        self.turn_log.push((self.turn, events.clone()));
        (self.turn, events)
    }

    /// End the game: produce the final score map, forget the roster and the
    /// turn log, and reopen the lobby. The resolver cannot produce kills in
    /// this revision, so every score is zero.
    pub fn finish(&mut self) -> BTreeMap<PlayerId, u32> {
        let scores = self.players.keys().map(|id| (*id, 0u32)).collect();
        self.players.clear();
        self.turn_log.clear();
        self.turn = 0;
        self.phase = Phase::Lobby;
        scores
    }

    fn resolve_intent(&mut self, id: PlayerId) -> Option<Event> {
        let slot = self.players.get_mut(&id)?;
        match slot.intent.take()? {
            // Reserved on the wire; the resolver emits nothing for them.
            Intent::PlaceBomb | Intent::PlaceBlock => None,
            Intent::Move(direction) => {
                let target =
                    slot.position
                        .step(direction, self.rules.size_x, self.rules.size_y)?;
                slot.position = target;
                Some(Event::PlayerMoved {
                    player_id: id,
                    position: target,
                })
            }
        }
    }

    #[cfg(test)]
    fn position_of(&self, id: PlayerId) -> Option<Position> {
        self.players.get(&id).map(|slot| slot.position)
    }
}
