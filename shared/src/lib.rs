use serde::{Deserialize, Serialize};
use std::fmt;

pub const INITIAL_HEALTH: i32 = 10;
pub const TURN_ENDED: &str = "turn-ended";

/// Largest UDP payload over IPv4; receive buffers are sized to this
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

pub type GameId = u32;
pub type PlayerId = u32;

/// Snapshot of a game returned to callers
pub type GameView = Game;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    RegisterPlayer {
        name: String,
    },
    CreateGame,
    JoinGame {
        game_id: GameId,
        player_id: PlayerId,
    },
    SubmitMove {
        game_id: GameId,
        player_id: PlayerId,
        action: Action,
        override_checks: bool,
    },
    GetGame {
        game_id: GameId,
    },

    PlayerRegistered {
        player: PlayerRecord,
    },
    GameState {
        game: GameView,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    RoundEnded {
        game_id: GameId,
        action: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotJoined,
    AlreadyMoved,
    PersistenceFailure,
    BadRequest,
    /// The reply did not fit in a single datagram
    ResponseTooLarge,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    /// Address round-ended notifications are delivered to
    pub device: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: &Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal heading; anything else is kept lowercased so it can be archived
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Unknown(String),
}

impl Direction {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.to_lowercase();
        match normalized.as_str() {
            "north" => Direction::North,
            "south" => Direction::South,
            "east" => Direction::East,
            "west" => Direction::West,
            _ => Direction::Unknown(normalized),
        }
    }

    /// Grid delta; y grows southwards
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Unknown(_) => (0, 0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Move,
    Shoot,
    Unknown(String),
}

impl ActionKind {
    /// Kinds are matched exactly, unlike directions
    pub fn parse(raw: &str) -> Self {
        match raw {
            "move" => ActionKind::Move,
            "shoot" => ActionKind::Shoot,
            other => ActionKind::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub direction: Direction,
}

impl Action {
    pub fn new(kind: &str, direction: &str) -> Self {
        Self {
            kind: ActionKind::parse(kind),
            direction: Direction::parse(direction),
        }
    }

    pub fn step(direction: Direction) -> Self {
        Self {
            kind: ActionKind::Move,
            direction,
        }
    }

    pub fn shoot(direction: Direction) -> Self {
        Self {
            kind: ActionKind::Shoot,
            direction,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub location: Location,
    pub health: i32,
    pub moved: bool,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            location: Location::default(),
            health: INITIAL_HEALTH,
            moved: false,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Bullet {
    pub player_id: PlayerId,
    pub direction: Direction,
    /// Shooter's location when the shot was taken
    pub origin: Location,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RoundRecord {
    pub bullets: Vec<Bullet>,
}

/// Player states keyed by player id, kept in insertion order
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PlayerStates {
    entries: Vec<(PlayerId, PlayerState)>,
}

impl PlayerStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&PlayerState> {
        self.entries
            .iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, state)| state)
    }

    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerState> {
        self.entries
            .iter_mut()
            .find(|(id, _)| *id == player_id)
            .map(|(_, state)| state)
    }

    /// Inserts or replaces; a replaced key keeps its position
    pub fn insert(&mut self, player_id: PlayerId, state: PlayerState) {
        match self.get_mut(player_id) {
            Some(existing) => *existing = state,
            None => self.entries.push((player_id, state)),
        }
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.get(player_id).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &PlayerState)> {
        self.entries.iter().map(|(id, state)| (*id, state))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut PlayerState> {
        self.entries.iter_mut().map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotJoined,
    AlreadyMoved,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotJoined => write!(f, "player hasn't joined this game"),
            Rejection::AlreadyMoved => write!(f, "already moved this round"),
        }
    }
}

/// What a resolved round produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// 1-based number of the round that was just archived
    pub round: usize,
    pub record: RoundRecord,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    pub players: Vec<PlayerId>,
    pub player_states: PlayerStates,
    pub pending_bullets: Vec<Bullet>,
    /// Resolved rounds, most recent first
    pub history: Vec<RoundRecord>,
}

impl Game {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            players: Vec::new(),
            player_states: PlayerStates::new(),
            pending_bullets: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn has_joined(&self, player_id: PlayerId) -> bool {
        self.players.contains(&player_id)
    }

    /// Adds a player to the roster with a fresh state.
    ///
    /// Returns false and leaves the game untouched when the player is
    /// already on the roster. A player that only has a state (from an
    /// override move) is added and re-seeded.
    pub fn join(&mut self, player_id: PlayerId) -> bool {
        if self.has_joined(player_id) {
            return false;
        }
        self.players.push(player_id);
        self.player_states.insert(player_id, PlayerState::new());
        true
    }

    pub fn validate_move(
        &self,
        player_id: PlayerId,
        override_checks: bool,
    ) -> Result<(), Rejection> {
        if override_checks {
            return Ok(());
        }
        match self.player_states.get(player_id) {
            None => Err(Rejection::NotJoined),
            Some(state) if state.moved => Err(Rejection::AlreadyMoved),
            Some(_) => Ok(()),
        }
    }

    /// Applies one action and marks the player as having moved.
    ///
    /// A player without a state (only reachable through an override) gets a
    /// fresh one that is not added to `players`.
    pub fn apply_move(&mut self, player_id: PlayerId, action: &Action) {
        if !self.player_states.contains(player_id) {
            self.player_states.insert(player_id, PlayerState::new());
        }
        let Some(state) = self.player_states.get_mut(player_id) else {
            return;
        };

        match &action.kind {
            ActionKind::Move => {
                state.location = state.location.step(&action.direction);
            }
            ActionKind::Shoot => {
                self.pending_bullets.push(Bullet {
                    player_id,
                    direction: action.direction.clone(),
                    origin: state.location,
                });
            }
            ActionKind::Unknown(_) => {}
        }

        state.moved = true;
    }

    pub fn is_round_complete(&self) -> bool {
        !self.players.is_empty() && self.player_states.iter().all(|(_, state)| state.moved)
    }

    /// Archives the pending bullets and opens the next round
    pub fn resolve_round(&mut self) -> RoundOutcome {
        let record = RoundRecord {
            bullets: std::mem::take(&mut self.pending_bullets),
        };
        self.history.insert(0, record.clone());

        for state in self.player_states.values_mut() {
            state.moved = false;
        }

        self.resolve_hits(&record);

        RoundOutcome {
            round: self.history.len(),
            record,
        }
    }

    /// Damage from archived bullets. Not implemented: health never changes.
    fn resolve_hits(&mut self, _record: &RoundRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with(players: &[PlayerId]) -> Game {
        let mut game = Game::new(1);
        for id in players {
            game.join(*id);
        }
        game
    }

    #[test]
    fn test_game_creation() {
        let game = Game::new(7);
        assert_eq!(game.id, 7);
        assert!(game.players.is_empty());
        assert!(game.player_states.is_empty());
        assert!(game.pending_bullets.is_empty());
        assert!(game.history.is_empty());
    }

    #[test]
    fn test_join_seeds_initial_state() {
        let game = game_with(&[1]);
        assert_eq!(game.players, vec![1]);
        let state = game.player_states.get(1).unwrap();
        assert_eq!(state.location, Location::new(0, 0));
        assert_eq!(state.health, 10);
        assert!(!state.moved);
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        let mut game = game_with(&[1, 2]);
        game.apply_move(1, &Action::step(Direction::East));

        assert!(!game.join(1));
        assert_eq!(game.players, vec![1, 2]);
        let state = game.player_states.get(1).unwrap();
        assert_eq!(state.location, Location::new(1, 0));
        assert!(state.moved);
    }

    #[test]
    fn test_join_keys_match_roster() {
        let game = game_with(&[3, 1, 2]);
        let keys: Vec<PlayerId> = game.player_states.keys().collect();
        assert_eq!(keys, game.players);
    }

    #[test]
    fn test_direction_parse_is_case_insensitive() {
        assert_eq!(Direction::parse("NORTH"), Direction::North);
        assert_eq!(Direction::parse("South"), Direction::South);
        assert_eq!(Direction::parse("eAsT"), Direction::East);
        assert_eq!(Direction::parse("west"), Direction::West);
        assert_eq!(Direction::parse("Up"), Direction::Unknown("up".to_string()));
    }

    #[test]
    fn test_action_kind_is_case_sensitive() {
        assert_eq!(ActionKind::parse("move"), ActionKind::Move);
        assert_eq!(ActionKind::parse("shoot"), ActionKind::Shoot);
        assert_eq!(
            ActionKind::parse("Move"),
            ActionKind::Unknown("Move".to_string())
        );
    }

    #[test]
    fn test_move_deltas() {
        let origin = Location::new(0, 0);
        assert_eq!(origin.step(&Direction::North), Location::new(0, -1));
        assert_eq!(origin.step(&Direction::South), Location::new(0, 1));
        assert_eq!(origin.step(&Direction::East), Location::new(1, 0));
        assert_eq!(origin.step(&Direction::West), Location::new(-1, 0));
        assert_eq!(origin.step(&Direction::Unknown("up".to_string())), origin);
    }

    #[test]
    fn test_opposite_moves_cancel() {
        let pairs = [
            (Direction::North, Direction::South),
            (Direction::East, Direction::West),
        ];
        for (there, back) in pairs {
            let start = Location::new(4, -2);
            assert_eq!(start.step(&there).step(&back), start);
            assert_eq!(start.step(&back).step(&there), start);
        }
    }

    #[test]
    fn test_validate_rejects_unjoined() {
        let game = game_with(&[1]);
        assert_eq!(game.validate_move(2, false), Err(Rejection::NotJoined));
        assert_eq!(game.validate_move(2, true), Ok(()));
    }

    #[test]
    fn test_validate_rejects_second_move() {
        let mut game = game_with(&[1, 2]);
        assert_eq!(game.validate_move(1, false), Ok(()));
        game.apply_move(1, &Action::step(Direction::North));
        assert_eq!(game.validate_move(1, false), Err(Rejection::AlreadyMoved));
        assert_eq!(game.validate_move(1, true), Ok(()));
    }

    #[test]
    fn test_shoot_captures_origin() {
        let mut game = game_with(&[1, 2]);
        game.player_states.get_mut(1).unwrap().location = Location::new(3, 4);

        game.apply_move(1, &Action::shoot(Direction::parse("EAST")));

        assert_eq!(
            game.pending_bullets,
            vec![Bullet {
                player_id: 1,
                direction: Direction::East,
                origin: Location::new(3, 4),
            }]
        );
        let state = game.player_states.get(1).unwrap();
        assert_eq!(state.location, Location::new(3, 4));
        assert!(state.moved);
    }

    #[test]
    fn test_unknown_action_still_marks_moved() {
        let mut game = game_with(&[1, 2]);
        game.apply_move(1, &Action::new("dance", "north"));

        let state = game.player_states.get(1).unwrap();
        assert_eq!(state.location, Location::new(0, 0));
        assert!(state.moved);
        assert!(game.pending_bullets.is_empty());
    }

    #[test]
    fn test_override_move_for_stranger_leaves_roster() {
        let mut game = game_with(&[1]);
        game.apply_move(9, &Action::step(Direction::South));

        assert_eq!(game.players, vec![1]);
        assert_eq!(
            game.player_states.get(9).unwrap().location,
            Location::new(0, 1)
        );

        // Joining afterwards puts the stranger on the roster with a clean state
        assert!(game.join(9));
        assert_eq!(game.players, vec![1, 9]);
        assert_eq!(game.player_states.get(9), Some(&PlayerState::new()));
    }

    #[test]
    fn test_empty_game_never_completes() {
        let game = Game::new(1);
        assert!(!game.is_round_complete());
    }

    #[test]
    fn test_round_completes_when_everyone_moved() {
        let mut game = game_with(&[1, 2]);
        assert!(!game.is_round_complete());

        game.apply_move(2, &Action::step(Direction::West));
        assert!(!game.is_round_complete());

        game.apply_move(1, &Action::step(Direction::East));
        assert!(game.is_round_complete());
    }

    #[test]
    fn test_resolve_round_archives_and_resets() {
        let mut game = game_with(&[1, 2]);
        game.apply_move(1, &Action::shoot(Direction::East));
        game.apply_move(2, &Action::step(Direction::South));

        let outcome = game.resolve_round();

        assert_eq!(outcome.round, 1);
        assert_eq!(
            outcome.record.bullets,
            vec![Bullet {
                player_id: 1,
                direction: Direction::East,
                origin: Location::new(0, 0),
            }]
        );
        assert_eq!(game.history.len(), 1);
        assert_eq!(game.history[0], outcome.record);
        assert!(game.pending_bullets.is_empty());
        assert!(game.player_states.iter().all(|(_, s)| !s.moved));
        assert_eq!(
            game.player_states.get(2).unwrap().location,
            Location::new(0, 1)
        );
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let mut game = game_with(&[1]);

        game.apply_move(1, &Action::shoot(Direction::North));
        game.resolve_round();
        game.apply_move(1, &Action::shoot(Direction::South));
        let outcome = game.resolve_round();

        assert_eq!(outcome.round, 2);
        assert_eq!(game.history.len(), 2);
        assert_eq!(game.history[0].bullets[0].direction, Direction::South);
        assert_eq!(game.history[1].bullets[0].direction, Direction::North);
    }

    #[test]
    fn test_health_never_decreases() {
        let mut game = game_with(&[1, 2]);
        for _ in 0..5 {
            game.apply_move(1, &Action::shoot(Direction::East));
            game.apply_move(2, &Action::step(Direction::West));
            game.resolve_round();
        }
        for (_, state) in game.player_states.iter() {
            assert_eq!(state.health, INITIAL_HEALTH);
        }
    }

    #[test]
    fn test_player_states_insert_keeps_position() {
        let mut states = PlayerStates::new();
        states.insert(5, PlayerState::new());
        states.insert(2, PlayerState::new());

        let mut moved = PlayerState::new();
        moved.moved = true;
        states.insert(5, moved.clone());

        assert_eq!(states.keys().collect::<Vec<_>>(), vec![5, 2]);
        assert_eq!(states.get(5), Some(&moved));
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn test_packet_serialization_submit_move() {
        let packet = Packet::SubmitMove {
            game_id: 3,
            player_id: 4,
            action: Action::new("shoot", "West"),
            override_checks: true,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::SubmitMove {
                game_id,
                player_id,
                action,
                override_checks,
            } => {
                assert_eq!(game_id, 3);
                assert_eq!(player_id, 4);
                assert_eq!(action, Action::shoot(Direction::West));
                assert!(override_checks);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_game_state() {
        let mut game = game_with(&[1, 2]);
        game.apply_move(1, &Action::shoot(Direction::Unknown("up".to_string())));
        game.apply_move(2, &Action::step(Direction::North));
        game.resolve_round();
        game.apply_move(2, &Action::shoot(Direction::East));

        let packet = Packet::GameState { game: game.clone() };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::GameState { game: restored } => assert_eq!(restored, game),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
