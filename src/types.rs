use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type RoomId = String;
pub type PlayerId = String;
pub type SessionId = String;

/// Number of cards on a board
pub const BOARD_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }

    /// Card color that belongs to this team
    pub fn color(self) -> CardColor {
        match self {
            Team::Blue => CardColor::Blue,
            Team::Red => CardColor::Red,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Blue => write!(f, "BLUE"),
            Team::Red => write!(f, "RED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Spymaster,
    Operative,
    Spectator,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardColor {
    Blue,
    Red,
    Neutral,
    Assassin,
}

impl CardColor {
    pub fn team(self) -> Option<Team> {
        match self {
            CardColor::Blue => Some(Team::Blue),
            CardColor::Red => Some(Team::Red),
            CardColor::Neutral | CardColor::Assassin => None,
        }
    }
}

/// Game phase. The lobby is the absence of a `GameState` on the room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Clue,
    Guess,
    GameOver,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub team: Option<Team>,
    pub role: Role,
    pub connected: bool,
    pub admin: bool,
}

impl Player {
    pub fn new(username: String, admin: bool) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            username,
            team: None,
            role: Role::Spectator,
            connected: true,
            admin,
        }
    }

    pub fn is_connected_spymaster_of(&self, team: Team) -> bool {
        self.connected && self.team == Some(team) && self.role == Role::Spymaster
    }

    pub fn is_connected_operative_of(&self, team: Team) -> bool {
        self.connected && self.team == Some(team) && self.role == Role::Operative
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub word: String,
    pub color: CardColor,
    pub revealed: bool,
    pub selected_by: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clue {
    pub word: String,
    pub number: u8,
    pub team: Team,
}

/// One revealed card within a turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessRecord {
    pub card_index: usize,
    pub word: String,
    pub color: CardColor,
    pub player_id: PlayerId,
}

/// Why a turn ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnOutcome {
    GuessesExhausted,
    WrongGuess,
    Passed,
    TimedOut,
    AssassinRevealed,
    AllAgentsFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRecord {
    pub team: Team,
    /// None when the turn timed out before a clue was given
    pub clue: Option<Clue>,
    pub guesses: Vec<GuessRecord>,
    pub outcome: TurnOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub board: Vec<Card>,
    pub starting_team: Team,
    pub current_team: Team,
    pub phase: GamePhase,
    pub current_clue: Option<Clue>,
    pub guesses_remaining: u8,
    pub blue_remaining: u8,
    pub red_remaining: u8,
    pub winner: Option<Team>,
    pub history: Vec<TurnRecord>,
    /// Guesses made so far in the turn in progress
    pub current_guesses: Vec<GuessRecord>,
    /// Turn timer deadline, set only when the room has a timer configured
    pub turn_deadline: Option<DateTime<Utc>>,
    pub turn_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSettings {
    pub word_pack: String,
    pub timer_seconds: Option<u32>,
}

impl RoomSettings {
    pub fn with_pack(word_pack: impl Into<String>) -> Self {
        Self {
            word_pack: word_pack.into(),
            timer_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub admin_id: PlayerId,
    pub players: Vec<Player>,
    pub settings: RoomSettings,
    pub game: Option<GameState>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every successful mutation so observers can order snapshots
    pub version: u64,
    #[serde(skip, default = "Utc::now")]
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, admin: Player, settings: RoomSettings) -> Self {
        let now = Utc::now();
        Self {
            id,
            admin_id: admin.id.clone(),
            players: vec![admin],
            settings,
            game: None,
            created_at: now,
            version: 1,
            last_activity: now,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// True if a connected player other than `except` uses this username
    pub fn username_taken(&self, username: &str, except: Option<&str>) -> bool {
        let wanted = username.to_lowercase();
        self.players.iter().any(|p| {
            p.connected && Some(p.id.as_str()) != except && p.username.to_lowercase() == wanted
        })
    }

    pub fn connected_spymasters(&self, team: Team) -> impl Iterator<Item = &Player> {
        self.players
            .iter()
            .filter(move |p| p.is_connected_spymaster_of(team))
    }

    /// Both teams need exactly one connected spymaster and at least one connected operative
    pub fn can_start(&self) -> bool {
        [Team::Blue, Team::Red].into_iter().all(|team| {
            self.connected_spymasters(team).count() == 1
                && self
                    .players
                    .iter()
                    .any(|p| p.is_connected_operative_of(team))
        })
    }

    pub fn game_in_progress(&self) -> bool {
        self.game
            .as_ref()
            .is_some_and(|g| g.phase != GamePhase::GameOver)
    }

    pub fn has_connected_players(&self) -> bool {
        self.players.iter().any(|p| p.connected)
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated(name: &str, team: Team, role: Role) -> Player {
        let mut p = Player::new(name.to_string(), false);
        p.team = Some(team);
        p.role = role;
        p
    }

    fn room_with(players: Vec<Player>) -> Room {
        let admin = Player::new("admin".to_string(), true);
        let mut room = Room::new("ABCDE-FGHJK".to_string(), admin, RoomSettings::with_pack("standard"));
        room.players.extend(players);
        room
    }

    #[test]
    fn test_can_start_requires_full_teams() {
        let mut room = room_with(vec![
            seated("a", Team::Blue, Role::Spymaster),
            seated("b", Team::Blue, Role::Operative),
            seated("c", Team::Red, Role::Spymaster),
        ]);
        assert!(!room.can_start());

        room.players.push(seated("d", Team::Red, Role::Operative));
        assert!(room.can_start());
    }

    #[test]
    fn test_can_start_ignores_disconnected_players() {
        let mut room = room_with(vec![
            seated("a", Team::Blue, Role::Spymaster),
            seated("b", Team::Blue, Role::Operative),
            seated("c", Team::Red, Role::Spymaster),
            seated("d", Team::Red, Role::Operative),
        ]);
        room.players[4].connected = false;
        assert!(!room.can_start());
    }

    #[test]
    fn test_can_start_rejects_two_spymasters() {
        let room = room_with(vec![
            seated("a", Team::Blue, Role::Spymaster),
            seated("a2", Team::Blue, Role::Spymaster),
            seated("b", Team::Blue, Role::Operative),
            seated("c", Team::Red, Role::Spymaster),
            seated("d", Team::Red, Role::Operative),
        ]);
        assert!(!room.can_start());
    }

    #[test]
    fn test_username_taken_is_case_insensitive_and_connected_only() {
        let mut room = room_with(vec![seated("Bob", Team::Blue, Role::Operative)]);
        assert!(room.username_taken("bob", None));
        assert!(room.username_taken("ADMIN", None));

        room.players[1].connected = false;
        assert!(!room.username_taken("bob", None));
    }

    #[test]
    fn test_username_taken_folds_non_ascii_case() {
        let room = room_with(vec![seated("Émile", Team::Red, Role::Operative)]);
        assert!(room.username_taken("émile", None));
        assert!(room.username_taken("ÉMILE", None));
        assert!(!room.username_taken("emile", None));
    }

    #[test]
    fn test_team_serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Team::Blue).unwrap(), "\"BLUE\"");
        assert_eq!(
            serde_json::to_string(&GamePhase::GameOver).unwrap(),
            "\"GAME_OVER\""
        );
    }
}
