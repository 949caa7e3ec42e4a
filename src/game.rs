//! Turn-based game state machine.
//!
//! Phases run CLUE -> GUESS -> CLUE ... until a team finds all of its cards or
//! someone reveals the assassin, which moves the game to the terminal GAME_OVER
//! phase. The lobby is represented by a room without a `GameState`.

use chrono::{DateTime, Utc};

use crate::board::cards_for;
use crate::error::{GameError, GameResult};
use crate::types::*;

pub const MAX_CLUE_NUMBER: u8 = 9;
pub const MAX_CLUE_CHARS: usize = 30;

/// What a single guess did to the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessResult {
    pub card_index: usize,
    pub color: CardColor,
    /// Set when the guess ended the turn (or the game)
    pub turn_ended: Option<TurnOutcome>,
}

impl GameState {
    pub fn new(board: Vec<Card>, starting_team: Team, turn_seconds: Option<u32>) -> Self {
        let mut game = Self {
            board,
            starting_team,
            current_team: starting_team,
            phase: GamePhase::Clue,
            current_clue: None,
            guesses_remaining: 0,
            blue_remaining: cards_for(Team::Blue, starting_team),
            red_remaining: cards_for(Team::Red, starting_team),
            winner: None,
            history: Vec::new(),
            current_guesses: Vec::new(),
            turn_deadline: None,
            turn_seconds,
        };
        game.start_turn_clock();
        game
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn remaining(&self, team: Team) -> u8 {
        match team {
            Team::Blue => self.blue_remaining,
            Team::Red => self.red_remaining,
        }
    }

    fn ensure_not_over(&self) -> GameResult<()> {
        if self.is_over() {
            return Err(GameError::InvalidState("The game is over".to_string()));
        }
        Ok(())
    }

    /// Spymaster of the current team gives a clue
    pub fn submit_clue(&mut self, actor: &Player, word: &str, number: i64) -> GameResult<()> {
        self.ensure_not_over()?;

        if self.phase != GamePhase::Clue {
            return Err(GameError::InvalidClue(
                "A clue has already been given this turn".to_string(),
            ));
        }
        if !actor.is_connected_spymaster_of(self.current_team) {
            return Err(GameError::InvalidClue(format!(
                "Only the {} spymaster can give a clue now",
                self.current_team
            )));
        }
        let number = u8::try_from(number)
            .ok()
            .filter(|n| *n <= MAX_CLUE_NUMBER)
            .ok_or_else(|| {
                GameError::InvalidClue(format!(
                    "Clue number must be between 0 and {}",
                    MAX_CLUE_NUMBER
                ))
            })?;

        let word = word.trim().to_uppercase();
        if word.is_empty() {
            return Err(GameError::InvalidClue("Clue word cannot be blank".to_string()));
        }
        if word.chars().count() > MAX_CLUE_CHARS {
            return Err(GameError::InvalidClue(format!(
                "Clue word must be at most {} characters",
                MAX_CLUE_CHARS
            )));
        }
        if self.board.iter().any(|c| c.word == word) {
            return Err(GameError::InvalidClue(
                "Clue cannot be a word on the board".to_string(),
            ));
        }

        self.current_clue = Some(Clue {
            word,
            number,
            team: self.current_team,
        });
        self.guesses_remaining = number + 1;
        self.phase = GamePhase::Guess;
        Ok(())
    }

    /// Operative of the current team reveals a card
    pub fn make_guess(&mut self, actor: &Player, card_index: i64) -> GameResult<GuessResult> {
        self.ensure_not_over()?;

        if self.phase != GamePhase::Guess {
            return Err(GameError::InvalidGuess(
                "Wait for the spymaster's clue".to_string(),
            ));
        }
        if !actor.is_connected_operative_of(self.current_team) {
            return Err(GameError::InvalidGuess(format!(
                "Only {} operatives can guess now",
                self.current_team
            )));
        }
        let card_index = usize::try_from(card_index)
            .ok()
            .filter(|i| *i < self.board.len())
            .ok_or_else(|| GameError::InvalidGuess(format!("No card at index {}", card_index)))?;
        let card = &mut self.board[card_index];
        if card.revealed {
            return Err(GameError::InvalidGuess(format!(
                "{} has already been revealed",
                card.word
            )));
        }

        card.revealed = true;
        card.selected_by = Some(actor.id.clone());
        let color = card.color;
        self.current_guesses.push(GuessRecord {
            card_index,
            word: card.word.clone(),
            color,
            player_id: actor.id.clone(),
        });

        let team = self.current_team;
        let turn_ended = if color == CardColor::Assassin {
            self.finish_game(team.other(), TurnOutcome::AssassinRevealed);
            Some(TurnOutcome::AssassinRevealed)
        } else if let Some(winner) = self.count_revealed(color) {
            self.finish_game(winner, TurnOutcome::AllAgentsFound);
            Some(TurnOutcome::AllAgentsFound)
        } else if color == team.color() {
            self.guesses_remaining = self.guesses_remaining.saturating_sub(1);
            if self.guesses_remaining == 0 {
                self.finish_turn(TurnOutcome::GuessesExhausted);
                Some(TurnOutcome::GuessesExhausted)
            } else {
                None
            }
        } else {
            self.finish_turn(TurnOutcome::WrongGuess);
            Some(TurnOutcome::WrongGuess)
        };

        Ok(GuessResult {
            card_index,
            color,
            turn_ended,
        })
    }

    /// Operative of the current team stops guessing
    pub fn end_turn(&mut self, actor: &Player) -> GameResult<()> {
        self.ensure_not_over()?;

        if self.phase != GamePhase::Guess {
            return Err(GameError::InvalidGuess(
                "There is no guessing turn to end".to_string(),
            ));
        }
        if !actor.is_connected_operative_of(self.current_team) {
            return Err(GameError::InvalidGuess(format!(
                "Only {} operatives can end the turn",
                self.current_team
            )));
        }

        self.finish_turn(TurnOutcome::Passed);
        Ok(())
    }

    /// End the current turn if its deadline has passed. Returns true if it did.
    pub fn expire_turn(&mut self, now: DateTime<Utc>) -> bool {
        match self.turn_deadline {
            Some(deadline) if !self.is_over() && deadline <= now => {
                self.finish_turn(TurnOutcome::TimedOut);
                true
            }
            _ => false,
        }
    }

    /// Decrement the count for a revealed team card, returning the winner if it hit zero
    fn count_revealed(&mut self, color: CardColor) -> Option<Team> {
        let team = color.team()?;
        let remaining = match team {
            Team::Blue => &mut self.blue_remaining,
            Team::Red => &mut self.red_remaining,
        };
        *remaining = remaining.saturating_sub(1);
        (*remaining == 0).then_some(team)
    }

    fn record_turn(&mut self, outcome: TurnOutcome) {
        self.history.push(TurnRecord {
            team: self.current_team,
            clue: self.current_clue.take(),
            guesses: std::mem::take(&mut self.current_guesses),
            outcome,
        });
        self.guesses_remaining = 0;
    }

    fn finish_turn(&mut self, outcome: TurnOutcome) {
        self.record_turn(outcome);
        self.current_team = self.current_team.other();
        self.phase = GamePhase::Clue;
        self.start_turn_clock();
    }

    fn finish_game(&mut self, winner: Team, outcome: TurnOutcome) {
        self.record_turn(outcome);
        self.winner = Some(winner);
        self.phase = GamePhase::GameOver;
        self.turn_deadline = None;
    }

    fn start_turn_clock(&mut self) {
        self.turn_deadline = self
            .turn_seconds
            .map(|secs| Utc::now() + chrono::Duration::seconds(i64::from(secs)));
    }
}
