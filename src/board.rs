//! Board generation: 25 shuffled cards with a fixed color distribution.

use crate::error::{GameError, GameResult};
use crate::types::{Card, CardColor, Team, BOARD_SIZE};
use rand::seq::SliceRandom;
use std::collections::HashSet;

const STARTING_TEAM_CARDS: usize = 9;
const OTHER_TEAM_CARDS: usize = 8;
const NEUTRAL_CARDS: usize = 7;

/// Build a board from at least 25 distinct words.
///
/// Words are upper-cased and deduplicated before counting. When more than 25
/// are supplied a random subset is used. The starting team gets nine cards,
/// the other team eight, plus seven neutral cards and one assassin.
pub fn create_board(words: &[String], starting_team: Team) -> GameResult<Vec<Card>> {
    let mut seen = HashSet::new();
    let mut pool: Vec<String> = words
        .iter()
        .map(|w| w.trim().to_uppercase())
        .filter(|w| !w.is_empty() && seen.insert(w.clone()))
        .collect();

    if pool.len() < BOARD_SIZE {
        return Err(GameError::InsufficientWords {
            required: BOARD_SIZE,
            available: pool.len(),
        });
    }

    let mut rng = rand::rng();
    pool.shuffle(&mut rng);
    pool.truncate(BOARD_SIZE);

    let mut colors = Vec::with_capacity(BOARD_SIZE);
    colors.extend(std::iter::repeat_n(starting_team.color(), STARTING_TEAM_CARDS));
    colors.extend(std::iter::repeat_n(
        starting_team.other().color(),
        OTHER_TEAM_CARDS,
    ));
    colors.extend(std::iter::repeat_n(CardColor::Neutral, NEUTRAL_CARDS));
    colors.push(CardColor::Assassin);
    colors.shuffle(&mut rng);

    Ok(pool
        .into_iter()
        .zip(colors)
        .map(|(word, color)| Card {
            word,
            color,
            revealed: false,
            selected_by: None,
        })
        .collect())
}

/// Number of cards a team must find when `starting_team` opens the game
pub fn cards_for(team: Team, starting_team: Team) -> u8 {
    if team == starting_team {
        STARTING_TEAM_CARDS as u8
    } else {
        OTHER_TEAM_CARDS as u8
    }
}
