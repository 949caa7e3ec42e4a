//! Room directory: creating, looking up and mutating rooms and their players.

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::RoomState;
use crate::types::*;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Room code alphabet: no I, O, 0 or 1 so codes survive being read aloud
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_GROUP_LENGTH: usize = 5;

pub const MAX_USERNAME_CHARS: usize = 20;
pub const MIN_TIMER_SECONDS: u32 = 10;
pub const MAX_TIMER_SECONDS: u32 = 600;

/// Generate a room code such as `K7MZQ-4HTXW`
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    let mut group = || -> String {
        (0..CODE_GROUP_LENGTH)
            .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
            .collect()
    };
    let first = group();
    format!("{}-{}", first, group())
}

/// Room ids are case-insensitive for lookup
pub fn normalize_room_id(room_id: &str) -> String {
    room_id.trim().to_ascii_uppercase()
}

fn validate_username(username: &str) -> GameResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(GameError::InvalidRequest(
            "Username cannot be blank".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(GameError::InvalidRequest(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_CHARS
        )));
    }
    Ok(username.to_string())
}

impl AppState {
    /// Create a room with `username` as its admin
    pub async fn create_room(&self, username: &str) -> GameResult<Room> {
        let username = validate_username(username)?;
        let mut rooms = self.rooms.write().await;

        if rooms.len() >= self.config.max_rooms {
            tracing::warn!("Refusing to create room: {} rooms exist", rooms.len());
            return Err(GameError::RoomLimitReached(self.config.max_rooms));
        }

        // Generate a unique code (collisions are rare with 32^10 combinations)
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let admin = Player::new(username, true);
        let room = Room::new(
            code.clone(),
            admin,
            RoomSettings::with_pack(self.config.default_word_pack.clone()),
        );
        rooms.insert(code.clone(), Arc::new(Mutex::new(room.clone())));

        tracing::info!("Created room {} for admin {}", code, room.admin_id);
        Ok(room)
    }

    /// Snapshot of a room
    pub async fn get_room(&self, room_id: &str) -> GameResult<Room> {
        let handle = self.room_handle(room_id).await?;
        let room = handle.lock().await;
        Ok(room.clone())
    }

    pub async fn room_exists(&self, room_id: &str) -> bool {
        self.rooms
            .read()
            .await
            .contains_key(&normalize_room_id(room_id))
    }

    /// Broadcast projection of a room
    pub async fn room_state(&self, room_id: &str) -> GameResult<RoomState> {
        let handle = self.room_handle(room_id).await?;
        let room = handle.lock().await;
        Ok(RoomState::from(&*room))
    }

    /// Add a new player. Fails if a connected player already uses the name.
    pub async fn join_room(&self, room_id: &str, username: &str) -> GameResult<(Room, PlayerId)> {
        let username = validate_username(username)?;

        let handle = self.room_handle(room_id).await?;
        let mut room = handle.lock().await;
        if room.username_taken(&username, None) {
            return Err(GameError::UsernameAlreadyExists(username));
        }

        let player = Player::new(username, false);
        let player_id = player.id.clone();
        tracing::info!("Player {} ({}) joined room {}", player.username, player_id, room.id);
        room.players.push(player);
        room.touch();
        Ok((room.clone(), player_id))
    }

    /// Move a player to a team and role.
    ///
    /// No team means spectating, and spectators have no team.
    pub async fn change_player_team(
        &self,
        room_id: &str,
        player_id: &str,
        team: Option<Team>,
        role: Role,
    ) -> GameResult<Room> {
        let (team, role) = match (team, role) {
            (None, _) | (_, Role::Spectator) => (None, Role::Spectator),
            (Some(team), role) => (Some(team), role),
        };

        self.mutate_room(room_id, |room| {
            if room.player(player_id).is_none() {
                return Err(GameError::PlayerNotFound(player_id.to_string()));
            }

            if let (Some(team), Role::Spymaster) = (team, role) {
                if room.connected_spymasters(team).any(|p| p.id != player_id) {
                    return Err(GameError::SpymasterAlreadyExists(team));
                }
            }

            let room_id = room.id.clone();
            if let Some(player) = room.player_mut(player_id) {
                player.team = team;
                player.role = role;
                tracing::info!(
                    "Player {} is now {:?} on {:?} in room {}",
                    player.username,
                    role,
                    team,
                    room_id
                );
            }
            Ok(())
        })
        .await
    }

    /// Flag a player as disconnected. Calling it again is harmless.
    pub async fn mark_player_disconnected(&self, room_id: &str, player_id: &str) -> GameResult<Room> {
        self.mutate_room(room_id, |room| {
            let room_id = room.id.clone();
            let player = room
                .player_mut(player_id)
                .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
            if player.connected {
                tracing::info!("Player {} disconnected from room {}", player.username, room_id);
            }
            player.connected = false;
            Ok(())
        })
        .await
    }

    /// Flag an existing player as connected again
    pub async fn reconnect_player(&self, room_id: &str, player_id: &str) -> GameResult<Room> {
        self.mutate_room(room_id, |room| {
            let username = room
                .player(player_id)
                .map(|p| p.username.clone())
                .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;

            // Someone may have joined under the same name while this player was away
            if room.username_taken(&username, Some(player_id)) {
                return Err(GameError::UsernameAlreadyExists(username));
            }

            if let Some(player) = room.player_mut(player_id) {
                player.connected = true;
            }
            tracing::info!("Player {} reconnected to room {}", username, room.id);
            Ok(())
        })
        .await
    }

    /// Change the word pack and turn timer. Not allowed mid-game.
    pub async fn update_settings(
        &self,
        room_id: &str,
        word_pack: Option<String>,
        timer_seconds: Option<u32>,
    ) -> GameResult<Room> {
        let word_pack = word_pack.map(|p| p.trim().to_lowercase());
        if let Some(pack) = &word_pack {
            if !self.words.has_pack(pack) {
                return Err(GameError::WordPackNotFound(pack.clone()));
            }
        }
        if let Some(secs) = timer_seconds {
            if !(MIN_TIMER_SECONDS..=MAX_TIMER_SECONDS).contains(&secs) {
                return Err(GameError::InvalidRequest(format!(
                    "Timer must be between {} and {} seconds",
                    MIN_TIMER_SECONDS, MAX_TIMER_SECONDS
                )));
            }
        }

        self.mutate_room(room_id, |room| {
            if room.game_in_progress() {
                return Err(GameError::InvalidState(
                    "Settings cannot change while a game is in progress".to_string(),
                ));
            }
            if let Some(pack) = word_pack {
                room.settings.word_pack = pack;
            }
            room.settings.timer_seconds = timer_seconds;
            Ok(())
        })
        .await
    }

    /// Remove rooms that have been idle past the TTL with nobody connected.
    /// Returns the ids of evicted rooms.
    pub async fn evict_idle_rooms(&self, now: DateTime<Utc>) -> Vec<RoomId> {
        let ttl = chrono::Duration::from_std(self.config.room_idle_ttl)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let is_idle = |room: &Room| {
            !room.has_connected_players() && now.signed_duration_since(room.last_activity) >= ttl
        };

        let handles: Vec<(RoomId, super::SharedRoom)> = self
            .rooms
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut candidates = Vec::new();
        for (id, handle) in handles {
            if is_idle(&*handle.lock().await) {
                candidates.push(id);
            }
        }
        if candidates.is_empty() {
            return candidates;
        }

        // Re-check under the registry lock; a busy room is skipped until next pass
        let mut rooms = self.rooms.write().await;
        let mut evicted = Vec::new();
        for id in candidates {
            let still_idle = rooms
                .get(&id)
                .and_then(|handle| handle.try_lock().ok().map(|room| is_idle(&*room)))
                .unwrap_or(false);
            if still_idle {
                rooms.remove(&id);
                evicted.push(id);
            }
        }
        evicted
    }

    /// `with_room` that hands back a snapshot of the mutated room
    pub(crate) async fn mutate_room(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut Room) -> GameResult<()>,
    ) -> GameResult<Room> {
        let handle = self.room_handle(room_id).await?;
        let mut room = handle.lock().await;
        f(&mut room)?;
        room.touch();
        Ok(room.clone())
    }
}
