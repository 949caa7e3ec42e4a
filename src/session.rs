//! Binding between transport sessions and (player, room) pairs.
//!
//! Connect/disconnect notifications from the transport race with the
//! application-level join and reconnect requests of the same session. Every
//! operation here runs under one lock so the checks used to
//! reconcile those races are atomic with respect to each other.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::types::{PlayerId, RoomId, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub player_id: PlayerId,
    pub room_id: RoomId,
}

/// Identity resolved for one inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub player_id: Option<PlayerId>,
    pub room_id: Option<RoomId>,
}

impl SessionContext {
    pub fn anonymous(session_id: SessionId) -> Self {
        Self {
            session_id,
            player_id: None,
            room_id: None,
        }
    }

    /// The bound (room, player) pair, if any
    pub fn binding(&self) -> Option<(&str, &str)> {
        Some((self.room_id.as_deref()?, self.player_id.as_deref()?))
    }
}

#[derive(Debug, Default)]
struct SessionTable {
    by_session: HashMap<SessionId, Binding>,
    by_player: HashMap<PlayerId, SessionId>,
    /// Sessions whose transport closed, kept until pruned
    disconnected: HashMap<SessionId, DateTime<Utc>>,
    /// Lower-cased usernames with a join in flight, per session
    pending_joins: HashMap<SessionId, HashSet<String>>,
}

impl SessionTable {
    fn unbind_player(&mut self, player_id: &str) -> Option<SessionId> {
        let session_id = self.by_player.remove(player_id)?;
        self.by_session.remove(&session_id);
        Some(session_id)
    }
}

#[derive(Debug, Default)]
pub struct SessionBinder {
    inner: Mutex<SessionTable>,
}

impl SessionBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a session to a player. The latest registration for a player wins.
    ///
    /// Returns the binding this session previously held for a different
    /// player, so the caller can mark that player disconnected.
    pub async fn register_session(
        &self,
        player_id: &str,
        room_id: &str,
        session_id: &str,
    ) -> Option<Binding> {
        let mut table = self.inner.lock().await;

        table.unbind_player(player_id);

        let displaced = table
            .by_session
            .remove(session_id)
            .filter(|old| old.player_id != player_id);
        if let Some(old) = &displaced {
            table.by_player.remove(&old.player_id);
        }

        table.by_session.insert(
            session_id.to_string(),
            Binding {
                player_id: player_id.to_string(),
                room_id: room_id.to_string(),
            },
        );
        table
            .by_player
            .insert(player_id.to_string(), session_id.to_string());

        displaced
    }

    /// Clear whatever session is bound to this player
    pub async fn remove_session(&self, player_id: &str) -> Option<SessionId> {
        self.inner.lock().await.unbind_player(player_id)
    }

    /// Check whether the session's transport has already closed.
    ///
    /// A join or reconnect that finds the mark must treat itself as void. The
    /// mark is not cleared here: session ids are never reused, and every
    /// request still in flight on the closed session has to see it. Marks are
    /// dropped by `prune_disconnect_marks`.
    pub async fn consume_disconnected_session(&self, session_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .disconnected
            .contains_key(session_id)
    }

    /// Unbind whatever player this session is bound to
    pub async fn release_session(&self, session_id: &str) -> Option<Binding> {
        let mut table = self.inner.lock().await;
        let binding = table.by_session.remove(session_id)?;
        table.by_player.remove(&binding.player_id);
        Some(binding)
    }

    /// Transport-level disconnect.
    ///
    /// The session is marked closed so in-flight joins/reconnects discover it
    /// via `consume_disconnected_session`. A bound session is also unbound and
    /// its binding returned so the caller can mark the player disconnected.
    pub async fn session_closed(&self, session_id: &str) -> Option<Binding> {
        let mut table = self.inner.lock().await;

        table
            .disconnected
            .insert(session_id.to_string(), Utc::now());

        let binding = table.by_session.remove(session_id)?;
        table.by_player.remove(&binding.player_id);
        Some(binding)
    }

    /// Mark a join for `username` in flight. Returns false if an identical
    /// join from this session is already being processed.
    pub async fn begin_join(&self, session_id: &str, username: &str) -> bool {
        self.inner
            .lock()
            .await
            .pending_joins
            .entry(session_id.to_string())
            .or_default()
            .insert(username.to_lowercase())
    }

    pub async fn finish_join(&self, session_id: &str, username: &str) {
        let mut table = self.inner.lock().await;
        if let Some(pending) = table.pending_joins.get_mut(session_id) {
            pending.remove(&username.to_lowercase());
            if pending.is_empty() {
                table.pending_joins.remove(session_id);
            }
        }
    }

    pub async fn context(&self, session_id: &str) -> SessionContext {
        let table = self.inner.lock().await;
        match table.by_session.get(session_id) {
            Some(binding) => SessionContext {
                session_id: session_id.to_string(),
                player_id: Some(binding.player_id.clone()),
                room_id: Some(binding.room_id.clone()),
            },
            None => SessionContext::anonymous(session_id.to_string()),
        }
    }

    pub async fn session_for_player(&self, player_id: &str) -> Option<SessionId> {
        self.inner.lock().await.by_player.get(player_id).cloned()
    }

    /// Drop every binding into a room (used when the room is evicted)
    pub async fn forget_room(&self, room_id: &str) {
        let mut table = self.inner.lock().await;
        let players: Vec<PlayerId> = table
            .by_session
            .values()
            .filter(|b| b.room_id == room_id)
            .map(|b| b.player_id.clone())
            .collect();
        for player_id in players {
            table.unbind_player(&player_id);
        }
    }

    /// Drop disconnect marks older than `max_age`. Returns how many were dropped.
    pub async fn prune_disconnect_marks(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        let mut table = self.inner.lock().await;
        let before = table.disconnected.len();
        table.disconnected.retain(|_, marked_at| *marked_at > cutoff);
        before - table.disconnected.len()
    }

    pub async fn bound_sessions(&self) -> usize {
        self.inner.lock().await.by_session.len()
    }
}
