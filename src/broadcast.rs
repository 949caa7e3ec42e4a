//! Fan-out of server messages to WebSocket sessions.
//!
//! Each connected session registers an outbound channel; rooms keep the set of
//! sessions subscribed to them. Delivery is fire-and-forget: a closed channel
//! simply drops the message.

use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerMessage;
use crate::types::{RoomId, SessionId};

pub type SessionSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Default)]
pub struct Gateway {
    sessions: RwLock<HashMap<SessionId, SessionSender>>,
    rooms: RwLock<HashMap<RoomId, HashSet<SessionId>>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, session_id: &str, sender: SessionSender) {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), sender);
    }

    /// Forget a session and drop it from every room.
    ///
    /// Takes `rooms` before `sessions`, the same order `subscribe` uses.
    pub async fn disconnect(&self, session_id: &str) {
        let mut rooms = self.rooms.write().await;
        self.sessions.write().await.remove(session_id);
        leave_all(&mut rooms, session_id);
    }

    /// Subscribe a session to a room, leaving any room it was in before.
    /// Sessions that already went away are ignored.
    pub async fn subscribe(&self, room_id: &str, session_id: &str) {
        // Held across the liveness check so it and the insert are atomic
        // with respect to `disconnect`
        let mut rooms = self.rooms.write().await;
        if !self.sessions.read().await.contains_key(session_id) {
            tracing::debug!("Not subscribing closed session {} to {}", session_id, room_id);
            return;
        }

        for (id, members) in rooms.iter_mut() {
            if id != room_id {
                members.remove(session_id);
            }
        }
        rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(session_id.to_string());
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Drop a session from every room but keep its outbound channel
    pub async fn unsubscribe(&self, session_id: &str) {
        leave_all(&mut *self.rooms.write().await, session_id);
    }

    pub async fn unsubscribe_all(&self, room_id: &str) {
        self.rooms.write().await.remove(room_id);
    }

    /// Deliver to every session subscribed to the room
    pub async fn broadcast(&self, room_id: &str, msg: ServerMessage) {
        let members: Vec<SessionId> = match self.rooms.read().await.get(room_id) {
            Some(members) => members.iter().cloned().collect(),
            None => return,
        };

        let sessions = self.sessions.read().await;
        for session_id in members {
            if let Some(sender) = sessions.get(&session_id) {
                // Ignore send errors (the socket task is shutting down)
                let _ = sender.send(msg.clone());
            }
        }
    }

    /// Deliver privately to one session
    pub async fn send_to_session(&self, session_id: &str, msg: ServerMessage) {
        if let Some(sender) = self.sessions.read().await.get(session_id) {
            let _ = sender.send(msg);
        }
    }

    pub async fn subscriber_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map_or(0, HashSet::len)
    }
}

fn leave_all(rooms: &mut HashMap<RoomId, HashSet<SessionId>>, session_id: &str) {
    for members in rooms.values_mut() {
        members.remove(session_id);
    }
    rooms.retain(|_, members| !members.is_empty());
}
