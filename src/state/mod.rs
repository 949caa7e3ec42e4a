mod game;
mod publish;
mod room;

pub use room::{generate_room_code, normalize_room_id};

use crate::broadcast::Gateway;
use crate::config::AppConfig;
use crate::error::{GameError, GameResult};
use crate::session::SessionBinder;
use crate::types::*;
use crate::words::{WordPacks, WordSource};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A room behind its own lock: mutations of one room are serialized while
/// different rooms proceed independently.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Keyed by normalized (upper-case) room id
    pub rooms: Arc<RwLock<HashMap<RoomId, SharedRoom>>>,
    pub sessions: Arc<SessionBinder>,
    pub gateway: Arc<Gateway>,
    pub words: Arc<dyn WordSource>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, words: Arc<dyn WordSource>) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(SessionBinder::new()),
            gateway: Arc::new(Gateway::new()),
            words,
            config: Arc::new(config),
        }
    }

    /// Look up the lock for a room without holding the registry lock afterwards
    pub async fn room_handle(&self, room_id: &str) -> GameResult<SharedRoom> {
        self.rooms
            .read()
            .await
            .get(&normalize_room_id(room_id))
            .cloned()
            .ok_or_else(|| GameError::RoomNotFound(room_id.trim().to_string()))
    }

    /// Run a mutation under the room's lock. The room version is bumped only
    /// when the mutation succeeds; the returned value is computed while locked.
    pub async fn with_room<T>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut Room) -> GameResult<T>,
    ) -> GameResult<T> {
        let handle = self.room_handle(room_id).await?;
        let mut room = handle.lock().await;
        let result = f(&mut room)?;
        room.touch();
        Ok(result)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default(), Arc::new(WordPacks::builtin()))
    }
}
