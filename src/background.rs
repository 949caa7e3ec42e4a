use crate::state::AppState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Spawn a background task that ends turns whose timer ran out
pub fn spawn_turn_timer_watcher(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;

            for room in state.expire_turns(Utc::now()).await {
                state.publish_all(&room).await;
            }
        }
    });
}

/// Spawn a background task that evicts idle rooms and stale disconnect marks
pub fn spawn_room_reaper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let period = state.config.reaper_interval.max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            reap_once(&state).await;
        }
    });
}

/// One reaper pass
pub async fn reap_once(state: &AppState) {
    for room_id in state.evict_idle_rooms(Utc::now()).await {
        state.sessions.forget_room(&room_id).await;
        state.gateway.unsubscribe_all(&room_id).await;
        tracing::info!("Evicted idle room {}", room_id);
    }

    let pruned = state
        .sessions
        .prune_disconnect_marks(state.config.disconnect_mark_ttl)
        .await;
    if pruned > 0 {
        tracing::debug!("Pruned {} stale disconnect marks", pruned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::words::WordPacks;

    #[tokio::test]
    async fn test_reap_once_evicts_abandoned_rooms() {
        let config = AppConfig {
            room_idle_ttl: Duration::ZERO,
            disconnect_mark_ttl: Duration::ZERO,
            ..Default::default()
        };
        let state = AppState::new(config, Arc::new(WordPacks::builtin()));

        let abandoned = state.create_room("Alice").await.unwrap();
        state
            .mark_player_disconnected(&abandoned.id, &abandoned.admin_id)
            .await
            .unwrap();
        let active = state.create_room("Bob").await.unwrap();
        state
            .sessions
            .register_session(&active.admin_id, &active.id, "s1")
            .await;
        state.sessions.session_closed("orphan").await;

        reap_once(&state).await;

        assert!(!state.room_exists(&abandoned.id).await);
        assert!(state.room_exists(&active.id).await);
        assert!(!state.sessions.consume_disconnected_session("orphan").await);
        assert_eq!(state.sessions.bound_sessions().await, 1);
    }
}
