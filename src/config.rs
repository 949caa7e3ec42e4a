//! Server configuration loaded from environment variables (and `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::words::STANDARD_PACK;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Pack used for newly created rooms
    pub default_word_pack: String,
    /// Optional directory of extra `<pack>.txt` word lists
    pub word_pack_dir: Option<PathBuf>,
    /// Rooms without connected players are evicted after this much inactivity
    pub room_idle_ttl: Duration,
    pub max_rooms: usize,
    pub reaper_interval: Duration,
    /// How long an unclaimed "disconnected before join finished" mark is kept
    pub disconnect_mark_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            default_word_pack: STANDARD_PACK.to_string(),
            word_pack_dir: None,
            room_idle_ttl: Duration::from_secs(2 * 60 * 60),
            max_rooms: 10_000,
            reaper_interval: Duration::from_secs(60),
            disconnect_mark_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = parse_env("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let default_word_pack = std::env::var("DEFAULT_WORD_PACK")
            .ok()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_word_pack);

        let word_pack_dir = std::env::var("WORD_PACK_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let room_idle_ttl = parse_env("ROOM_IDLE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.room_idle_ttl);

        let max_rooms = parse_env("MAX_ROOMS").unwrap_or(defaults.max_rooms);

        let reaper_interval = parse_env("REAPER_INTERVAL_SECS")
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.reaper_interval);

        let disconnect_mark_ttl = parse_env("DISCONNECT_MARK_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.disconnect_mark_ttl);

        tracing::info!(
            %bind_addr,
            %default_word_pack,
            ?word_pack_dir,
            room_idle_ttl_secs = room_idle_ttl.as_secs(),
            max_rooms,
            "Server config loaded"
        );

        Self {
            bind_addr,
            default_word_pack,
            word_pack_dir,
            room_idle_ttl,
            max_rooms,
            reaper_interval,
            disconnect_mark_ttl,
        }
    }
}

/// Parse an env var, warning (and returning None) when it is set but invalid
fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
