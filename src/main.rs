use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codenames::{
    api, background,
    config::AppConfig,
    state::AppState,
    types::BOARD_SIZE,
    words::{WordPacks, WordSource},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codenames=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting codenames server...");

    let config = AppConfig::from_env();

    let words = match &config.word_pack_dir {
        Some(dir) => match WordPacks::load_dir(dir) {
            Ok(packs) => packs,
            Err(e) => {
                tracing::warn!(
                    "Failed to load word packs from {}: {}. Using the built-in pack only.",
                    dir.display(),
                    e
                );
                WordPacks::builtin()
            }
        },
        None => WordPacks::builtin(),
    };

    match words.pack_len(&config.default_word_pack) {
        Some(n) if n >= BOARD_SIZE => {
            tracing::info!("Default word pack '{}' has {} words", config.default_word_pack, n);
        }
        Some(n) => {
            tracing::error!(
                "Default word pack '{}' has {} words, a board needs {}",
                config.default_word_pack,
                n,
                BOARD_SIZE
            );
            std::process::exit(1);
        }
        None => {
            tracing::error!(
                "Default word pack '{}' is not available (have: {:?})",
                config.default_word_pack,
                words.pack_names()
            );
            std::process::exit(1);
        }
    }

    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, Arc::new(words)));

    // Spawn background task for ending turns whose timer ran out
    background::spawn_turn_timer_watcher(state.clone());

    // Spawn background task for evicting abandoned rooms
    background::spawn_room_reaper(state.clone());

    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
