// Public API for integration tests and potential library usage

pub mod api;
pub mod background;
pub mod board;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod game;
pub mod protocol;
pub mod session;
pub mod state;
pub mod types;
pub mod words;
pub mod ws;
