pub mod web;

pub use web::{serve, start_dialogue_server, AppState};
