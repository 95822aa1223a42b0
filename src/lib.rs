// Decision Maker Library
// Tool-scoped decision dialogues with a terminal front end and a development dialogue service

pub mod assets;
pub mod cli;
pub mod client;
pub mod core;
pub mod dialogue;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use client::http::DialogueClient;
pub use core::{Config, Navigation, SessionStore, Tool};
pub use dialogue::{DialogueController, DialogueHandle, DialogueService};

// Error handling
pub use anyhow::{Error, Result};
