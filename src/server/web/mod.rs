pub mod dialogue;
pub mod flows;
pub mod routes;
pub mod types;

pub use routes::{router, serve, start_dialogue_server};
pub use types::{AppState, HealthResponse};
