pub mod http;
pub mod tui;

pub use http::DialogueClient;
pub use tui::ChatTui;
