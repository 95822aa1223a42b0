pub mod tui_writer;

pub use tui_writer::{LogBuffer, LogEntry, LogLevel, TuiWriter};
