use ratatui::style::Color;
use std::collections::VecDeque;
use std::io;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;

/// How many log lines the chat screen keeps around.
pub const LOG_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "ERROR" => LogLevel::Error,
            "WARN" => LogLevel::Warn,
            "DEBUG" => LogLevel::Debug,
            "TRACE" => LogLevel::Trace,
            _ => LogLevel::Info,
        })
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            LogLevel::Error => Color::Red,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Info => Color::Cyan,
            LogLevel::Debug => Color::Gray,
            LogLevel::Trace => Color::DarkGray,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl LogEntry {
    fn plain(message: &str) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Most recent log lines, oldest first.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == LOG_HISTORY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Routes tracing output into the chat screen instead of stderr, which the
/// alternate screen would otherwise garble.
#[derive(Clone)]
pub struct TuiWriter {
    sender: mpsc::UnboundedSender<LogEntry>,
}

impl TuiWriter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (TuiWriter { sender }, receiver)
    }
}

impl io::Write for TuiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines() {
            if let Some(entry) = parse_tracing_line(line) {
                let _ = self.sender.send(entry);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for TuiWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// Format: "2026-03-02T10:15:07.498408Z  WARN decision_maker::dialogue::controller: message"
fn parse_tracing_line(line: &str) -> Option<LogEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.split_whitespace();
    let (Some(timestamp), Some(level)) = (parts.next(), parts.next()) else {
        return Some(LogEntry::plain(line));
    };
    let Ok(timestamp) = chrono::DateTime::parse_from_rfc3339(timestamp) else {
        return Some(LogEntry::plain(line));
    };

    let rest = line
        .split_once(level)
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or_default();
    let message = match rest.split_once(": ") {
        Some((target, message)) if !target.contains(' ') => message,
        _ => rest,
    };

    Some(LogEntry {
        level: level.parse().unwrap_or(LogLevel::Info),
        message: message.to_string(),
        timestamp: timestamp.with_timezone(&chrono::Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tracing_line_strips_target() {
        let line = "2026-03-02T10:15:07.498408Z  WARN decision_maker::dialogue::controller: Dialogue turn failed: timeout";
        let parsed = parse_tracing_line(line).unwrap();

        assert_eq!(parsed.level, LogLevel::Warn);
        assert_eq!(parsed.message, "Dialogue turn failed: timeout");
    }

    #[test]
    fn test_parse_untimestamped_line() {
        let parsed = parse_tracing_line("listening on 127.0.0.1:8000").unwrap();
        assert_eq!(parsed.level, LogLevel::Info);
        assert_eq!(parsed.message, "listening on 127.0.0.1:8000");
        assert!(parse_tracing_line("   ").is_none());
    }

    #[test]
    fn test_log_buffer_keeps_latest() {
        let mut buffer = LogBuffer::default();
        for i in 0..LOG_HISTORY + 5 {
            buffer.push(LogEntry::plain(&format!("line {}", i)));
        }
        assert_eq!(buffer.len(), LOG_HISTORY);
        assert_eq!(buffer.iter().next().unwrap().message, "line 5");
    }
}
