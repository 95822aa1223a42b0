use anyhow::Result;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};

use crate::core::{color_for_axis, Navigation, Role, Selection, Stage, Tool};
use crate::dialogue::{DialogueEvent, DialogueHandle, DialogueSnapshot, DialogueState};
use crate::utils::tui_writer::{LogBuffer, LogEntry};

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input,
    Tools,
    Axes,
    Saved,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Input => Focus::Tools,
            Focus::Tools => Focus::Axes,
            Focus::Axes => Focus::Saved,
            Focus::Saved => Focus::Input,
        }
    }
}

/// Full-screen chat over a [`DialogueHandle`].
pub struct ChatTui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    handle: DialogueHandle,
    snapshot: DialogueSnapshot,
    input: String,
    focus: Focus,
    tool_cursor: usize,
    // 0 is "no axis"
    axis_cursor: usize,
    saved_cursor: usize,
    status_message: String,
    logs: LogBuffer,
    spinner_frame: usize,
}

impl ChatTui {
    pub async fn new(handle: DialogueHandle) -> Result<Self> {
        let snapshot = handle.snapshot().await?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let tool_cursor = Tool::ALL
            .iter()
            .position(|t| *t == snapshot.tool)
            .unwrap_or_default();

        Ok(ChatTui {
            terminal,
            handle,
            snapshot,
            input: String::new(),
            focus: Focus::Input,
            tool_cursor,
            axis_cursor: 0,
            saved_cursor: 0,
            status_message: "Tab: switch pane | Enter: send | Ctrl+S: save | Ctrl+C: quit"
                .to_string(),
            logs: LogBuffer::default(),
            spinner_frame: 0,
        })
    }

    pub async fn run(&mut self, mut log_rx: mpsc::UnboundedReceiver<LogEntry>) -> Result<()> {
        let result = self.event_loop(&mut log_rx).await;
        self.cleanup();
        result
    }

    async fn event_loop(&mut self, log_rx: &mut mpsc::UnboundedReceiver<LogEntry>) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut dialogue_events = self.handle.subscribe();
        let mut spinner = interval(Duration::from_millis(120));

        self.draw()?;

        loop {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            if self.handle_key(key).await? {
                                tracing::info!("Leaving chat");
                                return Ok(());
                            }
                            self.draw()?;
                        }
                        Some(Ok(Event::Resize(_, _))) => self.draw()?,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => tracing::warn!("Event stream error: {:?}", e),
                        None => return Ok(()),
                    }
                }

                event = dialogue_events.recv() => {
                    match event {
                        Ok(DialogueEvent::AxesUpdated(axes)) => {
                            tracing::info!("Received {} axes", axes.len());
                            self.refresh().await?;
                        }
                        Ok(DialogueEvent::Changed) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            self.refresh().await?;
                        }
                        Err(broadcast::error::RecvError::Closed) => return Ok(()),
                    }
                    self.draw()?;
                }

                Some(entry) = log_rx.recv() => {
                    self.logs.push(entry);
                    self.draw()?;
                }

                _ = spinner.tick(), if self.snapshot.is_busy() => {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
                    self.draw()?;
                }
            }
        }
    }

    async fn refresh(&mut self) -> Result<()> {
        self.snapshot = self.handle.snapshot().await?;
        self.axis_cursor = self.axis_cursor.min(self.snapshot.axes.len());
        self.saved_cursor = self
            .saved_cursor
            .min(self.snapshot.saved.len().saturating_sub(1));
        Ok(())
    }

    /// Returns true when the user asked to quit.
    async fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return Ok(true),
            KeyCode::Esc => return Ok(true),
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return Ok(false);
            }
            KeyCode::Char('s') if ctrl => {
                match self.handle.save().await? {
                    Some(id) => self.status_message = format!("Saved dialogue {}", id),
                    None => self.status_message = "Nothing to save yet".to_string(),
                }
                self.refresh().await?;
                return Ok(false);
            }
            _ => {}
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key).await?,
            Focus::Tools => self.handle_tools_key(key).await?,
            Focus::Axes => self.handle_axes_key(key).await?,
            Focus::Saved => self.handle_saved_key(key).await?,
        }
        Ok(false)
    }

    async fn handle_input_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => {
                if self.input.trim().is_empty() {
                    return Ok(());
                }
                if self.handle.send(self.input.clone()).await? {
                    self.input.clear();
                } else {
                    self.status_message = "Still waiting for the assistant".to_string();
                }
                self.refresh().await?;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        Ok(())
    }

    async fn handle_tools_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up => self.tool_cursor = self.tool_cursor.saturating_sub(1),
            KeyCode::Down => self.tool_cursor = (self.tool_cursor + 1).min(Tool::ALL.len() - 1),
            KeyCode::Enter => {
                let tool = Tool::ALL[self.tool_cursor];
                self.navigate(Navigation::new(tool, self.snapshot.axis.as_deref()))
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_axes_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up => self.axis_cursor = self.axis_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.axis_cursor = (self.axis_cursor + 1).min(self.snapshot.axes.len())
            }
            KeyCode::Enter => {
                let axis = match self.axis_cursor {
                    0 => None,
                    i => self.snapshot.axes.get(i - 1).map(|a| a.key.clone()),
                };
                self.navigate(Navigation::new(self.snapshot.tool, axis.as_deref()))
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_saved_key(&mut self, key: KeyEvent) -> Result<()> {
        let selected = self.snapshot.saved.get(self.saved_cursor).map(|s| s.id);
        match key.code {
            KeyCode::Up => self.saved_cursor = self.saved_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.saved_cursor =
                    (self.saved_cursor + 1).min(self.snapshot.saved.len().saturating_sub(1))
            }
            KeyCode::Enter => {
                if let Some(id) = selected {
                    self.handle.select(Selection::Saved(id)).await?;
                }
            }
            KeyCode::Char('c') => {
                self.handle.select(Selection::Current).await?;
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = selected {
                    self.handle.delete(id).await?;
                    self.status_message = "Dialogue deleted".to_string();
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = selected {
                    let title = std::mem::take(&mut self.input);
                    self.handle.rename(id, title).await?;
                }
            }
            _ => {}
        }
        self.refresh().await
    }

    async fn navigate(&mut self, navigation: Navigation) -> Result<()> {
        self.status_message = format!("?{}", navigation.to_query());
        self.handle.navigate(navigation).await?;
        self.refresh().await
    }

    fn cleanup(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }

    fn draw(&mut self) -> Result<()> {
        let view = View {
            snapshot: &self.snapshot,
            input: &self.input,
            focus: self.focus,
            tool_cursor: self.tool_cursor,
            axis_cursor: self.axis_cursor,
            saved_cursor: self.saved_cursor,
            status_message: &self.status_message,
            logs: &self.logs,
            spinner: SPINNER[self.spinner_frame],
        };
        self.terminal.draw(|f| view.render(f))?;
        Ok(())
    }
}

impl Drop for ChatTui {
    fn drop(&mut self) {
        self.cleanup();
    }
}

struct View<'a> {
    snapshot: &'a DialogueSnapshot,
    input: &'a str,
    focus: Focus,
    tool_cursor: usize,
    axis_cursor: usize,
    saved_cursor: usize,
    status_message: &'a str,
    logs: &'a LogBuffer,
    spinner: &'a str,
}

impl View<'_> {
    fn render(&self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(10),
                Constraint::Length(6),
                Constraint::Length(1),
            ])
            .split(f.area());

        let header = Paragraph::new(format!(
            "Decision Maker | {} ({}) | {}",
            self.snapshot.tool.label(),
            self.snapshot.tool.stage().label(),
            self.snapshot
                .axis
                .as_deref()
                .unwrap_or("no axis")
        ))
        .style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
        f.render_widget(header, rows[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(30)])
            .split(rows[1]);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(Tool::ALL.len() as u16 + 4),
                Constraint::Length(self.snapshot.axes.len() as u16 + 3),
                Constraint::Min(3),
            ])
            .split(columns[0]);
        self.draw_tools(f, sidebar[0]);
        self.draw_axes(f, sidebar[1]);
        self.draw_saved(f, sidebar[2]);

        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(columns[1]);
        self.draw_messages(f, main[0]);
        self.draw_input(f, main[1]);

        draw_logs(f, rows[2], self.logs);

        let status = match &self.snapshot.error {
            Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            None => Paragraph::new(self.status_message).style(Style::default().fg(Color::Gray)),
        };
        f.render_widget(status, rows[3]);
    }

    fn pane(&self, title: &str, focus: Focus) -> Block<'static> {
        let color = if self.focus == focus {
            Color::Yellow
        } else {
            Color::Blue
        };
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
    }

    fn draw_tools(&self, f: &mut Frame, area: Rect) {
        let mut items = Vec::new();
        let mut rows = Vec::new();
        for stage in [Stage::Pre, Stage::Post] {
            items.push(ListItem::new(Line::from(Span::styled(
                stage.label(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            ))));
            for tool in Tool::for_stage(stage) {
                let style = if tool == self.snapshot.tool {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                rows.push((tool, items.len()));
                items.push(ListItem::new(Span::styled(format!("  {}", tool.label()), style)));
            }
        }

        let highlighted = Tool::ALL
            .get(self.tool_cursor)
            .and_then(|cursor| rows.iter().find(|(tool, _)| tool == cursor))
            .map(|(_, row)| *row);
        let mut state = ListState::default().with_selected(highlighted);
        let list = List::new(items)
            .block(self.pane("Tools", Focus::Tools))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_axes(&self, f: &mut Frame, area: Rect) {
        let mut items = vec![ListItem::new(Span::styled(
            "(no axis)",
            axis_style(self.snapshot.axis.is_none(), Color::Gray),
        ))];
        for axis in &self.snapshot.axes {
            let active = self.snapshot.axis.as_deref() == Some(axis.key.as_str());
            let color = hex_color(color_for_axis(&axis.key)).unwrap_or(Color::Gray);
            items.push(ListItem::new(Span::styled(
                format!("● {}", axis.label),
                axis_style(active, color),
            )));
        }

        let mut state = ListState::default().with_selected(Some(self.axis_cursor));
        let list = List::new(items)
            .block(self.pane("Axis", Focus::Axes))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_saved(&self, f: &mut Frame, area: Rect) {
        let viewing = match self.snapshot.selection {
            Selection::Saved(id) => Some(id),
            Selection::Current => None,
        };
        let items: Vec<ListItem> = self
            .snapshot
            .saved
            .iter()
            .map(|s| {
                let marker = if viewing == Some(s.id) { "▶ " } else { "  " };
                ListItem::new(format!("{}{}", marker, s.title))
            })
            .collect();

        let selected = if self.snapshot.saved.is_empty() {
            None
        } else {
            Some(self.saved_cursor)
        };
        let mut state = ListState::default().with_selected(selected);
        let list = List::new(items)
            .block(self.pane("Saved (Enter/c/d/r)", Focus::Saved))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_messages(&self, f: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        for message in &self.snapshot.messages {
            let (who, color) = match message.role {
                Role::User => ("you", Color::Green),
                Role::Assistant => ("assistant", Color::Cyan),
                Role::System => ("system", Color::DarkGray),
            };
            lines.push(Line::from(Span::styled(
                format!("{}:", who),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(message.text.clone()));
            lines.push(Line::from(""));
        }
        if self.snapshot.is_busy() {
            lines.push(Line::from(Span::styled(
                format!("{} thinking...", self.spinner),
                Style::default().fg(Color::Yellow),
            )));
        }

        let title = match self.snapshot.state {
            DialogueState::ViewingSaved => "Saved dialogue",
            _ => "Current dialogue",
        };
        let visible = area.height.saturating_sub(2) as usize;
        let scroll = lines.len().saturating_sub(visible) as u16;
        let messages = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue)),
            )
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        f.render_widget(messages, area);
    }

    fn draw_input(&self, f: &mut Frame, area: Rect) {
        let input = Paragraph::new(self.input).block(self.pane("Message", Focus::Input));
        f.render_widget(input, area);
        if self.focus == Focus::Input {
            let x = area.x + 1 + self.input.chars().count() as u16;
            f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }
}

fn axis_style(active: bool, color: Color) -> Style {
    let style = Style::default().fg(color);
    if active {
        style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        style
    }
}

/// Parses `#rrggbb`.
fn hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn draw_logs(f: &mut Frame, area: Rect, logs: &LogBuffer) {
    let logs_block = Block::default()
        .title("Logs")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    if logs.is_empty() {
        let no_logs = Paragraph::new("No logs")
            .style(Style::default().fg(Color::Gray))
            .block(logs_block)
            .alignment(Alignment::Center);
        f.render_widget(no_logs, area);
        return;
    }

    let log_lines: Vec<Line> = logs
        .iter()
        .map(|log| {
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", log.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("{:<5} ", log.level.as_str()),
                    Style::default()
                        .fg(log.level.color())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(log.message.clone(), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let visible = area.height.saturating_sub(2) as usize;
    let logs_paragraph = Paragraph::new(log_lines)
        .block(logs_block)
        .scroll((logs.len().saturating_sub(visible) as u16, 0));
    f.render_widget(logs_paragraph, area);
}
