use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::message::{Message, Role};
use super::tool::Tool;

/// Session identifier sent to the dialogue service for the unsaved draft.
pub const CURRENT_SESSION_ID: &str = "current";

/// Title given to a saved session renamed to nothing.
pub const UNTITLED_SESSION: &str = "Untitled dialogue";

// Counted in characters, so "Should I take the new job?" becomes "Should I take the ne…".
const TITLE_PREVIEW_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The (tool, axis) pair a conversation belongs to.
///
/// Construct through [`SessionKey::new`] so that goal-type tools and blank
/// axes normalise to "no axis".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub tool: Tool,
    pub axis: Option<String>,
}

impl SessionKey {
    pub fn new(tool: Tool, axis: Option<&str>) -> Self {
        let axis = if tool.is_goal() {
            None
        } else {
            axis.map(str::trim)
                .filter(|axis| !axis.is_empty())
                .map(str::to_string)
        };
        Self { tool, axis }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.axis {
            Some(axis) => write!(f, "{}[{}]", self.tool, axis),
            None => write!(f, "{}", self.tool),
        }
    }
}

/// Which conversation is being viewed and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Selection {
    Current,
    Saved(SessionId),
}

impl Selection {
    /// Identifier sent to the dialogue service.
    pub fn wire_id(&self) -> String {
        match self {
            Selection::Current => CURRENT_SESSION_ID.to_string(),
            Selection::Saved(id) => id.to_string(),
        }
    }
}

/// The single unsaved conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub key: SessionKey,
    pub messages: Vec<Message>,
}

impl Draft {
    pub fn empty(key: SessionKey) -> Self {
        Self {
            key,
            messages: Vec::new(),
        }
    }

    /// True when the draft holds anything worth keeping.
    pub fn has_content(&self) -> bool {
        self.messages.iter().any(|m| m.role.is_conversational())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSession {
    pub id: SessionId,
    pub title: String,
    pub tool: Tool,
    pub axis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl SavedSession {
    pub fn key(&self) -> SessionKey {
        SessionKey {
            tool: self.tool,
            axis: self.axis.clone(),
        }
    }

    fn matches(&self, key: &SessionKey) -> bool {
        self.tool == key.tool && (key.tool.is_goal() || self.axis == key.axis)
    }
}

/// Computes the title of a conversation about to be saved.
///
/// The first saved conversation of a tool is named after the tool; later ones
/// are named after the opening of their first user message.
pub fn title_for(tool: Tool, messages: &[Message], tool_has_saved: bool) -> String {
    if !tool_has_saved {
        return tool.label().to_string();
    }

    let Some(first) = messages.iter().find(|m| m.role == Role::User) else {
        return tool.label().to_string();
    };

    let text = first.text.trim();
    if text.chars().count() > TITLE_PREVIEW_CHARS {
        let preview: String = text.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!("{}…", preview)
    } else {
        text.to_string()
    }
}

/// In-memory conversations: one draft plus saved sessions, most recent first.
#[derive(Debug, Clone)]
pub struct SessionStore {
    draft: Draft,
    saved: Vec<SavedSession>,
    selection: Selection,
}

impl SessionStore {
    pub fn new(key: SessionKey) -> Self {
        Self {
            draft: Draft::empty(key),
            saved: Vec::new(),
            selection: Selection::Current,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn saved(&self) -> &[SavedSession] {
        &self.saved
    }

    pub fn get(&self, id: SessionId) -> Option<&SavedSession> {
        self.saved.iter().find(|s| s.id == id)
    }

    /// The selection after falling back from dangling saved ids.
    pub fn selection(&self) -> Selection {
        match self.selection {
            Selection::Saved(id) if self.get(id).is_none() => Selection::Current,
            selection => selection,
        }
    }

    /// Points the view at `selection`, returning what was actually selected.
    pub fn select(&mut self, selection: Selection) -> Selection {
        self.selection = selection;
        let resolved = self.selection();
        if resolved != selection {
            tracing::debug!("Selection {:?} no longer exists, viewing draft", selection);
            self.selection = resolved;
        }
        resolved
    }

    pub fn messages(&self, selection: &Selection) -> Option<&[Message]> {
        match selection {
            Selection::Current => Some(&self.draft.messages),
            Selection::Saved(id) => self.get(*id).map(|s| s.messages.as_slice()),
        }
    }

    /// Messages of whatever is currently being viewed.
    pub fn active_messages(&self) -> &[Message] {
        self.messages(&self.selection())
            .unwrap_or(&self.draft.messages)
    }

    /// First saved session for `tool`/`axis`. Axis is ignored for goal-type tools.
    pub fn find_saved(&self, tool: Tool, axis: Option<&str>) -> Option<&SavedSession> {
        let key = SessionKey::new(tool, axis);
        self.saved.iter().find(|s| s.matches(&key))
    }

    pub fn find_saved_by_key(&self, key: &SessionKey) -> Option<&SavedSession> {
        self.saved.iter().find(|s| s.matches(key))
    }

    pub fn has_saved_for_key(&self, key: &SessionKey) -> bool {
        self.find_saved_by_key(key).is_some()
    }

    /// Whether a saved session for the draft's key already holds exactly the draft's messages.
    pub fn draft_already_saved(&self) -> bool {
        self.saved
            .iter()
            .any(|s| s.matches(&self.draft.key) && s.messages == self.draft.messages)
    }

    /// Appends to the session `target` points at. Returns false (and does
    /// nothing) if `target` names a saved session that no longer exists.
    pub fn append(&mut self, target: &Selection, message: Message) -> bool {
        match target {
            Selection::Current => {
                self.draft.messages.push(message);
                true
            }
            Selection::Saved(id) => match self.saved.iter_mut().find(|s| s.id == *id) {
                Some(session) => {
                    session.messages.push(message);
                    true
                }
                None => false,
            },
        }
    }

    /// Converts the draft into a saved session placed first in the list and
    /// leaves an empty draft for the same key behind.
    pub fn promote(&mut self) -> SessionId {
        let key = self.draft.key.clone();
        let messages = std::mem::take(&mut self.draft.messages);
        let tool_has_saved = self.saved.iter().any(|s| s.tool == key.tool);
        let title = title_for(key.tool, &messages, tool_has_saved);

        let session = SavedSession {
            id: SessionId::new(),
            title,
            tool: key.tool,
            axis: key.axis,
            created_at: Utc::now(),
            messages,
        };
        let id = session.id;
        tracing::debug!("Saved dialogue {} as '{}'", id, session.title);
        self.saved.insert(0, session);
        id
    }

    /// Replaces the draft, e.g. when the active tool changes.
    pub fn reset_draft(&mut self, key: SessionKey, messages: Vec<Message>) {
        self.draft = Draft { key, messages };
    }

    pub fn delete(&mut self, id: SessionId) -> bool {
        let before = self.saved.len();
        self.saved.retain(|s| s.id != id);
        let removed = self.saved.len() != before;
        if self.selection == Selection::Saved(id) {
            self.selection = Selection::Current;
        }
        removed
    }

    pub fn rename(&mut self, id: SessionId, title: &str) -> bool {
        let Some(session) = self.saved.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        let title = title.trim();
        session.title = if title.is_empty() {
            UNTITLED_SESSION.to_string()
        } else {
            title.to_string()
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_for(tool: Tool) -> SessionStore {
        SessionStore::new(SessionKey::new(tool, None))
    }

    #[test]
    fn test_session_key_normalises_axis() {
        assert_eq!(SessionKey::new(Tool::SmartGoal, Some("work_model")).axis, None);
        assert_eq!(SessionKey::new(Tool::Debrief, Some("  ")).axis, None);
        assert_eq!(
            SessionKey::new(Tool::Debrief, Some("work_model")).axis.as_deref(),
            Some("work_model")
        );
    }

    #[test]
    fn test_title_uses_tool_label_for_first_session() {
        let messages = vec![Message::user("Should I take the new job opportunity now")];
        assert_eq!(
            title_for(Tool::DecisionExploration, &messages, false),
            "Decision Exploration"
        );
    }

    #[test]
    fn test_title_truncates_first_user_message() {
        let messages = vec![
            Message::assistant("What decision are we working on?"),
            Message::user("Should I take the new job opportunity now"),
        ];
        assert_eq!(
            title_for(Tool::DecisionExploration, &messages, true),
            "Should I take the ne…"
        );
    }

    #[test]
    fn test_title_keeps_short_messages_and_falls_back_to_label() {
        let short = vec![Message::user("Move to Lisbon?")];
        assert_eq!(title_for(Tool::Debrief, &short, true), "Move to Lisbon?");

        let opener_only = vec![Message::assistant("Hi")];
        assert_eq!(title_for(Tool::Debrief, &opener_only, true), "Decision Debrief");
    }

    #[test]
    fn test_promote_prepends_and_clears_draft() {
        let mut store = store_for(Tool::Debrief);
        store.append(&Selection::Current, Message::user("first"));
        let first = store.promote();
        store.append(&Selection::Current, Message::user("another long conversation"));
        let second = store.promote();

        let ids: Vec<SessionId> = store.saved().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(store.draft().messages.is_empty());
        assert_eq!(store.get(first).unwrap().title, "Decision Debrief");
        assert_eq!(store.get(second).unwrap().title, "another long convers…");
    }

    #[test]
    fn test_find_saved_matches_axis_except_for_goal_tool() {
        let mut store = SessionStore::new(SessionKey::new(Tool::Debrief, Some("work_model")));
        store.append(&Selection::Current, Message::user("a"));
        store.promote();

        assert!(store.find_saved(Tool::Debrief, Some("work_model")).is_some());
        assert!(store.find_saved(Tool::Debrief, None).is_none());
        assert!(store.find_saved(Tool::Debrief, Some("team_type")).is_none());

        store.reset_draft(SessionKey::new(Tool::SmartGoal, None), Vec::new());
        store.append(&Selection::Current, Message::user("goal"));
        store.promote();
        assert!(store.find_saved(Tool::SmartGoal, Some("team_type")).is_some());
    }

    #[test]
    fn test_append_to_missing_session_is_noop() {
        let mut store = store_for(Tool::Debrief);
        assert!(!store.append(&Selection::Saved(SessionId::new()), Message::user("lost")));
        assert!(store.draft().messages.is_empty());
    }

    #[test]
    fn test_dangling_selection_falls_back_to_draft() {
        let mut store = store_for(Tool::Debrief);
        store.append(&Selection::Current, Message::user("draft text"));

        for _ in 0..10 {
            let selected = store.select(Selection::Saved(SessionId::new()));
            assert_eq!(selected, Selection::Current);
            assert_eq!(store.active_messages(), store.draft().messages.as_slice());
        }
    }

    #[test]
    fn test_delete_selected_session_reverts_to_draft() {
        let mut store = store_for(Tool::Debrief);
        store.append(&Selection::Current, Message::user("keep me"));
        let id = store.promote();
        store.select(Selection::Saved(id));

        assert!(store.delete(id));
        assert_eq!(store.selection(), Selection::Current);
        assert!(!store.delete(id));
    }

    #[test]
    fn test_rename_blank_uses_placeholder() {
        let mut store = store_for(Tool::Debrief);
        store.append(&Selection::Current, Message::user("x"));
        let id = store.promote();

        assert!(store.rename(id, "  Career move  "));
        assert_eq!(store.get(id).unwrap().title, "Career move");
        assert!(store.rename(id, "   "));
        assert_eq!(store.get(id).unwrap().title, UNTITLED_SESSION);
        assert!(!store.rename(SessionId::new(), "ghost"));
    }

    #[test]
    fn test_selection_wire_id() {
        assert_eq!(Selection::Current.wire_id(), "current");
        let id = SessionId::new();
        assert_eq!(Selection::Saved(id).wire_id(), id.to_string());
    }
}
