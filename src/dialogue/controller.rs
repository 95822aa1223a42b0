//! The dialogue state machine.
//!
//! `DialogueController` owns every conversation and decides when to save,
//! switch, fetch an opener or send a turn. It never performs I/O itself:
//! operations that need the dialogue service return an [`Outbound`] request
//! tagged with a [`Ticket`], and the caller reports the result back through
//! [`DialogueController::complete`]. Results whose ticket is no longer the
//! one being waited for are dropped, so a slow response can never land in a
//! conversation the user has already left.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::service::DialogueError;
use crate::core::{
    default_axes, Axis, DialogueReply, DialogueRequest, Message, Navigation, Selection, SessionId,
    SessionKey, SessionStore, Tool,
};

/// Shown in place of an opener the dialogue service failed to provide.
pub const OPENER_APOLOGY: &str =
    "Sorry, I couldn't start this conversation. Tell me about your decision to begin.";

/// Appended when a turn fails; the reason is reported separately.
pub const SEND_APOLOGY: &str = "Sorry, something went wrong reaching the assistant. Please try again.";

/// The draft a fresh conversation starts from after an explicit save.
pub const READY_MESSAGE: &str = "LLM ready. Ask about your decision.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DialogueState {
    /// Viewing a draft with no conversation in it.
    IdleCurrent,
    /// Viewing a draft that has at least one user or assistant message.
    ActiveCurrent,
    ViewingSaved,
    /// Waiting for the opener of the draft being viewed.
    Initializing,
    /// Waiting for the reply to a user message.
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Opener,
    Turn,
}

/// A request the controller needs sent to the dialogue service.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub ticket: Ticket,
    pub kind: RequestKind,
    pub request: DialogueRequest,
}

/// What applying a response did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub applied: bool,
    /// Replacement axis catalogue carried by the reply, for the axis picker.
    pub axes: Option<Vec<Axis>>,
}

impl Completion {
    fn discarded() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub tool: Tool,
    pub axis: Option<String>,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Everything a front end needs to render the dialogue panel.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueSnapshot {
    pub tool: Tool,
    pub axis: Option<String>,
    pub state: DialogueState,
    pub selection: Selection,
    pub messages: Vec<Message>,
    pub saved: Vec<SessionSummary>,
    pub input: String,
    pub error: Option<String>,
    pub axes: Vec<Axis>,
}

impl DialogueSnapshot {
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            DialogueState::Initializing | DialogueState::Sending
        )
    }
}

#[derive(Debug)]
struct PendingOpener {
    ticket: Ticket,
    key: SessionKey,
    epoch: u64,
}

#[derive(Debug)]
struct PendingSend {
    ticket: Ticket,
    /// Where the reply goes; `None` once that conversation has been discarded.
    target: Option<Selection>,
}

#[derive(Debug)]
pub struct DialogueController {
    store: SessionStore,
    navigation: Navigation,
    input: String,
    error: Option<String>,
    axes: Vec<Axis>,
    initialized: HashSet<SessionKey>,
    opener: Option<PendingOpener>,
    sending: Option<PendingSend>,
    /// Bumped whenever the conversation being shown is replaced.
    epoch: u64,
    next_ticket: u64,
}

impl DialogueController {
    pub fn new(navigation: Navigation) -> Self {
        Self {
            store: SessionStore::new(navigation.key()),
            navigation,
            input: String::new(),
            error: None,
            axes: default_axes(),
            initialized: HashSet::new(),
            opener: None,
            sending: None,
            epoch: 0,
            next_ticket: 0,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_some()
    }

    pub fn state(&self) -> DialogueState {
        if self.sending.is_some() {
            return DialogueState::Sending;
        }
        match self.store.selection() {
            Selection::Saved(_) => DialogueState::ViewingSaved,
            Selection::Current => {
                let waiting_for_opener = self
                    .opener
                    .as_ref()
                    .is_some_and(|p| p.epoch == self.epoch && p.key == self.store.draft().key);
                if waiting_for_opener {
                    DialogueState::Initializing
                } else if self.store.draft().has_content() {
                    DialogueState::ActiveCurrent
                } else {
                    DialogueState::IdleCurrent
                }
            }
        }
    }

    pub fn snapshot(&self) -> DialogueSnapshot {
        DialogueSnapshot {
            tool: self.navigation.tool,
            axis: self.navigation.axis.clone(),
            state: self.state(),
            selection: self.store.selection(),
            messages: self.store.active_messages().to_vec(),
            saved: self
                .store
                .saved()
                .iter()
                .map(|s| SessionSummary {
                    id: s.id,
                    title: s.title.clone(),
                    tool: s.tool,
                    axis: s.axis.clone(),
                    created_at: s.created_at,
                    message_count: s.messages.len(),
                })
                .collect(),
            input: self.input.clone(),
            error: self.error.clone(),
            axes: self.axes.clone(),
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    /// Starts fetching an opener if the draft being viewed needs one.
    ///
    /// A draft needs an opener when it is empty, nothing has been saved for
    /// its tool/axis, and no opener was already fetched for that pair.
    pub fn ensure_opener(&mut self) -> Option<Outbound> {
        let key = self.store.draft().key.clone();
        if self.store.selection() != Selection::Current
            || self.store.draft().has_content()
            || self.store.has_saved_for_key(&key)
            || self.initialized.contains(&key)
        {
            return None;
        }
        let already_waiting = self
            .opener
            .as_ref()
            .is_some_and(|p| p.epoch == self.epoch && p.key == key);
        if already_waiting {
            return None;
        }

        let ticket = self.issue_ticket();
        tracing::debug!("Requesting opener for {} ({:?})", key, ticket);
        let request = DialogueRequest::opener(key.tool, Selection::Current.wire_id());
        self.opener = Some(PendingOpener {
            ticket,
            key,
            epoch: self.epoch,
        });
        Some(Outbound {
            ticket,
            kind: RequestKind::Opener,
            request,
        })
    }

    /// Saves the draft under its own tool/axis if it holds something new.
    fn autosave_draft(&mut self) -> Option<SessionId> {
        let draft = self.store.draft();
        if !draft.has_content() {
            return None;
        }
        // The draft is about to be replaced, so its pair may need an opener again.
        self.initialized.remove(&draft.key);
        if self.store.draft_already_saved() {
            tracing::debug!("Draft for {} matches a saved dialogue, not saving again", draft.key);
            return None;
        }
        let id = self.store.promote();
        self.retarget_pending_send(Some(Selection::Saved(id)));
        tracing::info!("Auto-saved dialogue {}", id);
        Some(id)
    }

    /// Follows the draft when it is saved (or drops the reply when it's discarded).
    fn retarget_pending_send(&mut self, to: Option<Selection>) {
        if let Some(pending) = self.sending.as_mut() {
            if pending.target == Some(Selection::Current) {
                pending.target = to;
            }
        }
    }

    /// Reacts to a tool/axis change from the navigation surface.
    pub fn navigate(&mut self, navigation: Navigation) -> Option<Outbound> {
        let navigation = Navigation::new(navigation.tool, navigation.axis.as_deref());
        if navigation == self.navigation {
            tracing::debug!("Navigation to {} repeated, ignoring", navigation.to_query());
            return None;
        }
        tracing::info!("Switching dialogue to {}", navigation.to_query());

        if self.autosave_draft().is_none() {
            self.retarget_pending_send(None);
        }

        self.epoch += 1;
        self.navigation = navigation;
        let key = self.navigation.key();
        let saved = self.store.find_saved_by_key(&key).map(|s| s.id);
        self.store.reset_draft(key, Vec::new());
        self.error = None;

        match saved {
            Some(id) => {
                self.store.select(Selection::Saved(id));
                None
            }
            None => {
                self.store.select(Selection::Current);
                self.ensure_opener()
            }
        }
    }

    /// Sends the input field as a user message.
    ///
    /// Returns `None` when the input is blank or a reply is still pending.
    pub fn submit(&mut self) -> Option<Outbound> {
        if self.input.trim().is_empty() {
            return None;
        }
        if self.sending.is_some() {
            tracing::debug!("Send ignored, a reply is still pending");
            return None;
        }

        let text = std::mem::take(&mut self.input);
        let target = self.store.selection();
        let tool = match target {
            Selection::Saved(id) => self.store.get(id).map(|s| s.tool),
            Selection::Current => None,
        }
        .unwrap_or(self.store.draft().key.tool);

        let prior = self.store.messages(&target).unwrap_or_default();
        let request = DialogueRequest::turn(tool, target.wire_id(), text.clone(), prior);
        self.store.append(&target, Message::user(text));
        self.error = None;

        let ticket = self.issue_ticket();
        self.sending = Some(PendingSend {
            ticket,
            target: Some(target),
        });
        Some(Outbound {
            ticket,
            kind: RequestKind::Turn,
            request,
        })
    }

    /// Applies the outcome of a request previously returned as [`Outbound`].
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<DialogueReply, DialogueError>,
    ) -> Completion {
        if self.opener.as_ref().is_some_and(|p| p.ticket == ticket) {
            return self.complete_opener(result);
        }
        if self.sending.as_ref().is_some_and(|p| p.ticket == ticket) {
            return self.complete_send(result);
        }
        tracing::debug!("Discarding stale dialogue response {:?}", ticket);
        Completion::discarded()
    }

    fn complete_opener(&mut self, result: Result<DialogueReply, DialogueError>) -> Completion {
        let Some(pending) = self.opener.take() else {
            return Completion::discarded();
        };

        let still_wanted = pending.epoch == self.epoch
            && self.store.selection() == Selection::Current
            && self.store.draft().key == pending.key
            && !self.store.draft().has_content()
            && !self.store.has_saved_for_key(&pending.key)
            && !self.initialized.contains(&pending.key);
        if !still_wanted {
            tracing::debug!("Opener for {} arrived too late, discarding", pending.key);
            return Completion::discarded();
        }

        let (text, axes) = match result {
            Ok(reply) => (reply.reply, reply.axes),
            Err(e) => {
                tracing::warn!("Failed to fetch opener for {}: {}", pending.key, e);
                (OPENER_APOLOGY.to_string(), None)
            }
        };
        self.store.append(&Selection::Current, Message::assistant(text));
        self.initialized.insert(pending.key);
        if let Some(axes) = &axes {
            self.axes = axes.clone();
        }
        Completion {
            applied: true,
            axes,
        }
    }

    fn complete_send(&mut self, result: Result<DialogueReply, DialogueError>) -> Completion {
        let Some(pending) = self.sending.take() else {
            return Completion::discarded();
        };
        let Some(target) = pending.target else {
            tracing::debug!("Reply for a discarded draft arrived, dropping it");
            return Completion::discarded();
        };

        match result {
            Ok(reply) => {
                if !self.store.append(&target, Message::assistant(reply.reply)) {
                    tracing::debug!("Dialogue {:?} is gone, dropping reply", target);
                    return Completion::discarded();
                }
                if let Some(axes) = &reply.axes {
                    self.axes = axes.clone();
                }
                Completion {
                    applied: true,
                    axes: reply.axes,
                }
            }
            Err(e) => {
                tracing::warn!("Dialogue turn failed: {}", e);
                self.store.append(&target, Message::assistant(SEND_APOLOGY));
                self.error = Some(e.to_string());
                Completion {
                    applied: true,
                    axes: None,
                }
            }
        }
    }

    /// Explicitly saves the draft and starts a fresh one.
    pub fn save(&mut self) -> Option<SessionId> {
        if !self.store.draft().has_content() {
            return None;
        }
        let key = self.store.draft().key.clone();
        let id = self.store.promote();
        tracing::info!("Saved dialogue {} for {}", id, key);

        self.store
            .reset_draft(key.clone(), vec![Message::system(READY_MESSAGE)]);
        self.store.select(Selection::Current);
        self.input.clear();
        self.error = None;
        self.sending = None;
        self.opener = None;
        self.initialized.remove(&key);
        self.epoch += 1;
        Some(id)
    }

    /// Views `selection`; dangling saved ids fall back to the draft.
    pub fn select(&mut self, selection: Selection) -> (Selection, Option<Outbound>) {
        let selected = self.store.select(selection);
        (selected, self.ensure_opener())
    }

    pub fn delete(&mut self, id: SessionId) -> (bool, Option<Outbound>) {
        let removed = self.store.delete(id);
        if removed {
            tracing::info!("Deleted dialogue {}", id);
        }
        (removed, self.ensure_opener())
    }

    pub fn rename(&mut self, id: SessionId, title: &str) -> bool {
        self.store.rename(id, title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Role, GENERIC_OPENER};

    fn open(tool: Tool) -> (DialogueController, Outbound) {
        let mut controller = DialogueController::new(Navigation::new(tool, None));
        let opener = controller.ensure_opener().expect("fresh tool requests an opener");
        (controller, opener)
    }

    fn ok(text: &str) -> Result<DialogueReply, DialogueError> {
        Ok(DialogueReply::text(text))
    }

    fn failed() -> Result<DialogueReply, DialogueError> {
        Err(DialogueError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        })
    }

    fn texts(controller: &DialogueController) -> Vec<(Role, String)> {
        controller
            .store()
            .active_messages()
            .iter()
            .map(|m| (m.role, m.text.clone()))
            .collect()
    }

    fn all_texts(controller: &DialogueController) -> Vec<String> {
        let store = controller.store();
        store
            .draft()
            .messages
            .iter()
            .chain(store.saved().iter().flat_map(|s| s.messages.iter()))
            .map(|m| m.text.clone())
            .collect()
    }

    #[test]
    fn test_end_to_end_opener_then_turn() {
        let (mut controller, opener) = open(Tool::DecisionExploration);
        assert_eq!(opener.kind, RequestKind::Opener);
        assert!(opener.request.is_opener());
        assert_eq!(opener.request.tool.as_deref(), Some("decision-exploration"));
        assert_eq!(controller.state(), DialogueState::Initializing);
        assert!(controller.ensure_opener().is_none());

        assert!(controller.complete(opener.ticket, ok("Which options?")).applied);
        assert_eq!(controller.state(), DialogueState::ActiveCurrent);

        controller.set_input("pick option A");
        let turn = controller.submit().unwrap();
        assert_eq!(turn.request.message, "pick option A");
        assert_eq!(turn.request.session_id, "current");
        assert_eq!(controller.input(), "");
        assert_eq!(controller.state(), DialogueState::Sending);

        controller.complete(turn.ticket, ok("Good choice"));
        assert_eq!(
            texts(&controller),
            vec![
                (Role::Assistant, "Which options?".to_string()),
                (Role::User, "pick option A".to_string()),
                (Role::Assistant, "Good choice".to_string()),
            ]
        );
        assert!(controller.ensure_opener().is_none());
    }

    #[test]
    fn test_stale_opener_is_never_appended() {
        let (mut controller, opener) = open(Tool::DecisionExploration);
        let second = controller
            .navigate(Navigation::new(Tool::Debrief, None))
            .unwrap();

        let completion = controller.complete(opener.ticket, ok("late opener"));
        assert!(!completion.applied);
        assert!(!all_texts(&controller).contains(&"late opener".to_string()));

        controller.complete(second.ticket, ok("Debrief opener"));
        assert_eq!(all_texts(&controller), vec!["Debrief opener".to_string()]);
    }

    #[test]
    fn test_returning_to_tool_requests_fresh_opener() {
        let (mut controller, first) = open(Tool::DecisionExploration);
        controller.navigate(Navigation::new(Tool::Debrief, None));
        let again = controller
            .navigate(Navigation::new(Tool::DecisionExploration, None))
            .expect("the first opener was abandoned");
        assert_ne!(again.ticket, first.ticket);

        assert!(!controller.complete(first.ticket, ok("old")).applied);
        assert!(controller.complete(again.ticket, ok("new")).applied);
        assert_eq!(texts(&controller), vec![(Role::Assistant, "new".to_string())]);
    }

    #[test]
    fn test_repeated_navigation_is_ignored() {
        let (mut controller, _opener) = open(Tool::DecisionExploration);
        assert!(controller
            .navigate(Navigation::new(Tool::DecisionExploration, None))
            .is_none());
        assert_eq!(controller.state(), DialogueState::Initializing);
    }

    #[test]
    fn test_failed_opener_apologises_and_is_not_retried() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, failed());
        assert_eq!(texts(&controller), vec![(Role::Assistant, OPENER_APOLOGY.to_string())]);
        assert!(controller.ensure_opener().is_none());
    }

    #[test]
    fn test_switching_tools_saves_draft_under_previous_tool() {
        let (mut controller, opener) = open(Tool::DecisionExploration);
        controller.complete(opener.ticket, ok("Which options?"));
        controller.set_input("Should I take the new job opportunity now");
        let turn = controller.submit().unwrap();
        controller.complete(turn.ticket, ok("Tell me more"));

        controller.navigate(Navigation::new(Tool::Debrief, None));
        let saved = controller.store().saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].tool, Tool::DecisionExploration);
        assert_eq!(saved[0].title, "Decision Exploration");
        assert_eq!(saved[0].messages.len(), 3);

        // Coming back shows the saved dialogue instead of a new opener.
        let opener = controller.navigate(Navigation::new(Tool::DecisionExploration, None));
        assert!(opener.is_none());
        assert_eq!(controller.state(), DialogueState::ViewingSaved);
        assert_eq!(controller.snapshot().messages.len(), 3);
    }

    #[test]
    fn test_switching_back_and_forth_does_not_duplicate() {
        let (mut controller, opener) = open(Tool::DecisionExploration);
        controller.complete(opener.ticket, ok("Which options?"));

        for _ in 0..3 {
            if let Some(out) = controller.navigate(Navigation::new(Tool::Debrief, None)) {
                controller.complete(out.ticket, ok("Debrief opener"));
            }
            controller.navigate(Navigation::new(Tool::DecisionExploration, None));
        }

        let exploration = controller
            .store()
            .saved()
            .iter()
            .filter(|s| s.tool == Tool::DecisionExploration)
            .count();
        let debrief = controller
            .store()
            .saved()
            .iter()
            .filter(|s| s.tool == Tool::Debrief)
            .count();
        assert_eq!((exploration, debrief), (1, 1));
    }

    #[test]
    fn test_identical_draft_is_not_saved_twice() {
        let (mut controller, opener) = open(Tool::DecisionExploration);
        controller.complete(opener.ticket, ok("Which options?"));
        let copy = controller.store().draft().messages.clone();
        controller.navigate(Navigation::new(Tool::Debrief, None));
        controller.navigate(Navigation::new(Tool::DecisionExploration, None));

        // Put the same conversation back into the draft and leave again.
        controller.select(Selection::Current);
        let key = controller.store().draft().key.clone();
        controller.store.reset_draft(key, copy);
        controller.navigate(Navigation::new(Tool::Debrief, None));

        assert_eq!(controller.store().saved().len(), 1);
    }

    #[test]
    fn test_second_saved_dialogue_is_titled_from_user_message() {
        let (mut controller, opener) = open(Tool::DecisionExploration);
        controller.complete(opener.ticket, ok("Which options?"));
        controller.set_input("first question");
        let turn = controller.submit().unwrap();
        controller.complete(turn.ticket, ok("ok"));
        let first = controller.save().unwrap();

        controller.set_input("Should I take the new job opportunity now");
        let turn = controller.submit().unwrap();
        controller.complete(turn.ticket, ok("ok"));
        let second = controller.save().unwrap();

        assert_eq!(controller.store().get(first).unwrap().title, "Decision Exploration");
        assert_eq!(
            controller.store().get(second).unwrap().title,
            "Should I take the ne…"
        );
    }

    #[test]
    fn test_send_guard_and_blank_input() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));

        controller.set_input("   ");
        assert!(controller.submit().is_none());

        controller.set_input("first");
        let turn = controller.submit().unwrap();
        controller.set_input("second");
        assert!(controller.submit().is_none());
        assert_eq!(controller.input(), "second");

        controller.complete(turn.ticket, ok("reply"));
        assert!(controller.submit().is_some());
    }

    #[test]
    fn test_history_contains_only_conversation_in_order() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("What happened?"));
        controller.set_input("We shipped late");
        let turn = controller.submit().unwrap();
        controller.complete(turn.ticket, ok("Why?"));
        controller.save();

        // The fresh draft starts with a system line that must not be sent.
        controller.set_input("Next decision");
        let turn = controller.submit().unwrap();
        assert!(turn.request.history.is_empty());
        assert_eq!(turn.request.message, "Next decision");

        controller.complete(turn.ticket, ok("Go on"));
        controller.set_input("more");
        let turn = controller.submit().unwrap();
        let history: Vec<(Role, &str)> = turn
            .request
            .history
            .iter()
            .map(|t| (t.role, t.content.as_str()))
            .collect();
        assert_eq!(
            history,
            vec![(Role::User, "Next decision"), (Role::Assistant, "Go on")]
        );
    }

    #[test]
    fn test_failed_turn_reports_error_and_unblocks() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));
        controller.set_input("hello");
        let turn = controller.submit().unwrap();
        controller.complete(turn.ticket, failed());

        assert_eq!(
            controller.error(),
            Some("dialogue service returned 502: bad gateway")
        );
        assert_eq!(
            texts(&controller).last().unwrap(),
            &(Role::Assistant, SEND_APOLOGY.to_string())
        );
        assert!(!controller.is_sending());

        controller.set_input("retry");
        assert!(controller.submit().is_some());
        assert_eq!(controller.error(), None);
    }

    #[test]
    fn test_reply_follows_draft_saved_by_tool_switch() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));
        controller.set_input("question");
        let turn = controller.submit().unwrap();

        controller.navigate(Navigation::new(Tool::Resulting, None));
        controller.complete(turn.ticket, ok("answer"));

        let saved = controller.store().find_saved(Tool::Debrief, None).unwrap();
        assert_eq!(saved.messages.last().unwrap().text, "answer");
        assert!(controller.store().draft().messages.is_empty());
    }

    #[test]
    fn test_save_resets_draft_and_drops_inflight_reply() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));
        controller.set_input("question");
        let turn = controller.submit().unwrap();

        let id = controller.save().unwrap();
        assert_eq!(controller.state(), DialogueState::IdleCurrent);
        assert_eq!(
            texts(&controller),
            vec![(Role::System, READY_MESSAGE.to_string())]
        );
        assert!(!controller.complete(turn.ticket, ok("late")).applied);
        assert_eq!(controller.store().get(id).unwrap().messages.len(), 2);

        // Nothing new to save.
        assert!(controller.save().is_none());
    }

    #[test]
    fn test_save_empty_draft_is_noop() {
        let (mut controller, _opener) = open(Tool::Debrief);
        assert!(controller.save().is_none());
        assert!(controller.store().saved().is_empty());
    }

    #[test]
    fn test_selecting_missing_session_views_draft() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));
        let (selected, out) = controller.select(Selection::Saved(SessionId::new()));
        assert_eq!(selected, Selection::Current);
        assert!(out.is_none());
        assert_eq!(controller.snapshot().messages.len(), 1);
    }

    #[test]
    fn test_delete_selected_session_falls_back_to_draft() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));
        controller.navigate(Navigation::new(Tool::Resulting, None));
        controller.navigate(Navigation::new(Tool::Debrief, None));
        let id = controller.store().find_saved(Tool::Debrief, None).unwrap().id;
        assert_eq!(controller.state(), DialogueState::ViewingSaved);

        let (removed, _) = controller.delete(id);
        assert!(removed);
        assert_ne!(controller.state(), DialogueState::ViewingSaved);
        assert!(!controller.rename(id, "gone"));
    }

    #[test]
    fn test_deleting_explicitly_saved_dialogue_starts_new_opener() {
        let (mut controller, opener) = open(Tool::Resulting);
        controller.complete(opener.ticket, ok("hi"));
        let id = controller.save().unwrap();
        let (_, out) = controller.delete(id);
        let out = out.expect("an empty draft for a fresh tool gets an opener");
        assert_eq!(out.request.tool.as_deref(), Some("resulting"));
    }

    #[test]
    fn test_deleting_autosaved_dialogue_starts_new_opener() {
        let (mut controller, opener) = open(Tool::Resulting);
        controller.complete(opener.ticket, ok("hi"));

        let other = controller.navigate(Navigation::new(Tool::Debrief, None));
        controller.complete(other.unwrap().ticket, ok("debrief hi"));
        assert!(controller
            .navigate(Navigation::new(Tool::Resulting, None))
            .is_none());
        let id = match controller.store().selection() {
            Selection::Saved(id) => id,
            Selection::Current => panic!("returning to a saved tool shows its dialogue"),
        };

        let (deleted, out) = controller.delete(id);
        assert!(deleted);
        let out = out.expect("an empty draft with nothing saved gets an opener");
        assert_eq!(out.kind, RequestKind::Opener);
        assert_eq!(out.request.tool.as_deref(), Some("resulting"));
    }

    #[test]
    fn test_axes_update_is_reported() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok("hi"));
        controller.set_input("classify me");
        let turn = controller.submit().unwrap();

        let axes = vec![Axis::new("stakes", "Stakes")];
        let completion = controller.complete(
            turn.ticket,
            Ok(DialogueReply {
                reply: "done".to_string(),
                axes: Some(axes.clone()),
            }),
        );
        assert_eq!(completion.axes, Some(axes.clone()));
        assert_eq!(controller.axes(), axes.as_slice());
    }

    #[test]
    fn test_goal_tool_ignores_axis_changes() {
        let (mut controller, _opener) = open(Tool::SmartGoal);
        assert!(controller
            .navigate(Navigation::new(Tool::SmartGoal, Some("team_type")))
            .is_none());
        assert_eq!(controller.navigation().axis, None);
    }

    #[test]
    fn test_axis_change_starts_separate_dialogue() {
        let (mut controller, opener) = open(Tool::Debrief);
        controller.complete(opener.ticket, ok(GENERIC_OPENER));
        let out = controller
            .navigate(Navigation::new(Tool::Debrief, Some("work_model")))
            .expect("new axis gets its own opener");
        assert_eq!(out.kind, RequestKind::Opener);
        assert_eq!(controller.store().saved().len(), 1);
        assert_eq!(controller.store().saved()[0].axis, None);
    }
}
