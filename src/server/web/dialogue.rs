use axum::{extract::State, Json};

use super::types::AppState;
use crate::core::{
    DialogueReply, DialogueRequest, FlowRegistry, Tool, GENERIC_OPENER, INIT_MESSAGE,
};

const UNKNOWN_TOOL_SYSTEM: &str = "Be helpful, concise, and ask one question at a time.";

pub async fn dialogue(
    State(state): State<AppState>,
    Json(request): Json<DialogueRequest>,
) -> Json<DialogueReply> {
    Json(respond(&state.flows, &request))
}

/// Answers one dialogue turn without a language model behind it.
///
/// Openers come from the tool's flow when there is one; ordinary turns get
/// a canned follow-up so front ends can be exercised end to end.
pub fn respond(flows: &FlowRegistry, request: &DialogueRequest) -> DialogueReply {
    let slug = request.tool.as_deref().unwrap_or("smart-goal");
    let tool = slug.parse::<Tool>().ok();
    let system = request
        .system_override
        .clone()
        .or_else(|| tool.map(|t| t.profile().system_prompt()))
        .unwrap_or_else(|| UNKNOWN_TOOL_SYSTEM.to_string());
    tracing::debug!(
        "Dialogue turn for {} (session {}): {}",
        slug,
        request.session_id,
        system
    );

    if request.message == INIT_MESSAGE && request.history.is_empty() {
        let Some(tool) = tool else {
            return DialogueReply::text(GENERIC_OPENER);
        };
        let profile = tool.profile();
        let opener = profile
            .flow_id
            .and_then(|id| flows.get(id))
            .map(|flow| flow.first_prompt())
            .unwrap_or_else(|| profile.fallback_opener().to_string());
        return DialogueReply::text(opener);
    }

    DialogueReply::text(stub_reply(tool, &request.message, request.history.len()))
}

fn stub_reply(tool: Option<Tool>, message: &str, prior_turns: usize) -> String {
    let label = tool.map(|t| t.label()).unwrap_or("Assistant");
    format!(
        "[{} stub reply, turn {}] You said: \"{}\". What matters most to you here?",
        label,
        prior_turns / 2 + 1,
        message.trim()
    )
}
