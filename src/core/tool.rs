use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

const BASE_SYSTEM: &str = "Ask one targeted question at a time. Be concise and keep momentum.";

/// Opener used when a tool has neither a flow nor a dedicated opener.
pub const GENERIC_OPENER: &str = "What decision are we working on?";

/// Which tab of the decision workspace a tool lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Stage {
    Pre,
    Post,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Pre => "Pre Decision Tools",
            Stage::Post => "Post Decision Tools",
        }
    }
}

/// Every decision-support tool the workspace can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Tool {
    SmartGoal,
    DecisionContext,
    DecisionMultiverse,
    DecisionStacker,
    DecisionExploration,
    PerspectiveTracking,
    OptionExploration,
    SpeedChecker,
    Resulting,
    Debrief,
    LuckVsSkill,
}

/// Static, per-tool data consumed by the dialogue service.
#[derive(Debug)]
pub struct ToolProfile {
    pub guidance: &'static str,
    pub flow_id: Option<&'static str>,
    pub opener: Option<&'static str>,
}

impl ToolProfile {
    pub fn system_prompt(&self) -> String {
        format!("{} {}", self.guidance, BASE_SYSTEM)
    }

    pub fn fallback_opener(&self) -> &'static str {
        self.opener.unwrap_or(GENERIC_OPENER)
    }
}

static SMART_GOAL: ToolProfile = ToolProfile {
    guidance: "Clarify the user's goal and constraints.",
    flow_id: Some("goal_define"),
    opener: Some("What are you trying to accomplish?"),
};
static DECISION_CONTEXT: ToolProfile = ToolProfile {
    guidance: "Establish the context of the decision: who decides, by when, and what is at stake.",
    flow_id: None,
    opener: None,
};
static DECISION_MULTIVERSE: ToolProfile = ToolProfile {
    guidance: "Help the user map plausible best/base/worst cases.",
    flow_id: Some("decision_multiverse"),
    opener: None,
};
static DECISION_STACKER: ToolProfile = ToolProfile {
    guidance: "Order decisions to unlock information; start with low-impact prerequisites.",
    flow_id: None,
    opener: None,
};
static DECISION_EXPLORATION: ToolProfile = ToolProfile {
    guidance: "Clarify options and key trade-offs.",
    flow_id: Some("decision_exploration"),
    opener: None,
};
static PERSPECTIVE_TRACKING: ToolProfile = ToolProfile {
    guidance: "Collect supportive & skeptical POVs and missing info.",
    flow_id: None,
    opener: None,
};
static OPTION_EXPLORATION: ToolProfile = ToolProfile {
    guidance: "Enumerate outcomes (upsides/downsides) for an option.",
    flow_id: None,
    opener: Some("What decision are we exploring, in one sentence?"),
};
static SPEED_CHECKER: ToolProfile = ToolProfile {
    guidance: "Determine decision speed (reversible? quit cost? shots on goal?).",
    flow_id: Some("how_fast"),
    opener: Some("Quick check: what's the decision? I'll run the speed test next."),
};
static RESULTING: ToolProfile = ToolProfile {
    guidance: "Separate decision quality from outcomes; capture lessons.",
    flow_id: None,
    opener: None,
};
static DEBRIEF: ToolProfile = ToolProfile {
    guidance: "Quick debrief: what worked, what didn't, one change.",
    flow_id: Some("debrief"),
    opener: None,
};
static LUCK_VS_SKILL: ToolProfile = ToolProfile {
    guidance: "Assess contributions of luck vs. skill to outcome.",
    flow_id: None,
    opener: None,
};

impl Tool {
    pub const ALL: [Tool; 11] = [
        Tool::SmartGoal,
        Tool::DecisionContext,
        Tool::DecisionMultiverse,
        Tool::DecisionStacker,
        Tool::DecisionExploration,
        Tool::PerspectiveTracking,
        Tool::OptionExploration,
        Tool::SpeedChecker,
        Tool::Resulting,
        Tool::Debrief,
        Tool::LuckVsSkill,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Tool::SmartGoal => "smart-goal",
            Tool::DecisionContext => "decision-context",
            Tool::DecisionMultiverse => "decision-multiverse",
            Tool::DecisionStacker => "decision-stacker",
            Tool::DecisionExploration => "decision-exploration",
            Tool::PerspectiveTracking => "perspective-tracking",
            Tool::OptionExploration => "option-exploration",
            Tool::SpeedChecker => "speed-checker",
            Tool::Resulting => "resulting",
            Tool::Debrief => "debrief",
            Tool::LuckVsSkill => "luck-vs-skill",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::SmartGoal => "SMART Goal",
            Tool::DecisionContext => "Decision Context",
            Tool::DecisionMultiverse => "Decision Multiverse",
            Tool::DecisionStacker => "Decision Stacker",
            Tool::DecisionExploration => "Decision Exploration",
            Tool::PerspectiveTracking => "Perspective Tracking",
            Tool::OptionExploration => "Option Exploration",
            Tool::SpeedChecker => "Speed Checker",
            Tool::Resulting => "UnResulter",
            Tool::Debrief => "Decision Debrief",
            Tool::LuckVsSkill => "Luck vs Skill",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Tool::Resulting | Tool::Debrief | Tool::LuckVsSkill => Stage::Post,
            _ => Stage::Pre,
        }
    }

    /// Goal-type tools keep a single conversation regardless of the selected axis.
    pub fn is_goal(&self) -> bool {
        matches!(self, Tool::SmartGoal)
    }

    pub fn profile(&self) -> &'static ToolProfile {
        match self {
            Tool::SmartGoal => &SMART_GOAL,
            Tool::DecisionContext => &DECISION_CONTEXT,
            Tool::DecisionMultiverse => &DECISION_MULTIVERSE,
            Tool::DecisionStacker => &DECISION_STACKER,
            Tool::DecisionExploration => &DECISION_EXPLORATION,
            Tool::PerspectiveTracking => &PERSPECTIVE_TRACKING,
            Tool::OptionExploration => &OPTION_EXPLORATION,
            Tool::SpeedChecker => &SPEED_CHECKER,
            Tool::Resulting => &RESULTING,
            Tool::Debrief => &DEBRIEF,
            Tool::LuckVsSkill => &LUCK_VS_SKILL,
        }
    }

    pub fn for_stage(stage: Stage) -> impl Iterator<Item = Tool> {
        Tool::ALL.into_iter().filter(move |tool| tool.stage() == stage)
    }
}

impl Default for Tool {
    fn default() -> Self {
        Tool::DecisionContext
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older front ends still send the snake_case speed checker slug.
        let slug = match s.trim() {
            "speed_checker" => "speed-checker",
            other => other,
        };
        Tool::ALL
            .into_iter()
            .find(|tool| tool.slug() == slug)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}
