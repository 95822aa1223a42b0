use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Colour used for axes the catalogue doesn't know about.
pub const NEUTRAL_AXIS_COLOR: &str = "#6b7280";

/// A secondary classification tag narrowing a conversation within a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Axis {
    pub key: String,
    pub label: String,
}

impl Axis {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

const DEFAULT_AXES: [(&str, &str, &str); 5] = [
    ("company_stage", "Company stage", "#ef4444"),
    ("problem_domain", "Problem domain", "#f59e0b"),
    ("work_model", "Work model", "#10b981"),
    ("team_type", "Team type", "#3b82f6"),
    ("model_family", "Model family", "#a855f7"),
];

/// The catalogue shown by the axis picker until the dialogue service sends its own.
pub fn default_axes() -> Vec<Axis> {
    DEFAULT_AXES
        .iter()
        .map(|(key, label, _)| Axis::new(*key, *label))
        .collect()
}

pub fn color_for_axis(key: &str) -> &'static str {
    DEFAULT_AXES
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, _, color)| *color)
        .unwrap_or(NEUTRAL_AXIS_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let axes = default_axes();
        assert_eq!(axes.len(), 5);
        assert_eq!(axes[2], Axis::new("work_model", "Work model"));
    }

    #[test]
    fn test_unknown_axis_is_neutral() {
        assert_eq!(color_for_axis("team_type"), "#3b82f6");
        assert_eq!(color_for_axis("nope"), NEUTRAL_AXIS_COLOR);
    }
}
