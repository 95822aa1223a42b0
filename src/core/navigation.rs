use url::form_urlencoded;

use super::session::SessionKey;
use super::tool::Tool;

/// The tool/axis pair selected by the navigation surface (`?tool=..&axis=..`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub tool: Tool,
    pub axis: Option<String>,
}

impl Navigation {
    pub fn new(tool: Tool, axis: Option<&str>) -> Self {
        let key = SessionKey::new(tool, axis);
        Self {
            tool: key.tool,
            axis: key.axis,
        }
    }

    /// Parses a query string, with or without the leading `?`.
    ///
    /// A missing or unrecognised `tool` selects `default_tool`.
    pub fn from_query(query: &str, default_tool: Tool) -> Self {
        let query = query.trim_start_matches('?');
        let mut tool = None;
        let mut axis = None;

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "tool" => {
                    tool = match value.parse::<Tool>() {
                        Ok(tool) => Some(tool),
                        Err(e) => {
                            tracing::warn!("{}, using {}", e, default_tool);
                            None
                        }
                    }
                }
                "axis" => axis = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::new(tool.unwrap_or(default_tool), axis.as_deref())
    }

    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("tool", self.tool.slug());
        if let Some(axis) = &self.axis {
            serializer.append_pair("axis", axis);
        }
        serializer.finish()
    }

    pub fn key(&self) -> SessionKey {
        SessionKey {
            tool: self.tool,
            axis: self.axis.clone(),
        }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new(Tool::default(), None)
    }
}
