//! Scripted question flows used by the dialogue service.
//!
//! A flow is a small graph of nodes loaded from TOML. Walking it is
//! stateless: callers send the answers collected so far and the node they are
//! on, and get back the next question, a jump to another node, or the end of
//! the flow with a recommendation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use ts_rs::TS;

use crate::assets::embedded::BuiltinFlows;

pub type Answers = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("unknown flow_id: {0}")]
    UnknownFlow(String),
    #[error("unknown node '{node}' in flow '{flow}'")]
    UnknownNode { flow: String, node: String },
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),
    #[error("answer '{key}' is not a number: {value}")]
    NotANumber { key: String, value: String },
    #[error("node '{0}' has no rule for its answers")]
    Unhandled(String),
    #[error("invalid flow definition {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub id: String,
    pub start: String,
    pub nodes: HashMap<String, Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Composite {
        asks: Vec<Ask>,
        compute: Compute,
        on_answer: Vec<Rule>,
        #[serde(default)]
        scale_labels: BTreeMap<String, String>,
    },
    Yesno {
        prompt: String,
        on_yes: String,
        on_no: String,
    },
    Collect {
        prompt: String,
        next: String,
    },
    End {
        #[serde(default)]
        recommendation: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ask {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compute {
    pub pass_if: String,
}

/// `when` rules fire when the node's expression passes, `else` rules when it doesn't.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, rename = "else")]
    pub otherwise: bool,
    pub goto: String,
}

/// Body of `POST /flow/next`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FlowRequest {
    pub flow_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub answers: Answers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum FlowStep {
    Ask {
        node_id: String,
        ask: Ask,
        awaiting: String,
    },
    Goto {
        goto: String,
    },
    End {
        end: bool,
        recommendation: String,
    },
    Error {
        error: String,
    },
}

const FINISHED: &str = "Finished.";

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^max\(([^)]*)\)\s*(<=|>=|==|<|>)\s*(-?\d+(?:\.\d+)?)\s*$")
            .expect("expression pattern is valid")
    })
}

fn answer_text(answers: &Answers, key: &str) -> String {
    match answers.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn answer_number(answers: &Answers, key: &str) -> Result<f64, FlowError> {
    let not_a_number = |value: &Value| FlowError::NotANumber {
        key: key.to_string(),
        value: value.to_string(),
    };
    match answers.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| not_a_number(&Value::Number(n.clone()))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| not_a_number(&Value::String(s.clone()))),
        Some(other) => Err(not_a_number(other)),
    }
}

/// Evaluates `max(k1,k2,..) <op> <number>` against the answers.
pub fn eval_expr(expr: &str, answers: &Answers) -> Result<bool, FlowError> {
    let unsupported = || FlowError::UnsupportedExpression(expr.to_string());
    let captures = expression_pattern()
        .captures(expr.trim())
        .ok_or_else(unsupported)?;

    let keys: Vec<&str> = captures[1]
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return Err(unsupported());
    }
    let threshold: f64 = captures[3].parse().map_err(|_| unsupported())?;

    let mut value = f64::NEG_INFINITY;
    for key in keys {
        value = value.max(answer_number(answers, key)?);
    }

    Ok(match &captures[2] {
        "<=" => value <= threshold,
        "<" => value < threshold,
        ">=" => value >= threshold,
        ">" => value > threshold,
        "==" => value == threshold,
        _ => return Err(unsupported()),
    })
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    )
}

impl Flow {
    pub fn node(&self, node_id: &str) -> Result<&Node, FlowError> {
        self.nodes.get(node_id).ok_or_else(|| FlowError::UnknownNode {
            flow: self.id.clone(),
            node: node_id.to_string(),
        })
    }

    /// Decides what happens at `node_id` given the answers so far.
    pub fn next_node(&self, node_id: &str, answers: &Answers) -> Result<FlowStep, FlowError> {
        match self.node(node_id)? {
            Node::Composite {
                asks,
                compute,
                on_answer,
                ..
            } => {
                if let Some(ask) = asks.iter().find(|ask| !answers.contains_key(&ask.id)) {
                    return Ok(FlowStep::Ask {
                        node_id: node_id.to_string(),
                        ask: ask.clone(),
                        awaiting: ask.id.clone(),
                    });
                }
                let passed = eval_expr(&compute.pass_if, answers)?;
                on_answer
                    .iter()
                    .find(|rule| (rule.when.is_some() && passed) || (rule.otherwise && !passed))
                    .map(|rule| FlowStep::Goto {
                        goto: rule.goto.clone(),
                    })
                    .ok_or_else(|| FlowError::Unhandled(node_id.to_string()))
            }
            Node::Yesno {
                prompt,
                on_yes,
                on_no,
            } => {
                if !answers.contains_key(node_id) {
                    return Ok(FlowStep::Ask {
                        node_id: node_id.to_string(),
                        ask: Ask {
                            id: node_id.to_string(),
                            kind: "yesno".to_string(),
                            prompt: prompt.clone(),
                            helper_text: Some("y/n".to_string()),
                        },
                        awaiting: node_id.to_string(),
                    });
                }
                let next = if is_yes(&answer_text(answers, node_id)) {
                    on_yes
                } else {
                    on_no
                };
                Ok(FlowStep::Goto { goto: next.clone() })
            }
            Node::Collect { prompt, next } => {
                if answer_text(answers, node_id).trim().is_empty() {
                    Ok(FlowStep::Ask {
                        node_id: node_id.to_string(),
                        ask: Ask {
                            id: node_id.to_string(),
                            kind: "text".to_string(),
                            prompt: prompt.clone(),
                            helper_text: None,
                        },
                        awaiting: node_id.to_string(),
                    })
                } else {
                    Ok(FlowStep::Goto { goto: next.clone() })
                }
            }
            Node::End { recommendation } => Ok(FlowStep::End {
                end: true,
                recommendation: recommendation.clone().unwrap_or_else(|| FINISHED.to_string()),
            }),
        }
    }

    /// The question a fresh conversation on this flow starts with.
    pub fn first_prompt(&self) -> String {
        match self.nodes.get(&self.start) {
            Some(Node::Composite { asks, .. }) => asks
                .first()
                .map(|ask| ask.prompt.clone())
                .unwrap_or_else(|| "Let's begin.".to_string()),
            Some(Node::Yesno { prompt, .. }) | Some(Node::Collect { prompt, .. }) => prompt.clone(),
            Some(Node::End { recommendation }) => {
                recommendation.clone().unwrap_or_else(|| FINISHED.to_string())
            }
            None => "Let's begin.".to_string(),
        }
    }

    fn scale_helper(&self, node_id: &str) -> Option<String> {
        match self.nodes.get(node_id) {
            Some(Node::Composite { scale_labels, .. }) if !scale_labels.is_empty() => {
                let labels: Vec<String> = scale_labels
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                Some(format!("1–5 scale: {}", labels.join("; ")))
            }
            _ => None,
        }
    }

    pub fn parse(name: &str, content: &str) -> Result<Self, FlowError> {
        let mut flow: Flow = toml::from_str(content).map_err(|source| FlowError::Invalid {
            name: name.to_string(),
            source,
        })?;
        if flow.id.is_empty() {
            flow.id = Path::new(name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
        }
        Ok(flow)
    }
}

/// All flows known to the dialogue service, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: HashMap<String, Flow>,
}

impl FlowRegistry {
    /// Flows compiled into the binary.
    pub fn builtin() -> Result<Self, FlowError> {
        let mut registry = Self::default();
        for name in BuiltinFlows::iter() {
            let Some(file) = BuiltinFlows::get(&name) else {
                continue;
            };
            let content = String::from_utf8_lossy(&file.data);
            registry.insert(Flow::parse(&name, &content)?);
        }
        Ok(registry)
    }

    /// Adds every `*.toml` flow in `dir`, replacing flows with the same id.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, FlowError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let name = path.to_string_lossy().into_owned();
            let content = std::fs::read_to_string(&path)?;
            let flow = Flow::parse(&name, &content)?;
            tracing::debug!("Loaded flow '{}' from {}", flow.id, path.display());
            self.insert(flow);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn insert(&mut self, flow: Flow) {
        self.flows.insert(flow.id.clone(), flow);
    }

    pub fn get(&self, flow_id: &str) -> Option<&Flow> {
        self.flows.get(flow_id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.flows.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Runs one `/flow/next` step. Errors become an `error` step so the
    /// caller always gets a well-formed reply.
    pub fn advance(&self, request: &FlowRequest) -> FlowStep {
        let Some(flow) = self.get(&request.flow_id) else {
            return FlowStep::Error {
                error: FlowError::UnknownFlow(request.flow_id.clone()).to_string(),
            };
        };
        let node_id = request.node_id.as_deref().unwrap_or(&flow.start);

        match flow.next_node(node_id, &request.answers) {
            Ok(FlowStep::Ask {
                node_id,
                mut ask,
                awaiting,
            }) => {
                if ask.kind == "scale_1_5" {
                    ask.helper_text = flow.scale_helper(&node_id);
                }
                FlowStep::Ask {
                    node_id,
                    ask,
                    awaiting,
                }
            }
            Ok(step) => step,
            Err(e) => {
                tracing::warn!("Flow '{}' failed at '{}': {}", flow.id, node_id, e);
                FlowStep::Error {
                    error: e.to_string(),
                }
            }
        }
    }
}
