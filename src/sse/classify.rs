//! Classification of agent event payloads into transcript entries.
//!
//! The upstream protocol tags every content block with a `role`, but reuses
//! `"user"` for tool results as well as relayed human turns. The shape of the
//! first part is what tells them apart, so classification looks at both.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::types::{EventPayload, LogEntry, LogSource};

/// Maximum number of characters of an unparseable line quoted in diagnostics.
const SNIPPET_CHARS: usize = 100;

/// A classified agent event.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    ModelText(String),
    ModelFunctionCall { name: String, args: Value },
    UserToolResponse { name: String, response: Value },
    UserText(String),
    Unrecognized(Unrecognized),
}

/// Payloads that parsed as JSON but did not match a known shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Unrecognized {
    /// `role: "model"` with a first part that is neither text nor a function call.
    ModelPart(Value),
    /// `role: "user"` with a first part that is neither a function response nor text.
    UserPart(Value),
    /// A role other than `model`/`user`, or none at all.
    Role { role: Option<String>, content: Value },
    /// No `content.parts`, or an empty list.
    MissingParts(Value),
    /// The payload does not fit the event schema at all.
    Shape(Value),
}

impl AgentEvent {
    pub fn source(&self) -> LogSource {
        match self {
            Self::ModelText(_) | Self::ModelFunctionCall { .. } => LogSource::Ai,
            Self::UserText(_) => LogSource::User,
            Self::UserToolResponse { .. } | Self::Unrecognized(_) => LogSource::System,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::ModelText(text) | Self::UserText(text) => text.clone(),
            Self::ModelFunctionCall { name, args } => format!("Function Call: {name}({args})"),
            Self::UserToolResponse { name, response } => {
                format!("Tool Response [{name}]: {response}")
            }
            Self::Unrecognized(Unrecognized::ModelPart(part)) => {
                format!("Unrecognized model content part: {part}")
            }
            Self::Unrecognized(Unrecognized::UserPart(part)) => {
                format!("Unrecognized user content part: {part}")
            }
            Self::Unrecognized(Unrecognized::Role { role, content }) => format!(
                "Unhandled event role '{}': {content}",
                role.as_deref().unwrap_or("none")
            ),
            Self::Unrecognized(Unrecognized::MissingParts(raw)) => {
                format!("Event without content parts: {raw}")
            }
            Self::Unrecognized(Unrecognized::Shape(raw)) => {
                format!("Unrecognized event payload: {raw}")
            }
        }
    }
}

/// Classify a decoded JSON payload.
pub fn classify(raw: &Value) -> AgentEvent {
    let payload = match EventPayload::deserialize(raw) {
        Ok(payload) => payload,
        Err(_) => return AgentEvent::Unrecognized(Unrecognized::Shape(raw.clone())),
    };

    let Some(content) = payload.content.filter(|c| !c.parts.is_empty()) else {
        return AgentEvent::Unrecognized(Unrecognized::MissingParts(raw.clone()));
    };

    let raw_part = || raw.pointer("/content/parts/0").cloned().unwrap_or(Value::Null);
    let mut parts = content.parts.into_iter();
    let Some(part) = parts.next() else {
        return AgentEvent::Unrecognized(Unrecognized::MissingParts(raw.clone()));
    };

    match content.role.as_deref() {
        Some("model") => {
            if let Some(text) = part.text {
                AgentEvent::ModelText(text)
            } else if let Some(call) = part.function_call {
                AgentEvent::ModelFunctionCall {
                    name: call.name,
                    args: call.args.unwrap_or_else(|| Value::Object(Default::default())),
                }
            } else {
                AgentEvent::Unrecognized(Unrecognized::ModelPart(raw_part()))
            }
        }
        Some("user") => {
            if let Some(response) = part.function_response {
                AgentEvent::UserToolResponse {
                    name: response.name,
                    response: response.response,
                }
            } else if let Some(text) = part.text {
                AgentEvent::UserText(text)
            } else {
                AgentEvent::Unrecognized(Unrecognized::UserPart(raw_part()))
            }
        }
        other => AgentEvent::Unrecognized(Unrecognized::Role {
            role: other.map(str::to_string),
            content: raw.get("content").cloned().unwrap_or(Value::Null),
        }),
    }
}

/// The payload's own timestamp, or now.
pub fn event_timestamp(raw: &Value) -> DateTime<Utc> {
    raw.get("timestamp")
        .and_then(Value::as_f64)
        .and_then(from_epoch_seconds)
        .unwrap_or_else(Utc::now)
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Parse and classify the body of one `data:` line.
///
/// Never fails: malformed JSON becomes a `system` entry describing the error.
pub fn decode_data(data: &str) -> LogEntry {
    match serde_json::from_str::<Value>(data) {
        Ok(raw) => {
            let event = classify(&raw);
            LogEntry::new(event.source(), event.message(), event_timestamp(&raw))
        }
        Err(err) => LogEntry::system(format!(
            "Failed to parse event data: {err} (data: {})",
            snippet(data)
        )),
    }
}

fn snippet(data: &str) -> String {
    let mut chars = data.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
