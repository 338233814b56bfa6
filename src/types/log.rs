//! Display-ready transcript entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who a transcript entry is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogSource {
    /// A human turn (typed locally or relayed by the agent service).
    User,
    /// The agent's own output, including function calls it makes.
    Ai,
    /// Tool results and diagnostics.
    System,
}

/// One entry in the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub source: LogSource,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl LogEntry {
    pub fn new(source: LogSource, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            source,
            message: message.into(),
            timestamp,
            is_code: false,
            reasoning: None,
        }
    }

    /// A `system` entry stamped with the current time.
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(LogSource::System, message, Utc::now())
    }

    /// A `user` entry stamped with the current time.
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(LogSource::User, message, Utc::now())
    }
}

/// Append-only, ordered transcript of [`LogEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<LogEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}

impl Extend<LogEntry> for Transcript {
    fn extend<I: IntoIterator<Item = LogEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
