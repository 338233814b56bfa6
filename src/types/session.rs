//! Browser session state, backend responses, and persisted session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Live state of the current user's browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub namespace: Option<String>,
    pub vnc_passwd: Option<String>,
    pub session_id: Option<String>,
    pub is_active: bool,
    pub is_loading: bool,
}

impl SessionState {
    pub(crate) fn active(started: &StartSessionResponse) -> Self {
        Self {
            namespace: started.namespace.clone(),
            vnc_passwd: started.vnc_passwd.clone(),
            session_id: Some(started.session_id.clone()),
            is_active: true,
            is_loading: false,
        }
    }
}

/// Body returned by `POST /start-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub vnc_passwd: Option<String>,
    pub session_id: String,
}

impl StartSessionResponse {
    /// The backend reuses a running session instead of provisioning a new one.
    pub fn is_existing(&self) -> bool {
        self.message.as_deref() == Some("Session exists")
    }
}

/// Body returned by `POST /end-session`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndSessionResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a session lifecycle operation as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub success: bool,
    pub message: String,
    pub session_id: Option<String>,
}

impl SessionOutcome {
    pub fn success(message: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            session_id,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
pub enum SessionMode {
    Normal,
    Hacking,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionOwner {
    pub uid: String,
    pub name: String,
    pub photo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    pub enable_recording: bool,
    pub mode: SessionMode,
    pub privacy: Privacy,
}

/// Recording metadata, filled in after the session ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recording {
    /// Length in seconds.
    pub duration: u64,
    pub url: String,
    pub thumbnail: String,
    pub summary: String,
}

impl Recording {
    /// `M:SS`, or `H:MM:SS` once the recording passes an hour.
    pub fn formatted_duration(&self) -> String {
        let hours = self.duration / 3600;
        let minutes = (self.duration % 3600) / 60;
        let seconds = self.duration % 60;
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

/// A persisted session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub owner: SessionOwner,
    pub options: SessionOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<Recording>,
}

impl SessionRecord {
    /// Case-insensitive match against the title or owner name.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.owner.name.to_lowercase().contains(&query)
    }

    /// Public sessions are visible to everyone; private ones only to their owner.
    pub fn visible_to(&self, uid: Option<&str>) -> bool {
        match self.options.privacy {
            Privacy::Public => true,
            Privacy::Private => uid == Some(self.owner.uid.as_str()),
        }
    }
}
