//! Convenience re-exports for common use.

pub use crate::auth::{CredentialSource, IdToken, Identity, StaticCredentials, StoredCredentials};
pub use crate::client::{AgentClient, BackendClient, RunRequest};
pub use crate::config::SpectraConfig;
pub use crate::error::{Result, SpectraError};
pub use crate::session::SessionService;
pub use crate::sse::{AgentEvent, SseDecoder};
pub use crate::types::{LogEntry, LogSource, SessionOutcome, SessionState, Transcript};
