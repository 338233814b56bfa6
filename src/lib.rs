//! Spectra: client core for remote browser sessions driven by an AI agent.
//!
//! Starts and ends isolated browser sessions against the Spectra backend,
//! and streams the agent's activity in a session as an ordered transcript.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use spectra::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> spectra::error::Result<()> {
//! let config = SpectraConfig::load()?;
//! let credentials = Arc::new(StaticCredentials::from_token(IdToken::new("eyJ...".into()))?);
//!
//! let sessions = SessionService::new(config.clone(), credentials.clone())?;
//! let outcome = sessions.start_session(false).await;
//! let Some(session_id) = sessions.wait_ready(&outcome).await else {
//!     return Ok(());
//! };
//!
//! let agent = AgentClient::new(config, credentials)?;
//! let request = RunRequest::builder()
//!     .session_id(session_id)
//!     .message("Open example.com")
//!     .build();
//! let mut entries = agent.run_sse(request, CancellationToken::new());
//! while let Some(entry) = entries.next().await {
//!     println!("{}: {}", entry.source, entry.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod session;
pub mod sse;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
