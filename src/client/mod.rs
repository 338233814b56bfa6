//! HTTP clients for the session backend and the agent service.

pub mod agent;
pub mod backend;
pub mod http;

pub use agent::{AgentClient, RunRequest};
pub use backend::BackendClient;
