//! Server-sent-events decoding for agent runs.
//!
//! The agent service streams one JSON payload per `data: ` line, with records
//! separated by a blank line. [`SseDecoder`] reassembles the body across
//! arbitrary chunk boundaries and [`classify`] turns each payload into a
//! transcript entry.

pub mod classify;
pub mod decoder;

pub use classify::{classify, decode_data, AgentEvent, Unrecognized};
pub use decoder::{decode_stream, SseDecoder, Utf8Decoder};
