//! Core types for Spectra.

pub mod log;
pub mod payload;
pub mod session;

pub use log::*;
pub use payload::*;
pub use session::*;
