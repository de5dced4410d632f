//! Quill core — shared types, the message bus, the conversation log,
//! configuration, and small utilities.
//!
//! Everything here is transport- and provider-agnostic: the agent crate,
//! the channel crate, and the CLI all build on these pieces.

pub mod bus;
pub mod config;
pub mod log;
pub mod types;
pub mod utils;
