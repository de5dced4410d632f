//! Model provider layer for Quill.
//!
//! - [`traits::ModelClient`] — the stateless send-messages boundary the
//!   orchestration loop drives
//! - [`anthropic::AnthropicClient`] — HTTP client for the Anthropic
//!   Messages API
//!
//! Provider failures surface as [`traits::ModelError`] values; the loop
//! treats them as fatal to the current turn (fail-fast, no retry).

pub mod anthropic;
pub mod traits;

pub use anthropic::{create_client, AnthropicClient};
pub use traits::{ModelClient, ModelError, RequestConfig};
