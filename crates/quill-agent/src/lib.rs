//! Quill agent — the tool-use orchestration core.
//!
//! - **tools**: the declared tool catalog (closed enum) and the executor
//!   that performs tool effects inside the workspace sandbox
//! - **turn**: per-turn context (action log, pending attachments)
//! - **context**: system prompt and message assembly
//! - **agent_loop**: the model ↔ tool round loop

pub mod agent_loop;
pub mod context;
pub mod tools;
pub mod turn;

pub use agent_loop::{AgentLoop, LoopOutcome};
pub use context::ContextBuilder;
pub use tools::catalog::{catalog, ToolKind};
pub use tools::executor::{ToolError, ToolExecutor};
pub use turn::TurnContext;
