//! The orchestration loop — model ↔ tool rounds until a final answer.
//!
//! One *turn* is an inbound message through to the outbound response. Each
//! *round* is one model call plus, if the model requested tools, the tool
//! executions and the result-folding that follow. Rounds run strictly
//! sequentially; the loop is a small explicit state machine so the iteration
//! bound and the one-round/one-result-batch pairing stay testable without a
//! network.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use quill_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use quill_core::log::ConversationLog;
use quill_core::types::{Message, ModelResponse, Role, ToolDefinition};
use quill_core::utils::truncate_string;
use quill_providers::ModelClient;

use crate::context::ContextBuilder;
use crate::tools::catalog::catalog;
use crate::tools::executor::ToolExecutor;
use crate::turn::TurnContext;

/// Default ceiling on model calls per turn.
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Default number of logged messages replayed as context.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// One-shot progress notice sent on the first tool round.
const PROGRESS_NOTICE: &str = "🔧 Working on it...";

/// Cap on provider diagnostics surfaced to the user.
const ERROR_DIAGNOSTIC_LIMIT: usize = 500;

// ─────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────

/// Terminal value of one loop invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum LoopOutcome {
    /// The model produced a final text answer (possibly empty).
    FinalAnswer(String),
    /// The round ceiling was hit first; carries the significant-action log
    /// so the caller can report partial progress instead of silence.
    IterationLimitReached(Vec<String>),
}

/// Loop phases. `RunTools` holds the response whose requests still need
/// answering before the next model call may be issued.
enum LoopState {
    CallModel,
    RunTools(ModelResponse),
    Finished(LoopOutcome),
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// Drives model calls and tool execution for each inbound message.
pub struct AgentLoop {
    bus: Arc<MessageBus>,
    client: Arc<dyn ModelClient>,
    executor: ToolExecutor,
    context: ContextBuilder,
    log: Arc<ConversationLog>,
    max_iterations: usize,
    history_limit: usize,
}

impl AgentLoop {
    pub fn new(
        bus: Arc<MessageBus>,
        client: Arc<dyn ModelClient>,
        workspace: PathBuf,
        log: Arc<ConversationLog>,
        max_iterations: Option<usize>,
        history_limit: Option<usize>,
        assistant_name: Option<String>,
    ) -> Self {
        let name = assistant_name.unwrap_or_else(|| "Quill".to_string());
        let max_iterations = max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);

        info!(
            model = client.default_model(),
            workspace = %workspace.display(),
            max_iterations,
            "agent loop initialized"
        );

        Self {
            bus,
            client,
            executor: ToolExecutor::new(workspace.clone()),
            context: ContextBuilder::new(workspace, name),
            log,
            max_iterations,
            history_limit: history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        }
    }

    /// Consume inbound messages until the channel closes.
    pub async fn run(&self) {
        info!("agent loop started, waiting for messages");
        while let Some(msg) = self.bus.consume_inbound().await {
            debug!(conversation = %msg.conversation_key(), "received message");
            let response = self.process_message(&msg).await;
            if let Err(e) = self.bus.publish_outbound(response).await {
                error!(error = %e, "failed to publish outbound message");
            }
        }
        info!("inbound channel closed, agent loop exiting");
    }

    /// Process one inbound message into an outbound response.
    ///
    /// Infallible by design: every turn ends in either a final answer or a
    /// limit-reached summary, and both are presentable.
    pub async fn process_message(&self, msg: &InboundMessage) -> OutboundMessage {
        let key = msg.conversation_key();

        // Fresh context per turn: the attachment queue starts empty no
        // matter how the previous turn ended.
        let mut turn = TurnContext::new(&msg.channel, &msg.chat_id);

        // History excludes the current message; the user line is logged
        // before the loop starts so an aborted turn still shows the intent.
        let history = self.log.recent_history(&key, self.history_limit);
        self.log.append(&key, Role::User, &msg.content);

        let system = self.context.build_system_prompt(&msg.channel, &msg.chat_id);
        let media: Vec<String> = msg.media.iter().map(|m| m.path.clone()).collect();
        let messages = self.context.build_messages(&history, &msg.content, &media);
        let tools = catalog();

        let outcome = self.run_turn(&system, &tools, messages, &mut turn).await;
        let content = compose_response(outcome, &turn);

        self.log.append(&key, Role::Assistant, &content);

        let mut response = OutboundMessage::new(&msg.channel, &msg.chat_id, &content);
        response.attachments = turn.take_attachments();
        response
    }

    /// Process a raw text message on the CLI conversation.
    pub async fn process_direct(&self, text: &str) -> String {
        let msg = InboundMessage::new("cli", "user", "direct", text);
        self.process_message(&msg).await.content
    }

    /// The core loop: repeated model calls with tool rounds in between.
    ///
    /// Invariants:
    /// - at most `max_iterations` model calls per invocation;
    /// - a round with N tool requests appends the model's raw content as one
    ///   assistant message plus one user message with exactly N correlated
    ///   results, before the next call;
    /// - a provider error aborts immediately (no retry — a retry could
    ///   re-execute side effects from earlier rounds).
    pub async fn run_turn(
        &self,
        system: &str,
        tools: &[ToolDefinition],
        mut messages: Vec<Message>,
        turn: &mut TurnContext,
    ) -> LoopOutcome {
        let mut calls = 0usize;
        let mut state = LoopState::CallModel;

        loop {
            state = match state {
                LoopState::CallModel => {
                    if calls >= self.max_iterations {
                        warn!(max_iterations = self.max_iterations, "iteration limit reached");
                        LoopState::Finished(LoopOutcome::IterationLimitReached(
                            turn.actions().to_vec(),
                        ))
                    } else {
                        calls += 1;
                        debug!(round = calls, "model call");
                        match self.client.send(system, tools, &messages).await {
                            Ok(response) if response.requests_tools() => {
                                LoopState::RunTools(response)
                            }
                            Ok(response) => {
                                LoopState::Finished(LoopOutcome::FinalAnswer(response.text()))
                            }
                            Err(e) => {
                                error!(error = %e, "model call failed, aborting turn");
                                LoopState::Finished(LoopOutcome::FinalAnswer(format!(
                                    "Sorry, I encountered an error: {}",
                                    truncate_string(&e.to_string(), ERROR_DIAGNOSTIC_LIMIT)
                                )))
                            }
                        }
                    }
                }
                LoopState::RunTools(response) => {
                    if turn.should_send_progress() {
                        self.send_progress(turn).await;
                    }

                    let requests = response.tool_requests();
                    let mut results = Vec::with_capacity(requests.len());
                    for request in &requests {
                        info!(tool = %request.name, round = calls, "executing tool");
                        let output = self
                            .executor
                            .execute(&request.name, &request.input, turn)
                            .await;
                        debug!(tool = %request.name, output_len = output.len(), "tool result");
                        results.push((request.id.clone(), output));
                    }

                    // Provider contract: the raw assistant turn, then every
                    // request answered in one synthetic user turn.
                    messages.push(Message::blocks(Role::Assistant, response.content));
                    messages.push(Message::tool_results(results));
                    LoopState::CallModel
                }
                LoopState::Finished(outcome) => return outcome,
            };
        }
    }

    /// One-shot "working" notice to the originating chat.
    async fn send_progress(&self, turn: &TurnContext) {
        let notice = OutboundMessage::new(turn.channel(), turn.chat_id(), PROGRESS_NOTICE);
        if let Err(e) = self.bus.publish_outbound(notice).await {
            debug!(error = %e, "failed to send progress notice");
        }
    }
}

// ─────────────────────────────────────────────
// Response composition
// ─────────────────────────────────────────────

/// Turn a loop outcome plus the action log into the user-facing text.
fn compose_response(outcome: LoopOutcome, turn: &TurnContext) -> String {
    match outcome {
        LoopOutcome::FinalAnswer(text) => {
            let actions = turn.actions();
            if text.trim().is_empty() {
                if actions.is_empty() {
                    "I completed the task but have no additional response.".to_string()
                } else {
                    format!("Done! Here's what I did:\n{}", actions.join("\n"))
                }
            } else if actions.len() >= 2 {
                format!("{text}\n\n**Actions taken:**\n{}", actions.join("\n"))
            } else {
                text
            }
        }
        LoopOutcome::IterationLimitReached(actions) => {
            if actions.is_empty() {
                "I hit my tool use limit before finishing. Let me know if you need me to continue."
                    .to_string()
            } else {
                format!(
                    "I hit my tool use limit.\n\n{}\n\nLet me know if you need me to continue.",
                    actions.join("\n")
                )
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
