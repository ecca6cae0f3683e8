//! The agent execution loop.
//!
//! One [`AgentLoop`] drives one run: it streams model turns, dispatches the
//! tool calls each turn requests, feeds the results back, and keeps going
//! until the model's `evaluation` report says the goal is achieved (or says
//! to stop), the step limit is hit, the run is cancelled, or a fatal error
//! occurs. Transient provider failures are retried with backoff; after any
//! turn that changed project files a checkpoint is requested so the user
//! can roll the turn back.

use crate::retry::RetryPolicy;
use crate::stream_event::{AgentStreamEvent, StreamingEventBus};
use atelier_config::AppConfig;
use atelier_core::checkpoint::CheckpointService;
use atelier_core::error::{Error, ProviderError};
use atelier_core::message::{Conversation, Message, MessageToolCall};
use atelier_core::provider::{
    Provider, ProviderRequest, StreamChunk, ToolCallFragment, ToolChoice, Usage,
    assemble_tool_calls,
};
use atelier_core::tool::{Evaluation, ToolStatus, check_definitions};
use atelier_telemetry::{PricingTable, RunUsage, UsageMeter};
use atelier_tools::ToolDispatcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SYSTEM_PROMPT: &str = "\
You are a coding agent working inside a web development studio. You act on \
the project only through your tools: `shell` to inspect files, `json_patch` \
to edit them, and `evaluation` to report progress. After every batch of \
work, call `evaluation` with an honest judgement of whether the user's goal \
is achieved; the run only ends cleanly through that report.";

/// The final outcome of one run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Whether the model judged the goal achieved.
    pub success: bool,

    /// Human-readable closing summary.
    pub summary: String,

    /// Model turns completed.
    pub steps_completed: u32,

    /// The last checkpoint created during this run, if any turn mutated files.
    pub checkpoint_id: Option<String>,

    /// Whether the run was stopped by the user.
    pub cancelled: bool,

    /// Accumulated token usage.
    pub usage: RunUsage,

    /// Accumulated cost in USD.
    pub total_cost: f64,
}

/// One assembled model turn.
struct AssistantTurn {
    text: String,
    tool_calls: Vec<MessageToolCall>,
    usage: Option<Usage>,
}

enum TurnOutcome {
    Turn(AssistantTurn),
    Cancelled,
}

/// Drives one agent run end to end. Create one loop per run.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    dispatcher: ToolDispatcher,
    checkpoints: Arc<dyn CheckpointService>,
    events: StreamingEventBus,
    config: AppConfig,
    pricing: PricingTable,
    project_id: String,
    cancel: CancellationToken,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: ToolDispatcher,
        checkpoints: Arc<dyn CheckpointService>,
        config: AppConfig,
        project_id: &str,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            checkpoints,
            events: StreamingEventBus::default(),
            config,
            pricing: PricingTable::with_defaults(),
            project_id: project_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// The event bus this run publishes to.
    pub fn events(&self) -> &StreamingEventBus {
        &self.events
    }

    /// Request cancellation. Cooperative: an in-flight tool call finishes
    /// first, remaining calls in its batch are skipped, and the run stops
    /// before the next model turn.
    pub fn stop(&self) {
        info!(project_id = %self.project_id, "stop requested");
        self.cancel.cancel();
    }

    /// Run the loop for one user instruction.
    pub async fn execute(&self, prompt: &str) -> atelier_core::error::Result<RunResult> {
        let run_id = Uuid::new_v4().to_string();
        let definitions = self.dispatcher.registry().definitions();
        check_definitions(&definitions)?;

        let mut conversation = Conversation::new();
        conversation.push(Message::system(SYSTEM_PROMPT));
        conversation.push(Message::user(prompt));

        let retry = RetryPolicy::new(self.config.agent.retry.clone());
        let mut meter = UsageMeter::new(
            self.pricing.clone(),
            &self.config.default_provider,
            &self.config.default_model,
        );
        let mut checkpoint_id: Option<String> = None;
        let mut steps_completed = 0u32;

        info!(run_id, project_id = %self.project_id, model = %self.config.default_model, "run started");
        self.events.publish(AgentStreamEvent::Divider {
            label: "Run started".into(),
        });

        for step in 1..=self.config.agent.max_steps {
            if self.cancel.is_cancelled() {
                return Ok(self.stopped(steps_completed, checkpoint_id, &meter));
            }

            let turn = match self.stream_turn(&conversation, &retry).await {
                Ok(TurnOutcome::Turn(turn)) => turn,
                Ok(TurnOutcome::Cancelled) => {
                    return Ok(self.stopped(steps_completed, checkpoint_id, &meter));
                }
                Err(e) => {
                    self.events.publish(AgentStreamEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            };
            steps_completed = step;

            if let Some(usage) = &turn.usage {
                let cost = meter.record(usage);
                self.events.publish(AgentStreamEvent::Usage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                    cost,
                });
            }

            // an empty list tells subscribers this turn was a final answer
            self.events.publish(AgentStreamEvent::ToolCalls {
                names: turn.tool_calls.iter().map(|c| c.name.clone()).collect(),
            });

            if turn.tool_calls.is_empty() {
                // a plain reply with no tool work: treat the turn as the
                // answer rather than spinning more steps out of the model
                debug!(run_id, step, "turn requested no tools; run complete");
                conversation.push(Message::assistant(turn.text.clone()));
                self.events.publish(AgentStreamEvent::Divider {
                    label: "Run complete".into(),
                });
                return Ok(RunResult {
                    success: true,
                    summary: turn.text,
                    steps_completed,
                    checkpoint_id,
                    cancelled: false,
                    usage: meter.usage().clone(),
                    total_cost: meter.total_cost(),
                });
            }

            conversation.push(Message::assistant_with_tool_calls(
                turn.text.clone(),
                turn.tool_calls.clone(),
            ));

            // stop() is honored between calls: the call already dispatched
            // runs to completion, later calls in the batch never start
            let mut mutated = false;
            let mut mutating_tools: Vec<String> = Vec::new();
            let mut evaluation: Option<Evaluation> = None;
            for call in &turn.tool_calls {
                if self.cancel.is_cancelled() {
                    warn!(run_id, step, skipped = %call.name, "stop requested; remaining tool calls skipped");
                    break;
                }
                self.events.publish(AgentStreamEvent::ToolStatus {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    status: ToolStatus::Pending,
                });
                self.events.publish(AgentStreamEvent::ToolStatus {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    status: ToolStatus::Executing,
                });

                let outcome = self.dispatcher.dispatch(call).await;
                if outcome.mutated {
                    mutated = true;
                    mutating_tools.push(call.name.clone());
                }
                if outcome.evaluation.is_some() {
                    evaluation = outcome.evaluation;
                }

                conversation.push(Message::tool_result(
                    call.id.clone(),
                    outcome.result.output.clone(),
                ));
                self.events.publish(AgentStreamEvent::ToolStatus {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    status: outcome.result.status,
                });
                self.events.publish(AgentStreamEvent::ToolResult {
                    result: outcome.result,
                });
            }
            debug_assert!(conversation.is_well_formed());

            if mutated {
                let label = format!("run {run_id} step {step}");
                let meta = serde_json::json!({ "tools": mutating_tools });
                match self
                    .checkpoints
                    .create_checkpoint(&self.project_id, &label, meta)
                    .await
                {
                    Ok(cp) => {
                        debug!(run_id, step, checkpoint_id = %cp.id, "checkpoint created");
                        checkpoint_id = Some(cp.id);
                    }
                    // an undo point is lost, the run itself is still sound
                    Err(e) => warn!(run_id, step, error = %e, "checkpoint creation failed"),
                }
            }

            if let Some(eval) = evaluation {
                self.events.publish(AgentStreamEvent::Evaluation {
                    evaluation: eval.clone(),
                });
                if eval.goal_achieved || !eval.should_continue {
                    info!(run_id, step, goal_achieved = eval.goal_achieved, "run ended by evaluation");
                    self.events.publish(AgentStreamEvent::Divider {
                        label: "Run complete".into(),
                    });
                    let summary = eval
                        .progress_summary
                        .clone()
                        .unwrap_or_else(|| eval.reasoning.clone());
                    return Ok(RunResult {
                        success: eval.goal_achieved,
                        summary,
                        steps_completed,
                        checkpoint_id,
                        cancelled: false,
                        usage: meter.usage().clone(),
                        total_cost: meter.total_cost(),
                    });
                }
            }
        }

        warn!(run_id, max_steps = self.config.agent.max_steps, "step limit reached");
        self.events.publish(AgentStreamEvent::Divider {
            label: format!("Stopped at the {}-step limit", self.config.agent.max_steps),
        });
        Ok(RunResult {
            success: false,
            summary: format!(
                "Stopped after reaching the {}-step limit without a completed goal",
                self.config.agent.max_steps
            ),
            steps_completed,
            checkpoint_id,
            cancelled: false,
            usage: meter.usage().clone(),
            total_cost: meter.total_cost(),
        })
    }

    fn stopped(&self, steps_completed: u32, checkpoint_id: Option<String>, meter: &UsageMeter) -> RunResult {
        self.events.publish(AgentStreamEvent::Divider {
            label: "Run stopped".into(),
        });
        RunResult {
            success: false,
            summary: "Run stopped by user".into(),
            steps_completed,
            checkpoint_id,
            cancelled: true,
            usage: meter.usage().clone(),
            total_cost: meter.total_cost(),
        }
    }

    /// Stream one model turn, retrying transient provider failures.
    async fn stream_turn(
        &self,
        conversation: &Conversation,
        retry: &RetryPolicy,
    ) -> atelier_core::error::Result<TurnOutcome> {
        let mut attempt = 0u32;
        loop {
            match self.stream_once(conversation).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    attempt += 1;
                    if !retry.should_retry(&e, attempt) {
                        return Err(Error::Provider(e));
                    }
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying provider call");
                    self.events.publish(AgentStreamEvent::Divider {
                        label: format!("Retry {attempt}/{}: {e}", retry.max_retries()),
                    });
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Ok(TurnOutcome::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One streaming attempt: consume chunks until `done`, assembling text
    /// and tool-call fragments. A snapshot chunk replaces all accumulated
    /// text. An error mid-stream fails the whole attempt.
    async fn stream_once(
        &self,
        conversation: &Conversation,
    ) -> std::result::Result<TurnOutcome, ProviderError> {
        let request = ProviderRequest {
            model: self.config.default_model.clone(),
            messages: conversation.messages.clone(),
            temperature: self.config.default_temperature,
            max_tokens: Some(self.config.default_max_tokens),
            tools: self.dispatcher.registry().definitions(),
            tool_choice: ToolChoice::Auto,
            stream: true,
            stop: Vec::new(),
        };

        let mut rx = self.provider.stream(request).await?;
        let mut text = String::new();
        let mut fragments: Vec<ToolCallFragment> = Vec::new();
        let mut usage: Option<Usage> = None;

        loop {
            let chunk: StreamChunk = tokio::select! {
                _ = self.cancel.cancelled() => {
                    // no tools have started; the partial turn is discarded
                    return Ok(TurnOutcome::Cancelled);
                }
                next = rx.recv() => match next {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => return Err(e),
                    None => return Err(ProviderError::StreamInterrupted(
                        "stream closed before a terminal chunk".into(),
                    )),
                },
            };

            if let Some(snapshot) = chunk.snapshot {
                text = snapshot.clone();
                self.events.publish(AgentStreamEvent::AssistantDelta {
                    text: None,
                    snapshot: Some(snapshot),
                });
            } else if let Some(delta) = chunk.delta {
                text.push_str(&delta);
                self.events.publish(AgentStreamEvent::AssistantDelta {
                    text: Some(delta),
                    snapshot: None,
                });
            }
            fragments.extend(chunk.tool_calls);
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }

        Ok(TurnOutcome::Turn(AssistantTurn {
            text,
            tool_calls: assemble_tool_calls(&fragments),
            usage,
        }))
    }
}
