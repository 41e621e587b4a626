//! Workflow step handlers.
//!
//! One handler per transition. Each consumes a classified event, runs its
//! guards, and emits at most a few outbound effects. Guard failures and
//! missing correlation fields are reported as [`StepOutcome::Skipped`];
//! only downstream delivery failures surface as errors.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chat::{ChatSurface, TranscriptSource};
use crate::classifier::{ClassifiedEvent, WebhookAction};
use crate::config::WorkflowConfig;
use crate::correlation::ContextError;
use crate::lookup::ReverseLookup;
use crate::outbound::{OutboundSink, WorkItem, WorkKind};

mod creation;
mod reactions;
mod title;
mod webhooks;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A guard rejected the event.
    Guard(&'static str),
    /// The correlation context lacked a required field or was inconsistent.
    Context(ContextError),
    /// The workflow instance was not found within the lookup window.
    LookupMiss,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guard(reason) => f.write_str(reason),
            Self::Context(error) => write!(f, "{error}"),
            Self::LookupMiss => f.write_str("no matching message within the lookup window"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran; `effects` counts queue items, reactions and form operations.
    Completed { effects: usize },
    Skipped(SkipReason),
}

impl StepOutcome {
    pub fn effects(&self) -> usize {
        match self {
            Self::Completed { effects } => *effects,
            Self::Skipped(_) => 0,
        }
    }
}

enum StepAbort {
    Skip(SkipReason),
    Failed(anyhow::Error),
}

impl From<ContextError> for StepAbort {
    fn from(error: ContextError) -> Self {
        Self::Skip(SkipReason::Context(error))
    }
}

impl From<anyhow::Error> for StepAbort {
    fn from(error: anyhow::Error) -> Self {
        Self::Failed(error)
    }
}

type StepResult = std::result::Result<StepOutcome, StepAbort>;

fn completed(effects: usize) -> StepResult {
    Ok(StepOutcome::Completed { effects })
}

fn skip(reason: &'static str) -> StepResult {
    Ok(StepOutcome::Skipped(SkipReason::Guard(reason)))
}

fn lookup_miss() -> StepResult {
    Ok(StepOutcome::Skipped(SkipReason::LookupMiss))
}

#[derive(Clone)]
/// Step handlers sharing the immutable configuration and the transport seams.
pub struct WorkflowHandlers {
    config: Arc<WorkflowConfig>,
    outbound: Arc<dyn OutboundSink>,
    chat: Arc<dyn ChatSurface>,
    lookup: ReverseLookup,
}

impl WorkflowHandlers {
    pub fn new(
        config: Arc<WorkflowConfig>,
        outbound: Arc<dyn OutboundSink>,
        chat: Arc<dyn ChatSurface>,
        transcript: Arc<dyn TranscriptSource>,
    ) -> Self {
        let lookup = ReverseLookup::new(
            transcript,
            config.status_channel_id.clone(),
            config.history_search_limit,
        );
        Self {
            config,
            outbound,
            chat,
            lookup,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Runs the handler for `event`.
    pub async fn handle(&self, event: &ClassifiedEvent) -> Result<StepOutcome> {
        let result = match event {
            ClassifiedEvent::SlashCommand(command) => self.open_issue_form(command).await,
            ClassifiedEvent::FormSubmission(form) => self.submit_issue(form).await,
            ClassifiedEvent::WorkerOutput(output) => match output.kind {
                WorkKind::CreateIssue => self.record_created(output).await,
                WorkKind::Sanitize => self.sanitize_complete(output).await,
                WorkKind::GenerateTitle => self.apply_generated_title(output).await,
                WorkKind::AddToProject | WorkKind::AssignAgent => {
                    skip("output kind has no follow-up step")
                }
            },
            ClassifiedEvent::EmojiReaction(reaction) => self.react(reaction).await,
            ClassifiedEvent::MessageAction(request) => self.generate_title(request).await,
            ClassifiedEvent::Webhook(webhook) => match &webhook.action {
                WebhookAction::Closed => self.webhook_closed(webhook).await,
                WebhookAction::Assigned { assignee } => {
                    self.webhook_assigned(webhook, assignee).await
                }
            },
        };
        match result {
            Ok(outcome) => Ok(outcome),
            Err(StepAbort::Skip(reason)) => Ok(StepOutcome::Skipped(reason)),
            Err(StepAbort::Failed(error)) => Err(error),
        }
    }

    async fn submit(&self, item: &WorkItem) -> Result<()> {
        self.outbound
            .submit_work(item.kind.queue(), item)
            .await
            .with_context(|| format!("failed to submit {} work item", item.kind.as_str()))
    }
}
