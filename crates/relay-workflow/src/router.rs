//! Classify-then-handle entry point shared by every listener.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chat::{ChatSurface, TranscriptSource};
use crate::classifier::{Classification, EventClassifier, InboundChannel};
use crate::config::WorkflowConfig;
use crate::outbound::OutboundSink;
use crate::workflow_handlers::{SkipReason, StepOutcome, WorkflowHandlers};

#[derive(Clone)]
pub struct EventRouter {
    classifier: EventClassifier,
    handlers: WorkflowHandlers,
}

impl EventRouter {
    pub fn new(
        config: Arc<WorkflowConfig>,
        outbound: Arc<dyn OutboundSink>,
        chat: Arc<dyn ChatSurface>,
        transcript: Arc<dyn TranscriptSource>,
    ) -> Self {
        Self {
            classifier: EventClassifier::new(&config),
            handlers: WorkflowHandlers::new(config, outbound, chat, transcript),
        }
    }

    /// Routes one inbound payload. Returns `None` when the payload was
    /// discarded or its step failed; neither is reported to the publisher.
    pub async fn route(&self, channel: InboundChannel, payload: &[u8]) -> Option<StepOutcome> {
        let event = match self.classifier.classify(channel, payload) {
            Classification::Event(event) => event,
            Classification::Discard(reason) => {
                if reason.is_diagnostic() {
                    warn!(
                        channel = channel.as_str(),
                        reason = %reason,
                        "discarded inbound payload"
                    );
                } else {
                    debug!(channel = channel.as_str(), reason = %reason, "ignored inbound payload");
                }
                return None;
            }
        };

        let step = event.label();
        match self.handlers.handle(&event).await {
            Ok(outcome) => {
                match &outcome {
                    StepOutcome::Completed { effects } => {
                        debug!(
                            channel = channel.as_str(),
                            step,
                            effects,
                            "workflow step completed"
                        );
                    }
                    StepOutcome::Skipped(reason @ SkipReason::Context(_)) => {
                        warn!(
                            channel = channel.as_str(),
                            step,
                            reason = %reason,
                            "workflow event abandoned"
                        );
                    }
                    StepOutcome::Skipped(SkipReason::LookupMiss) => {
                        info!(channel = channel.as_str(), step, "workflow instance not found");
                    }
                    StepOutcome::Skipped(reason) => {
                        debug!(
                            channel = channel.as_str(),
                            step,
                            reason = %reason,
                            "workflow step skipped"
                        );
                    }
                }
                Some(outcome)
            }
            Err(error) => {
                warn!(
                    channel = channel.as_str(),
                    step,
                    error = %format!("{error:#}"),
                    "workflow step failed; event dropped"
                );
                None
            }
        }
    }
}
