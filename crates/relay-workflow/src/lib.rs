//! Correlation and event-routing engine for the issue relay.
//!
//! Inbound chat, executor and webhook events are classified, matched back to
//! the workflow instance they belong to through the correlation context that
//! travels with every message, and turned into at most a handful of outbound
//! queue items. Nothing is persisted here: the chat transcript is the only
//! record, searched through a bounded reverse lookup.

pub mod chat;
pub mod classifier;
pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod lookup;
pub mod memory;
pub mod outbound;
pub mod payloads;
pub mod resource;
pub mod router;
pub mod shell;
pub mod state;
pub mod workflow_handlers;

pub use chat::{
    ChatSurface, IssueFormPrefill, MessageLocation, TranscriptMessage, TranscriptSource,
};
pub use classifier::{
    Classification, ClassifiedEvent, DiscardReason, EventClassifier, InboundChannel,
};
pub use config::{ReactionEmojis, WorkflowConfig};
pub use correlation::{ContextError, CorrelationContext, MessageMetadata};
pub use dispatch::{run_listener, InboundSource, ListenerReport, ListenerSet};
pub use lookup::{LookupHit, ReverseLookup};
pub use outbound::{
    CleanupSignal, OutboundSink, ReactionRequest, StatusMessage, WorkItem, WorkKind, WorkQueue,
};
pub use resource::{extract_issue_url, issue_number_from_url, qualify_repo_name, IssueUrl};
pub use router::EventRouter;
pub use state::{TransitionError, WorkflowState};
pub use workflow_handlers::{SkipReason, StepOutcome, WorkflowHandlers};
