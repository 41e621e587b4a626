//! Outbound queue records and the sink that delivers them.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationContext, MessageMetadata};

pub const DEFAULT_GIT_REF: &str = "refs/heads/main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Kind tag of an executor work item; echoed back as the output `type`.
pub enum WorkKind {
    #[serde(rename = "slash-vibe-issue")]
    CreateIssue,
    #[serde(rename = "slash-vibe-issue-project")]
    AddToProject,
    #[serde(rename = "slash-vibe-issue-assign-copilot")]
    AssignAgent,
    #[serde(rename = "slash-vibe-issue-sanitize")]
    Sanitize,
    #[serde(rename = "slash-vibe-issue-ticket-title")]
    GenerateTitle,
}

impl WorkKind {
    pub const ALL: [WorkKind; 5] = [
        Self::CreateIssue,
        Self::AddToProject,
        Self::AssignAgent,
        Self::Sanitize,
        Self::GenerateTitle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateIssue => "slash-vibe-issue",
            Self::AddToProject => "slash-vibe-issue-project",
            Self::AssignAgent => "slash-vibe-issue-assign-copilot",
            Self::Sanitize => "slash-vibe-issue-sanitize",
            Self::GenerateTitle => "slash-vibe-issue-ticket-title",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    /// Queue the executor should pick this kind of work from.
    pub fn queue(self) -> WorkQueue {
        match self {
            Self::Sanitize => WorkQueue::Long,
            _ => WorkQueue::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkQueue {
    Short,
    Long,
}

impl WorkQueue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Unit of shell work submitted to the executor.
pub struct WorkItem {
    pub repo: String,
    #[serde(rename = "branch")]
    pub git_ref: String,
    #[serde(rename = "type")]
    pub kind: WorkKind,
    pub dir: String,
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "CorrelationContext::is_empty")]
    pub metadata: CorrelationContext,
}

impl WorkItem {
    pub fn new(
        kind: WorkKind,
        repo: impl Into<String>,
        dir: impl Into<String>,
        command: String,
        metadata: CorrelationContext,
    ) -> Self {
        Self {
            repo: repo.into(),
            git_ref: DEFAULT_GIT_REF.to_string(),
            kind,
            dir: dir.into(),
            commands: vec![command],
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Chat message posted by the status relay, optionally carrying metadata.
pub struct StatusMessage {
    pub channel: String,
    pub text: String,
    pub ttl: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRequest {
    pub reaction: String,
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Deferred removal of a chat message after `ttl` seconds.
pub struct CleanupSignal {
    pub channel: String,
    pub ts: String,
    pub ttl: u64,
}

#[async_trait]
/// Delivery seam for everything the workflow emits.
pub trait OutboundSink: Send + Sync {
    async fn submit_work(&self, queue: WorkQueue, item: &WorkItem) -> Result<()>;
    async fn post_status(&self, message: &StatusMessage) -> Result<()>;
    async fn request_reaction(&self, reaction: &ReactionRequest) -> Result<()>;
    async fn schedule_cleanup(&self, signal: &CleanupSignal) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{WorkItem, WorkKind, WorkQueue};
    use crate::correlation::CorrelationContext;

    #[test]
    fn unit_work_kind_labels_round_trip_and_route_sanitize_to_long_queue() {
        for kind in WorkKind::ALL {
            assert_eq!(WorkKind::parse(kind.as_str()), Some(kind));
            assert_eq!(
                serde_json::to_value(kind).expect("serialize"),
                json!(kind.as_str())
            );
        }
        assert_eq!(WorkKind::Sanitize.queue(), WorkQueue::Long);
        assert_eq!(WorkKind::CreateIssue.queue(), WorkQueue::Short);
        assert_eq!(WorkKind::parse("unknown"), None);
    }

    #[test]
    fn unit_work_item_serializes_executor_field_names() {
        let item = WorkItem::new(
            WorkKind::CreateIssue,
            "org/repo",
            "/tmp",
            "gh issue create".to_string(),
            CorrelationContext::new(),
        );
        assert_eq!(
            serde_json::to_value(&item).expect("serialize"),
            json!({
                "repo": "org/repo",
                "branch": "refs/heads/main",
                "type": "slash-vibe-issue",
                "dir": "/tmp",
                "commands": ["gh issue create"]
            })
        );
    }
}
