//! Chat platform seams: the issue form surface and transcript reads.

use anyhow::Result;
use async_trait::async_trait;

use crate::correlation::MessageMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Position of a chat message.
pub struct MessageLocation {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// A transcript message as returned by history reads.
pub struct TranscriptMessage {
    pub ts: String,
    pub text: String,
    pub metadata: Option<MessageMetadata>,
    /// Names of reactions already present on the message.
    pub reactions: Vec<String>,
}

impl TranscriptMessage {
    pub fn has_reaction(&self, name: &str) -> bool {
        self.reactions.iter().any(|reaction| reaction == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Initial values shown in the issue form.
pub struct IssueFormPrefill {
    pub title: String,
    pub description: String,
    pub preselect_assignment: bool,
}

#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Opens the issue form and returns the platform view id.
    async fn open_issue_form(&self, trigger_id: &str, prefill: &IssueFormPrefill)
        -> Result<String>;
    async fn update_issue_form(&self, view_id: &str, prefill: &IssueFormPrefill) -> Result<()>;
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Returns at most `limit` most recent messages of `channel`, newest first.
    async fn recent_messages(&self, channel: &str, limit: usize)
        -> Result<Vec<TranscriptMessage>>;
    async fn message_at(&self, channel: &str, ts: &str) -> Result<Option<TranscriptMessage>>;
}
