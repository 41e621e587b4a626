//! Bounded reverse lookup over the status conversation.
//!
//! There is no index: the newest `search_limit` messages are scanned
//! linearly and the first announcement naming the issue wins. Instances older
//! than the window are simply not found.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::chat::{MessageLocation, TranscriptMessage, TranscriptSource};
use crate::correlation::{MessageMetadata, KEY_ISSUE_URL};
use crate::resource::IssueUrl;

#[derive(Debug, Clone, PartialEq)]
/// Announcement located for an issue.
pub struct LookupHit {
    pub location: MessageLocation,
    pub metadata: MessageMetadata,
    pub reactions: Vec<String>,
}

impl LookupHit {
    pub fn has_reaction(&self, name: &str) -> bool {
        self.reactions.iter().any(|reaction| reaction == name)
    }
}

#[derive(Clone)]
pub struct ReverseLookup {
    transcript: Arc<dyn TranscriptSource>,
    status_channel_id: String,
    search_limit: usize,
}

impl ReverseLookup {
    pub fn new(
        transcript: Arc<dyn TranscriptSource>,
        status_channel_id: impl Into<String>,
        search_limit: usize,
    ) -> Self {
        Self {
            transcript,
            status_channel_id: status_channel_id.into(),
            search_limit: search_limit.max(1),
        }
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    /// Finds the announcement for `issue_url`. `Ok(None)` is a normal miss.
    pub async fn find_by_resource(&self, issue_url: &IssueUrl) -> Result<Option<LookupHit>> {
        if self.status_channel_id.trim().is_empty() {
            bail!("status channel id is not configured");
        }
        let mut messages = self
            .transcript
            .recent_messages(&self.status_channel_id, self.search_limit)
            .await?;
        messages.truncate(self.search_limit);
        Ok(find_announcement(&messages, issue_url).map(|message| LookupHit {
            location: MessageLocation {
                channel: self.status_channel_id.clone(),
                ts: message.ts.clone(),
            },
            metadata: message.metadata.clone().unwrap_or_default(),
            reactions: message.reactions.clone(),
        }))
    }

    /// Reads the single message a reaction points at.
    pub async fn message_at(
        &self,
        location: &MessageLocation,
    ) -> Result<Option<TranscriptMessage>> {
        self.transcript
            .message_at(&location.channel, &location.ts)
            .await
    }
}

/// Returns the first announcement in `messages` whose metadata names `issue_url`.
pub fn find_announcement<'a>(
    messages: &'a [TranscriptMessage],
    issue_url: &IssueUrl,
) -> Option<&'a TranscriptMessage> {
    messages.iter().find(|message| {
        message
            .metadata
            .as_ref()
            .filter(|metadata| metadata.is_issue_created())
            .and_then(|metadata| metadata.event_payload.optional_str(KEY_ISSUE_URL))
            .and_then(IssueUrl::parse)
            .is_some_and(|candidate| candidate == *issue_url)
    })
}
