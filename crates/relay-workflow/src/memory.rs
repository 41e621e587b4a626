//! In-process implementations of the transport seams.
//!
//! Used by tests that drive the router without Redis or Slack. The outbound
//! double keeps every record, so it is not meant for long-running processes.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::chat::{ChatSurface, IssueFormPrefill, TranscriptMessage, TranscriptSource};
use crate::dispatch::InboundSource;
use crate::outbound::{
    CleanupSignal, OutboundSink, ReactionRequest, StatusMessage, WorkItem, WorkQueue,
};

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundRecord {
    Work { queue: WorkQueue, item: WorkItem },
    Status(StatusMessage),
    Reaction(ReactionRequest),
    Cleanup(CleanupSignal),
}

#[derive(Debug, Default)]
/// Records every outbound item instead of delivering it.
pub struct MemoryOutbound {
    records: Mutex<Vec<OutboundRecord>>,
}

impl MemoryOutbound {
    pub fn records(&self) -> Vec<OutboundRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn work_items(&self) -> Vec<(WorkQueue, WorkItem)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                OutboundRecord::Work { queue, item } => Some((queue, item)),
                _ => None,
            })
            .collect()
    }

    pub fn status_messages(&self) -> Vec<StatusMessage> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                OutboundRecord::Status(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<ReactionRequest> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                OutboundRecord::Reaction(reaction) => Some(reaction),
                _ => None,
            })
            .collect()
    }

    pub fn cleanups(&self) -> Vec<CleanupSignal> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                OutboundRecord::Cleanup(signal) => Some(signal),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: OutboundRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory outbound lock poisoned"))?;
        records.push(record);
        Ok(())
    }
}

#[async_trait]
impl OutboundSink for MemoryOutbound {
    async fn submit_work(&self, queue: WorkQueue, item: &WorkItem) -> Result<()> {
        debug!(queue = queue.as_str(), kind = item.kind.as_str(), "recorded work item");
        self.push(OutboundRecord::Work {
            queue,
            item: item.clone(),
        })
    }

    async fn post_status(&self, message: &StatusMessage) -> Result<()> {
        debug!(channel = %message.channel, "recorded status message");
        self.push(OutboundRecord::Status(message.clone()))
    }

    async fn request_reaction(&self, reaction: &ReactionRequest) -> Result<()> {
        debug!(reaction = %reaction.reaction, ts = %reaction.ts, "recorded reaction");
        self.push(OutboundRecord::Reaction(reaction.clone()))
    }

    async fn schedule_cleanup(&self, signal: &CleanupSignal) -> Result<()> {
        debug!(ts = %signal.ts, ttl = signal.ttl, "recorded cleanup");
        self.push(OutboundRecord::Cleanup(signal.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormRecord {
    Opened {
        trigger_id: String,
        view_id: String,
        prefill: IssueFormPrefill,
    },
    Updated {
        view_id: String,
        prefill: IssueFormPrefill,
    },
}

#[derive(Debug, Default)]
/// Chat surface that hands out sequential view ids.
pub struct MemoryChatSurface {
    forms: Mutex<Vec<FormRecord>>,
}

impl MemoryChatSurface {
    pub fn forms(&self) -> Vec<FormRecord> {
        self.forms
            .lock()
            .map(|forms| forms.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatSurface for MemoryChatSurface {
    async fn open_issue_form(
        &self,
        trigger_id: &str,
        prefill: &IssueFormPrefill,
    ) -> Result<String> {
        let mut forms = self
            .forms
            .lock()
            .map_err(|_| anyhow!("memory chat surface lock poisoned"))?;
        let view_id = format!("V{}", forms.len() + 1);
        forms.push(FormRecord::Opened {
            trigger_id: trigger_id.to_string(),
            view_id: view_id.clone(),
            prefill: prefill.clone(),
        });
        Ok(view_id)
    }

    async fn update_issue_form(&self, view_id: &str, prefill: &IssueFormPrefill) -> Result<()> {
        let mut forms = self
            .forms
            .lock()
            .map_err(|_| anyhow!("memory chat surface lock poisoned"))?;
        forms.push(FormRecord::Updated {
            view_id: view_id.to_string(),
            prefill: prefill.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
/// Transcript backed by per-channel message lists, newest first.
pub struct MemoryTranscript {
    channels: Mutex<HashMap<String, Vec<TranscriptMessage>>>,
}

impl MemoryTranscript {
    pub fn set_history(&self, channel: &str, messages: Vec<TranscriptMessage>) {
        if let Ok(mut channels) = self.channels.lock() {
            channels.insert(channel.to_string(), messages);
        }
    }
}

#[async_trait]
impl TranscriptSource for MemoryTranscript {
    async fn recent_messages(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<TranscriptMessage>> {
        let channels = self
            .channels
            .lock()
            .map_err(|_| anyhow!("memory transcript lock poisoned"))?;
        Ok(channels
            .get(channel)
            .map(|messages| messages.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn message_at(&self, channel: &str, ts: &str) -> Result<Option<TranscriptMessage>> {
        let channels = self
            .channels
            .lock()
            .map_err(|_| anyhow!("memory transcript lock poisoned"))?;
        Ok(channels
            .get(channel)
            .and_then(|messages| messages.iter().find(|message| message.ts == ts))
            .cloned())
    }
}

/// Inbound source fed from an mpsc channel.
pub struct MemoryInbound {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl MemoryInbound {
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self { receiver })
    }
}

#[async_trait]
impl InboundSource for MemoryInbound {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.receiver.recv().await)
    }
}
