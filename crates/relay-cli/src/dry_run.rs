use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use relay_workflow::{
    CleanupSignal, OutboundSink, ReactionRequest, StatusMessage, WorkItem, WorkQueue,
};
use tracing::info;

#[derive(Debug, Default)]
/// Outbound sink for `--dry-run`: logs each item and keeps only a count.
pub(crate) struct DryRunOutbound {
    delivered: AtomicU64,
}

impl DryRunOutbound {
    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl OutboundSink for DryRunOutbound {
    async fn submit_work(&self, queue: WorkQueue, item: &WorkItem) -> Result<()> {
        info!(
            queue = queue.as_str(),
            kind = item.kind.as_str(),
            repo = %item.repo,
            dir = %item.dir,
            commands = ?item.commands,
            "dry run: work item"
        );
        self.count();
        Ok(())
    }

    async fn post_status(&self, message: &StatusMessage) -> Result<()> {
        info!(
            channel = %message.channel,
            ttl = message.ttl,
            text = %message.text,
            "dry run: status message"
        );
        self.count();
        Ok(())
    }

    async fn request_reaction(&self, reaction: &ReactionRequest) -> Result<()> {
        info!(
            reaction = %reaction.reaction,
            channel = %reaction.channel,
            ts = %reaction.ts,
            "dry run: reaction"
        );
        self.count();
        Ok(())
    }

    async fn schedule_cleanup(&self, signal: &CleanupSignal) -> Result<()> {
        info!(
            channel = %signal.channel,
            ts = %signal.ts,
            ttl = signal.ttl,
            "dry run: cleanup"
        );
        self.count();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_workflow::memory::{MemoryChatSurface, MemoryTranscript};
    use relay_workflow::{
        CleanupSignal, EventRouter, InboundChannel, OutboundSink, StepOutcome, WorkflowConfig,
    };
    use serde_json::json;

    use super::DryRunOutbound;

    #[tokio::test]
    async fn functional_dry_run_sink_accepts_every_record_kind() {
        let sink = DryRunOutbound::default();
        sink.schedule_cleanup(&CleanupSignal {
            channel: "C1".to_string(),
            ts: "1.0".to_string(),
            ttl: 60,
        })
        .await
        .expect("cleanup");
        assert_eq!(sink.delivered(), 1);
    }

    #[tokio::test]
    async fn integration_dry_run_sink_completes_steps_without_retaining_items() {
        let sink = Arc::new(DryRunOutbound::default());
        let router = EventRouter::new(
            Arc::new(WorkflowConfig::new("org")),
            sink.clone(),
            Arc::new(MemoryChatSurface::default()),
            Arc::new(MemoryTranscript::default()),
        );
        let payload = json!({
            "view": {
                "callback_id": "create_github_issue_modal",
                "state": {"values": {
                    "repo_selection_block": {"SlashVibeIssue": {"selected_option": {"value": "repo"}}},
                    "title_block": {"issue_title": {"value": "Dry run"}}
                }}
            },
            "user": {"username": "alice"}
        });
        for _ in 0..3 {
            let outcome = router
                .route(InboundChannel::ViewSubmissions, payload.to_string().as_bytes())
                .await;
            assert_eq!(outcome, Some(StepOutcome::Completed { effects: 1 }));
        }
        assert_eq!(sink.delivered(), 3);
    }
}
