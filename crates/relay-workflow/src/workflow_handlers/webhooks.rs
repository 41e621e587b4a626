use anyhow::Context;
use tracing::info;

use super::{completed, lookup_miss, skip, StepResult, WorkflowHandlers};
use crate::classifier::IssueWebhook;
use crate::outbound::CleanupSignal;

impl WorkflowHandlers {
    pub(super) async fn webhook_closed(&self, webhook: &IssueWebhook) -> StepResult {
        let Some(issue_url) = webhook.issue_url.as_ref() else {
            return skip("closed webhook carries no issue url");
        };
        let Some(hit) = self
            .lookup
            .find_by_resource(issue_url)
            .await
            .context("failed to search status conversation")?
        else {
            info!(issue_url = %issue_url, "no announcement found for closed issue");
            return lookup_miss();
        };
        let emoji = &self.config.emojis.closed;
        if hit.has_reaction(emoji) {
            return skip("announcement already marked closed");
        }
        self.add_reaction(emoji, &hit.location).await?;
        let signal = CleanupSignal {
            channel: hit.location.channel.clone(),
            ts: hit.location.ts.clone(),
            ttl: self.config.closed_cleanup_ttl_seconds,
        };
        self.outbound
            .schedule_cleanup(&signal)
            .await
            .context("failed to schedule announcement cleanup")?;
        info!(
            issue_url = %issue_url,
            ttl = signal.ttl,
            "closed issue marked and cleanup scheduled"
        );
        completed(2)
    }

    pub(super) async fn webhook_assigned(
        &self,
        webhook: &IssueWebhook,
        assignee: &str,
    ) -> StepResult {
        if !self.config.is_automation_login(assignee) {
            return skip("assignee is not the automation account");
        }
        let Some(issue_url) = webhook.issue_url.as_ref() else {
            return skip("assigned webhook carries no issue url");
        };
        let Some(hit) = self
            .lookup
            .find_by_resource(issue_url)
            .await
            .context("failed to search status conversation")?
        else {
            info!(issue_url = %issue_url, "no announcement found for assigned issue");
            return lookup_miss();
        };
        let emoji = &self.config.emojis.assigned;
        if hit.has_reaction(emoji) {
            return skip("announcement already marked assigned");
        }
        self.add_reaction(emoji, &hit.location).await?;
        info!(issue_url = %issue_url, "automation assignment marked");
        completed(1)
    }
}
