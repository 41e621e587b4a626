use anyhow::Context;
use tracing::{debug, info};

use super::{completed, lookup_miss, skip, StepResult, WorkflowHandlers};
use crate::chat::MessageLocation;
use crate::classifier::{ReactionEvent, ReactionTrigger, WorkerOutput};
use crate::correlation::{CorrelationContext, KEY_ISSUE_URL};
use crate::outbound::{ReactionRequest, WorkItem, WorkKind};
use crate::resource::IssueUrl;
use crate::shell::{assign_command, sanitize_command};
use crate::state::WorkflowState;

const REACTABLE_ITEM_TYPE: &str = "message";

impl WorkflowHandlers {
    /// Assign and sanitize share every guard, including the assignment check,
    /// so neither runs once the issue has been handed to the automation.
    pub(super) async fn react(&self, reaction: &ReactionEvent) -> StepResult {
        if reaction.reactor_is_bot {
            return skip("reaction came from a bot");
        }
        if reaction.item_type != REACTABLE_ITEM_TYPE {
            return skip("reaction target is not a message");
        }
        let Some(message) = self
            .lookup
            .message_at(&reaction.location)
            .await
            .context("failed to read reacted message")?
        else {
            return lookup_miss();
        };
        let Some(metadata) = message
            .metadata
            .as_ref()
            .filter(|metadata| metadata.is_issue_created())
        else {
            debug!(ts = %reaction.location.ts, "reacted message is not an issue announcement");
            return skip("message carries no issue announcement metadata");
        };
        let announced = &metadata.event_payload;
        if announced
            .state()
            .is_some_and(|state| !state.is_announced())
        {
            return skip("announcement is not in an announced state");
        }
        let Some(issue_url) = IssueUrl::parse(announced.require_str(KEY_ISSUE_URL)?) else {
            return skip("announcement issue url is not a github issue url");
        };
        if announced.is_assigned() || message.has_reaction(&self.config.emojis.assigned) {
            return skip("issue is already assigned");
        }

        match reaction.trigger {
            ReactionTrigger::Assign => self.request_assignment(announced, &issue_url).await,
            ReactionTrigger::Sanitize => self.request_sanitize(announced, &issue_url).await,
        }
    }

    async fn request_assignment(
        &self,
        announced: &CorrelationContext,
        issue_url: &IssueUrl,
    ) -> StepResult {
        let pending = announced.advance(WorkflowState::AssignPending)?;
        let item = WorkItem::new(
            WorkKind::AssignAgent,
            self.repo_for(announced, issue_url),
            self.config.working_dir.as_str(),
            assign_command(&self.config.automation_assignee, issue_url),
            pending,
        );
        self.submit(&item).await?;
        info!(issue_url = %issue_url, "assignment requested");
        completed(1)
    }

    async fn request_sanitize(
        &self,
        announced: &CorrelationContext,
        issue_url: &IssueUrl,
    ) -> StepResult {
        let pending = announced.advance(WorkflowState::SanitizePending)?;
        let item = WorkItem::new(
            WorkKind::Sanitize,
            self.repo_for(announced, issue_url),
            self.config.agent_working_dir.as_str(),
            sanitize_command(&self.config.agent_model, issue_url),
            pending,
        );
        self.submit(&item).await?;
        info!(issue_url = %issue_url, "sanitize requested");
        completed(1)
    }

    pub(super) async fn sanitize_complete(&self, output: &WorkerOutput) -> StepResult {
        let raw_url = output.context.require_str(KEY_ISSUE_URL)?;
        let Some(issue_url) = IssueUrl::parse(raw_url) else {
            return skip("sanitize output issue url is not a github issue url");
        };
        output.context.advance(WorkflowState::Idle)?;
        let Some(hit) = self
            .lookup
            .find_by_resource(&issue_url)
            .await
            .context("failed to search status conversation")?
        else {
            info!(issue_url = %issue_url, "no announcement found for sanitized issue");
            return lookup_miss();
        };
        let emoji = &self.config.emojis.sanitized;
        if hit.has_reaction(emoji) {
            return skip("announcement already marked sanitized");
        }
        self.add_reaction(emoji, &hit.location).await?;
        info!(issue_url = %issue_url, "sanitize completed");
        completed(1)
    }

    fn repo_for(&self, announced: &CorrelationContext, issue_url: &IssueUrl) -> String {
        announced
            .repo()
            .map(str::to_string)
            .or_else(|| issue_url.repo_full_name())
            .unwrap_or_else(|| self.config.github_org.clone())
    }

    pub(super) async fn add_reaction(
        &self,
        emoji: &str,
        location: &MessageLocation,
    ) -> anyhow::Result<()> {
        let request = ReactionRequest {
            reaction: emoji.to_string(),
            channel: location.channel.clone(),
            ts: location.ts.clone(),
        };
        self.outbound
            .request_reaction(&request)
            .await
            .with_context(|| format!("failed to request `{emoji}` reaction"))
    }
}
