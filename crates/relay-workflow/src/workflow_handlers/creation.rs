use anyhow::Context;
use tracing::{info, warn};

use super::{completed, skip, StepOutcome, StepResult, WorkflowHandlers};
use crate::chat::IssueFormPrefill;
use crate::classifier::{IssueCommand, IssueFormSubmission, WorkerOutput};
use crate::correlation::{
    CorrelationContext, MessageMetadata, KEY_ADD_TO_PROJECT, KEY_ASSIGNED, KEY_ISSUE_NUMBER,
    KEY_ISSUE_URL, KEY_REPO, KEY_TITLE, KEY_USERNAME,
};
use crate::outbound::{StatusMessage, WorkItem, WorkKind};
use crate::resource::{extract_issue_url, qualify_repo_name, IssueUrl};
use crate::shell::{issue_create_command, project_add_command, ISSUE_CREATE_PREFIX};
use crate::state::WorkflowState;

const INSTRUCTIONS_SHORTCUT: &str = ":sparkles:";
const INSTRUCTIONS_TITLE: &str = "✨ Set up Copilot instructions";
const INSTRUCTIONS_DESCRIPTION: &str = "Configure instructions for this repository as documented in [Best practices for Copilot coding agent in your repository](https://gh.io/copilot-coding-agent-tips).\n\n<Onboard this repo>";

/// Form prefill for `/issue <text>`.
pub(crate) fn prefill_for_command(text: &str) -> IssueFormPrefill {
    let text = text.trim();
    if text == INSTRUCTIONS_SHORTCUT {
        return IssueFormPrefill {
            title: INSTRUCTIONS_TITLE.to_string(),
            description: INSTRUCTIONS_DESCRIPTION.to_string(),
            preselect_assignment: true,
        };
    }
    IssueFormPrefill {
        title: text.to_string(),
        ..IssueFormPrefill::default()
    }
}

fn render_announcement(username: &str, repo: &str, title: &str, issue_url: &IssueUrl) -> String {
    format!(
        "✅ *GitHub Issue Created by @{username}*\n\n*Repository:* {repo}\n*Title:* {title}\n*URL:* {issue_url}"
    )
}

impl WorkflowHandlers {
    pub(super) async fn open_issue_form(&self, command: &IssueCommand) -> StepResult {
        let prefill = prefill_for_command(&command.text);
        let view_id = self
            .chat
            .open_issue_form(&command.trigger_id, &prefill)
            .await
            .context("failed to open issue form")?;
        info!(user = %command.user_name, view_id = %view_id, "opened issue form");
        completed(1)
    }

    pub(super) async fn submit_issue(&self, form: &IssueFormSubmission) -> StepResult {
        if form.repo.trim().is_empty() {
            return skip("form submission has no repository");
        }
        if form.title.trim().is_empty() {
            return skip("form submission has no title");
        }
        let repo = qualify_repo_name(&form.repo, &self.config.github_org);
        let requested = CorrelationContext::starting_at(WorkflowState::Requested)
            .with(KEY_REPO, repo.as_str())?
            .with(KEY_TITLE, form.title.as_str())?
            .with(KEY_USERNAME, form.username.as_str())?
            .with(KEY_ADD_TO_PROJECT, form.add_to_project)?
            .with(KEY_ASSIGNED, form.assign_to_automation)?;
        let submitted = requested.advance(WorkflowState::Submitted)?;

        let assignee = form
            .assign_to_automation
            .then_some(self.config.automation_assignee.as_str());
        let command = issue_create_command(&repo, &form.title, &form.description, assignee);
        let item = WorkItem::new(
            WorkKind::CreateIssue,
            repo.as_str(),
            self.config.working_dir.as_str(),
            command,
            submitted,
        );
        self.submit(&item).await?;
        info!(repo = %repo, user = %form.username, "issue creation submitted");
        completed(1)
    }

    pub(super) async fn record_created(&self, output: &WorkerOutput) -> StepResult {
        if !output.command.trim_start().starts_with(ISSUE_CREATE_PREFIX) {
            return skip("output is not from an issue create command");
        }
        let context = &output.context;
        let repo = context.require_str(KEY_REPO)?;
        let title = context.require_str(KEY_TITLE)?;
        let username = context.require_str(KEY_USERNAME)?;
        let Some(issue_url) = extract_issue_url(&output.output) else {
            warn!(repo = %repo, "issue create output carries no issue url");
            return skip("no issue url in output");
        };

        let created = context
            .advance(WorkflowState::Created)?
            .with(KEY_ISSUE_URL, issue_url.as_str())?
            .with(KEY_ISSUE_NUMBER, issue_url.number())?;

        let mut effects = 0;
        if context.wants_project_item() {
            let project_repo = issue_url
                .repo_full_name()
                .unwrap_or_else(|| repo.to_string());
            let item = WorkItem::new(
                WorkKind::AddToProject,
                project_repo,
                self.config.working_dir.as_str(),
                project_add_command(
                    &self.config.project_id,
                    &self.config.project_owner,
                    &issue_url,
                ),
                created.clone(),
            );
            match self.submit(&item).await {
                Ok(()) => effects += 1,
                Err(error) => {
                    warn!(
                        issue_url = %issue_url,
                        error = %format!("{error:#}"),
                        "project add was not submitted"
                    )
                }
            }
        }

        let message = StatusMessage {
            channel: self.config.status_channel_id.clone(),
            text: render_announcement(username, repo, title, &issue_url),
            ttl: self.config.status_ttl_seconds,
            metadata: Some(MessageMetadata::issue_created(created)),
        };
        self.outbound
            .post_status(&message)
            .await
            .context("failed to post issue announcement")?;
        effects += 1;
        info!(issue_url = %issue_url, repo = %repo, "issue created and announced");
        Ok(StepOutcome::Completed { effects })
    }
}
