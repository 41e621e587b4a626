use anyhow::Context;
use tracing::{info, warn};

use super::{completed, skip, StepResult, WorkflowHandlers};
use crate::chat::IssueFormPrefill;
use crate::classifier::{TitleRequest, WorkerOutput};
use crate::correlation::{CorrelationContext, KEY_USERNAME, KEY_VIEW_ID};
use crate::outbound::{WorkItem, WorkKind};
use crate::payloads::TitleGenerationOutput;
use crate::shell::title_command;
use crate::state::WorkflowState;

const PLACEHOLDER_TITLE: &str = "⏳ Generating title...";
const AGENT_REPO_NAME: &str = "SlashVibeIssue";

impl WorkflowHandlers {
    /// Opens the form straight away so the trigger id does not expire while
    /// the summariser runs, then queues the summariser.
    pub(super) async fn generate_title(&self, request: &TitleRequest) -> StepResult {
        if request.text.trim().is_empty() {
            return skip("message action has no text");
        }
        let placeholder = IssueFormPrefill {
            title: PLACEHOLDER_TITLE.to_string(),
            description: request.text.clone(),
            preselect_assignment: false,
        };
        let view_id = self
            .chat
            .open_issue_form(&request.trigger_id, &placeholder)
            .await
            .context("failed to open placeholder issue form")?;

        let context = CorrelationContext::starting_at(WorkflowState::Drafting)
            .with(KEY_USERNAME, request.username.as_str())?
            .with(KEY_VIEW_ID, view_id.as_str())?;
        let item = WorkItem::new(
            WorkKind::GenerateTitle,
            format!("{}/{AGENT_REPO_NAME}", self.config.github_org),
            self.config.agent_working_dir.as_str(),
            title_command(&self.config.agent_model, &request.text),
            context,
        );
        self.submit(&item).await?;
        info!(user = %request.username, view_id = %view_id, "title generation requested");
        completed(2)
    }

    pub(super) async fn apply_generated_title(&self, output: &WorkerOutput) -> StepResult {
        let context = &output.context;
        if context
            .state()
            .is_some_and(|state| state != WorkflowState::Drafting)
        {
            return skip("title output does not belong to a drafting form");
        }
        let username = context.require_str(KEY_USERNAME)?;
        let view_id = context.require_str(KEY_VIEW_ID)?;
        let generated = match serde_json::from_str::<TitleGenerationOutput>(output.output.trim()) {
            Ok(generated) => generated,
            Err(error) => {
                warn!(
                    view_id = %view_id,
                    error = %error,
                    "title generator output is not valid json"
                );
                return skip("title generator output is not valid json");
            }
        };
        let title = generated.title.trim();
        if title.is_empty() {
            return skip("title generator returned an empty title");
        }

        let prefill = IssueFormPrefill {
            title: title.to_string(),
            description: generated.prompt,
            preselect_assignment: false,
        };
        self.chat
            .update_issue_form(view_id, &prefill)
            .await
            .context("failed to update issue form with generated title")?;
        info!(user = %username, view_id = %view_id, "issue form updated with generated title");
        completed(1)
    }
}
