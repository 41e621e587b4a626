//! Wire shapes of the six inbound channels.
//!
//! Every field is defaulted so that partial payloads decode and the classifier
//! can decide by discriminator; unknown fields are ignored.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewSubmissionPayload {
    #[serde(rename = "type", default)]
    pub payload_type: String,
    #[serde(default)]
    pub view: SubmittedView,
    #[serde(default)]
    pub user: PayloadUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmittedView {
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub state: SubmittedViewState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmittedViewState {
    #[serde(default)]
    pub values: IssueFormValues,
}

/// Typed view of the issue form state, keyed by block id then action id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFormValues {
    #[serde(default)]
    pub repo_selection_block: RepoSelectionBlock,
    #[serde(default)]
    pub title_block: TitleBlock,
    #[serde(default)]
    pub description_block: DescriptionBlock,
    #[serde(default)]
    pub assignment_block: AssignmentBlock,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoSelectionBlock {
    #[serde(rename = "SlashVibeIssue", default)]
    pub repo_select: SelectValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleBlock {
    #[serde(default)]
    pub issue_title: TextValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptionBlock {
    #[serde(default)]
    pub issue_description: TextValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentBlock {
    #[serde(default)]
    pub assign_copilot: CheckboxValue,
    #[serde(default)]
    pub add_to_project: CheckboxValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectValue {
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectedOption {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckboxValue {
    #[serde(default)]
    pub selected_options: Option<Vec<Value>>,
}

impl SelectValue {
    pub fn selected(&self) -> &str {
        self.selected_option
            .as_ref()
            .map(|option| option.value.trim())
            .unwrap_or_default()
    }
}

impl TextValue {
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

impl CheckboxValue {
    pub fn is_checked(&self) -> bool {
        self.selected_options
            .as_ref()
            .is_some_and(|options| !options.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerOutputPayload {
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(rename = "type", default)]
    pub output_type: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionAddedPayload {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub event: ReactionEventBody,
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionEventBody {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub reaction: String,
    #[serde(default)]
    pub item: ReactionItem,
    #[serde(default)]
    pub item_user: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorization {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageActionPayload {
    #[serde(rename = "type", default)]
    pub payload_type: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub user: PayloadUser,
    #[serde(default)]
    pub channel: ActionChannel,
    #[serde(default)]
    pub message: ActionMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionChannel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubIssueWebhookPayload {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub assignee: Option<GithubAccount>,
    #[serde(default)]
    pub issue: GithubIssue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubAccount {
    #[serde(default)]
    pub login: String,
    #[serde(rename = "type", default)]
    pub account_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubIssue {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

/// JSON document printed by the title summariser agent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TitleGenerationOutput {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GithubIssueWebhookPayload, TitleGenerationOutput, ViewSubmissionPayload};

    #[test]
    fn unit_view_submission_decodes_nested_form_values() {
        let payload: ViewSubmissionPayload = serde_json::from_value(json!({
            "type": "view_submission",
            "view": {
                "callback_id": "create_github_issue_modal",
                "state": {"values": {
                    "repo_selection_block": {"SlashVibeIssue": {"selected_option": {"value": "relay"}}},
                    "title_block": {"issue_title": {"value": "Fix login bug"}},
                    "description_block": {"issue_description": {"value": null}},
                    "assignment_block": {
                        "assign_copilot": {"selected_options": []},
                        "add_to_project": {"selected_options": [{"value": "true"}]}
                    }
                }}
            },
            "user": {"id": "U1", "username": "alice"}
        }))
        .expect("payload");
        let values = &payload.view.state.values;
        assert_eq!(values.repo_selection_block.repo_select.selected(), "relay");
        assert_eq!(values.title_block.issue_title.text(), "Fix login bug");
        assert_eq!(values.description_block.issue_description.text(), "");
        assert!(!values.assignment_block.assign_copilot.is_checked());
        assert!(values.assignment_block.add_to_project.is_checked());
    }

    #[test]
    fn regression_view_submission_with_missing_blocks_defaults_to_empty() {
        let payload: ViewSubmissionPayload = serde_json::from_value(json!({
            "view": {"callback_id": "create_github_issue_modal", "state": {"values": {}}},
            "user": {"username": "alice"}
        }))
        .expect("payload");
        let values = &payload.view.state.values;
        assert_eq!(values.repo_selection_block.repo_select.selected(), "");
        assert!(!values.assignment_block.add_to_project.is_checked());
    }

    #[test]
    fn unit_github_webhook_decodes_optional_assignee() {
        let assigned: GithubIssueWebhookPayload = serde_json::from_value(json!({
            "action": "assigned",
            "assignee": {"login": "Copilot", "type": "Bot"},
            "issue": {"html_url": "https://github.com/org/repo/issues/42", "number": 42, "title": "T"}
        }))
        .expect("assigned");
        assert_eq!(
            assigned.assignee.map(|account| account.login).as_deref(),
            Some("Copilot")
        );

        let closed: GithubIssueWebhookPayload = serde_json::from_value(json!({
            "action": "closed",
            "issue": {"url": "https://api.github.com/repos/org/repo/issues/44", "number": 44}
        }))
        .expect("closed");
        assert!(closed.assignee.is_none());
        assert_eq!(closed.issue.number, 44);
    }

    #[test]
    fn unit_title_generation_output_decodes_agent_json() {
        let output: TitleGenerationOutput = serde_json::from_str(
            r#"{"version": 1, "title": "Fix Slack search", "prompt": "Search is broken"}"#,
        )
        .expect("title output");
        assert_eq!(output.title, "Fix Slack search");
        assert_eq!(output.prompt, "Search is broken");
        assert!(serde_json::from_str::<TitleGenerationOutput>(r#"{"invalid json"#).is_err());
    }
}
