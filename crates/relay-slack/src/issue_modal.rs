//! Block Kit rendering of the issue form.
//!
//! Block and action ids must stay in sync with the submission schema decoded
//! by `relay_workflow::payloads::IssueFormValues`.

use relay_workflow::classifier::ISSUE_FORM_CALLBACK_ID;
use relay_workflow::IssueFormPrefill;
use serde_json::{json, Value};

const OPTION_VALUE: &str = "true";

fn plain_text(text: &str) -> Value {
    json!({"type": "plain_text", "text": text})
}

fn checkbox_option(label: &str) -> Value {
    json!({"text": plain_text(label), "value": OPTION_VALUE})
}

fn checkbox_group(action_id: &str, label: &str, preselected: bool) -> Value {
    let option = checkbox_option(label);
    let mut element = json!({
        "type": "checkboxes",
        "action_id": action_id,
        "options": [option.clone()],
    });
    if preselected {
        element["initial_options"] = json!([option]);
    }
    element
}

fn text_input(action_id: &str, placeholder: &str, multiline: bool, initial: &str) -> Value {
    let mut element = json!({
        "type": "plain_text_input",
        "action_id": action_id,
        "multiline": multiline,
        "placeholder": plain_text(placeholder),
    });
    if !initial.is_empty() {
        element["initial_value"] = Value::String(initial.to_string());
    }
    element
}

/// Renders the modal view, pre-filled from `prefill`.
pub fn render_issue_modal(prefill: &IssueFormPrefill) -> Value {
    json!({
        "type": "modal",
        "callback_id": ISSUE_FORM_CALLBACK_ID,
        "title": plain_text("New GitHub Issue"),
        "submit": plain_text("Create Issue"),
        "close": plain_text("Cancel"),
        "blocks": [
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": "Fill out the details below to open a new issue in your repository."
                }
            },
            {
                "type": "input",
                "block_id": "repo_selection_block",
                "label": plain_text("Select Repository"),
                "element": {
                    "type": "external_select",
                    "action_id": "SlashVibeIssue",
                    "placeholder": plain_text("Search for a repo...")
                }
            },
            {
                "type": "input",
                "block_id": "title_block",
                "label": plain_text("Issue Title"),
                "element": text_input(
                    "issue_title",
                    "Brief summary of the issue",
                    false,
                    &prefill.title
                )
            },
            {
                "type": "input",
                "block_id": "description_block",
                "optional": true,
                "label": plain_text("Description"),
                "element": text_input(
                    "issue_description",
                    "Provide more details, reproduction steps, etc.",
                    true,
                    &prefill.description
                )
            },
            {
                "type": "actions",
                "block_id": "assignment_block",
                "elements": [
                    checkbox_group(
                        "assign_copilot",
                        "Assign to Copilot",
                        prefill.preselect_assignment
                    ),
                    checkbox_group("add_to_project", "Add to project", true)
                ]
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use relay_workflow::IssueFormPrefill;

    use super::render_issue_modal;

    #[test]
    fn functional_render_issue_modal_prefills_and_preselects() {
        let view = render_issue_modal(&IssueFormPrefill {
            title: "✨ Set up Copilot instructions".to_string(),
            description: "Configure instructions".to_string(),
            preselect_assignment: true,
        });
        assert_eq!(view["callback_id"], "create_github_issue_modal");
        let blocks = view["blocks"].as_array().expect("blocks");
        assert_eq!(blocks[1]["element"]["action_id"], "SlashVibeIssue");
        assert_eq!(
            blocks[2]["element"]["initial_value"],
            "✨ Set up Copilot instructions"
        );
        assert_eq!(blocks[3]["element"]["initial_value"], "Configure instructions");
        let assignment = &blocks[4]["elements"];
        assert_eq!(assignment[0]["action_id"], "assign_copilot");
        assert!(assignment[0]["initial_options"].is_array());
        assert!(assignment[1]["initial_options"].is_array());
    }

    #[test]
    fn unit_render_issue_modal_leaves_empty_fields_unset() {
        let view = render_issue_modal(&IssueFormPrefill::default());
        let blocks = view["blocks"].as_array().expect("blocks");
        assert!(blocks[2]["element"].get("initial_value").is_none());
        assert!(blocks[4]["elements"][0].get("initial_options").is_none());
        assert!(blocks[4]["elements"][1]["initial_options"].is_array());
    }
}
