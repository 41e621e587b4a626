//! Shell command text handed to the executor.
//!
//! Commands are assembled by concatenation; every value that did not
//! originate in this process is single-quoted with `'` rewritten to `'\''`.

use serde::Serialize;

use crate::resource::IssueUrl;

pub const ISSUE_CREATE_PREFIX: &str = "gh issue create";

const ISSUE_SUMMARISER_AGENT: &str = "issue-summariser";
const ISSUE_SANITISER_AGENT: &str = "issue-sanitiser";

/// Quotes a value for POSIX shells.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn issue_create_command(
    repo_full_name: &str,
    title: &str,
    description: &str,
    assignee: Option<&str>,
) -> String {
    let mut command = format!(
        "{ISSUE_CREATE_PREFIX} --repo {} --title {}",
        shell_quote(repo_full_name),
        shell_quote(title)
    );
    if !description.trim().is_empty() {
        command.push_str(" --body ");
        command.push_str(&shell_quote(description));
    }
    if let Some(assignee) = assignee {
        command.push_str(" --assignee ");
        command.push_str(&shell_quote(assignee));
    }
    command
}

pub fn project_add_command(project_id: &str, owner: &str, issue_url: &IssueUrl) -> String {
    format!(
        "gh project item-add {} --owner {} --url {}",
        shell_quote(project_id),
        shell_quote(owner),
        shell_quote(issue_url.as_str())
    )
}

pub fn assign_command(assignee: &str, issue_url: &IssueUrl) -> String {
    format!(
        "gh issue edit --add-assignee {} {}",
        shell_quote(assignee),
        shell_quote(issue_url.as_str())
    )
}

#[derive(Debug, Serialize)]
struct AgentInput<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct SanitiseInput<'a> {
    issue_url: &'a str,
}

fn agent_command(model: &str, agent: &str, prompt_json: &str) -> String {
    format!(
        "copilot --model {} --agent {agent} --prompt {}",
        shell_quote(model),
        shell_quote(prompt_json)
    )
}

/// Builds the summariser invocation; the message travels as JSON so quotes
/// and newlines survive intact.
pub fn title_command(model: &str, message: &str) -> String {
    let input = serde_json::to_string(&AgentInput { message }).unwrap_or_default();
    agent_command(model, ISSUE_SUMMARISER_AGENT, &input)
}

pub fn sanitize_command(model: &str, issue_url: &IssueUrl) -> String {
    let input = serde_json::to_string(&SanitiseInput {
        issue_url: issue_url.as_str(),
    })
    .unwrap_or_default();
    agent_command(model, ISSUE_SANITISER_AGENT, &input)
}
