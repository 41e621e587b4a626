//! Slack Web API adapter: opens and updates the issue form and reads the
//! status conversation history for reverse lookups.

mod issue_modal;
mod retry;
mod slack_client;

pub use issue_modal::render_issue_modal;
pub use slack_client::{SlackApiClient, SlackClientConfig, DEFAULT_SLACK_API_BASE};
