//! Inbound event classification.
//!
//! Each channel has one discriminator field. Payloads that do not decode are
//! discarded with a diagnostic; payloads with an unknown discriminator are
//! discarded quietly because unrelated traffic shares these channels.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::chat::MessageLocation;
use crate::config::WorkflowConfig;
use crate::correlation::{ContextError, CorrelationContext};
use crate::outbound::WorkKind;
use crate::payloads::{
    GithubIssueWebhookPayload, MessageActionPayload, ReactionAddedPayload, SlashCommandPayload,
    ViewSubmissionPayload, WorkerOutputPayload,
};
use crate::resource::IssueUrl;

pub const ISSUE_SLASH_COMMAND: &str = "/issue";
pub const ISSUE_FORM_CALLBACK_ID: &str = "create_github_issue_modal";
pub const MESSAGE_ACTION_TYPE: &str = "message_action";
pub const MESSAGE_ACTION_CALLBACK_ID: &str = "create_github_issue";
pub const REACTION_ADDED_EVENT: &str = "reaction_added";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The six independently subscribed inbound channels.
pub enum InboundChannel {
    SlashCommands,
    ViewSubmissions,
    WorkerOutput,
    Reactions,
    MessageActions,
    GithubWebhooks,
}

impl InboundChannel {
    pub const ALL: [InboundChannel; 6] = [
        Self::SlashCommands,
        Self::ViewSubmissions,
        Self::WorkerOutput,
        Self::Reactions,
        Self::MessageActions,
        Self::GithubWebhooks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlashCommands => "slash_commands",
            Self::ViewSubmissions => "view_submissions",
            Self::WorkerOutput => "worker_output",
            Self::Reactions => "reactions",
            Self::MessageActions => "message_actions",
            Self::GithubWebhooks => "github_webhooks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCommand {
    pub trigger_id: String,
    pub user_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFormSubmission {
    pub username: String,
    pub repo: String,
    pub title: String,
    pub description: String,
    pub assign_to_automation: bool,
    pub add_to_project: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutput {
    pub kind: WorkKind,
    pub command: String,
    pub output: String,
    pub context: CorrelationContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTrigger {
    Assign,
    Sanitize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub trigger: ReactionTrigger,
    pub reactor: String,
    pub reactor_is_bot: bool,
    pub item_type: String,
    pub location: MessageLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRequest {
    pub trigger_id: String,
    pub username: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    Closed,
    Assigned { assignee: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueWebhook {
    pub action: WebhookAction,
    pub issue_url: Option<IssueUrl>,
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
/// Inbound event reduced to the fields its handler needs.
pub enum ClassifiedEvent {
    SlashCommand(IssueCommand),
    FormSubmission(IssueFormSubmission),
    WorkerOutput(WorkerOutput),
    EmojiReaction(ReactionEvent),
    MessageAction(TitleRequest),
    Webhook(IssueWebhook),
}

impl ClassifiedEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SlashCommand(_) => "slash_command",
            Self::FormSubmission(_) => "form_submission",
            Self::WorkerOutput(_) => "worker_output",
            Self::EmojiReaction(_) => "emoji_reaction",
            Self::MessageAction(_) => "message_action",
            Self::Webhook(_) => "webhook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The payload could not be decoded at all.
    Malformed(String),
    /// The discriminator names something this relay does not handle.
    Unrecognized(String),
    /// The payload decoded but its correlation metadata did not.
    InvalidContext(ContextError),
}

impl DiscardReason {
    pub fn is_diagnostic(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "malformed payload: {detail}"),
            Self::Unrecognized(detail) => write!(f, "unrecognized {detail}"),
            Self::InvalidContext(error) => write!(f, "{error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Event(ClassifiedEvent),
    Discard(DiscardReason),
}

#[derive(Debug, Clone)]
/// Stateless classifier configured with the trigger emoji names.
pub struct EventClassifier {
    assign_emoji: String,
    sanitize_emoji: String,
}

impl EventClassifier {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            assign_emoji: config.emojis.assign_trigger.clone(),
            sanitize_emoji: config.emojis.sanitize_trigger.clone(),
        }
    }

    pub fn classify(&self, channel: InboundChannel, payload: &[u8]) -> Classification {
        let result = match channel {
            InboundChannel::SlashCommands => decode(payload).map(classify_slash_command),
            InboundChannel::ViewSubmissions => decode(payload).map(classify_view_submission),
            InboundChannel::WorkerOutput => decode(payload).map(classify_worker_output),
            InboundChannel::Reactions => {
                decode::<ReactionAddedPayload>(payload).map(|raw| self.classify_reaction(raw))
            }
            InboundChannel::MessageActions => decode(payload).map(classify_message_action),
            InboundChannel::GithubWebhooks => decode(payload).map(classify_webhook),
        };
        match result {
            Ok(classification) => classification,
            Err(reason) => Classification::Discard(reason),
        }
    }

    fn classify_reaction(&self, raw: ReactionAddedPayload) -> Classification {
        if raw.event.event_type != REACTION_ADDED_EVENT {
            return unrecognized(format!("event type `{}`", raw.event.event_type));
        }
        let trigger = if raw.event.reaction == self.assign_emoji {
            ReactionTrigger::Assign
        } else if raw.event.reaction == self.sanitize_emoji {
            ReactionTrigger::Sanitize
        } else {
            return unrecognized(format!("reaction `{}`", raw.event.reaction));
        };
        let reactor_is_bot = raw
            .authorizations
            .iter()
            .any(|auth| auth.is_bot && auth.user_id == raw.event.user);
        Classification::Event(ClassifiedEvent::EmojiReaction(ReactionEvent {
            trigger,
            reactor: raw.event.user,
            reactor_is_bot,
            item_type: raw.event.item.item_type,
            location: MessageLocation {
                channel: raw.event.item.channel,
                ts: raw.event.item.ts,
            },
        }))
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DiscardReason> {
    serde_json::from_slice(payload).map_err(|error| DiscardReason::Malformed(error.to_string()))
}

fn unrecognized(detail: String) -> Classification {
    Classification::Discard(DiscardReason::Unrecognized(detail))
}

fn classify_slash_command(raw: SlashCommandPayload) -> Classification {
    if raw.command != ISSUE_SLASH_COMMAND {
        return unrecognized(format!("command `{}`", raw.command));
    }
    Classification::Event(ClassifiedEvent::SlashCommand(IssueCommand {
        trigger_id: raw.trigger_id,
        user_name: raw.user_name,
        text: raw.text.trim().to_string(),
    }))
}

fn classify_view_submission(raw: ViewSubmissionPayload) -> Classification {
    if raw.view.callback_id != ISSUE_FORM_CALLBACK_ID {
        return unrecognized(format!("callback id `{}`", raw.view.callback_id));
    }
    let values = raw.view.state.values;
    Classification::Event(ClassifiedEvent::FormSubmission(IssueFormSubmission {
        username: raw.user.username,
        repo: values.repo_selection_block.repo_select.selected().to_string(),
        title: values.title_block.issue_title.text().trim().to_string(),
        description: values.description_block.issue_description.text().to_string(),
        assign_to_automation: values.assignment_block.assign_copilot.is_checked(),
        add_to_project: values.assignment_block.add_to_project.is_checked(),
    }))
}

fn classify_worker_output(raw: WorkerOutputPayload) -> Classification {
    let Some(kind) = WorkKind::parse(&raw.output_type) else {
        return unrecognized(format!("output type `{}`", raw.output_type));
    };
    let context = match CorrelationContext::from_value(raw.metadata.as_ref()) {
        Ok(context) => context,
        Err(error) => return Classification::Discard(DiscardReason::InvalidContext(error)),
    };
    Classification::Event(ClassifiedEvent::WorkerOutput(WorkerOutput {
        kind,
        command: raw.command,
        output: raw.output,
        context,
    }))
}

fn classify_message_action(raw: MessageActionPayload) -> Classification {
    if raw.payload_type != MESSAGE_ACTION_TYPE {
        return unrecognized(format!("payload type `{}`", raw.payload_type));
    }
    if raw.callback_id != MESSAGE_ACTION_CALLBACK_ID {
        return unrecognized(format!("callback id `{}`", raw.callback_id));
    }
    Classification::Event(ClassifiedEvent::MessageAction(TitleRequest {
        trigger_id: raw.trigger_id,
        username: raw.user.username,
        text: raw.message.text,
    }))
}

fn classify_webhook(raw: GithubIssueWebhookPayload) -> Classification {
    let action = match raw.action.as_str() {
        "closed" => WebhookAction::Closed,
        "assigned" => WebhookAction::Assigned {
            assignee: raw
                .assignee
                .map(|account| account.login)
                .unwrap_or_default(),
        },
        other => return unrecognized(format!("webhook action `{other}`")),
    };
    let issue_url =
        IssueUrl::parse(&raw.issue.html_url).or_else(|| IssueUrl::parse(&raw.issue.url));
    Classification::Event(ClassifiedEvent::Webhook(IssueWebhook {
        action,
        issue_url,
        number: raw.issue.number,
        title: raw.issue.title,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        Classification, ClassifiedEvent, DiscardReason, EventClassifier, InboundChannel,
        ReactionTrigger, WebhookAction,
    };
    use crate::config::WorkflowConfig;
    use crate::outbound::WorkKind;

    fn classifier() -> EventClassifier {
        EventClassifier::new(&WorkflowConfig::new("org"))
    }

    fn classify(channel: InboundChannel, payload: serde_json::Value) -> Classification {
        classifier()
            .classify(channel, payload.to_string().as_bytes())
    }

    #[test]
    fn unit_unknown_discriminators_are_discarded_on_every_channel() {
        let cases = [
            (InboundChannel::SlashCommands, json!({"command": "/deploy"})),
            (
                InboundChannel::ViewSubmissions,
                json!({"view": {"callback_id": "other_modal"}}),
            ),
            (InboundChannel::WorkerOutput, json!({"type": "other-tool"})),
            (
                InboundChannel::Reactions,
                json!({"event": {"type": "reaction_added", "reaction": "thumbsup"}}),
            ),
            (
                InboundChannel::MessageActions,
                json!({"type": "message_action", "callback_id": "other"}),
            ),
            (InboundChannel::GithubWebhooks, json!({"action": "labeled"})),
        ];
        for (channel, payload) in cases {
            match classify(channel, payload) {
                Classification::Discard(reason) => assert!(!reason.is_diagnostic()),
                other => panic!("expected discard for {channel:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn regression_malformed_payloads_are_discarded_with_diagnostic() {
        for channel in InboundChannel::ALL {
            match classifier().classify(channel, b"{not json") {
                Classification::Discard(DiscardReason::Malformed(_)) => {}
                other => panic!("expected malformed discard for {channel:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn functional_slash_command_trims_text() {
        let classification = classify(
            InboundChannel::SlashCommands,
            json!({"command": "/issue", "text": "  Fix it ", "trigger_id": "T1", "user_name": "alice"}),
        );
        let Classification::Event(ClassifiedEvent::SlashCommand(command)) = classification else {
            panic!("expected slash command");
        };
        assert_eq!(command.text, "Fix it");
        assert_eq!(command.trigger_id, "T1");
    }

    #[test]
    fn functional_worker_output_carries_kind_and_context() {
        let classification = classify(
            InboundChannel::WorkerOutput,
            json!({
                "type": "slash-vibe-issue",
                "command": "gh issue create --repo 'org/repo'",
                "output": "https://github.com/org/repo/issues/1",
                "metadata": {"repo": "org/repo", "workflow_state": "submitted"}
            }),
        );
        let Classification::Event(ClassifiedEvent::WorkerOutput(output)) = classification else {
            panic!("expected worker output");
        };
        assert_eq!(output.kind, WorkKind::CreateIssue);
        assert_eq!(output.context.require_str("repo"), Ok("org/repo"));
    }

    #[test]
    fn regression_worker_output_with_non_object_metadata_is_discarded() {
        let classification = classify(
            InboundChannel::WorkerOutput,
            json!({"type": "slash-vibe-issue", "metadata": "oops"}),
        );
        assert!(matches!(
            classification,
            Classification::Discard(DiscardReason::InvalidContext(_))
        ));
    }

    #[test]
    fn functional_reaction_detects_trigger_and_bot_reactor() {
        let classification = classify(
            InboundChannel::Reactions,
            json!({
                "event": {
                    "type": "reaction_added",
                    "user": "UBOT",
                    "reaction": "soap",
                    "item": {"type": "message", "channel": "C1", "ts": "1.2"}
                },
                "authorizations": [{"user_id": "UBOT", "is_bot": true}]
            }),
        );
        let Classification::Event(ClassifiedEvent::EmojiReaction(reaction)) = classification else {
            panic!("expected reaction");
        };
        assert_eq!(reaction.trigger, ReactionTrigger::Sanitize);
        assert!(reaction.reactor_is_bot);
        assert_eq!(reaction.location.channel, "C1");
        assert_eq!(reaction.location.ts, "1.2");
    }

    #[test]
    fn functional_webhook_prefers_html_url_and_normalizes_api_url() {
        let assigned = classify(
            InboundChannel::GithubWebhooks,
            json!({
                "action": "assigned",
                "assignee": {"login": "Copilot"},
                "issue": {"html_url": "https://github.com/org/repo/issues/42", "number": 42}
            }),
        );
        let Classification::Event(ClassifiedEvent::Webhook(webhook)) = assigned else {
            panic!("expected webhook");
        };
        assert_eq!(
            webhook.action,
            WebhookAction::Assigned {
                assignee: "Copilot".to_string()
            }
        );
        assert_eq!(
            webhook.issue_url.map(|url| url.to_string()).as_deref(),
            Some("https://github.com/org/repo/issues/42")
        );

        let closed = classify(
            InboundChannel::GithubWebhooks,
            json!({"action": "closed", "issue": {"url": "https://api.github.com/repos/org/repo/issues/13"}}),
        );
        let Classification::Event(ClassifiedEvent::Webhook(webhook)) = closed else {
            panic!("expected webhook");
        };
        assert_eq!(
            webhook.issue_url.map(|url| url.to_string()).as_deref(),
            Some("https://github.com/org/repo/issues/13")
        );
    }

    #[test]
    fn unit_message_action_requires_type_and_callback() {
        let classification = classify(
            InboundChannel::MessageActions,
            json!({
                "type": "message_action",
                "callback_id": "create_github_issue",
                "trigger_id": "T9",
                "user": {"username": "bob"},
                "message": {"text": "login is broken"}
            }),
        );
        let Classification::Event(ClassifiedEvent::MessageAction(request)) = classification else {
            panic!("expected message action");
        };
        assert_eq!(request.text, "login is broken");
        assert_eq!(request.username, "bob");
    }
}
