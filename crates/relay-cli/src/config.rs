use relay_queue::{InboundChannelNames, QueueTargets};
use relay_slack::SlackClientConfig;
use relay_workflow::{ReactionEmojis, WorkflowConfig};
use thiserror::Error;

use crate::cli_args::Cli;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ConfigError {
    #[error("SLACK_BOT_TOKEN is required")]
    MissingSlackToken,
    #[error("GITHUB_ORG is required")]
    MissingGithubOrg,
    #[error("{name} must be whole seconds or a duration such as 48h, got `{value}`")]
    InvalidTtl { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
/// Validated start-up configuration.
pub(crate) struct RelayConfig {
    pub(crate) workflow: WorkflowConfig,
    pub(crate) redis_address: String,
    pub(crate) redis_password: Option<String>,
    pub(crate) inbound: InboundChannelNames,
    pub(crate) targets: QueueTargets,
    pub(crate) slack: SlackClientConfig,
    pub(crate) dry_run: bool,
}

fn required(value: Option<&str>, missing: ConfigError) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(missing)
}

fn ttl(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    parse_ttl_seconds(raw).ok_or_else(|| ConfigError::InvalidTtl {
        name,
        value: raw.to_string(),
    })
}

/// Parses whole seconds (`3600`) or a duration made of `h`, `m` and `s`
/// components (`48h`, `1h30m`, `90s`).
pub(crate) fn parse_ttl_seconds(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds);
    }
    let mut total = 0_u64;
    let mut digits = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch {
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        let amount = digits.parse::<u64>().ok()?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

impl RelayConfig {
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let bot_token = required(cli.slack_bot_token.as_deref(), ConfigError::MissingSlackToken)?;
        let github_org = required(cli.github_org.as_deref(), ConfigError::MissingGithubOrg)?;

        let mut workflow = WorkflowConfig::new(github_org);
        workflow.working_dir = cli.working_dir.clone();
        workflow.agent_working_dir = cli.agent_working_dir.clone();
        workflow.agent_model = cli.agent_model.clone();
        workflow.status_channel_id = cli.confirmation_channel_id.trim().to_string();
        workflow.history_search_limit = cli.confirmation_search_limit;
        workflow.status_ttl_seconds = ttl("CONFIRMATION_TTL", &cli.confirmation_ttl)?;
        workflow.closed_cleanup_ttl_seconds = ttl("CLOSED_CLEANUP_TTL", &cli.closed_cleanup_ttl)?;
        workflow.project_id = cli.project_id.clone();
        workflow.project_owner = cli.project_org.clone();
        workflow.automation_login = cli.automation_login.clone();
        workflow.automation_assignee = cli.automation_assignee.clone();
        workflow.emojis = ReactionEmojis {
            assign_trigger: cli.assign_emoji.clone(),
            sanitize_trigger: cli.sanitize_emoji.clone(),
            closed: cli.closed_emoji.clone(),
            assigned: cli.assigned_emoji.clone(),
            sanitized: cli.sanitized_emoji.clone(),
        };

        let mut slack = SlackClientConfig::new(bot_token);
        slack.api_base = cli.slack_api_base.clone();
        slack.request_timeout_ms = cli.slack_request_timeout_ms;
        slack.retry_max_attempts = cli.slack_retry_max_attempts;
        slack.retry_base_delay_ms = cli.slack_retry_base_delay_ms;
        slack.retry_max_delay_ms = cli.slack_retry_max_delay_ms;

        Ok(Self {
            workflow,
            redis_address: cli.redis_addr.clone(),
            redis_password: cli.redis_password.clone(),
            inbound: InboundChannelNames {
                slash_commands: cli.slash_command_channel.clone(),
                view_submissions: cli.view_submission_channel.clone(),
                worker_output: cli.worker_output_channel.clone(),
                reactions: cli.reaction_channel.clone(),
                message_actions: cli.message_action_channel.clone(),
                github_webhooks: cli.github_webhook_channel.clone(),
            },
            targets: QueueTargets {
                short_task_list: cli.short_task_list.clone(),
                long_task_list: cli.long_task_list.clone(),
                status_list: cli.status_list.clone(),
                reaction_list: cli.reaction_list.clone(),
                cleanup_channel: cli.cleanup_channel.clone(),
            },
            slack,
            dry_run: cli.dry_run,
        })
    }
}
