use clap::Parser;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "issue-relay",
    about = "Relays Slack issue requests to the shell executor and follows each issue through GitHub",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "redis-addr",
        env = "REDIS_ADDR",
        default_value = "host.docker.internal:6379",
        help = "Redis address as host:port or a redis:// url"
    )]
    pub(crate) redis_addr: String,

    #[arg(
        long = "redis-password",
        env = "REDIS_PASSWORD",
        hide_env_values = true,
        help = "Redis password"
    )]
    pub(crate) redis_password: Option<String>,

    #[arg(
        long = "redis-channel",
        env = "REDIS_CHANNEL",
        default_value = "slack-commands",
        help = "Pub/sub channel carrying slash commands"
    )]
    pub(crate) slash_command_channel: String,

    #[arg(
        long = "redis-view-submission-channel",
        env = "REDIS_VIEW_SUBMISSION_CHANNEL",
        default_value = "slack-relay-view-submission"
    )]
    pub(crate) view_submission_channel: String,

    #[arg(
        long = "redis-poppit-output-channel",
        env = "REDIS_POPPIT_OUTPUT_CHANNEL",
        default_value = "poppit:command-output",
        help = "Pub/sub channel carrying executor output"
    )]
    pub(crate) worker_output_channel: String,

    #[arg(
        long = "redis-reaction-channel",
        env = "REDIS_REACTION_CHANNEL",
        default_value = "slack-relay-reaction-added"
    )]
    pub(crate) reaction_channel: String,

    #[arg(
        long = "redis-message-action-channel",
        env = "REDIS_MESSAGE_ACTION_CHANNEL",
        default_value = "slack-relay-message-action"
    )]
    pub(crate) message_action_channel: String,

    #[arg(
        long = "redis-github-webhook-channel",
        env = "REDIS_GITHUB_WEBHOOK_CHANNEL",
        default_value = "github-webhook-issues"
    )]
    pub(crate) github_webhook_channel: String,

    #[arg(
        long = "redis-poppit-list",
        env = "REDIS_POPPIT_LIST",
        default_value = "poppit:commands",
        help = "List receiving short executor tasks"
    )]
    pub(crate) short_task_list: String,

    #[arg(
        long = "redis-poppit-long-list",
        env = "REDIS_POPPIT_LONG_LIST",
        default_value = "poppit:long-commands",
        help = "List receiving long-running agent tasks"
    )]
    pub(crate) long_task_list: String,

    #[arg(
        long = "redis-slackliner-list",
        env = "REDIS_SLACKLINER_LIST",
        default_value = "slack_messages",
        help = "List receiving status messages"
    )]
    pub(crate) status_list: String,

    #[arg(
        long = "redis-slack-reactions-list",
        env = "REDIS_SLACK_REACTIONS_LIST",
        default_value = "slack_reactions"
    )]
    pub(crate) reaction_list: String,

    #[arg(
        long = "redis-timebomb-channel",
        env = "REDIS_TIMEBOMB_CHANNEL",
        default_value = "timebomb-messages",
        help = "Pub/sub channel receiving deferred message cleanups"
    )]
    pub(crate) cleanup_channel: String,

    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub(crate) slack_bot_token: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub(crate) slack_api_base: String,

    #[arg(
        long = "slack-request-timeout-ms",
        env = "SLACK_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64
    )]
    pub(crate) slack_request_timeout_ms: u64,

    #[arg(
        long = "slack-retry-max-attempts",
        env = "SLACK_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize
    )]
    pub(crate) slack_retry_max_attempts: usize,

    #[arg(
        long = "slack-retry-base-delay-ms",
        env = "SLACK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64
    )]
    pub(crate) slack_retry_base_delay_ms: u64,

    #[arg(
        long = "slack-retry-max-delay-ms",
        env = "SLACK_RETRY_MAX_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Longest wait between Slack retries; longer Retry-After hints fail the call"
    )]
    pub(crate) slack_retry_max_delay_ms: u64,

    #[arg(
        long = "github-org",
        env = "GITHUB_ORG",
        help = "Organization used to qualify bare repository names"
    )]
    pub(crate) github_org: Option<String>,

    #[arg(long = "working-dir", env = "WORKING_DIR", default_value = "/tmp")]
    pub(crate) working_dir: String,

    #[arg(
        long = "agent-working-dir",
        env = "AGENT_WORKING_DIR",
        default_value = "/tmp/agent"
    )]
    pub(crate) agent_working_dir: String,

    #[arg(long = "agent-model", env = "AGENT_MODEL", default_value = "gpt-4.1")]
    pub(crate) agent_model: String,

    #[arg(
        long = "confirmation-channel-id",
        env = "CONFIRMATION_CHANNEL_ID",
        default_value = "",
        help = "Status conversation that receives issue announcements"
    )]
    pub(crate) confirmation_channel_id: String,

    #[arg(
        long = "confirmation-ttl",
        env = "CONFIRMATION_TTL",
        default_value = "48h",
        help = "Lifetime of status messages, as seconds or a duration such as 48h"
    )]
    pub(crate) confirmation_ttl: String,

    #[arg(
        long = "closed-cleanup-ttl",
        env = "CLOSED_CLEANUP_TTL",
        default_value = "24h",
        help = "Delay before a closed issue's announcement is removed"
    )]
    pub(crate) closed_cleanup_ttl: String,

    #[arg(
        long = "confirmation-search-limit",
        env = "CONFIRMATION_SEARCH_LIMIT",
        default_value_t = 100,
        value_parser = parse_positive_usize,
        help = "How many recent status messages a reverse lookup scans"
    )]
    pub(crate) confirmation_search_limit: usize,

    #[arg(long = "project-id", env = "PROJECT_ID", default_value = "1")]
    pub(crate) project_id: String,

    #[arg(
        long = "project-org",
        env = "PROJECT_ORG",
        default_value = "its-the-vibe"
    )]
    pub(crate) project_org: String,

    #[arg(
        long = "automation-login",
        env = "AUTOMATION_LOGIN",
        default_value = "Copilot",
        help = "Login reported by assignment webhooks for the coding agent"
    )]
    pub(crate) automation_login: String,

    #[arg(
        long = "automation-assignee",
        env = "AUTOMATION_ASSIGNEE",
        default_value = "@copilot"
    )]
    pub(crate) automation_assignee: String,

    #[arg(
        long = "assign-emoji",
        env = "ASSIGN_EMOJI",
        default_value = "sparkles"
    )]
    pub(crate) assign_emoji: String,

    #[arg(
        long = "sanitize-emoji",
        env = "SANITIZE_EMOJI",
        default_value = "soap"
    )]
    pub(crate) sanitize_emoji: String,

    #[arg(long = "closed-emoji", env = "CLOSED_EMOJI", default_value = "cat2")]
    pub(crate) closed_emoji: String,

    #[arg(
        long = "assigned-emoji",
        env = "ASSIGNED_EMOJI",
        default_value = "robot_face"
    )]
    pub(crate) assigned_emoji: String,

    #[arg(
        long = "sanitized-emoji",
        env = "SANITIZED_EMOJI",
        default_value = "white_check_mark"
    )]
    pub(crate) sanitized_emoji: String,

    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    pub(crate) log_level: String,

    #[arg(
        long = "dry-run",
        env = "RELAY_DRY_RUN",
        default_value_t = false,
        help = "Log outbound queue items instead of pushing them"
    )]
    pub(crate) dry_run: bool,
}
