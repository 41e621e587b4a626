//! Names of the pub/sub channels and lists the relay talks to.

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use relay_workflow::{InboundChannel, WorkQueue};

pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Inbound pub/sub channel names, one per [`InboundChannel`].
pub struct InboundChannelNames {
    pub slash_commands: String,
    pub view_submissions: String,
    pub worker_output: String,
    pub reactions: String,
    pub message_actions: String,
    pub github_webhooks: String,
}

impl Default for InboundChannelNames {
    fn default() -> Self {
        Self {
            slash_commands: "slack-commands".to_string(),
            view_submissions: "slack-relay-view-submission".to_string(),
            worker_output: "poppit:command-output".to_string(),
            reactions: "slack-relay-reaction-added".to_string(),
            message_actions: "slack-relay-message-action".to_string(),
            github_webhooks: "github-webhook-issues".to_string(),
        }
    }
}

impl InboundChannelNames {
    pub fn name(&self, channel: InboundChannel) -> &str {
        match channel {
            InboundChannel::SlashCommands => &self.slash_commands,
            InboundChannel::ViewSubmissions => &self.view_submissions,
            InboundChannel::WorkerOutput => &self.worker_output,
            InboundChannel::Reactions => &self.reactions,
            InboundChannel::MessageActions => &self.message_actions,
            InboundChannel::GithubWebhooks => &self.github_webhooks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outbound list and channel names.
pub struct QueueTargets {
    pub short_task_list: String,
    pub long_task_list: String,
    pub status_list: String,
    pub reaction_list: String,
    pub cleanup_channel: String,
}

impl Default for QueueTargets {
    fn default() -> Self {
        Self {
            short_task_list: "poppit:commands".to_string(),
            long_task_list: "poppit:long-commands".to_string(),
            status_list: "slack_messages".to_string(),
            reaction_list: "slack_reactions".to_string(),
            cleanup_channel: "timebomb-messages".to_string(),
        }
    }
}

impl QueueTargets {
    pub fn work_list(&self, queue: WorkQueue) -> &str {
        match queue {
            WorkQueue::Short => &self.short_task_list,
            WorkQueue::Long => &self.long_task_list,
        }
    }
}

/// Builds connection info from a `host:port` address (or a full `redis://`
/// url) and an optional password.
pub fn connection_info(
    address: &str,
    password: Option<&str>,
) -> redis::RedisResult<ConnectionInfo> {
    let address = address.trim();
    let password = password
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    if address.starts_with("redis://") || address.starts_with("rediss://") {
        let mut info = redis::IntoConnectionInfo::into_connection_info(address)?;
        if password.is_some() {
            info.redis.password = password;
        }
        return Ok(info);
    }
    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().unwrap_or(DEFAULT_REDIS_PORT)),
        None => (address, DEFAULT_REDIS_PORT),
    };
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host.to_string(), port),
        redis: RedisConnectionInfo {
            password,
            ..RedisConnectionInfo::default()
        },
    })
}
