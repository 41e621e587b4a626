//! Redis-backed outbound sink and inbound subscriptions.

use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use redis::aio::MultiplexedConnection;
use relay_workflow::{
    CleanupSignal, InboundSource, OutboundSink, ReactionRequest, StatusMessage, WorkItem,
    WorkQueue,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::targets::QueueTargets;

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    serde_json::to_vec(value).with_context(|| format!("failed to encode {what}"))
}

#[derive(Clone)]
/// Pushes work, status and reaction records onto lists; publishes cleanups.
pub struct RedisTransport {
    connection: MultiplexedConnection,
    targets: QueueTargets,
}

impl RedisTransport {
    pub async fn connect(client: &redis::Client, targets: QueueTargets) -> Result<Self> {
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to redis")?;
        Ok(Self {
            connection,
            targets,
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let mut connection = self.connection.clone();
        let reply: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .context("redis ping failed")?;
        debug!(reply = %reply, "redis ping");
        Ok(())
    }

    async fn push(&self, list: &str, payload: Vec<u8>) -> Result<()> {
        let mut connection = self.connection.clone();
        let length: i64 = redis::cmd("RPUSH")
            .arg(list)
            .arg(payload)
            .query_async(&mut connection)
            .await
            .with_context(|| format!("failed to push to redis list {list}"))?;
        debug!(list, length, "pushed redis list item");
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<()> {
        let mut connection = self.connection.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut connection)
            .await
            .with_context(|| format!("failed to publish to redis channel {channel}"))?;
        debug!(channel, receivers, "published redis message");
        Ok(())
    }
}

#[async_trait]
impl OutboundSink for RedisTransport {
    async fn submit_work(&self, queue: WorkQueue, item: &WorkItem) -> Result<()> {
        let list = self.targets.work_list(queue);
        self.push(list, encode(item, "work item")?).await?;
        info!(list, kind = item.kind.as_str(), repo = %item.repo, "work item submitted");
        Ok(())
    }

    async fn post_status(&self, message: &StatusMessage) -> Result<()> {
        self.push(&self.targets.status_list, encode(message, "status message")?)
            .await
    }

    async fn request_reaction(&self, reaction: &ReactionRequest) -> Result<()> {
        self.push(&self.targets.reaction_list, encode(reaction, "reaction request")?)
            .await
    }

    async fn schedule_cleanup(&self, signal: &CleanupSignal) -> Result<()> {
        self.publish(&self.targets.cleanup_channel, encode(signal, "cleanup signal")?)
            .await
    }
}

type MessageStream = Pin<Box<dyn Stream<Item = redis::Msg> + Send>>;

const RESUBSCRIBE_BASE_DELAY: Duration = Duration::from_millis(500);
const RESUBSCRIBE_MAX_DELAY: Duration = Duration::from_secs(30);

fn next_resubscribe_delay(current: Duration) -> Duration {
    current.saturating_mul(2).min(RESUBSCRIBE_MAX_DELAY)
}

async fn open_stream(client: &redis::Client, channel_name: &str) -> Result<MessageStream> {
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .context("failed to open redis pub/sub connection")?;
    pubsub
        .subscribe(channel_name)
        .await
        .with_context(|| format!("failed to subscribe to redis channel {channel_name}"))?;
    Ok(Box::pin(pubsub.into_on_message()))
}

/// One pub/sub subscription feeding a listener.
///
/// The message stream ends when the pub/sub connection drops; the
/// subscription is then re-established with backoff. Messages published
/// while disconnected are lost, as pub/sub keeps no backlog.
pub struct RedisSubscription {
    client: redis::Client,
    channel_name: String,
    messages: MessageStream,
}

impl RedisSubscription {
    pub async fn subscribe(client: &redis::Client, channel_name: &str) -> Result<Self> {
        let messages = open_stream(client, channel_name).await?;
        info!(channel = channel_name, "subscribed to redis channel");
        Ok(Self {
            client: client.clone(),
            channel_name: channel_name.to_string(),
            messages,
        })
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    async fn resubscribe(&mut self) {
        let mut delay = RESUBSCRIBE_BASE_DELAY;
        loop {
            tokio::time::sleep(delay).await;
            match open_stream(&self.client, &self.channel_name).await {
                Ok(messages) => {
                    self.messages = messages;
                    info!(channel = %self.channel_name, "resubscribed to redis channel");
                    return;
                }
                Err(error) => {
                    delay = next_resubscribe_delay(delay);
                    warn!(
                        channel = %self.channel_name,
                        error = %format!("{error:#}"),
                        retry_in_ms = delay.as_millis() as u64,
                        "redis resubscribe failed"
                    );
                }
            }
        }
    }
}

#[async_trait]
impl InboundSource for RedisSubscription {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(message) = self.messages.next().await {
                return Ok(Some(message.get_payload_bytes().to_vec()));
            }
            warn!(channel = %self.channel_name, "redis subscription dropped; resubscribing");
            self.resubscribe().await;
        }
    }
}
