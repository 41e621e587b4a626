//! Slack Web API client for the issue form and status conversation reads.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use relay_workflow::{
    ChatSurface, IssueFormPrefill, MessageMetadata, TranscriptMessage, TranscriptSource,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::issue_modal::render_issue_modal;
use crate::retry::RetryPolicy;


pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub(crate) const RETRY_ATTEMPT_HEADER: &str = "x-relay-retry-attempt";
const HISTORY_PAGE_MAX: usize = 1_000;
const ERROR_BODY_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Connection settings for [`SlackApiClient`].
pub struct SlackClientConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    /// Longest wait between attempts; longer `Retry-After` hints fail the call.
    pub retry_max_delay_ms: u64,
}

impl SlackClientConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_SLACK_API_BASE.to_string(),
            bot_token: bot_token.into(),
            request_timeout_ms: 10_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SlackViewResponse {
    ok: bool,
    view: Option<SlackView>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackView {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackHistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackHistoryMessage>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackHistoryMessage {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    reactions: Vec<SlackReaction>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackReaction {
    name: String,
}

impl SlackHistoryMessage {
    /// Metadata that does not decode is treated as absent; a foreign app's
    /// message must not abort a whole history scan.
    fn into_transcript(self) -> TranscriptMessage {
        let metadata = self
            .metadata
            .and_then(|value| serde_json::from_value::<MessageMetadata>(value).ok());
        TranscriptMessage {
            ts: self.ts,
            text: self.text,
            metadata,
            reactions: self
                .reactions
                .into_iter()
                .map(|reaction| reaction.name)
                .collect(),
        }
    }
}

/// First line of an error body, shortened for logs.
fn body_excerpt(body: &str) -> String {
    let line = body.lines().map(str::trim).find(|line| !line.is_empty());
    let Some(line) = line else {
        return "<empty body>".to_string();
    };
    match line.char_indices().nth(ERROR_BODY_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

fn slack_failure(operation: &str, error: Option<String>) -> anyhow::Error {
    anyhow!(
        "slack {operation} failed: {}",
        error.unwrap_or_else(|| "unknown error".to_string())
    )
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry: RetryPolicy,
}

impl SlackApiClient {
    pub fn new(config: &SlackClientConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("issue-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
            retry: RetryPolicy::new(
                config.retry_max_attempts,
                config.retry_base_delay_ms,
                config.retry_max_delay_ms,
            ),
        })
    }

    pub async fn open_view(&self, trigger_id: &str, view: &Value) -> Result<String> {
        let payload = json!({"trigger_id": trigger_id, "view": view});
        let response: SlackViewResponse = self
            .request_json("views.open", || {
                self.http
                    .post(format!("{}/views.open", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        if !response.ok {
            return Err(slack_failure("views.open", response.error));
        }
        response
            .view
            .map(|view| view.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("slack views.open did not return a view id"))
    }

    pub async fn update_view(&self, view_id: &str, view: &Value) -> Result<()> {
        let payload = json!({"view_id": view_id, "view": view});
        let response: SlackViewResponse = self
            .request_json("views.update", || {
                self.http
                    .post(format!("{}/views.update", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        if !response.ok {
            return Err(slack_failure("views.update", response.error));
        }
        Ok(())
    }

    /// Reads channel history newest first. With `latest`, the page ends at
    /// (and includes) that timestamp.
    pub async fn conversation_history(
        &self,
        channel: &str,
        limit: usize,
        latest: Option<&str>,
    ) -> Result<Vec<TranscriptMessage>> {
        if channel.trim().is_empty() {
            bail!("slack conversations.history requires a channel id");
        }
        let mut query = vec![
            ("channel", channel.to_string()),
            ("limit", limit.clamp(1, HISTORY_PAGE_MAX).to_string()),
            ("include_all_metadata", "true".to_string()),
        ];
        if let Some(latest) = latest {
            query.push(("latest", latest.to_string()));
            query.push(("inclusive", "true".to_string()));
        }
        let response: SlackHistoryResponse = self
            .request_json("conversations.history", || {
                self.http
                    .get(format!("{}/conversations.history", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&query)
            })
            .await?;
        if !response.ok {
            return Err(slack_failure("conversations.history", response.error));
        }
        debug!(
            channel,
            count = response.messages.len(),
            "read slack conversation history"
        );
        Ok(response
            .messages
            .into_iter()
            .map(SlackHistoryMessage::into_transcript)
            .collect())
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(RETRY_ATTEMPT_HEADER, attempt.saturating_sub(1).to_string())
                .send()
                .await;
            let delay = match response {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<T>()
                        .await
                        .with_context(|| format!("failed to decode slack {operation}"));
                }
                Ok(response) => {
                    let status = response.status();
                    match self.retry.after_status(attempt, status, response.headers()) {
                        Some(delay) => delay,
                        None => {
                            let body = response.text().await.unwrap_or_default();
                            bail!(
                                "slack api {operation} failed with status {}: {}",
                                status.as_u16(),
                                body_excerpt(&body)
                            );
                        }
                    }
                }
                Err(error) => match self.retry.after_transport_error(attempt, &error) {
                    Some(delay) => delay,
                    None => {
                        return Err(error)
                            .with_context(|| format!("slack api {operation} request failed"));
                    }
                },
            };
            debug!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying slack api call"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ChatSurface for SlackApiClient {
    async fn open_issue_form(
        &self,
        trigger_id: &str,
        prefill: &IssueFormPrefill,
    ) -> Result<String> {
        self.open_view(trigger_id, &render_issue_modal(prefill)).await
    }

    async fn update_issue_form(&self, view_id: &str, prefill: &IssueFormPrefill) -> Result<()> {
        self.update_view(view_id, &render_issue_modal(prefill)).await
    }
}

#[async_trait]
impl TranscriptSource for SlackApiClient {
    async fn recent_messages(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<TranscriptMessage>> {
        let mut messages = self.conversation_history(channel, limit, None).await?;
        messages.truncate(limit);
        Ok(messages)
    }

    async fn message_at(&self, channel: &str, ts: &str) -> Result<Option<TranscriptMessage>> {
        let messages = self.conversation_history(channel, 1, Some(ts)).await?;
        Ok(messages.into_iter().find(|message| message.ts == ts))
    }
}
