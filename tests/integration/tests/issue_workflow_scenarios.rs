use std::sync::Arc;

use relay_workflow::memory::{MemoryChatSurface, MemoryInbound, MemoryOutbound, MemoryTranscript};
use relay_workflow::{
    run_listener, EventRouter, InboundChannel, StatusMessage, StepOutcome, TranscriptMessage,
    WorkItem, WorkKind, WorkQueue, WorkflowConfig, WorkflowState,
};
use serde_json::{json, Value};
use tokio::sync::watch;

const STATUS_CHANNEL: &str = "C-STATUS";

struct Relay {
    router: Arc<EventRouter>,
    outbound: Arc<MemoryOutbound>,
    transcript: Arc<MemoryTranscript>,
}

impl Relay {
    fn new() -> Self {
        let mut config = WorkflowConfig::new("org");
        config.status_channel_id = STATUS_CHANNEL.to_string();
        config.closed_cleanup_ttl_seconds = 600;
        let outbound = Arc::new(MemoryOutbound::default());
        let transcript = Arc::new(MemoryTranscript::default());
        let router = Arc::new(EventRouter::new(
            Arc::new(config),
            outbound.clone(),
            Arc::new(MemoryChatSurface::default()),
            transcript.clone(),
        ));
        Self {
            router,
            outbound,
            transcript,
        }
    }

    async fn send(&self, channel: InboundChannel, payload: Value) -> Option<StepOutcome> {
        self.router
            .route(channel, payload.to_string().as_bytes())
            .await
    }

    /// Plays the status relay: posted messages show up in the transcript,
    /// newest first, at increasing timestamps.
    fn publish_status_history(&self) {
        let messages = self
            .outbound
            .status_messages()
            .into_iter()
            .enumerate()
            .rev()
            .map(|(index, message): (usize, StatusMessage)| TranscriptMessage {
                ts: format!("{}.0001", 100 + index),
                text: message.text,
                metadata: message.metadata,
                reactions: Vec::new(),
            })
            .collect();
        self.transcript.set_history(STATUS_CHANNEL, messages);
    }
}

fn form_submission(repo: &str, title: &str, add_to_project: bool) -> Value {
    let project = if add_to_project {
        json!([{"value": "true"}])
    } else {
        json!([])
    };
    json!({
        "type": "view_submission",
        "view": {
            "callback_id": "create_github_issue_modal",
            "state": {"values": {
                "repo_selection_block": {"SlashVibeIssue": {"selected_option": {"value": repo}}},
                "title_block": {"issue_title": {"value": title}},
                "description_block": {"issue_description": {"value": null}},
                "assignment_block": {
                    "assign_copilot": {"selected_options": []},
                    "add_to_project": {"selected_options": project}
                }
            }}
        },
        "user": {"id": "U1", "username": "alice"}
    })
}

fn executor_output(item: &WorkItem, output: &str) -> Value {
    json!({
        "metadata": serde_json::to_value(&item.metadata).expect("metadata"),
        "type": item.kind.as_str(),
        "command": item.commands[0],
        "output": output
    })
}

fn reaction(emoji: &str, ts: &str) -> Value {
    json!({
        "event": {
            "type": "reaction_added",
            "user": "U2",
            "reaction": emoji,
            "item": {"type": "message", "channel": STATUS_CHANNEL, "ts": ts}
        }
    })
}

#[tokio::test]
async fn integration_form_submission_emits_single_escaped_create_item() {
    let relay = Relay::new();
    let outcome = relay
        .send(
            InboundChannel::ViewSubmissions,
            form_submission("org/repo", "Fix login bug", false),
        )
        .await;
    assert_eq!(outcome, Some(StepOutcome::Completed { effects: 1 }));

    let items = relay.outbound.work_items();
    assert_eq!(items.len(), 1);
    let (queue, item) = &items[0];
    assert_eq!(*queue, WorkQueue::Short);
    assert_eq!(
        serde_json::to_value(item).expect("wire shape"),
        json!({
            "repo": "org/repo",
            "branch": "refs/heads/main",
            "type": "slash-vibe-issue",
            "dir": "/tmp",
            "commands": ["gh issue create --repo 'org/repo' --title 'Fix login bug'"],
            "metadata": {
                "workflow_state": "submitted",
                "repo": "org/repo",
                "title": "Fix login bug",
                "username": "alice",
                "add_to_project": false,
                "assigned": false
            }
        })
    );
    assert!(relay
        .outbound
        .work_items()
        .iter()
        .all(|(_, item)| item.kind != WorkKind::AddToProject));
}

#[tokio::test]
async fn integration_reaction_on_message_without_metadata_emits_nothing() {
    let relay = Relay::new();
    relay.transcript.set_history(
        STATUS_CHANNEL,
        vec![TranscriptMessage {
            ts: "42.0001".to_string(),
            text: "lunch?".to_string(),
            metadata: None,
            reactions: Vec::new(),
        }],
    );
    let outcome = relay
        .send(InboundChannel::Reactions, reaction("sparkles", "42.0001"))
        .await;
    assert!(matches!(outcome, Some(StepOutcome::Skipped(_))));
    assert!(relay.outbound.records().is_empty());
}

#[tokio::test]
async fn integration_closed_webhook_reacts_once_and_schedules_cleanup() {
    let relay = Relay::new();
    relay
        .send(
            InboundChannel::ViewSubmissions,
            form_submission("org/repo", "Fix login bug", false),
        )
        .await;
    let (_, create) = relay.outbound.work_items().remove(0);
    relay
        .send(
            InboundChannel::WorkerOutput,
            executor_output(&create, "https://github.com/org/repo/issues/42\n"),
        )
        .await;
    relay.publish_status_history();

    let outcome = relay
        .send(
            InboundChannel::GithubWebhooks,
            json!({
                "action": "closed",
                "issue": {"url": "https://api.github.com/repos/org/repo/issues/42", "number": 42}
            }),
        )
        .await;
    assert_eq!(outcome, Some(StepOutcome::Completed { effects: 2 }));

    let reactions = relay.outbound.reactions();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].reaction, "cat2");
    assert_eq!(reactions[0].channel, STATUS_CHANNEL);
    let cleanups = relay.outbound.cleanups();
    assert_eq!(cleanups.len(), 1);
    assert_eq!(cleanups[0].ttl, 600);
    assert_eq!(cleanups[0].ts, reactions[0].ts);
}

#[tokio::test]
async fn integration_full_lifecycle_through_creation_assignment_and_sanitize_guard() {
    let relay = Relay::new();
    relay
        .send(
            InboundChannel::ViewSubmissions,
            form_submission("repo", "Fix 'login' bug", true),
        )
        .await;
    let (_, create) = relay.outbound.work_items().remove(0);
    assert_eq!(create.repo, "org/repo");

    let created = relay
        .send(
            InboundChannel::WorkerOutput,
            executor_output(
                &create,
                "Creating issue in org/repo\n\nhttps://github.com/org/repo/issues/7\n",
            ),
        )
        .await;
    assert_eq!(created, Some(StepOutcome::Completed { effects: 2 }));
    let status = relay.outbound.status_messages();
    assert_eq!(status.len(), 1);
    let announced = &status[0].metadata.as_ref().expect("metadata").event_payload;
    assert_eq!(announced.state(), Some(WorkflowState::Created));
    assert_eq!(announced.number("issue_number"), Some(7));
    relay.publish_status_history();

    let assign = relay
        .send(InboundChannel::Reactions, reaction("sparkles", "100.0001"))
        .await;
    assert_eq!(assign, Some(StepOutcome::Completed { effects: 1 }));
    let items = relay.outbound.work_items();
    let (_, assign_item) = items
        .iter()
        .find(|(_, item)| item.kind == WorkKind::AssignAgent)
        .expect("assign item");
    assert_eq!(
        assign_item.commands[0],
        "gh issue edit --add-assignee '@copilot' 'https://github.com/org/repo/issues/7'"
    );

    let webhook = relay
        .send(
            InboundChannel::GithubWebhooks,
            json!({
                "action": "assigned",
                "assignee": {"login": "Copilot"},
                "issue": {"html_url": "https://github.com/org/repo/issues/7", "number": 7}
            }),
        )
        .await;
    assert_eq!(webhook, Some(StepOutcome::Completed { effects: 1 }));
    let reactions = relay.outbound.reactions();
    assert_eq!(reactions.last().map(|r| r.reaction.as_str()), Some("robot_face"));

    // Slack now shows the assigned marker on the announcement.
    let announcement = relay.outbound.status_messages().remove(0);
    relay.transcript.set_history(
        STATUS_CHANNEL,
        vec![TranscriptMessage {
            ts: "100.0001".to_string(),
            text: announcement.text,
            metadata: announcement.metadata,
            reactions: vec!["robot_face".to_string()],
        }],
    );

    let before = relay.outbound.records().len();
    let sanitize = relay
        .send(InboundChannel::Reactions, reaction("soap", "100.0001"))
        .await;
    assert!(matches!(sanitize, Some(StepOutcome::Skipped(_))));
    assert_eq!(relay.outbound.records().len(), before);
}

#[tokio::test]
async fn integration_listener_preserves_order_and_drops_garbage() {
    let relay = Relay::new();
    let (sender, source) = MemoryInbound::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    for title in ["one", "two"] {
        sender
            .send(
                form_submission("org/repo", title, false)
                    .to_string()
                    .into_bytes(),
            )
            .await
            .expect("send");
    }
    sender.send(b"not json".to_vec()).await.expect("send");
    sender
        .send(
            json!({"view": {"callback_id": "someone_elses_modal"}})
                .to_string()
                .into_bytes(),
        )
        .await
        .expect("send");
    drop(sender);

    let report = run_listener(
        InboundChannel::ViewSubmissions,
        source,
        relay.router.clone(),
        shutdown_rx,
    )
    .await;
    assert_eq!(report.received, 4);
    assert_eq!(report.completed, 2);
    assert_eq!(report.dropped, 2);
    let titles = relay
        .outbound
        .work_items()
        .into_iter()
        .filter_map(|(_, item)| item.metadata.optional_str("title").map(str::to_string))
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["one", "two"]);
}
