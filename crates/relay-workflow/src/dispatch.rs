//! Per-channel listener loops.
//!
//! Each inbound channel gets one sequential loop; payloads on a channel are
//! routed strictly in arrival order. Cancellation is observed between
//! receives, so a payload already being routed always finishes.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::classifier::InboundChannel;
use crate::router::EventRouter;
use crate::workflow_handlers::StepOutcome;

#[async_trait]
/// Source of raw payloads for one channel. `Ok(None)` means the source closed.
pub trait InboundSource: Send {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Counters reported by a listener when it stops.
pub struct ListenerReport {
    pub channel: InboundChannel,
    pub received: usize,
    pub completed: usize,
    pub skipped: usize,
    pub dropped: usize,
}

impl ListenerReport {
    fn new(channel: InboundChannel) -> Self {
        Self {
            channel,
            received: 0,
            completed: 0,
            skipped: 0,
            dropped: 0,
        }
    }

    fn record(&mut self, outcome: Option<&StepOutcome>) {
        self.received += 1;
        match outcome {
            Some(StepOutcome::Completed { .. }) => self.completed += 1,
            Some(StepOutcome::Skipped(_)) => self.skipped += 1,
            None => self.dropped += 1,
        }
    }
}

pub async fn run_listener<S>(
    channel: InboundChannel,
    mut source: S,
    router: Arc<EventRouter>,
    mut shutdown: watch::Receiver<bool>,
) -> ListenerReport
where
    S: InboundSource,
{
    let mut report = ListenerReport::new(channel);
    info!(channel = channel.as_str(), "listener started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = source.next_payload() => next,
        };
        let payload = match next {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!(channel = channel.as_str(), "inbound source closed");
                break;
            }
            Err(error) => {
                warn!(
                    channel = channel.as_str(),
                    error = %format!("{error:#}"),
                    "inbound source failed"
                );
                break;
            }
        };
        let outcome = router.route(channel, &payload).await;
        report.record(outcome.as_ref());
    }
    info!(
        channel = channel.as_str(),
        received = report.received,
        completed = report.completed,
        skipped = report.skipped,
        dropped = report.dropped,
        "listener stopped"
    );
    report
}

/// Listener tasks sharing one cancellation signal.
///
/// Listeners are expected to run until cancelled. One that returns earlier
/// (its source closed or failed) leaves its channel unserved, so
/// [`ListenerSet::run_until`] treats that as fatal for the whole set.
pub struct ListenerSet {
    tasks: JoinSet<ListenerReport>,
    shutdown: watch::Sender<bool>,
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerSet {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            tasks: JoinSet::new(),
            shutdown,
        }
    }

    pub fn spawn<S>(&mut self, channel: InboundChannel, source: S, router: Arc<EventRouter>)
    where
        S: InboundSource + 'static,
    {
        let shutdown = self.shutdown.subscribe();
        self.tasks.spawn(run_listener(channel, source, router, shutdown));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs until `stop` resolves, then cancels every listener and returns
    /// their reports. If a listener ends first, the rest are cancelled and
    /// an error naming its channel is returned.
    pub async fn run_until<F>(mut self, stop: F) -> Result<Vec<ListenerReport>>
    where
        F: Future<Output = ()>,
    {
        let premature = if self.tasks.is_empty() {
            stop.await;
            None
        } else {
            tokio::select! {
                () = stop => None,
                joined = self.tasks.join_next() => joined,
            }
        };

        self.shutdown.send_replace(true);
        let mut reports = Vec::with_capacity(self.tasks.len() + 1);
        let failure = premature.map(|joined| match joined {
            Ok(report) => {
                warn!(channel = report.channel.as_str(), "listener stopped before shutdown");
                reports.push(report);
                anyhow!("{} listener stopped before shutdown", report.channel.as_str())
            }
            Err(error) => anyhow!("listener task failed: {error}"),
        });
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(error) => warn!(error = %error, "listener task failed"),
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(reports),
        }
    }
}
