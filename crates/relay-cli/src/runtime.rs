use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use relay_queue::{connection_info, RedisSubscription, RedisTransport};
use relay_slack::SlackApiClient;
use relay_workflow::{EventRouter, InboundChannel, ListenerSet, OutboundSink};
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::dry_run::DryRunOutbound;

pub(crate) async fn run(config: RelayConfig) -> Result<()> {
    let info = connection_info(&config.redis_address, config.redis_password.as_deref())
        .context("invalid redis address")?;
    let client = redis::Client::open(info).context("failed to create redis client")?;
    let transport = RedisTransport::connect(&client, config.targets.clone()).await?;
    transport.ping().await?;
    info!(address = %config.redis_address, "connected to redis");

    let outbound: Arc<dyn OutboundSink> = if config.dry_run {
        info!("dry run: outbound items are logged, not pushed");
        Arc::new(DryRunOutbound::default())
    } else {
        Arc::new(transport)
    };
    let slack = Arc::new(SlackApiClient::new(&config.slack)?);
    let router = Arc::new(EventRouter::new(
        Arc::new(config.workflow.clone()),
        outbound,
        slack.clone(),
        slack,
    ));

    let stop = shutdown_signal()?;
    let mut listeners = ListenerSet::new();
    for channel in InboundChannel::ALL {
        let subscription =
            RedisSubscription::subscribe(&client, config.inbound.name(channel)).await?;
        listeners.spawn(channel, subscription, router.clone());
    }
    info!(listeners = listeners.len(), "issue relay running");

    let reports = listeners.run_until(stop).await?;
    info!(listeners = reports.len(), "issue relay stopped");
    Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    Ok(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    warn!(error = %error, "failed to listen for ctrl-c");
                }
            }
            _ = terminate.recv() => {}
        }
        info!("shutdown requested; waiting for listeners");
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for ctrl-c");
        }
        info!("shutdown requested; waiting for listeners");
    })
}
