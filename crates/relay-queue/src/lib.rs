//! Redis transport for the issue relay: six inbound pub/sub subscriptions
//! and the outbound task, status, reaction and cleanup queues.

mod redis_transport;
mod targets;

pub use redis_transport::{RedisSubscription, RedisTransport};
pub use targets::{connection_info, InboundChannelNames, QueueTargets, DEFAULT_REDIS_PORT};
