use crate::socks::Destination;
use std::time::Duration;

pub const DEFAULT_MAX_CONNECTIONS: usize = 64;
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

pub type SlotId = usize;

#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Connection table capacity.
    pub max_connections: usize,
    /// Largest chunk moved in one read.
    pub buffer_size: usize,
    pub handshake_timeout: Duration,
    /// Extra attempts made while the session reports "not ready".
    pub channel_open_retries: u32,
    pub channel_retry_delay: Duration,
    /// How often the session is checked for being closed.
    pub health_interval: Duration,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            handshake_timeout: Duration::from_secs(10),
            channel_open_retries: 100,
            channel_retry_delay: Duration::from_millis(10),
            health_interval: Duration::from_millis(200),
        }
    }
}

/// Progress a slot task reports back to the accept loop.
#[derive(Debug)]
pub(crate) enum SlotEvent {
    /// Sent by the task holding `slot` once its channel is open.
    Forwarding {
        slot: SlotId,
        task: tokio::task::Id,
        destination: Destination,
    },
}
