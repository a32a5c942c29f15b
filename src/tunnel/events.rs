use derive_more::Display;

/// Session state transitions reported to whoever drives reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TunnelEvent {
    Connected,
    Failed,
    Stopped,
}

pub trait EventListener: Send + Sync {
    fn on_event(&self, event: TunnelEvent);
}

/// Listener that only writes transitions to the log.
pub struct LogListener;

impl EventListener for LogListener {
    fn on_event(&self, event: TunnelEvent) {
        match event {
            TunnelEvent::Failed => log::error!("Tunnel state: {}", event),
            _ => log::info!("Tunnel state: {}", event),
        }
    }
}
