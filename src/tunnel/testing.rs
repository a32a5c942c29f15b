use crate::socks::{Address, Destination};
use crate::tunnel::{ChannelError, Tunnel};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::io::DuplexStream;

pub(crate) const REJECTED_HOST: &str = "rejected.example";
pub(crate) const FATAL_HOST: &str = "fatal.example";

/// Tunnel whose channels echo back whatever is written to them.
///
/// The first `not_ready` opens report [`ChannelError::NotReady`]; `u32::MAX`
/// never becomes ready. [`REJECTED_HOST`] is always refused and
/// [`FATAL_HOST`] kills the session.
#[derive(Default)]
pub(crate) struct EchoTunnel {
    not_ready: AtomicU32,
    opened: AtomicU32,
    closed: AtomicBool,
}

impl EchoTunnel {
    pub(crate) fn with_not_ready(not_ready: u32) -> Self {
        Self {
            not_ready: AtomicU32::new(not_ready),
            ..Default::default()
        }
    }

    pub(crate) fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn kill(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Tunnel for EchoTunnel {
    type Channel = DuplexStream;

    async fn open_channel(
        &self,
        destination: &Destination,
    ) -> std::result::Result<DuplexStream, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::SessionClosed);
        }
        if let Address::Domain(host) = &destination.address {
            match host.as_str() {
                REJECTED_HOST => return Err(ChannelError::Rejected("prohibited".to_string())),
                FATAL_HOST => {
                    self.kill();
                    return Err(ChannelError::SessionClosed);
                }
                _ => {}
            }
        }
        let pending = self.not_ready.load(Ordering::SeqCst);
        if pending > 0 {
            if pending != u32::MAX {
                self.not_ready.store(pending - 1, Ordering::SeqCst);
            }
            return Err(ChannelError::NotReady);
        }

        let (local, remote) = tokio::io::duplex(8 * 1024);
        tokio::spawn(async move {
            let (mut reader, mut writer) = tokio::io::split(remote);
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(local)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.kill();
    }
}
