//! Authenticated session to the relay and the channels it carries.

mod error;
mod events;
mod result;
mod ssh;
mod types;

#[cfg(test)]
pub(crate) mod testing;

use crate::socks::Destination;
use async_trait::async_trait;
pub use error::{ChannelError, Error};
pub use events::{EventListener, LogListener, TunnelEvent};
pub use result::Result;
pub use ssh::SshTunnel;
use tokio::io::{AsyncRead, AsyncWrite};
pub use types::{
    ObfuscationConfig, RelayConfig, RelayCredentials, DEFAULT_CONNECT_ATTEMPTS,
    DEFAULT_CONNECT_TIMEOUT,
};

/// Byte stream of one channel.
pub trait ChannelIo: AsyncRead + AsyncWrite + Send {}

impl<T: AsyncRead + AsyncWrite + Send> ChannelIo for T {}

/// Session able to open channels to destinations on the relay side.
#[async_trait]
pub trait Tunnel: Send + Sync + 'static {
    type Channel: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn open_channel(
        &self,
        destination: &Destination,
    ) -> std::result::Result<Self::Channel, ChannelError>;

    fn is_closed(&self) -> bool;

    /// Disconnects the session. Calling it again does nothing.
    async fn close(&self);
}
