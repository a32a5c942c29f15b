use crate::obfuscation::ObfuscatedStream;
use crate::socks::Destination;
use crate::tunnel::error::{ChannelError, Error};
use crate::tunnel::events::{EventListener, TunnelEvent};
use crate::tunnel::result::Result;
use crate::tunnel::types::{RelayConfig, RelayCredentials, ORIGINATOR_ADDRESS, ORIGINATOR_PORT};
use crate::tunnel::{ChannelIo, Tunnel};
use async_trait::async_trait;
use log;
use russh::client::{self, Handle};
use russh::Disconnect;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;

struct RelayHandler;

#[async_trait]
impl client::Handler for RelayHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh_keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        log::info!("Relay host key fingerprint: {}", server_public_key.fingerprint());
        Ok(true)
    }
}

/// Session to the relay over SSH, optionally carried inside an obfuscated
/// stream. Channels are `direct-tcpip` forwards.
pub struct SshTunnel {
    handle: Handle<RelayHandler>,
    closed: AtomicBool,
    listener: Arc<dyn EventListener>,
}

impl SshTunnel {
    /// Connects, handshakes and authenticates. `listener` is told
    /// [`TunnelEvent::Connected`] or [`TunnelEvent::Failed`].
    pub async fn connect(config: &RelayConfig, listener: Arc<dyn EventListener>) -> Result<Self> {
        log::info!("Connecting to relay \"{}\"", config.address());
        match establish(config).await {
            Ok(handle) => {
                listener.on_event(TunnelEvent::Connected);
                Ok(Self {
                    handle,
                    closed: AtomicBool::new(false),
                    listener,
                })
            }
            Err(e) => {
                log::error!("Relay session failed: {}", e);
                listener.on_event(TunnelEvent::Failed);
                Err(e)
            }
        }
    }
}

async fn establish(config: &RelayConfig) -> Result<Handle<RelayHandler>> {
    let stream = connect_relay(config).await?;
    let ssh_config = Arc::new(client::Config::default());

    let mut handle = match &config.obfuscation {
        Some(obfuscation) => {
            log::debug!(
                "Obfuscating relay transport (camouflage: {})",
                obfuscation.camouflage
            );
            let stream = ObfuscatedStream::connect(
                stream,
                obfuscation.keyword.as_deref(),
                obfuscation.camouflage,
            )
            .await?;
            client::connect_stream(ssh_config, stream, RelayHandler).await?
        }
        None => client::connect_stream(ssh_config, stream, RelayHandler).await?,
    };
    log::debug!("Session handshake with relay complete");

    authenticate(&mut handle, &config.credentials).await?;
    Ok(handle)
}

async fn connect_relay(config: &RelayConfig) -> Result<TcpStream> {
    let address = (config.host.as_str(), config.port);
    for attempt in 1..=config.connect_attempts.max(1) {
        match tokio::time::timeout(config.connect_timeout, TcpStream::connect(address)).await {
            Ok(stream) => {
                let stream = stream?;
                stream.set_nodelay(true)?;
                log::debug!("TCP connection to relay established");
                return Ok(stream);
            }
            Err(_) => log::warn!(
                "Connect attempt {} to \"{}\" timed out",
                attempt,
                config.address()
            ),
        }
    }
    Err(Error::ConnectTimeout(config.address()))
}

async fn authenticate(
    handle: &mut Handle<RelayHandler>,
    credentials: &RelayCredentials,
) -> Result<()> {
    let accepted = handle
        .authenticate_password(credentials.username.as_str(), credentials.password.as_str())
        .await?;
    if !accepted {
        return Err(Error::AuthenticationFailed(credentials.username.clone()));
    }
    log::info!("Authenticated to relay as \"{}\"", credentials.username);
    Ok(())
}

#[async_trait]
impl Tunnel for SshTunnel {
    type Channel = Pin<Box<dyn ChannelIo>>;

    async fn open_channel(
        &self,
        destination: &Destination,
    ) -> std::result::Result<Self::Channel, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::SessionClosed);
        }
        log::debug!("Opening channel to \"{}\"", destination);
        match self
            .handle
            .channel_open_direct_tcpip(
                destination.host(),
                destination.port as u32,
                ORIGINATOR_ADDRESS,
                ORIGINATOR_PORT,
            )
            .await
        {
            Ok(channel) => {
                let stream: Self::Channel = Box::pin(channel.into_stream());
                Ok(stream)
            }
            Err(russh::Error::ChannelOpenFailure(reason)) => {
                Err(ChannelError::Rejected(format!("{:?}", reason)))
            }
            Err(_) if self.handle.is_closed() => Err(ChannelError::SessionClosed),
            Err(e) => Err(ChannelError::Rejected(e.to_string())),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.handle.is_closed()
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            log::warn!("Relay disconnect failed: {}", e);
        }
        self.listener.on_event(TunnelEvent::Stopped);
        log::info!("Relay session closed");
    }
}
