use log;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

mod error;
pub mod mux;
pub mod obfuscation;
pub mod socks;
pub mod socks4;
pub mod socks5;
pub mod tunnel;

pub use self::error::{Error, Result};
use mux::{Multiplexer, MuxConfig};
use tunnel::{LogListener, RelayConfig, SshTunnel, Tunnel};

#[derive(Debug)]
pub struct ExecuteConfig {
    pub listen_address: SocketAddr,
    pub relay: RelayConfig,
    pub mux: MuxConfig,
}

impl ExecuteConfig {
    pub fn new(listen_address: SocketAddr, relay: RelayConfig) -> Self {
        Self {
            listen_address,
            relay,
            mux: MuxConfig::default(),
        }
    }
}

/// Binds the SOCKS listener, brings up the relay session and serves clients
/// until Ctrl-C or until the session fails.
pub async fn run(cfg: ExecuteConfig) -> Result<()> {
    log::info!("Starting proxy on \"{}\"", cfg.listen_address);
    let listener = TcpListener::bind(cfg.listen_address).await?;

    let tunnel = Arc::new(SshTunnel::connect(&cfg.relay, Arc::new(LogListener)).await?);
    let result = run_with_listener(listener, tunnel.clone(), cfg.mux, shutdown_signal()).await;
    tunnel.close().await;
    result
}

/// Serves SOCKS clients from `listener` over an already established session.
pub async fn run_with_listener<T, F>(
    listener: TcpListener,
    tunnel: Arc<T>,
    config: MuxConfig,
    shutdown: F,
) -> Result<()>
where
    T: Tunnel,
    F: Future<Output = ()>,
{
    log::debug!("Waiting for connections");
    Multiplexer::new(listener, tunnel, config)
        .run(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
