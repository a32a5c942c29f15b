//! Accepts local SOCKS clients and binds each one to a channel of the session.
//!
//! One loop owns the listener and the [`SlotTable`]. Every accepted client
//! gets a slot and a task that runs the SOCKS handshake, opens the channel
//! and forwards until either side closes; the slot is emptied when its task
//! ends.

mod error;
mod forward;
mod result;
mod slots;
mod types;

use crate::socks::{self, Destination};
use crate::tunnel::Tunnel;
pub use error::Error;
pub use forward::forward;
use log;
pub use result::Result;
pub use slots::{Slot, SlotTable};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use types::SlotEvent;
pub use types::{MuxConfig, SlotId, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CONNECTIONS};

type SlotOutcome = (SlotId, Result<()>);

pub struct Multiplexer<T: Tunnel> {
    listener: TcpListener,
    tunnel: Arc<T>,
    config: MuxConfig,
    slots: SlotTable,
}

impl<T: Tunnel> Multiplexer<T> {
    pub async fn bind(address: SocketAddr, tunnel: Arc<T>, config: MuxConfig) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        log::info!("Listening for SOCKS clients on \"{}\"", listener.local_addr()?);
        Ok(Self::new(listener, tunnel, config))
    }

    pub fn new(listener: TcpListener, tunnel: Arc<T>, config: MuxConfig) -> Self {
        let slots = SlotTable::new(config.max_connections);
        Self {
            listener,
            tunnel,
            config,
            slots,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves clients until `shutdown` completes (`Ok`) or the session dies
    /// (`Err`). All slots are torn down before returning either way.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut tasks: JoinSet<SlotOutcome> = JoinSet::new();
        let mut health = tokio::time::interval(self.config.health_interval);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutting down multiplexer");
                    break Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => self.admit(socket, peer, &mut tasks, &events_tx),
                    Err(e) => log::warn!("Could not accept connection: {}", e),
                },
                Some(event) = events.recv() => self.apply(event),
                Some(joined) = tasks.join_next() => {
                    if let Err(e) = self.finish(joined) {
                        break Err(e);
                    }
                }
                _ = health.tick() => {
                    if self.tunnel.is_closed() {
                        log::error!("Relay session is closed");
                        break Err(Error::SessionLost);
                    }
                }
            }
        };

        log::debug!("Closing {} active slots", self.slots.occupied());
        tasks.shutdown().await;
        self.slots.clear();
        outcome
    }

    fn admit(
        &mut self,
        socket: TcpStream,
        peer: SocketAddr,
        tasks: &mut JoinSet<SlotOutcome>,
        events: &mpsc::UnboundedSender<SlotEvent>,
    ) {
        let Some(slot) = self.slots.free_slot() else {
            log::warn!(
                "All {} slots busy, rejecting \"{}\"",
                self.slots.capacity(),
                peer
            );
            return;
        };
        log::debug!("Accepted \"{}\" into slot {}", peer, slot);

        let worker = SlotWorker {
            slot,
            tunnel: self.tunnel.clone(),
            config: self.config.clone(),
            events: events.clone(),
        };
        let task = tasks.spawn(async move { (slot, worker.serve(socket).await) });
        self.slots.occupy(slot, peer, task);
    }

    fn apply(&mut self, event: SlotEvent) {
        match event {
            SlotEvent::Forwarding {
                slot,
                task,
                destination,
            } => {
                let description = destination.to_string();
                if self.slots.mark_forwarding(slot, task, destination) {
                    log::info!("Slot {} forwarding to \"{}\"", slot, description);
                } else {
                    log::debug!("Dropped stale forwarding event of slot {}", slot);
                }
            }
        }
    }

    fn finish(&mut self, joined: std::result::Result<SlotOutcome, JoinError>) -> Result<()> {
        match joined {
            Ok((slot, outcome)) => {
                self.slots.release(slot);
                match outcome {
                    Ok(()) => log::debug!("Slot {} closed", slot),
                    Err(e) if e.is_fatal() => {
                        log::error!("Slot {} hit a session failure: {}", slot, e);
                        return Err(e);
                    }
                    Err(e) => log::warn!("Slot {} failed: {}", slot, e),
                }
            }
            Err(e) => {
                log::error!("Slot task ended abnormally: {}", e);
                self.slots.sweep_finished();
            }
        }
        Ok(())
    }
}

/// Everything one slot task needs; owns its client socket and channel.
struct SlotWorker<T: Tunnel> {
    slot: SlotId,
    tunnel: Arc<T>,
    config: MuxConfig,
    events: mpsc::UnboundedSender<SlotEvent>,
}

impl<T: Tunnel> SlotWorker<T> {
    async fn serve(self, mut socket: TcpStream) -> Result<()> {
        socket.set_nodelay(true)?;
        let request = tokio::time::timeout(
            self.config.handshake_timeout,
            socks::read_destination(&mut socket),
        )
        .await
        .map_err(|_| Error::HandshakeTimeout(self.config.handshake_timeout))??;
        let (destination, pending) = request;

        let mut channel = self.open_channel(&destination).await?;
        if !pending.is_empty() {
            channel.write_all(&pending).await?;
            channel.flush().await?;
        }
        // the loop may already be gone during shutdown
        let _ = self.events.send(SlotEvent::Forwarding {
            slot: self.slot,
            task: tokio::task::id(),
            destination,
        });
        forward(socket, channel, self.config.buffer_size).await
    }

    /// Retries only while the session reports a transient condition.
    async fn open_channel(&self, destination: &Destination) -> Result<T::Channel> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.tunnel.open_channel(destination).await {
                Ok(channel) => return Ok(channel),
                Err(e) if e.is_transient() && attempts <= self.config.channel_open_retries => {
                    log::trace!("Session not ready for \"{}\", attempt {}", destination, attempts);
                    tokio::time::sleep(self.config.channel_retry_delay).await;
                }
                Err(e) if e.is_transient() => return Err(Error::ChannelNotReady(attempts)),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
