use crate::tunnel::ChannelError;
use derive_more::{Display, From};
use std::time::Duration;

#[derive(Debug, From, Display)]
pub enum Error {
    #[from]
    Socks(crate::socks::Error),

    #[from]
    Channel(ChannelError),

    #[display("SOCKS handshake not finished within {_0:?}")]
    HandshakeTimeout(Duration),

    #[display("channel still not ready after {_0} attempts")]
    ChannelNotReady(u32),

    #[display("relay session lost")]
    SessionLost,

    #[from]
    IO(std::io::Error),
}

impl Error {
    /// Whether the error concerns the whole session rather than one slot.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Channel(e) => e.is_fatal(),
            Error::SessionLost => true,
            _ => false,
        }
    }
}

impl std::error::Error for Error {}
