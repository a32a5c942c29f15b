use derive_more::{Display, From};

#[derive(Debug, From, Display)]
pub enum Error {
    #[display("could not reach relay \"{_0}\" within the connect timeout")]
    ConnectTimeout(String),

    #[display("relay rejected credentials for user \"{_0}\"")]
    AuthenticationFailed(String),

    #[display("credentials file has no \"user:password\" line")]
    NoCredentials,

    #[from]
    Obfuscation(crate::obfuscation::Error),

    #[from]
    Ssh(russh::Error),

    #[from]
    IO(std::io::Error),
}

impl std::error::Error for Error {}

/// Why a channel to a destination could not be opened.
#[derive(Debug, Display)]
pub enum ChannelError {
    /// The session cannot take the request right now; trying again may work.
    #[display("session not ready")]
    NotReady,

    /// The relay refused this one destination.
    #[display("channel rejected: {_0}")]
    Rejected(String),

    /// The session itself is gone.
    #[display("session closed")]
    SessionClosed,
}

impl ChannelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ChannelError::NotReady)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ChannelError::SessionClosed)
    }
}

impl std::error::Error for ChannelError {}
