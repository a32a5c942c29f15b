use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, From, Display)]
pub enum Error {
    #[from]
    Tunnel(crate::tunnel::Error),

    #[from]
    Mux(crate::mux::Error),

    #[display("invalid configuration: {_0}")]
    Config(String),

    #[from]
    IO(std::io::Error),
}

impl std::error::Error for Error {}
