use derive_more::{Display, From};

#[derive(Debug, From, Display)]
pub enum Error {
    SocksProtocolVersionNotSupported(u8),

    #[display("client closed the connection before sending a request")]
    SocksNoRequest,

    #[from]
    Socks4(crate::socks4::Error),

    #[from]
    Socks5(crate::socks5::Error),

    #[from]
    IO(std::io::Error),
}

impl std::error::Error for Error {}
