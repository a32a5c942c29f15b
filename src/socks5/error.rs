use derive_more::{Display, From};

#[derive(Debug, From, Display)]
pub enum Error {
    SocksProtocolVersionNotSupported(u8),
    SocksCMDNotSupported(u8),
    SocksAddrTypeNotSupported(u8),

    #[display("reserved field is {_0}, expected 0")]
    SocksBadReserved(u8),

    SockAuthMethodNotSupportedByClient,

    #[display("request ended before it was complete")]
    SocksTruncated,

    BadString,

    #[from]
    IO(std::io::Error),
}

impl std::error::Error for Error {}
