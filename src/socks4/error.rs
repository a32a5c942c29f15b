use derive_more::{Display, From};

#[derive(Debug, From, Display)]
pub enum Error {
    SocksProtocolVersionNotSupported(u8),
    SocksCMDNotSupported(u8),

    #[display("request ended before it was complete")]
    SocksTruncated,

    #[display("no NUL terminator within the first {_0} bytes")]
    SocksUnterminated(usize),

    #[display("hostname of {_0} bytes is too long")]
    SocksHostnameTooLong(usize),

    SocksBadHostname,

    #[from]
    IO(std::io::Error),
}

impl std::error::Error for Error {}
