use crate::socks4::error::Error;
use crate::socks4::result::Result;
use std::net::Ipv4Addr;
use std::time::Duration;

pub const SUCCESS_CODE: u8 = 90;
pub const SOCKS4_VERSION: u8 = 4;
pub const HEADER_LENGTH: usize = 8;

/// User id and hostname terminators must show up before this offset.
pub const MAX_SCAN: usize = 1024;

/// How long a SOCKS4a marker request without hostname waits for one.
pub const HOSTNAME_WAIT: Duration = Duration::from_millis(200);

pub enum SocksCMD {
    CONNECT,
}

impl TryFrom<u8> for SocksCMD {
    type Error = Error;
    fn try_from(value: u8) -> Result<SocksCMD> {
        match value {
            1 => Ok(SocksCMD::CONNECT),
            n => Err(Error::SocksCMDNotSupported(n)),
        }
    }
}

/// SOCKS4a marks a request carrying a hostname with the invalid address `0.0.0.x`, x != 0.
pub fn is_socks4a_marker(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[..3] == [0, 0, 0] && octets[3] != 0
}

pub enum Socks4ErrCode {
    GeneralFailure,
}

impl Socks4ErrCode {
    pub fn value(&self) -> u8 {
        match self {
            Socks4ErrCode::GeneralFailure => 91,
        }
    }
}

impl From<&Error> for Socks4ErrCode {
    fn from(value: &Error) -> Self {
        match value {
            Error::SocksProtocolVersionNotSupported(_)
            | Error::SocksCMDNotSupported(_)
            | Error::SocksTruncated
            | Error::SocksUnterminated(_)
            | Error::SocksHostnameTooLong(_)
            | Error::SocksBadHostname
            | Error::IO(_) => Socks4ErrCode::GeneralFailure,
        }
    }
}
