use crate::socks5::error::Error;
use crate::socks5::result::Result;

// https://datatracker.ietf.org/doc/html/rfc1928
pub const SUCCESS_CODE: u8 = 0;
pub const RESERVED: u8 = 0;

pub const SOCKS5_VERSION: u8 = 5;

pub const NO_AUTH_METHOD: u8 = 0;
pub const NO_ACCEPTABLE_METHODS: u8 = 0xff;

/// VER, CMD, RSV and ATYP.
pub const REQUEST_HEADER_LENGTH: usize = 4;

pub enum SocksCMD {
    CONNECT,
}

impl SocksCMD {
    pub fn value(&self) -> u8 {
        match self {
            SocksCMD::CONNECT => 1,
        }
    }
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

pub enum Socks5ErrCode {
    GeneralFailure,
    CommandUnsupported,
    AddressTypeNotSupported,
}

impl Socks5ErrCode {
    pub fn value(&self) -> u8 {
        match self {
            Socks5ErrCode::GeneralFailure => 1,
            Socks5ErrCode::CommandUnsupported => 7,
            Socks5ErrCode::AddressTypeNotSupported => 8,
        }
    }
}

impl From<&Error> for Socks5ErrCode {
    fn from(value: &Error) -> Self {
        match value {
            Error::SocksCMDNotSupported(_) => Socks5ErrCode::CommandUnsupported,
            Error::SocksAddrTypeNotSupported(_) => Socks5ErrCode::AddressTypeNotSupported,
            _ => Socks5ErrCode::GeneralFailure,
        }
    }
}

pub enum SocksAddrType {
    IPV4,
    DOMAINNAME,
    IPV6,
}

impl SocksAddrType {
    pub fn value(&self) -> u8 {
        match self {
            SocksAddrType::IPV4 => 1,
            SocksAddrType::DOMAINNAME => 3,
            SocksAddrType::IPV6 => 4,
        }
    }
}

impl TryFrom<u8> for SocksAddrType {
    type Error = Error;
    fn try_from(value: u8) -> Result<SocksAddrType> {
        match value {
            1 => Ok(SocksAddrType::IPV4),
            3 => Ok(SocksAddrType::DOMAINNAME),
            4 => Ok(SocksAddrType::IPV6),
            n => Err(Error::SocksAddrTypeNotSupported(n)),
        }
    }
}
