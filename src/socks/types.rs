use std::fmt;
use std::net::IpAddr;

pub const MAX_DOMAIN_LENGTH: usize = 255;

/// Size of the buffer a SOCKS request is accumulated in.
pub const MAX_REQUEST_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Ip(IpAddr),
    Domain(String),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ip(ip) => write!(f, "{}", ip),
            Address::Domain(name) => write!(f, "{}", name),
        }
    }
}

/// Target a local client asked to be connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub address: Address,
    pub port: u16,
}

impl Destination {
    pub fn new(address: Address, port: u16) -> Self {
        Self { address, port }
    }

    /// Host part as sent in a `direct-tcpip` request, without IPv6 brackets.
    pub fn host(&self) -> String {
        self.address.to_string()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Address::Ip(IpAddr::V6(ip)) => write!(f, "[{}]:{}", ip, self.port),
            address => write!(f, "{}:{}", address, self.port),
        }
    }
}
