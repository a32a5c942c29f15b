pub const SEED_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 16;
pub const HASH_ITERATIONS: usize = 6000;
pub const MAX_PADDING: u32 = 8192;
pub const MAGIC_VALUE: u32 = 0x0BF5_CA7E;

/// Seed, magic and padding length, before the padding bytes.
pub const SEED_HEADER_LENGTH: usize = SEED_LENGTH + 8;

pub const CLIENT_TO_SERVER: &[u8] = b"client_to_server";
pub const SERVER_TO_CLIENT: &[u8] = b"server_to_client";

pub const INITIATOR_PREFIX: &[u8] = b"POST / HTTP/1.1\r\n\r\n";
pub const RESPONDER_PREFIX: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

pub const MAX_PREFIX_SCAN: usize = 50;

pub type Key = [u8; KEY_LENGTH];
pub type Seed = [u8; SEED_LENGTH];

/// Which end of the obfuscated connection this context belongs to. The
/// initiator sends the seed message and writes with the `client_to_server` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn output_label(&self) -> &'static [u8] {
        match self {
            Role::Initiator => CLIENT_TO_SERVER,
            Role::Responder => SERVER_TO_CLIENT,
        }
    }

    pub fn input_label(&self) -> &'static [u8] {
        match self {
            Role::Initiator => SERVER_TO_CLIENT,
            Role::Responder => CLIENT_TO_SERVER,
        }
    }

    /// Camouflage bytes this side sends in the clear.
    pub fn prefix(&self) -> &'static [u8] {
        match self {
            Role::Initiator => INITIATOR_PREFIX,
            Role::Responder => RESPONDER_PREFIX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes arriving from the peer.
    Inbound,
    /// Bytes sent to the peer.
    Outbound,
}
