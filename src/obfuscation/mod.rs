//! Keystream obfuscation of the relay transport.
//!
//! The initiator picks a random seed, derives one RC4 key per direction from
//! `seed || keyword || label` and sends the seed message; every later byte in
//! both directions passes through the matching keystream. An optional HTTP
//! looking prefix can precede the first message on each side.

mod cipher;
mod error;
mod prefix;
mod result;
mod seed;
mod stream;
mod types;

pub use cipher::{derive_key, ObfuscationContext};
pub use error::Error;
pub use prefix::{Feed, PrefixSkipper};
pub use result::Result;
pub use seed::{read_seed, send_seed, SeedMessage};
pub use stream::ObfuscatedStream;
pub use types::{
    Direction, Key, Role, Seed, CLIENT_TO_SERVER, INITIATOR_PREFIX, KEY_LENGTH, MAGIC_VALUE,
    MAX_PADDING, RESPONDER_PREFIX, SEED_LENGTH, SERVER_TO_CLIENT,
};
