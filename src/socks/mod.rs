mod error;
mod result;
mod types;
pub(crate) mod utils;

use crate::{socks4, socks5};
pub use error::Error;
pub use result::Result;
use tokio::io::{AsyncRead, AsyncWrite};
pub use types::{Address, Destination, MAX_DOMAIN_LENGTH, MAX_REQUEST_SIZE};

/// Reads the first message of a local client and runs the SOCKS4 or SOCKS5
/// handshake it starts, leaving `stream` ready for forwarding.
///
/// ## Return
///
/// The destination and the bytes the client already sent past its request.
pub async fn read_destination<S>(stream: &mut S) -> Result<(Destination, Vec<u8>)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();
    if utils::read_more(stream, &mut buffer, MAX_REQUEST_SIZE).await? == 0 {
        return Err(Error::SocksNoRequest);
    }
    log::trace!("Got SOCKS version: {}", buffer[0]);

    let destination = match buffer[0] {
        socks4::SOCKS4_VERSION => socks4::handshake(stream, &mut buffer).await?,
        socks5::SOCKS5_VERSION => socks5::handshake(stream, &mut buffer).await?,
        version => return Err(Error::SocksProtocolVersionNotSupported(version)),
    };
    if !buffer.is_empty() {
        log::trace!("Client sent {} bytes along with its request", buffer.len());
    }
    Ok((destination, buffer))
}
