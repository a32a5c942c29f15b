mod error;
mod result;
mod types;
mod utils;

use crate::socks::utils::read_more;
use crate::socks::{Address, Destination, MAX_REQUEST_SIZE};
pub use error::Error;
use log;
pub use result::Result;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncWrite};
pub use types::SOCKS5_VERSION;

/// Initiate SOCKS5 handshake communication. `buffer` holds whatever was already
/// read from `stream`; on success it keeps only the bytes sent after the request.
/// Only the "no authentication" method and the CONNECT command are accepted.
/// See more about
/// [protocol specification](https://datatracker.ietf.org/doc/html/rfc1928)
pub async fn handshake<S>(stream: &mut S, buffer: &mut Vec<u8>) -> Result<Destination>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    log::info!("Start SOCKS5 handshake");

    let consumed = match read_message(stream, buffer, parse_greeting).await {
        Ok(consumed) => consumed,
        Err(e) => {
            if matches!(e, Error::SockAuthMethodNotSupportedByClient) {
                utils::send_socks5_method(stream, false)
                    .await
                    .unwrap_or_else(|_| log::error!("Failed to refuse SOCKS5 auth methods"));
            }
            return Err(e);
        }
    };
    utils::send_socks5_method(stream, true).await?;
    // a client may send its request without waiting for the method reply
    buffer.drain(..consumed);

    match read_message(stream, buffer, parse_request).await {
        Ok((destination, length)) => {
            buffer.drain(..length);
            utils::send_socks5_success(stream).await?;
            log::info!("Successful SOCKS5 handshake for \"{}\"", destination);
            Ok(destination)
        }
        Err(e) => {
            utils::send_socks5_error(stream, &e)
                .await
                .unwrap_or_else(|_| log::error!("Failed to send SOCKS5 error code"));
            Err(e)
        }
    }
}

/// Runs `parse` over `buffer`, reading more from `stream` while the message is incomplete.
async fn read_message<S, T>(
    stream: &mut S,
    buffer: &mut Vec<u8>,
    parse: fn(&[u8]) -> Result<T>,
) -> Result<T>
where
    S: AsyncRead + Unpin,
{
    loop {
        match parse(buffer) {
            Err(Error::SocksTruncated) => {
                if read_more(stream, buffer, MAX_REQUEST_SIZE).await? == 0 {
                    return Err(Error::SocksTruncated);
                }
            }
            other => return other,
        }
    }
}

/// Parses the method negotiation message.
///
/// ## Return
///
/// Length of the message, if "no authentication" is among the offered methods.
pub fn parse_greeting(buf: &[u8]) -> Result<usize> {
    if buf.len() < 2 {
        return Err(Error::SocksTruncated);
    }
    if buf[0] != SOCKS5_VERSION {
        return Err(Error::SocksProtocolVersionNotSupported(buf[0]));
    }
    let length = 2 + buf[1] as usize;
    if buf.len() < length {
        return Err(Error::SocksTruncated);
    }

    let methods = &buf[2..length];
    log::trace!("Got auth methods: {:?}", methods);
    if !methods.contains(&types::NO_AUTH_METHOD) {
        return Err(Error::SockAuthMethodNotSupportedByClient);
    }
    Ok(length)
}

/// Parses a CONNECT request.
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// ## Return
///
/// The destination and the length of the request.
pub fn parse_request(buf: &[u8]) -> Result<(Destination, usize)> {
    if buf.len() < types::REQUEST_HEADER_LENGTH {
        return Err(Error::SocksTruncated);
    }
    if buf[0] != SOCKS5_VERSION {
        return Err(Error::SocksProtocolVersionNotSupported(buf[0]));
    }
    let cmd = types::SocksCMD::try_from(buf[1])?;
    log::trace!("CMD: {}", cmd.value());
    if buf[2] != types::RESERVED {
        return Err(Error::SocksBadReserved(buf[2]));
    }
    let addr_type = types::SocksAddrType::try_from(buf[3])?;
    log::trace!("Target address type: {}", addr_type.value());

    let body = &buf[types::REQUEST_HEADER_LENGTH..];
    let (address, address_length) = match addr_type {
        types::SocksAddrType::IPV4 => {
            let octets: [u8; 4] = take(body, 4)?.try_into().or(Err(Error::SocksTruncated))?;
            (Address::Ip(IpAddr::V4(Ipv4Addr::from(octets))), 4)
        }
        types::SocksAddrType::IPV6 => {
            let octets: [u8; 16] = take(body, 16)?.try_into().or(Err(Error::SocksTruncated))?;
            (Address::Ip(IpAddr::V6(Ipv6Addr::from(octets))), 16)
        }
        types::SocksAddrType::DOMAINNAME => {
            let length = *take(body, 1)?.first().ok_or(Error::SocksTruncated)? as usize;
            let name = &take(body, 1 + length)?[1..];
            if name.is_empty() {
                return Err(Error::BadString);
            }
            let name = String::from_utf8(name.to_vec()).or(Err(Error::BadString))?;
            (Address::Domain(name), 1 + length)
        }
    };
    log::trace!("Target address: {}", address);

    let port_bytes = &take(body, address_length + 2)?[address_length..];
    let port = u16::from_be_bytes([port_bytes[0], port_bytes[1]]);
    log::trace!("Target port: {}", port);

    Ok((
        Destination::new(address, port),
        types::REQUEST_HEADER_LENGTH + address_length + 2,
    ))
}

fn take(buf: &[u8], length: usize) -> Result<&[u8]> {
    buf.get(..length).ok_or(Error::SocksTruncated)
}
