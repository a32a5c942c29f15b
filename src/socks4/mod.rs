mod error;
mod result;
mod types;
mod utils;

use crate::socks::utils::read_more;
use crate::socks::{Address, Destination, MAX_DOMAIN_LENGTH, MAX_REQUEST_SIZE};
pub use error::Error;
use log;
pub use result::Result;
use std::net::{IpAddr, Ipv4Addr};
use tokio::io::{AsyncRead, AsyncWrite};
pub use types::SOCKS4_VERSION;

/// Reads a SOCKS4/4a request from `stream` and answers it with "request granted".
/// `buffer` holds whatever was already read from `stream`; more is read until the
/// request is complete. On success the request is drained from `buffer`, leaving
/// any bytes the client sent after it. See more about
/// [protocol specification](https://www.openssh.com/txt/socks4.protocol) and the
/// [4a extension](https://www.openssh.com/txt/socks4a.protocol).
pub async fn handshake<S>(stream: &mut S, buffer: &mut Vec<u8>) -> Result<Destination>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    log::info!("Start SOCKS4 handshake");

    let mut parsed = read_request(stream, buffer).await;
    if let Ok((destination, consumed)) = &parsed {
        if may_await_hostname(destination, *consumed, buffer.len()) {
            log::trace!("SOCKS4a marker without hostname, waiting for more input");
            match tokio::time::timeout(
                types::HOSTNAME_WAIT,
                read_more(stream, buffer, MAX_REQUEST_SIZE),
            )
            .await
            {
                Ok(Ok(0)) | Err(_) => {}
                Ok(Ok(_)) => parsed = read_request(stream, buffer).await,
                Ok(Err(e)) => parsed = Err(e.into()),
            }
        }
    }

    match parsed {
        Ok((destination, consumed)) => {
            buffer.drain(..consumed);
            utils::send_socks4_success(stream).await?;
            log::info!(
                "Successful SOCKS4{} handshake for \"{}\"",
                match destination.address {
                    Address::Domain(_) => "a",
                    Address::Ip(_) => "",
                },
                destination
            );
            Ok(destination)
        }
        Err(e) => {
            utils::send_socks4_error(stream, &e)
                .await
                .unwrap_or_else(|_| log::error!("Failed to send SOCKS4 error code"));
            Err(e)
        }
    }
}

async fn read_request<S>(stream: &mut S, buffer: &mut Vec<u8>) -> Result<(Destination, usize)>
where
    S: AsyncRead + Unpin,
{
    loop {
        match parse_request(buffer) {
            Err(Error::SocksTruncated) => {
                if read_more(stream, buffer, MAX_REQUEST_SIZE).await? == 0 {
                    return Err(Error::SocksTruncated);
                }
            }
            other => return other,
        }
    }
}

/// A marker address whose request ends right at the user id terminator may
/// still get its hostname in a later read.
fn may_await_hostname(destination: &Destination, consumed: usize, buffered: usize) -> bool {
    match destination.address {
        Address::Ip(IpAddr::V4(ip)) => types::is_socks4a_marker(&ip) && consumed == buffered,
        _ => false,
    }
}

/// Parses a complete SOCKS4 or SOCKS4a CONNECT request.
///
/// ```text
/// +----+----+----+----+----+----+----+----+----+....+----+----+....+----+
/// | VN | CD | DSTPORT |      DSTIP        | USERID  |NULL| HOSTNAME |NULL|
/// +----+----+----+----+----+----+----+----+----+....+----+----+....+----+
/// ```
///
/// The hostname is only present when `DSTIP` is `0.0.0.x`. A marker address with
/// nothing after the user id is taken literally.
///
/// ## Return
///
/// The destination and the length of the request, or [`Error::SocksTruncated`]
/// when `buf` holds only part of a request.
pub fn parse_request(buf: &[u8]) -> Result<(Destination, usize)> {
    if buf.len() < types::HEADER_LENGTH {
        return Err(Error::SocksTruncated);
    }
    if buf[0] != SOCKS4_VERSION {
        return Err(Error::SocksProtocolVersionNotSupported(buf[0]));
    }
    types::SocksCMD::try_from(buf[1])?;

    let port = u16::from_be_bytes([buf[2], buf[3]]);
    log::trace!("Got port number: {}", port);
    let ip = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
    log::trace!("Got address: {}", ip);

    let (userid, rest) = split_terminated(buf, types::HEADER_LENGTH)?;
    log::trace!("Got username: {}", String::from_utf8_lossy(userid));

    if types::is_socks4a_marker(&ip) && !rest.is_empty() {
        let offset = buf.len() - rest.len();
        let (hostname, rest) = split_terminated(buf, offset)?;
        let address = Address::Domain(read_hostname(hostname)?);
        return Ok((Destination::new(address, port), buf.len() - rest.len()));
    }

    Ok((
        Destination::new(Address::Ip(IpAddr::V4(ip)), port),
        buf.len() - rest.len(),
    ))
}

/// Splits `buf[offset..]` at its first NUL byte, which must appear before
/// [`types::MAX_SCAN`].
fn split_terminated(buf: &[u8], offset: usize) -> Result<(&[u8], &[u8])> {
    let window = buf.len().min(types::MAX_SCAN);
    let field = &buf[offset.min(window)..window];
    match field.iter().position(|b| *b == 0) {
        Some(end) => Ok((&field[..end], &buf[offset + end + 1..])),
        None if buf.len() >= types::MAX_SCAN => Err(Error::SocksUnterminated(types::MAX_SCAN)),
        None => Err(Error::SocksTruncated),
    }
}

fn read_hostname(bytes: &[u8]) -> Result<String> {
    if bytes.len() > MAX_DOMAIN_LENGTH {
        return Err(Error::SocksHostnameTooLong(bytes.len()));
    }
    if bytes.is_empty() {
        return Err(Error::SocksBadHostname);
    }
    String::from_utf8(bytes.to_vec()).or(Err(Error::SocksBadHostname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn socks4a_request(port: u16, userid: &[u8], hostname: &[u8]) -> Vec<u8> {
        let mut request = vec![4, 1];
        request.extend_from_slice(&port.to_be_bytes());
        request.extend_from_slice(&[0, 0, 0, 2]);
        request.extend_from_slice(userid);
        request.push(0);
        request.extend_from_slice(hostname);
        request.push(0);
        request
    }

    #[test]
    fn plain_request_with_empty_username() {
        let (destination, length) =
            parse_request(&[0x04, 0x01, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(destination.to_string(), "0.0.0.1:80");
        assert_eq!(length, 9);
    }

    #[test]
    fn plain_request_with_username() {
        let mut request = vec![4, 1, 0x1f, 0x90, 10, 0, 0, 7];
        request.extend_from_slice(b"alice\0");
        let (destination, _) = parse_request(&request).unwrap();
        assert_eq!(destination.to_string(), "10.0.0.7:8080");
    }

    #[test]
    fn socks4a_request_carries_hostname() {
        let (destination, _) = parse_request(&socks4a_request(443, b"", b"example.com")).unwrap();
        assert_eq!(
            destination,
            Destination::new(Address::Domain("example.com".to_string()), 443)
        );
    }

    #[test]
    fn request_length_excludes_trailing_bytes() {
        let request = socks4a_request(443, b"me", b"example.com");
        let mut pipelined = request.clone();
        pipelined.extend_from_slice(b"GET / HTTP/1.1");
        let (_, length) = parse_request(&pipelined).unwrap();
        assert_eq!(length, request.len());

        let mut plain = vec![4, 1, 0, 80, 10, 0, 0, 1, 0];
        plain.extend_from_slice(b"data");
        assert_eq!(parse_request(&plain).unwrap().1, 9);
    }

    #[test]
    fn short_header_is_truncated() {
        assert!(matches!(
            parse_request(&[0x04, 0x01, 0x00]),
            Err(Error::SocksTruncated)
        ));
    }

    #[test]
    fn missing_terminators_need_more_input() {
        assert!(matches!(
            parse_request(&[4, 1, 0, 80, 1, 2, 3, 4, b'b', b'o']),
            Err(Error::SocksTruncated)
        ));
        let mut request = socks4a_request(80, b"bob", b"example.com");
        request.pop();
        assert!(matches!(parse_request(&request), Err(Error::SocksTruncated)));
    }

    #[test]
    fn garbage_without_terminator_is_rejected() {
        let mut request = vec![4, 1, 0, 80, 1, 2, 3, 4];
        request.extend(std::iter::repeat(b'x').take(2000));
        assert!(matches!(
            parse_request(&request),
            Err(Error::SocksUnterminated(_))
        ));
    }

    #[test]
    fn only_connect_is_supported() {
        assert!(matches!(
            parse_request(&[4, 2, 0, 80, 1, 2, 3, 4, 0]),
            Err(Error::SocksCMDNotSupported(2))
        ));
    }

    #[test]
    fn overlong_hostname_is_rejected() {
        let request = socks4a_request(80, b"", &[b'a'; 300]);
        assert!(matches!(
            parse_request(&request),
            Err(Error::SocksHostnameTooLong(300))
        ));
    }

    #[test]
    fn empty_hostname_is_rejected() {
        let request = socks4a_request(80, b"u", b"");
        assert!(matches!(parse_request(&request), Err(Error::SocksBadHostname)));
    }

    #[tokio::test]
    async fn handshake_replies_granted() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client
            .write_all(&socks4a_request(443, b"me", b"example.com"))
            .await
            .unwrap();

        let mut buffer = Vec::new();
        let destination = handshake(&mut server, &mut buffer).await.unwrap();
        assert_eq!(destination.to_string(), "example.com:443");

        let mut reply = [0u8; 8];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0, 90, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn handshake_reassembles_split_request() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let request = socks4a_request(22, b"", b"relay.example");
        let (first, second) = request.split_at(5);

        let mut buffer = first.to_vec();
        let server_side = tokio::spawn(async move { handshake(&mut server, &mut buffer).await });
        client.write_all(second).await.unwrap();

        let destination = server_side.await.unwrap().unwrap();
        assert_eq!(destination.to_string(), "relay.example:22");
    }

    #[tokio::test]
    async fn handshake_keeps_bytes_after_request() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let mut message = vec![4, 1, 0, 80, 10, 0, 0, 1];
        message.extend_from_slice(b"user\0early payload");
        client.write_all(&message).await.unwrap();

        let mut buffer = Vec::new();
        let destination = handshake(&mut server, &mut buffer).await.unwrap();
        assert_eq!(destination.to_string(), "10.0.0.1:80");
        assert_eq!(buffer, b"early payload");
    }

    #[tokio::test]
    async fn hostname_arriving_after_user_id_is_used() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let server_side = tokio::spawn(async move {
            let mut buffer = Vec::new();
            let destination = handshake(&mut server, &mut buffer).await;
            (destination, buffer)
        });

        client
            .write_all(&[4, 1, 0, 80, 0, 0, 0, 1, b'u', 0])
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        client.write_all(b"example.com\0").await.unwrap();

        let (destination, buffer) = server_side.await.unwrap();
        assert_eq!(
            destination.unwrap(),
            Destination::new(Address::Domain("example.com".to_string()), 80)
        );
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn marker_without_hostname_falls_back_to_address() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client
            .write_all(&[0x04, 0x01, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00])
            .await
            .unwrap();

        let mut buffer = Vec::new();
        let destination = handshake(&mut server, &mut buffer).await.unwrap();
        assert_eq!(destination.to_string(), "0.0.0.1:80");

        let mut reply = [0u8; 8];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 90);
    }

    #[tokio::test]
    async fn handshake_rejects_truncated_request() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[4, 1, 0]).await.unwrap();
        client.shutdown().await.unwrap();

        let mut buffer = Vec::new();
        let result = handshake(&mut server, &mut buffer).await;
        assert!(matches!(result, Err(Error::SocksTruncated)));

        let mut reply = [0u8; 8];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 91);
    }
}
