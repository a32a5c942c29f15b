use crate::mux::result::Result;
use log;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Moves bytes between a local client and its channel until either side
/// reaches end of stream or fails. Each read is written out in full before
/// the next one is issued.
pub async fn forward<L, C>(mut local: L, mut channel: C, buffer_size: usize) -> Result<()>
where
    L: AsyncRead + AsyncWrite + Unpin,
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut upstream = vec![0u8; buffer_size];
    let mut downstream = vec![0u8; buffer_size];

    loop {
        tokio::select! {
            read = local.read(&mut upstream) => {
                let n = read?;
                if n == 0 {
                    log::debug!("Local client closed the connection");
                    break;
                }
                log::trace!("Local -> channel: {} bytes", n);
                channel.write_all(&upstream[..n]).await?;
                channel.flush().await?;
            }
            read = channel.read(&mut downstream) => {
                let n = read?;
                if n == 0 {
                    log::debug!("Channel closed by the relay");
                    break;
                }
                log::trace!("Channel -> local: {} bytes", n);
                local.write_all(&downstream[..n]).await?;
                local.flush().await?;
            }
        }
    }

    if let Err(e) = channel.shutdown().await {
        log::trace!("Channel shutdown failed: {}", e);
    }
    if let Err(e) = local.shutdown().await {
        log::trace!("Local shutdown failed: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_flow_both_ways() {
        let (local, mut client) = tokio::io::duplex(64);
        let (channel, mut relay) = tokio::io::duplex(64);
        let forwarding = tokio::spawn(forward(local, channel, 16));

        client.write_all(b"request bytes longer than one buffer").await.unwrap();
        let mut request = [0u8; 36];
        relay.read_exact(&mut request).await.unwrap();
        assert_eq!(&request, b"request bytes longer than one buffer");

        relay.write_all(b"response").await.unwrap();
        let mut response = [0u8; 8];
        client.read_exact(&mut response).await.unwrap();
        assert_eq!(&response, b"response");

        drop(client);
        forwarding.await.unwrap().unwrap();
        let mut rest = Vec::new();
        relay.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn channel_close_ends_forwarding() {
        let (local, mut client) = tokio::io::duplex(64);
        let (channel, relay) = tokio::io::duplex(64);
        let forwarding = tokio::spawn(forward(local, channel, 1024));

        drop(relay);
        forwarding.await.unwrap().unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn large_transfer_is_complete() {
        let (local, mut client) = tokio::io::duplex(1024);
        let (channel, mut relay) = tokio::io::duplex(1024);
        tokio::spawn(forward(local, channel, 4096));

        let data: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let expected = data.clone();
        let writer = tokio::spawn(async move {
            client.write_all(&data).await.unwrap();
            client
        });

        let mut received = vec![0u8; expected.len()];
        relay.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected);
        writer.await.unwrap();
    }
}
