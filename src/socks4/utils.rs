use crate::socks4::result::Result;
use crate::socks4::types::{Socks4ErrCode, SUCCESS_CODE};
use tokio::io::{AsyncWrite, AsyncWriteExt};

async fn send_socks4_reply<S: AsyncWrite + Unpin>(stream: &mut S, status: u8) -> Result<()> {
    let buffer = [
        0,
        status,
        0, // port
        0,
        0, // address
        0,
        0,
        0,
    ];
    log::trace!("Send SOCKS4 reply: \"{:?}\"", buffer);
    stream.write_all(&buffer).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn send_socks4_success<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<()> {
    send_socks4_reply(stream, SUCCESS_CODE).await
}

pub async fn send_socks4_error<S: AsyncWrite + Unpin>(
    stream: &mut S,
    code: impl Into<Socks4ErrCode>,
) -> Result<()> {
    send_socks4_reply(stream, code.into().value()).await
}
