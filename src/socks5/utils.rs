use crate::socks5::result::Result;
use crate::socks5::types::{
    Socks5ErrCode, SocksAddrType, NO_ACCEPTABLE_METHODS, NO_AUTH_METHOD, RESERVED,
    SOCKS5_VERSION, SUCCESS_CODE,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

async fn send_socks5_reply<S: AsyncWrite + Unpin>(stream: &mut S, status: u8) -> Result<()> {
    let buffer = [
        SOCKS5_VERSION,
        status,
        RESERVED,
        SocksAddrType::IPV4.value(),
        0, // address
        0,
        0,
        0,
        0, // port
        0,
    ];
    log::trace!("Send SOCKS5 reply: \"{:?}\"", buffer);
    stream.write_all(&buffer).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn send_socks5_success<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<()> {
    send_socks5_reply(stream, SUCCESS_CODE).await
}

pub async fn send_socks5_error<S: AsyncWrite + Unpin>(
    stream: &mut S,
    code: impl Into<Socks5ErrCode>,
) -> Result<()> {
    send_socks5_reply(stream, code.into().value()).await
}

/// Answers the method negotiation, either accepting "no authentication" or
/// refusing every offered method.
pub async fn send_socks5_method<S: AsyncWrite + Unpin>(stream: &mut S, accepted: bool) -> Result<()> {
    let method = if accepted {
        NO_AUTH_METHOD
    } else {
        NO_ACCEPTABLE_METHODS
    };
    stream.write_all(&[SOCKS5_VERSION, method]).await?;
    stream.flush().await?;
    Ok(())
}
