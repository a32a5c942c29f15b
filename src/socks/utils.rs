use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Appends whatever `stream` has available to `buffer`, never growing it past `limit`.
///
/// ## Return
///
/// Number of bytes appended, 0 on end of stream or when `buffer` is already full.
pub async fn read_more<S: AsyncRead + Unpin>(
    stream: &mut S,
    buffer: &mut Vec<u8>,
    limit: usize,
) -> io::Result<usize> {
    let start = buffer.len();
    if start >= limit {
        return Ok(0);
    }
    buffer.resize(limit, 0);
    match stream.read(&mut buffer[start..]).await {
        Ok(n) => {
            buffer.truncate(start + n);
            Ok(n)
        }
        Err(e) => {
            buffer.truncate(start);
            Err(e)
        }
    }
}
