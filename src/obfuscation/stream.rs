use crate::obfuscation::cipher::ObfuscationContext;
use crate::obfuscation::result::Result;
use crate::obfuscation::seed;
use crate::obfuscation::types::{Direction, Role};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

const PREFIX_READ_CHUNK: usize = 64;

/// Wraps a byte stream so that everything written is obfuscated with the
/// outbound keystream and everything read is deobfuscated with the inbound one.
///
/// While a camouflage prefix is expected, raw incoming bytes go through the
/// context's prefix skipper first; bytes following the terminator in the same
/// read are kept and delivered as data.
pub struct ObfuscatedStream<S> {
    inner: S,
    context: ObfuscationContext,
    read_backlog: Vec<u8>,
    write_backlog: Vec<u8>,
    written: usize,
}

impl<S> ObfuscatedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(inner: S, context: ObfuscationContext) -> Self {
        Self {
            inner,
            context,
            read_backlog: Vec::new(),
            write_backlog: Vec::new(),
            written: 0,
        }
    }

    /// Starts an obfuscated session as initiator by sending the seed message.
    pub async fn connect(mut inner: S, keyword: Option<&[u8]>, camouflage: bool) -> Result<Self> {
        let mut context = ObfuscationContext::new(Role::Initiator, keyword, camouflage)?;
        seed::send_seed(&mut inner, &mut context).await?;
        Ok(Self::new(inner, context))
    }

    /// Accepts an obfuscated session as responder, answering with the
    /// responder camouflage prefix when enabled.
    pub async fn accept(mut inner: S, keyword: Option<&[u8]>, camouflage: bool) -> Result<Self> {
        let context = seed::read_seed(&mut inner, keyword, camouflage).await?;
        if camouflage {
            inner.write_all(context.role().prefix()).await?;
            inner.flush().await?;
        }
        Ok(Self::new(inner, context))
    }

    pub fn context(&self) -> &ObfuscationContext {
        &self.context
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.written < self.write_backlog.len() {
            let n = ready!(
                Pin::new(&mut self.inner).poll_write(cx, &self.write_backlog[self.written..])
            )?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.written += n;
        }
        self.write_backlog.clear();
        self.written = 0;
        Poll::Ready(Ok(()))
    }

    fn poll_skip_prefix(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.context.awaiting_prefix() {
            let mut chunk = [0u8; PREFIX_READ_CHUNK];
            let mut chunk_buf = ReadBuf::new(&mut chunk);
            ready!(Pin::new(&mut self.inner).poll_read(cx, &mut chunk_buf))?;
            let raw = chunk_buf.filled();
            if raw.is_empty() {
                return Poll::Ready(Err(io::ErrorKind::UnexpectedEof.into()));
            }
            if let Some(consumed) = self.context.skip_prefix(raw)? {
                let mut rest = raw[consumed..].to_vec();
                self.context.transform(&mut rest, Direction::Inbound);
                self.read_backlog = rest;
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl<S> AsyncRead for ObfuscatedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_skip_prefix(cx))?;

        if !this.read_backlog.is_empty() {
            let n = this.read_backlog.len().min(buf.remaining());
            buf.put_slice(&this.read_backlog[..n]);
            this.read_backlog.drain(..n);
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let fresh = &mut buf.filled_mut()[before..];
        this.context.transform(fresh, Direction::Inbound);
        Poll::Ready(Ok(()))
    }
}

impl<S> AsyncWrite for ObfuscatedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        // encrypted bytes already handed out must reach the wire before new ones
        ready!(this.poll_drain(cx))?;
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let mut encrypted = buf.to_vec();
        this.context.transform(&mut encrypted, Direction::Outbound);

        match Pin::new(&mut this.inner).poll_write(cx, &encrypted) {
            Poll::Ready(Ok(n)) => {
                if n < encrypted.len() {
                    encrypted.drain(..n);
                    this.write_backlog = encrypted;
                }
            }
            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            Poll::Pending => this.write_backlog = encrypted,
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
