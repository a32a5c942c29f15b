use crate::obfuscation::cipher::ObfuscationContext;
use crate::obfuscation::prefix::{Feed, PrefixSkipper};
use crate::obfuscation::result::Result;
use crate::obfuscation::types::{
    Direction, Role, Seed, MAGIC_VALUE, MAX_PADDING, MAX_PREFIX_SCAN, SEED_HEADER_LENGTH,
    SEED_LENGTH,
};
use crate::obfuscation::Error;
use rand::{Rng, RngCore};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The first message an initiator sends:
///
/// ```text
/// +-----------+-----------+----------------+-------------+
/// | SEED (16) | MAGIC (4) | PADDING LEN (4)| PADDING ... |
/// +-----------+-----------+----------------+-------------+
/// ```
///
/// Everything after the seed is obfuscated with the initiator's output keystream.
pub struct SeedMessage {
    pub seed: Seed,
    pub padding: Vec<u8>,
}

impl SeedMessage {
    pub fn random(seed: Seed) -> Self {
        let mut rng = rand::thread_rng();
        let mut padding = vec![0u8; rng.gen_range(0..MAX_PADDING) as usize];
        rng.fill_bytes(&mut padding);
        Self { seed, padding }
    }

    /// Serializes the message, prepending the camouflage prefix when the
    /// context has camouflage enabled, and obfuscates it from the magic onward.
    pub fn encode(&self, context: &mut ObfuscationContext) -> Vec<u8> {
        let prefix: &[u8] = if context.camouflage() {
            context.role().prefix()
        } else {
            &[]
        };
        let mut buffer =
            Vec::with_capacity(prefix.len() + SEED_HEADER_LENGTH + self.padding.len());
        buffer.extend_from_slice(prefix);
        buffer.extend_from_slice(&self.seed);
        buffer.extend_from_slice(&MAGIC_VALUE.to_be_bytes());
        buffer.extend_from_slice(&(self.padding.len() as u32).to_be_bytes());
        buffer.extend_from_slice(&self.padding);

        context.transform(
            &mut buffer[prefix.len() + SEED_LENGTH..],
            Direction::Outbound,
        );
        buffer
    }
}

/// Sends the seed message for `context` in a single write.
pub async fn send_seed<W: AsyncWrite + Unpin>(
    writer: &mut W,
    context: &mut ObfuscationContext,
) -> Result<()> {
    let buffer = SeedMessage::random(*context.seed()).encode(context);
    log::debug!("Sending seed message of {} bytes", buffer.len());
    writer.write_all(&buffer).await?;
    writer.flush().await?;
    Ok(())
}

/// Consumes a camouflage prefix one byte at a time, never reading past the terminator.
pub async fn skip_prefix<R: AsyncRead + Unpin>(reader: &mut R) -> Result<()> {
    let mut skipper = PrefixSkipper::default();
    let mut byte = [0u8];
    loop {
        reader.read_exact(&mut byte).await?;
        match skipper.feed(byte[0]) {
            Feed::Continue => {}
            Feed::Done => return Ok(()),
            Feed::NoMatch => return Err(Error::PrefixNotFound(MAX_PREFIX_SCAN)),
        }
    }
}

/// Reads the peer's seed message and builds the responder side context.
pub async fn read_seed<R: AsyncRead + Unpin>(
    reader: &mut R,
    keyword: Option<&[u8]>,
    camouflage: bool,
) -> Result<ObfuscationContext> {
    if camouflage {
        skip_prefix(reader).await?;
    }

    let mut seed = [0u8; SEED_LENGTH];
    reader.read_exact(&mut seed).await?;
    let mut context = ObfuscationContext::with_seed(seed, Role::Responder, keyword, camouflage)?;
    // the peer's prefix is gone; what follows is obfuscated data
    context.prefix_skipped();

    let mut header = [0u8; 8];
    reader.read_exact(&mut header).await?;
    context.transform(&mut header, Direction::Inbound);

    let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if magic != MAGIC_VALUE {
        return Err(Error::BadMagic(magic));
    }
    let padding_length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if padding_length > MAX_PADDING {
        return Err(Error::PaddingTooLong(padding_length));
    }

    let mut padding = vec![0u8; padding_length as usize];
    reader.read_exact(&mut padding).await?;
    context.transform(&mut padding, Direction::Inbound);

    log::debug!("Accepted seed message with {} padding bytes", padding_length);
    Ok(context)
}
