use crate::obfuscation::types::MAX_PREFIX_SCAN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PrefixState {
    #[default]
    Idle,
    Cr,
    CrLf,
    CrLfCr,
    Done,
}

impl PrefixState {
    fn index(&self) -> u8 {
        match self {
            PrefixState::Idle => 0,
            PrefixState::Cr => 1,
            PrefixState::CrLf => 2,
            PrefixState::CrLfCr => 3,
            PrefixState::Done => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Continue,
    Done,
    NoMatch,
}

/// Consumes a camouflage prefix up to and including the first `\r\n\r\n`.
///
/// The skipper keeps its position between calls, so the prefix may arrive
/// split over any number of reads. At most `limit` bytes are examined.
#[derive(Debug, Clone)]
pub struct PrefixSkipper {
    state: PrefixState,
    fed: usize,
    limit: usize,
}

impl Default for PrefixSkipper {
    fn default() -> Self {
        Self::with_limit(MAX_PREFIX_SCAN)
    }
}

impl PrefixSkipper {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: PrefixState::Idle,
            fed: 0,
            limit,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Feed {
        if self.state == PrefixState::Done {
            return Feed::Done;
        }
        if self.fed >= self.limit {
            return Feed::NoMatch;
        }
        self.fed += 1;

        self.state = match (self.state, byte) {
            (PrefixState::Idle, b'\r') => PrefixState::Cr,
            (PrefixState::Cr, b'\n') => PrefixState::CrLf,
            (PrefixState::CrLf, b'\r') => PrefixState::CrLfCr,
            (PrefixState::CrLfCr, b'\n') => PrefixState::Done,
            // a stray CR may itself start the terminator
            (_, b'\r') => PrefixState::Cr,
            _ => PrefixState::Idle,
        };

        if self.state == PrefixState::Done {
            log::trace!("Camouflage prefix skipped after {} bytes", self.fed);
            Feed::Done
        } else if self.fed >= self.limit {
            Feed::NoMatch
        } else {
            Feed::Continue
        }
    }

    /// Feeds `bytes` until the terminator is matched.
    ///
    /// ## Return
    ///
    /// `Some(n)` once done, where `bytes[..n]` belonged to the prefix; `None` if every
    /// byte was consumed without reaching the terminator yet.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Result<Option<usize>, usize> {
        for (i, byte) in bytes.iter().enumerate() {
            match self.feed(*byte) {
                Feed::Continue => {}
                Feed::Done => return Ok(Some(i + 1)),
                Feed::NoMatch => return Err(self.fed),
            }
        }
        Ok(None)
    }

    pub fn is_done(&self) -> bool {
        self.state == PrefixState::Done
    }

    /// Progress through the terminator, 0 when idle and 4 once matched.
    pub fn progress(&self) -> u8 {
        self.state.index()
    }

    pub(crate) fn finish(&mut self) {
        self.state = PrefixState::Done;
    }
}
