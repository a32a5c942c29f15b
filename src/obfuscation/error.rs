use derive_more::{Display, From};

#[derive(Debug, From, Display)]
pub enum Error {
    #[display("derived key is {_0} bytes, expected at least 16")]
    KeyDerivation(usize),

    #[display("camouflage prefix terminator not found within {_0} bytes")]
    PrefixNotFound(usize),

    #[display("bad seed message magic {_0:#010x}")]
    BadMagic(u32),

    #[display("seed message padding of {_0} bytes exceeds the maximum")]
    PaddingTooLong(u32),

    #[from]
    IO(std::io::Error),
}

impl std::error::Error for Error {}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::IO(e) => e,
            e => std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        }
    }
}
