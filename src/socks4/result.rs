pub type Result<T> = std::result::Result<T, crate::socks4::Error>;
