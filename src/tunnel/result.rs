pub type Result<T> = std::result::Result<T, crate::tunnel::Error>;
