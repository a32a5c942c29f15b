use crate::tunnel::error::Error;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

/// Origin reported in `direct-tcpip` requests.
pub const ORIGINATOR_ADDRESS: &str = "127.0.0.1";
pub const ORIGINATOR_PORT: u32 = 0;

#[derive(Clone, PartialEq, Eq)]
pub struct RelayCredentials {
    pub username: String,
    pub password: String,
}

impl RelayCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RelayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Reads the first `user:password` line of a file.
impl TryFrom<PathBuf> for RelayCredentials {
    type Error = Error;

    fn try_from(value: PathBuf) -> std::result::Result<Self, Self::Error> {
        let reader = BufReader::new(std::fs::File::open(value)?);

        for line in reader.lines() {
            let line = line?;
            if let Some((name, password)) = line.trim_end_matches('\r').split_once(':') {
                if !name.is_empty() {
                    return Ok(RelayCredentials::new(name, password));
                }
            }
        }
        Err(Error::NoCredentials)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObfuscationConfig {
    pub keyword: Option<Vec<u8>>,
    pub camouflage: bool,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub credentials: RelayCredentials,
    /// `None` speaks the plain session protocol to the relay.
    pub obfuscation: Option<ObfuscationConfig>,
    pub connect_timeout: Duration,
    pub connect_attempts: u32,
}

impl RelayConfig {
    pub fn new(host: impl Into<String>, port: u16, credentials: RelayCredentials) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            obfuscation: Some(ObfuscationConfig::default()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn credentials_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "obfs-tunnel-{}-{}",
            std::process::id(),
            name
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn first_valid_line_is_used() {
        let path = credentials_file("valid", "# relay\r\nalice:s3cr:et\r\nbob:pw\n");
        let credentials = RelayCredentials::try_from(path.clone()).unwrap();
        std::fs::remove_file(path).unwrap();
        assert_eq!(credentials, RelayCredentials::new("alice", "s3cr:et"));
    }

    #[test]
    fn empty_password_is_allowed() {
        let path = credentials_file("token", "token:\n");
        let credentials = RelayCredentials::try_from(path.clone()).unwrap();
        std::fs::remove_file(path).unwrap();
        assert_eq!(credentials.password, "");
    }

    #[test]
    fn file_without_credentials_is_rejected() {
        let path = credentials_file("empty", "\n:nobody\n");
        let result = RelayCredentials::try_from(path.clone());
        std::fs::remove_file(path).unwrap();
        assert!(matches!(result, Err(Error::NoCredentials)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = RelayCredentials::try_from(PathBuf::from("/nonexistent/obfs-tunnel/creds"));
        assert!(matches!(result, Err(Error::IO(_))));
    }

    #[test]
    fn password_is_not_logged() {
        let credentials = RelayCredentials::new("alice", "hunter2");
        assert!(!format!("{:?}", credentials).contains("hunter2"));
    }

    #[test]
    fn relay_defaults() {
        let config = RelayConfig::new("relay.example", 22, RelayCredentials::new("u", "p"));
        assert_eq!(config.address(), "relay.example:22");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.obfuscation, Some(ObfuscationConfig::default()));
    }
}
