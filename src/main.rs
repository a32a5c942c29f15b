use clap::{ArgAction, Parser};
use log;
use obfs_tunnel::mux::MuxConfig;
use obfs_tunnel::tunnel::{ObfuscationConfig, RelayConfig, RelayCredentials};
use obfs_tunnel::{run, Error, ExecuteConfig, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(
        short = 'l',
        long,
        default_value = "127.0.0.1",
        help = "From what IP address listen for SOCKS clients"
    )]
    listen_ip: IpAddr,

    #[arg(
        short = 'p',
        long,
        default_value = "1080",
        help = "From what port listen for SOCKS clients"
    )]
    listen_port: u16,

    #[arg(short = 'r', long, help = "Host name or address of the relay")]
    relay_host: String,

    #[arg(short = 'R', long, default_value = "22", help = "Port of the relay")]
    relay_port: u16,

    #[arg(short = 'u', long, help = "User name to authenticate to the relay with")]
    username: Option<String>,

    #[arg(long, help = "Password to authenticate to the relay with")]
    password: Option<String>,

    #[arg(
        short = 'f',
        long,
        conflicts_with_all = ["username", "password"],
        help = "Path to the file where relay credentials are stored. The first \
            <user:password> line of the file is used"
    )]
    credentials_file: Option<PathBuf>,

    #[arg(short = 'k', long, help = "Obfuscation keyword shared with the relay")]
    keyword: Option<String>,

    #[arg(
        short = 'c',
        long,
        help = "Prefix the obfuscated handshake with an HTTP looking request line"
    )]
    camouflage: bool,

    #[arg(
        long,
        conflicts_with_all = ["keyword", "camouflage"],
        help = "Speak the session protocol to the relay without obfuscation"
    )]
    plain: bool,

    #[arg(
        short = 'm',
        long,
        default_value_t = obfs_tunnel::mux::DEFAULT_MAX_CONNECTIONS,
        help = "How many local clients are served at the same time"
    )]
    max_connections: usize,

    #[arg(
        short = 't',
        long,
        default_value = "5",
        help = "Seconds to wait for the TCP connection to the relay"
    )]
    connect_timeout: u64,

    #[arg(
        short = 'v',
        action = ArgAction::Count,
        help = "How verbose logging messages are. The more value is set the more messages are \
                displayed. Maximum message verbosity set at 5"
    )]
    verbosity: u8,
}

impl TryFrom<Args> for ExecuteConfig {
    type Error = Error;

    fn try_from(args: Args) -> std::result::Result<Self, Self::Error> {
        let credentials = match (args.credentials_file, args.username) {
            (Some(file), _) => RelayCredentials::try_from(file)?,
            (None, Some(username)) => {
                RelayCredentials::new(username, args.password.unwrap_or_default())
            }
            (None, None) => {
                return Err(Error::Config(
                    "either --username or --credentials-file is required".to_string(),
                ))
            }
        };
        if args.max_connections == 0 {
            return Err(Error::Config("--max-connections must be positive".to_string()));
        }

        let mut relay = RelayConfig::new(args.relay_host, args.relay_port, credentials);
        relay.connect_timeout = Duration::from_secs(args.connect_timeout);
        relay.obfuscation = if args.plain {
            None
        } else {
            Some(ObfuscationConfig {
                keyword: args.keyword.map(String::into_bytes),
                camouflage: args.camouflage,
            })
        };

        Ok(ExecuteConfig {
            listen_address: SocketAddr::new(args.listen_ip, args.listen_port),
            relay,
            mux: MuxConfig {
                max_connections: args.max_connections,
                ..Default::default()
            },
        })
    }
}

fn u8_to_log_level(value: u8) -> log::LevelFilter {
    match value {
        1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.verbosity > 0 {
        std::env::set_var(
            env_logger::DEFAULT_FILTER_ENV,
            u8_to_log_level(args.verbosity).as_str(),
        )
    }

    env_logger::init();
    let cfg = match ExecuteConfig::try_from(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = run(cfg).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}
