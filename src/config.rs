use getopts::Options;

use crate::client::{HandshakeRequest, SocksVersion};

use std::io;
use std::time::Duration;


#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClientConfig {
    /// socks proxy `host:port`, resolved when connecting
    pub proxy_addr: String,
    pub target_host: String,
    pub target_port: u16,
    pub version: SocksVersion,
    pub username: String,
    pub password: String,
    /// let the proxy resolve `target_host` (socks5 only)
    pub resolve_via_proxy: bool,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn handshake_request(&self) -> HandshakeRequest {
        HandshakeRequest::new(self.target_host.clone(), self.target_port)
            .version(self.version)
            .credentials(self.username.clone(), self.password.clone())
            .resolve_via_proxy(self.resolve_via_proxy)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    /// Print the usage text and exit.
    Help(String),
    Run(ClientConfig),
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("p", "proxy", "socks proxy address", "HOST:PORT");
    opts.optopt("t", "target", "destination to tunnel to", "HOST:PORT");
    opts.optflag("4", "", "speak socks4");
    opts.optflag("5", "", "speak socks5 (default)");
    opts.optopt("u", "user", "username (socks5 auth, socks4 userid)", "NAME");
    opts.optopt("P", "password", "password for socks5 username/password auth", "PASS");
    opts.optflag("r", "remote-dns", "let the proxy resolve the target host (socks5)");
    opts.optopt("", "timeout", "abort the handshake after this many seconds", "SECS");
    opts.optflag("h", "help", "print this help menu");
    opts
}

fn invalid<E: Into<Box<dyn std::error::Error + Send + Sync>>>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e)
}

/// Parses command line arguments, without the program name.
pub fn parse_args<I, S>(program: &str, args: I) -> io::Result<Command>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let opts = options();
    let matches = opts.parse(args).map_err(|e| invalid(e.to_string()))?;

    if matches.opt_present("h") {
        let brief = format!("Usage: {} --proxy HOST:PORT --target HOST:PORT [options]", program);
        return Ok(Command::Help(opts.usage(&brief)));
    }

    let proxy_addr = matches.opt_str("p").ok_or_else(|| invalid("missing --proxy"))?;
    let target = matches.opt_str("t").ok_or_else(|| invalid("missing --target"))?;
    let (target_host, target_port) = split_host_port(&target)?;

    let version = match (matches.opt_present("4"), matches.opt_present("5")) {
        (true, true) => return Err(invalid("-4 and -5 are mutually exclusive")),
        (true, false) => SocksVersion::V4,
        _ => SocksVersion::V5,
    };

    let username = matches.opt_str("u").unwrap_or_default();
    let password = matches.opt_str("P").unwrap_or_default();
    let resolve_via_proxy = matches.opt_present("r");

    let timeout = match matches.opt_str("timeout") {
        Some(secs) => {
            let secs = secs.parse::<u64>().map_err(|e| invalid(format!("invalid --timeout: {}", e)))?;
            Some(Duration::from_secs(secs))
        }
        None => None,
    };

    let config = ClientConfig {
        proxy_addr,
        target_host,
        target_port,
        version,
        username,
        password,
        resolve_via_proxy,
        timeout,
    };
    validate(&config)?;

    Ok(Command::Run(config))
}

/// Checks what the wire formats cannot carry.
fn validate(config: &ClientConfig) -> io::Result<()> {
    if config.username.len() > u8::MAX as usize {
        return Err(invalid("username longer than 255 bytes"));
    }
    if config.password.len() > u8::MAX as usize {
        return Err(invalid("password longer than 255 bytes"));
    }

    match config.version {
        SocksVersion::V4 => {
            if config.resolve_via_proxy {
                return Err(invalid("socks4 cannot resolve the target on the proxy"));
            }
            if !config.password.is_empty() {
                return Err(invalid("socks4 has no password authentication"));
            }
            if config.username.as_bytes().contains(&0) {
                return Err(invalid("socks4 userid cannot contain NUL"));
            }
        }
        SocksVersion::V5 => {
            if config.resolve_via_proxy && config.target_host.len() > u8::MAX as usize {
                return Err(invalid("target domain longer than 255 bytes"));
            }
        }
    }

    Ok(())
}

/// `example.com:80`, `10.0.0.1:80` or `[::1]:80`.
fn split_host_port(s: &str) -> io::Result<(String, u16)> {
    let (host, port) = s.rsplit_once(':')
        .ok_or_else(|| invalid(format!("missing port in {:?}", s)))?;

    let host = host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(invalid(format!("missing host in {:?}", s)));
    }

    let port = port.parse::<u16>().map_err(|e| invalid(format!("invalid port in {:?}: {}", s, e)))?;
    Ok((host.to_owned(), port))
}
