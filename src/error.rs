//! Handshake outcome taxonomy.
//!
//! Every handshake ends with exactly one [`Result`]. Errors fall in three
//! groups: transport failures (always reported in preference to anything
//! else), local protocol violations, and failures the proxy itself
//! reported through its reply code.

use std::io;
use thiserror::Error;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Transport
    /// Read or write on the underlying stream failed
    #[error("socks transport error: {0}")]
    Io(#[source] io::Error),

    /// Proxy closed the stream before a complete reply arrived
    #[error("socks proxy closed the connection")]
    Eof,

    /// Handshake cancelled while an I/O was outstanding
    #[error("socks operation aborted")]
    Aborted,

    // Protocol
    #[error("unsupported socks version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("unsupported socks authentication method {0:#04x}")]
    UnsupportedAuthMethod(u8),

    #[error("unsupported socks authentication version {0:#04x}")]
    UnsupportedAuthVersion(u8),

    #[error("socks authentication failed (status {0:#04x})")]
    AuthenticationFailed(u8),

    #[error("socks proxy requires a username")]
    UsernameRequired,

    #[error("socks general failure")]
    GeneralFailure,

    /// Host is not an IP literal the chosen protocol can carry
    #[error("cannot resolve socks target address {0:?}")]
    AddressResolution(String),

    // SOCKS5 reply codes, 0x01 is GeneralFailure
    #[error("connection not allowed by ruleset")]
    RulesetDenied,

    #[error("network unreachable")]
    NetworkUnreachable,

    #[error("host unreachable")]
    HostUnreachable,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("TTL expired")]
    TtlExpired,

    #[error("command not supported")]
    CommandNotSupported,

    #[error("address type not supported")]
    AddressTypeNotSupported,

    #[error("unassigned socks reply code {0:#04x}")]
    Unassigned(u8),

    // SOCKS4 reply codes
    #[error("request rejected or failed")]
    RejectedOrFailed,

    #[error("request rejected because SOCKS server cannot connect to the target")]
    CannotConnectTarget,

    #[error("request rejected because the client program and identd report different user-ids")]
    RejectedUserMismatch,

    #[error("unknown socks reply code {0}")]
    Unknown(u8),
}

impl Error {
    /// Whether this error came from the stream rather than the protocol.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Eof | Error::Aborted)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::Eof,
            io::ErrorKind::ConnectionAborted => Error::Aborted,
            _ => Error::Io(e),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match e {
            Error::Io(inner) => return inner,
            Error::Eof => io::ErrorKind::UnexpectedEof,
            Error::Aborted => io::ErrorKind::ConnectionAborted,
            Error::ConnectionRefused => io::ErrorKind::ConnectionRefused,
            Error::AddressResolution(_) => io::ErrorKind::InvalidInput,
            Error::AuthenticationFailed(_) | Error::UsernameRequired => io::ErrorKind::PermissionDenied,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
