use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::socks::{SOCKS_V4, SOCKS_V5};

use super::socks4::Socks4Handshake;
use super::socks5::Socks5Handshake;

use std::convert::TryFrom;
use std::fmt;


#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SocksVersion {
    V4,
    V5,
}

impl TryFrom<u8> for SocksVersion {
    type Error = Error;

    fn try_from(ver: u8) -> Result<Self> {
        match ver {
            SOCKS_V4 => Ok(SocksVersion::V4),
            SOCKS_V5 => Ok(SocksVersion::V5),
            _ => Err(Error::UnsupportedVersion(ver)),
        }
    }
}

impl fmt::Display for SocksVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksVersion::V4 => f.write_str("socks4"),
            SocksVersion::V5 => f.write_str("socks5"),
        }
    }
}

/// What to ask the proxy for. Immutable while a handshake runs.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HandshakeRequest {
    host: String,
    port: u16,
    username: String,
    password: String,
    /// Send `host` as a SOCKS5 DOMAINNAME instead of parsing it locally.
    resolve_via_proxy: bool,
    version: SocksVersion,
}

impl HandshakeRequest {
    /// SOCKS5, no credentials, `host` must be an IP literal.
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
            resolve_via_proxy: false,
            version: SocksVersion::V5,
        }
    }

    pub fn version(mut self, version: SocksVersion) -> Self {
        self.version = version;
        self
    }

    /// An empty username means "no authentication". SOCKS4 sends the
    /// username as USERID and ignores the password. Both must be at most
    /// 255 bytes, longer values corrupt the SOCKS5 auth request.
    pub fn credentials<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// The host must fit a SOCKS5 DOMAINNAME, at most 255 bytes.
    pub fn resolve_via_proxy(mut self, yes: bool) -> Self {
        self.resolve_via_proxy = yes;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn resolves_via_proxy(&self) -> bool {
        self.resolve_via_proxy
    }

    pub fn socks_version(&self) -> SocksVersion {
        self.version
    }

    /// Negotiates the tunnel over `stream`. On `Ok(())` the stream carries
    /// application data to the target.
    pub async fn handshake<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.handshake_with(stream, None, NoopObserver).await
    }

    /// Like [`handshake`](Self::handshake), aborting once `cancel` fires and
    /// reporting the endpoint the proxy bound (SOCKS5 only) to `observer`.
    pub async fn handshake_with<S, O>(
        &self,
        stream: &mut S,
        cancel: Option<CancellationToken>,
        observer: O,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        O: HandshakeObserver,
    {
        debug!("{} handshake for {}:{}", self.version, self.host, self.port);

        match self.version {
            SocksVersion::V4 => {
                let mut hs = Socks4Handshake::new(stream, self);
                if let Some(token) = cancel {
                    hs = hs.cancel_on(token);
                }
                hs.run().await
            }
            SocksVersion::V5 => {
                let mut hs = Socks5Handshake::new(stream, self).observe(observer);
                if let Some(token) = cancel {
                    hs = hs.cancel_on(token);
                }
                hs.run().await
            }
        }
    }
}

/// Receives informational events from a running handshake.
pub trait HandshakeObserver {
    /// The `BND.ADDR:BND.PORT` from the proxy's CONNECT reply. Delivered
    /// before the reply code is checked, so also on failure.
    fn remote_endpoint(&mut self, addr: &Address);
}

impl<F: FnMut(&Address)> HandshakeObserver for F {
    fn remote_endpoint(&mut self, addr: &Address) {
        self(addr)
    }
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl HandshakeObserver for NoopObserver {
    fn remote_endpoint(&mut self, _addr: &Address) {}
}

/// Performs a SOCKS4 or SOCKS5 CONNECT handshake for `host:port` over
/// `stream`.
///
/// `username`, `password` and, with `resolve_via_proxy`, `host` must each
/// be at most 255 bytes; the length prefixes on the wire are one byte.
///
/// # Panics
///
/// If `version` is neither 4 nor 5.
pub async fn perform_handshake<S>(
    stream: &mut S,
    host: &str,
    port: u16,
    version: u8,
    username: &str,
    password: &str,
    resolve_via_proxy: bool,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    assert!(version == SOCKS_V4 || version == SOCKS_V5, "incorrect socks version {}", version);
    let version = if version == SOCKS_V4 { SocksVersion::V4 } else { SocksVersion::V5 };

    HandshakeRequest::new(host, port)
        .version(version)
        .credentials(username, password)
        .resolve_via_proxy(resolve_via_proxy)
        .handshake(stream)
        .await
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_version_from_u8() {
        assert_eq!(SocksVersion::try_from(4).unwrap(), SocksVersion::V4);
        assert_eq!(SocksVersion::try_from(5).unwrap(), SocksVersion::V5);
        assert!(matches!(SocksVersion::try_from(6), Err(Error::UnsupportedVersion(6))));
    }

    #[test]
    fn test_request_defaults() {
        let request = HandshakeRequest::new("::1", 8080);
        assert_eq!(request.socks_version(), SocksVersion::V5);
        assert_eq!(request.username(), "");
        assert!(!request.resolves_via_proxy());
    }

    #[tokio::test]
    #[should_panic(expected = "incorrect socks version")]
    async fn test_bad_version_is_a_bug() {
        let (mut client, _server) = tokio::io::duplex(64);
        let _ = perform_handshake(&mut client, "127.0.0.1", 80, 3, "", "", false).await;
    }

    #[tokio::test]
    async fn test_dispatch_socks4() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let proxy = tokio::spawn(async move {
            let mut request = [0u8; 9];
            server.read_exact(&mut request).await.unwrap();
            server.write_all(&[0, 90, 0, 0, 0, 0, 0, 0]).await.unwrap();
            request
        });

        perform_handshake(&mut client, "127.0.0.1", 1080, 4, "", "", false).await.unwrap();
        assert_eq!(proxy.await.unwrap()[0], SOCKS_V4);
    }

    #[tokio::test]
    async fn test_dispatch_socks5_with_observer() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let proxy = tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            server.read_exact(&mut greeting).await.unwrap();
            server.write_all(&[0x05, 0x00]).await.unwrap();

            let mut connect = [0u8; 10];
            server.read_exact(&mut connect).await.unwrap();
            server.write_all(&[0x05, 0x00, 0x00, 0x01, 192, 168, 0, 1, 0x1f, 0x90]).await.unwrap();
            greeting
        });

        let mut seen = Vec::new();
        HandshakeRequest::new("10.0.0.1", 80)
            .handshake_with(&mut client, None, |addr: &Address| seen.push(addr.to_string()))
            .await
            .unwrap();

        assert_eq!(proxy.await.unwrap(), [0x05, 0x01, 0x00]);
        assert_eq!(seen, vec!["192.168.0.1:8080".to_owned()]);
    }
}
