//! Client side SOCKS4/SOCKS5 CONNECT handshakes over any tokio byte stream.
mod socks;
mod socks4;
mod socks5;
mod transport;

pub use self::socks::{perform_handshake, HandshakeObserver, HandshakeRequest, NoopObserver, SocksVersion};
pub use self::socks4::Socks4Handshake;
pub use self::socks5::Socks5Handshake;
