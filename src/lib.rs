#[macro_use]
extern crate log;
extern crate tokio;


mod codec;
mod socks;

pub mod address;
pub mod config;
pub mod error;

/// socks4 / socks5 CONNECT client
pub mod client;

pub use self::address::Address;
pub use self::client::{perform_handshake, HandshakeObserver, HandshakeRequest, SocksVersion};
pub use self::error::{Error, Result};
