use bytes::{Buf, BufMut};

use crate::codec::{read_be, write_be};
use crate::error::{Error, Result};
use crate::socks::*;

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};


/// A SOCKS5 endpoint as it travels in `DST.ADDR`/`BND.ADDR` + port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Socket address (IP Address)
    SocketAddress(SocketAddr),
    /// Domain name address and port
    DomainNameAddress(String, u16),
}

impl Address {
    /// Parses `host` as an IPv4 or IPv6 literal. No name resolution is done.
    pub fn from_ip_literal(host: &str, port: u16) -> Result<Address> {
        host.parse::<IpAddr>()
            .map(|ip| Address::SocketAddress(SocketAddr::new(ip, port)))
            .map_err(|_| Error::AddressResolution(host.to_owned()))
    }

    pub fn port(&self) -> u16 {
        match self {
            Address::SocketAddress(addr) => addr.port(),
            Address::DomainNameAddress(_, port) => *port,
        }
    }

    /// Bytes written by [`Address::write_to_buf`]: ATYP, address, port.
    #[inline]
    pub fn serialized_len(&self) -> usize {
        match self {
            Address::SocketAddress(SocketAddr::V4(..)) => 1 + 4 + 2,
            Address::SocketAddress(SocketAddr::V6(..)) => 1 + 16 + 2,
            Address::DomainNameAddress(ref name, _) => 1 + 1 + name.len() + 2,
        }
    }

    /// Appends `ATYP | ADDR | PORT`.
    ///
    /// Domain names longer than 255 bytes cannot be expressed in SOCKS5;
    /// keeping them short is up to whoever built the address.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) {
        match self {
            Address::SocketAddress(SocketAddr::V4(addr)) => {
                write_be(SOCKS5_ATYP_IPV4, buf);
                write_be(u32::from(*addr.ip()), buf);
                write_be(addr.port(), buf);
            }
            Address::SocketAddress(SocketAddr::V6(addr)) => {
                write_be(SOCKS5_ATYP_IPV6, buf);
                write_be(u128::from(*addr.ip()), buf);
                write_be(addr.port(), buf);
            }
            Address::DomainNameAddress(name, port) => {
                debug_assert!(name.len() <= u8::MAX as usize);
                write_be(SOCKS5_ATYP_DOMAIN_NAME, buf);
                write_be(name.len() as u8, buf);
                buf.put_slice(name.as_bytes());
                write_be(*port, buf);
            }
        }
    }

    /// Reads `ATYP | ADDR | PORT` from a cursor that already holds all of it.
    ///
    /// Returns `None` for an unknown ATYP. Non UTF-8 domain bytes are
    /// replaced, the endpoint is informational only.
    pub fn read_from_buf<B: Buf>(cur: &mut B) -> Option<Address> {
        match read_be::<u8, _>(cur) {
            SOCKS5_ATYP_IPV4 => {
                let ip = Ipv4Addr::from(read_be::<u32, _>(cur));
                let port = read_be::<u16, _>(cur);
                Some(Address::SocketAddress(SocketAddr::V4(SocketAddrV4::new(ip, port))))
            }
            SOCKS5_ATYP_IPV6 => {
                let ip = Ipv6Addr::from(read_be::<u128, _>(cur));
                let port = read_be::<u16, _>(cur);
                Some(Address::SocketAddress(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0))))
            }
            SOCKS5_ATYP_DOMAIN_NAME => {
                let len = read_be::<u8, _>(cur) as usize;
                let name = String::from_utf8_lossy(&cur.copy_to_bytes(len)).into_owned();
                let port = read_be::<u16, _>(cur);
                Some(Address::DomainNameAddress(name, port))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::SocketAddress(addr) => write!(f, "{}", addr),
            Address::DomainNameAddress(name, port) => write!(f, "{}:{}", name, port),
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::SocketAddress(addr)
    }
}
