// SOCKS: A protocol for TCP proxy across firewalls
// https://www.openssh.com/txt/socks4.protocol
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::codec::{read_be, write_be};
use crate::error::{Error, Result};
use crate::socks::*;

use super::socks::HandshakeRequest;
use super::transport::Transport;

use std::net::Ipv4Addr;


// CONNECT
//
// +----+----+----+----+----+----+----+----+----+----+....+----+
// | VN | CD | DSTPORT |      DSTIP        | USERID       |NULL|
// +----+----+----+----+----+----+----+----+----+----+....+----+
//    1    1      2              4           variable       1
//
// +----+----+----+----+----+----+----+----+
// | VN | CD | DSTPORT |      DSTIP        |
// +----+----+----+----+----+----+----+----+
//    1    1      2              4

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Step {
    BuildConnectRequest = 0,
    AwaitReply = 1,
    ParseReply = 2,
    Done = 3,
}

/// Client half of a SOCKS4 CONNECT exchange.
///
/// Only literal IPv4 targets can be expressed; there is no 4A support.
pub struct Socks4Handshake<'a, S> {
    transport: Transport<'a, S>,
    request: &'a HandshakeRequest,
    buf: BytesMut,
    step: Step,
}

impl<'a, S: AsyncRead + AsyncWrite + Unpin> Socks4Handshake<'a, S> {
    pub fn new(stream: &'a mut S, request: &'a HandshakeRequest) -> Self {
        Self {
            transport: Transport::new(stream, None),
            request,
            buf: BytesMut::with_capacity(9 + request.username().len()),
            step: Step::BuildConnectRequest,
        }
    }

    /// Aborts the handshake with [`Error::Aborted`] once `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.transport.cancel_on(token);
        self
    }

    /// Drives the exchange to completion. Consumes the handshake, a new
    /// attempt needs a new instance.
    pub async fn run(mut self) -> Result<()> {
        let mut outcome = Ok(());
        while self.step != Step::Done {
            let step = self.step;
            self.step = match self.advance().await {
                Ok(next) => next,
                Err(e) => {
                    debug!("socks4 {:?} failed: {}", step, e);
                    outcome = Err(e);
                    Step::Done
                }
            };
            debug!("socks4 {:?} -> {:?}", step, self.step);
        }

        if outcome.is_ok() {
            info!("socks4 tunnel to {}:{} established", self.request.host(), self.request.port());
        }
        outcome
    }

    async fn advance(&mut self) -> Result<Step> {
        match self.step {
            Step::BuildConnectRequest => {
                let request = self.request;
                let ip = request.host().parse::<Ipv4Addr>()
                    .map_err(|_| Error::AddressResolution(request.host().to_owned()))?;
                let username = request.username().as_bytes();

                self.buf.clear();
                self.buf.reserve(9 + username.len());
                write_be(SOCKS_V4, &mut self.buf);
                write_be(SOCKS_CMD_CONNECT, &mut self.buf);
                write_be(request.port(), &mut self.buf);
                write_be(u32::from(ip), &mut self.buf);
                self.buf.put_slice(username);
                write_be(0u8, &mut self.buf);
                debug_assert_eq!(self.buf.len(), 9 + username.len());

                self.transport.write(&self.buf).await?;
                Ok(Step::AwaitReply)
            }
            Step::AwaitReply => {
                self.buf.clear();
                self.transport.read_exact(&mut self.buf, SOCKS4_REPLY_LEN).await?;
                Ok(Step::ParseReply)
            }
            Step::ParseReply => {
                let mut cur = &self.buf[..];
                let _vn = read_be::<u8, _>(&mut cur);
                let cd = read_be::<u8, _>(&mut cur);

                match reply_error(cd) {
                    Some(e) => Err(e),
                    None => Ok(Step::Done),
                }
            }
            Step::Done => Ok(Step::Done),
        }
    }
}

/// Maps a SOCKS4 `CD` byte to its failure, `None` when the request was granted.
pub fn reply_error(cd: u8) -> Option<Error> {
    match cd {
        SOCKS4_REP_REQUEST_GRANTED    => None,
        SOCKS4_REP_REQUEST_REJECTED   => Some(Error::RejectedOrFailed),
        SOCKS4_REP_CANNOT_CONNECT     => Some(Error::CannotConnectTarget),
        SOCKS4_REP_DIFFERENT_USER_ID  => Some(Error::RejectedUserMismatch),
        _ => Some(Error::Unknown(cd)),
    }
}
