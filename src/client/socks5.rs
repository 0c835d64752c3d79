// SOCKS Protocol Version 5
// https://tools.ietf.org/html/rfc1928
//
// Username/Password Authentication for SOCKS V5
// https://tools.ietf.org/html/rfc1929
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::address::Address;
use crate::codec::{read_be, write_be};
use crate::error::{Error, Result};
use crate::socks::*;

use super::socks::{HandshakeObserver, HandshakeRequest, NoopObserver};
use super::transport::Transport;


// https://tools.ietf.org/html/rfc1928#section-3
// +----+----------+----------+
// |VER | NMETHODS | METHODS  |
// +----+----------+----------+
// | 1  |    1     | 1 to 255 |
// +----+----------+----------+
//
// +----+--------+
// |VER | METHOD |
// +----+--------+
// | 1  |   1    |
// +----+--------+

// https://tools.ietf.org/html/rfc1929#section-2
// +----+------+----------+------+----------+
// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
// +----+------+----------+------+----------+
// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
// +----+------+----------+------+----------+
//
// +----+--------+
// |VER | STATUS |
// +----+--------+
// | 1  |   1    |
// +----+--------+

// https://tools.ietf.org/html/rfc1928#section-4
// +----+-----+-------+------+----------+----------+
// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+

// https://tools.ietf.org/html/rfc1928#section-6
// +----+-----+-------+------+----------+----------+
// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+

/// Steps keep their numbers; 9 is unused so the method-select step can jump
/// over the auth exchange to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Step {
    SendGreeting = 0,
    AwaitMethodSelect = 1,
    EvaluateMethod = 2,
    AwaitAuthReply = 3,
    EvaluateAuthReply = 4,
    BuildConnectRequest = 5,
    AwaitConnectReplyHeader = 6,
    EvaluateHeaderAndExtend = 7,
    FinalizeReply = 8,
    Done = 10,
}

/// Client half of a SOCKS5 CONNECT exchange, with optional RFC 1929
/// username/password authentication.
pub struct Socks5Handshake<'a, S, O = NoopObserver> {
    transport: Transport<'a, S>,
    request: &'a HandshakeRequest,
    observer: O,
    buf: BytesMut,
    step: Step,
}

impl<'a, S: AsyncRead + AsyncWrite + Unpin> Socks5Handshake<'a, S> {
    pub fn new(stream: &'a mut S, request: &'a HandshakeRequest) -> Self {
        Self {
            transport: Transport::new(stream, None),
            request,
            observer: NoopObserver,
            buf: BytesMut::with_capacity(SOCKS5_REPLY_MIN_LEN),
            step: Step::SendGreeting,
        }
    }
}

impl<'a, S, O> Socks5Handshake<'a, S, O>
where
    S: AsyncRead + AsyncWrite + Unpin,
    O: HandshakeObserver,
{
    /// Reports the endpoint from the CONNECT reply to `observer`.
    pub fn observe<P: HandshakeObserver>(self, observer: P) -> Socks5Handshake<'a, S, P> {
        Socks5Handshake {
            transport: self.transport,
            request: self.request,
            observer,
            buf: self.buf,
            step: self.step,
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
                    debug!("socks5 {:?} failed: {}", step, e);
                    outcome = Err(e);
                    Step::Done
                }
            };
            debug!("socks5 {:?} -> {:?}", step, self.step);
        }

        if outcome.is_ok() {
            info!("socks5 tunnel to {}:{} established", self.request.host(), self.request.port());
        }
        outcome
    }

    async fn advance(&mut self) -> Result<Step> {
        let request = self.request;

        match self.step {
            Step::SendGreeting => {
                self.buf.clear();
                write_be(SOCKS_V5, &mut self.buf);
                if request.username().is_empty() {
                    write_be(1u8, &mut self.buf);
                    write_be(SOCKS5_METHOD_NO_AUTH, &mut self.buf);
                } else {
                    write_be(2u8, &mut self.buf);
                    write_be(SOCKS5_METHOD_NO_AUTH, &mut self.buf);
                    write_be(SOCKS5_METHOD_PASSWD_AUTH, &mut self.buf);
                }

                self.transport.write(&self.buf).await?;
                Ok(Step::AwaitMethodSelect)
            }
            Step::AwaitMethodSelect => {
                self.buf.clear();
                self.transport.read_exact(&mut self.buf, 2).await?;
                Ok(Step::EvaluateMethod)
            }
            Step::EvaluateMethod => {
                let mut cur = &self.buf[..];
                let ver = read_be::<u8, _>(&mut cur);
                let method = read_be::<u8, _>(&mut cur);

                if ver != SOCKS_V5 {
                    return Err(Error::UnsupportedVersion(ver));
                }

                match method {
                    SOCKS5_METHOD_PASSWD_AUTH => {
                        let username = request.username().as_bytes();
                        let password = request.password().as_bytes();
                        if username.is_empty() {
                            return Err(Error::UsernameRequired);
                        }
                        debug_assert!(username.len() <= u8::MAX as usize);
                        debug_assert!(password.len() <= u8::MAX as usize);

                        self.buf.clear();
                        self.buf.reserve(3 + username.len() + password.len());
                        write_be(SOCKS5_AUTH_VERSION, &mut self.buf);
                        write_be(username.len() as u8, &mut self.buf);
                        self.buf.put_slice(username);
                        write_be(password.len() as u8, &mut self.buf);
                        self.buf.put_slice(password);

                        self.transport.write(&self.buf).await?;
                        Ok(Step::AwaitAuthReply)
                    }
                    SOCKS5_METHOD_NO_AUTH => Ok(Step::BuildConnectRequest),
                    SOCKS5_METHOD_NO_ACCEPTABLE => {
                        debug!("socks5 proxy accepted none of the offered methods");
                        Err(Error::UnsupportedAuthMethod(method))
                    }
                    _ => Err(Error::UnsupportedAuthMethod(method)),
                }
            }
            Step::AwaitAuthReply => {
                self.buf.clear();
                self.transport.read_exact(&mut self.buf, 2).await?;
                Ok(Step::EvaluateAuthReply)
            }
            Step::EvaluateAuthReply => {
                let mut cur = &self.buf[..];
                let ver = read_be::<u8, _>(&mut cur);
                let status = read_be::<u8, _>(&mut cur);

                if ver != SOCKS5_AUTH_VERSION {
                    return Err(Error::UnsupportedAuthVersion(ver));
                }
                if status != SOCKS5_AUTH_STATUS_SUCCESS {
                    return Err(Error::AuthenticationFailed(status));
                }
                Ok(Step::BuildConnectRequest)
            }
            Step::BuildConnectRequest => {
                let target = if request.resolves_via_proxy() {
                    Address::DomainNameAddress(request.host().to_owned(), request.port())
                } else {
                    Address::from_ip_literal(request.host(), request.port())?
                };

                self.buf.clear();
                self.buf.reserve(3 + target.serialized_len());
                write_be(SOCKS_V5, &mut self.buf);
                write_be(SOCKS_CMD_CONNECT, &mut self.buf);
                write_be(0u8, &mut self.buf);
                target.write_to_buf(&mut self.buf);

                self.transport.write(&self.buf).await?;
                Ok(Step::AwaitConnectReplyHeader)
            }
            Step::AwaitConnectReplyHeader => {
                self.buf.clear();
                self.transport.read_exact(&mut self.buf, SOCKS5_REPLY_MIN_LEN).await?;
                Ok(Step::EvaluateHeaderAndExtend)
            }
            Step::EvaluateHeaderAndExtend => {
                let ver = self.buf[0];
                let atyp = self.buf[3];

                if ver != SOCKS_V5 {
                    return Err(Error::UnsupportedVersion(ver));
                }

                let reply_len = match reply_len(atyp, &self.buf) {
                    Some(len) => len,
                    None => return Err(Error::GeneralFailure),
                };
                if reply_len > self.buf.len() {
                    let remaining = reply_len - self.buf.len();
                    self.transport.read_exact(&mut self.buf, remaining).await?;
                } else if reply_len < self.buf.len() {
                    warn!(
                        "socks5 reply is {} bytes, {} bytes past it were already consumed",
                        reply_len,
                        self.buf.len() - reply_len,
                    );
                }
                Ok(Step::FinalizeReply)
            }
            Step::FinalizeReply => {
                let mut cur = &self.buf[..];
                let _ver = read_be::<u8, _>(&mut cur);
                let rep = read_be::<u8, _>(&mut cur);
                let _rsv = read_be::<u8, _>(&mut cur);

                match Address::read_from_buf(&mut cur) {
                    Some(bound) => {
                        info!("socks remote host: {}", bound);
                        self.observer.remote_endpoint(&bound);
                    }
                    None => return Err(Error::GeneralFailure),
                }

                match reply_error(rep) {
                    Some(e) => Err(e),
                    None => Ok(Step::Done),
                }
            }
            Step::Done => Ok(Step::Done),
        }
    }
}

/// Total length of a CONNECT reply whose fixed header (and, for domain
/// names, the length byte) is already in `header`. `None` for an ATYP this
/// client does not know.
fn reply_len(atyp: u8, header: &[u8]) -> Option<usize> {
    let addr_len = match atyp {
        SOCKS5_ATYP_IPV4 => 4,
        SOCKS5_ATYP_IPV6 => 16,
        SOCKS5_ATYP_DOMAIN_NAME => 1 + header[SOCKS5_REPLY_HEADER_LEN] as usize,
        _ => return None,
    };
    Some(SOCKS5_REPLY_HEADER_LEN + addr_len + 2)
}

/// Maps a SOCKS5 `REP` byte to its failure, `None` on success.
pub fn reply_error(rep: u8) -> Option<Error> {
    match rep {
        SOCKS5_REP_SUCCEEDED                         => None,
        SOCKS5_REP_GENERAL_SERVER_FAILURE            => Some(Error::GeneralFailure),
        SOCKS5_REP_CONNECTION_NOT_ALLOWED_BY_RULESET => Some(Error::RulesetDenied),
        SOCKS5_REP_NETWORK_UNREACHABLE               => Some(Error::NetworkUnreachable),
        SOCKS5_REP_HOST_UNREACHABLE                  => Some(Error::HostUnreachable),
        SOCKS5_REP_CONNECTION_REFUSED                => Some(Error::ConnectionRefused),
        SOCKS5_REP_TTL_EXPIRED                       => Some(Error::TtlExpired),
        SOCKS5_REP_COMMAND_NOT_SUPPORTED             => Some(Error::CommandNotSupported),
        SOCKS5_REP_ADDRESS_TYPE_NOT_SUPPORTED        => Some(Error::AddressTypeNotSupported),
        _ => Some(Error::Unassigned(rep)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use std::net::{Ipv6Addr, SocketAddr};
    use std::sync::{Arc, Mutex};

    const OK_IPV4_REPLY: [u8; 10] = [0x05, 0x00, 0x00, 0x01, 127, 0, 0, 1, 0x04, 0x38];

    /// One scripted exchange: read exactly `expect` bytes, then send `reply`.
    type Script = Vec<(usize, Vec<u8>)>;

    /// Plays `script` against the client and returns every byte it sent,
    /// followed by whatever it sent after the script ran out.
    async fn scripted_proxy(mut server: DuplexStream, script: Script) -> Vec<u8> {
        let mut received = Vec::new();
        for (expect, reply) in script {
            let mut chunk = vec![0u8; expect];
            server.read_exact(&mut chunk).await.unwrap();
            received.extend_from_slice(&chunk);
            server.write_all(&reply).await.unwrap();
        }
        server.read_to_end(&mut received).await.unwrap();
        received
    }

    async fn run_against(request: &HandshakeRequest, script: Script) -> (Result<()>, Vec<u8>, Vec<Address>) {
        let (mut client, server) = tokio::io::duplex(4096);
        let proxy = tokio::spawn(scripted_proxy(server, script));

        let mut seen = Vec::new();
        let ret = Socks5Handshake::new(&mut client, request)
            .observe(|addr: &Address| seen.push(addr.clone()))
            .run()
            .await;
        drop(client);

        (ret, proxy.await.unwrap(), seen)
    }

    #[tokio::test]
    async fn test_no_auth_ipv4() {
        let request = HandshakeRequest::new("10.0.0.2", 443);
        let (ret, sent, seen) = run_against(&request, vec![
            (3, vec![0x05, 0x00]),
            (10, OK_IPV4_REPLY.to_vec()),
        ]).await;

        ret.unwrap();
        assert_eq!(&sent[..3], &[0x05, 0x01, 0x00]);
        assert_eq!(&sent[3..], &[0x05, 0x01, 0x00, 0x01, 10, 0, 0, 2, 0x01, 0xbb]);
        assert_eq!(seen, vec![Address::from("127.0.0.1:1080".parse::<SocketAddr>().unwrap())]);
    }

    #[tokio::test]
    async fn test_password_auth() {
        let request = HandshakeRequest::new("10.0.0.2", 80).credentials("bob", "s3cret");
        let (ret, sent, _) = run_against(&request, vec![
            (4, vec![0x05, 0x02]),
            (3 + 3 + 6, vec![0x01, 0x00]),
            (10, OK_IPV4_REPLY.to_vec()),
        ]).await;

        ret.unwrap();
        assert_eq!(&sent[..4], &[0x05, 0x02, 0x00, 0x02]);
        assert_eq!(&sent[4..8], &[0x01, 3, b'b', b'o']);
        assert_eq!(&sent[8..16], &[b'b', 6, b's', b'3', b'c', b'r', b'e', b't']);
        assert_eq!(sent.len(), 4 + 12 + 10);
    }

    #[tokio::test]
    async fn test_credentials_offered_but_not_needed() {
        let request = HandshakeRequest::new("10.0.0.2", 80).credentials("bob", "pw");
        let (ret, sent, _) = run_against(&request, vec![
            (4, vec![0x05, 0x00]),
            (10, OK_IPV4_REPLY.to_vec()),
        ]).await;

        ret.unwrap();
        // greeting + connect, no auth sub-negotiation
        assert_eq!(sent.len(), 4 + 10);
        assert_eq!(&sent[4..7], &[0x05, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn test_auth_rejected() {
        let request = HandshakeRequest::new("10.0.0.2", 80).credentials("bob", "wrong");
        let (ret, sent, _) = run_against(&request, vec![
            (4, vec![0x05, 0x02]),
            (3 + 3 + 5, vec![0x01, 0x01]),
        ]).await;

        assert!(matches!(ret, Err(Error::AuthenticationFailed(0x01))));
        assert_eq!(sent.len(), 4 + 11);
    }

    #[tokio::test]
    async fn test_auth_bad_subversion() {
        let request = HandshakeRequest::new("10.0.0.2", 80).credentials("bob", "pw");
        let (ret, _, _) = run_against(&request, vec![
            (4, vec![0x05, 0x02]),
            (3 + 3 + 2, vec![0x05, 0x00]),
        ]).await;

        assert!(matches!(ret, Err(Error::UnsupportedAuthVersion(0x05))));
    }

    #[tokio::test]
    async fn test_username_required_sends_nothing_more() {
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let (ret, sent, _) = run_against(&request, vec![(3, vec![0x05, 0x02])]).await;

        assert!(matches!(ret, Err(Error::UsernameRequired)));
        assert_eq!(sent, vec![0x05, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn test_no_acceptable_method() {
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let (ret, _, _) = run_against(&request, vec![(3, vec![0x05, SOCKS5_METHOD_NO_ACCEPTABLE])]).await;
        assert!(matches!(ret, Err(Error::UnsupportedAuthMethod(0xff))));
    }

    #[tokio::test]
    async fn test_wrong_version_in_method_select() {
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let (ret, _, _) = run_against(&request, vec![(3, vec![0x04, 0x00])]).await;
        assert!(matches!(ret, Err(Error::UnsupportedVersion(0x04))));
    }

    #[tokio::test]
    async fn test_ipv6_target_and_reply() {
        let request = HandshakeRequest::new("2001:db8::1", 8443);

        let mut reply = vec![0x05, 0x00, 0x00, 0x04];
        reply.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        reply.extend_from_slice(&[0x00, 0x35]);

        let (ret, sent, seen) = run_against(&request, vec![
            (3, vec![0x05, 0x00]),
            (22, reply),
        ]).await;

        ret.unwrap();
        let connect = &sent[3..];
        assert_eq!(connect.len(), 22);
        assert_eq!(connect[3], SOCKS5_ATYP_IPV6);
        assert_eq!(&connect[4..20], &"2001:db8::1".parse::<Ipv6Addr>().unwrap().octets());
        assert_eq!(&connect[20..], &8443u16.to_be_bytes());
        assert_eq!(seen, vec![Address::from("[::1]:53".parse::<SocketAddr>().unwrap())]);
    }

    #[tokio::test]
    async fn test_domain_target_and_reply() {
        let request = HandshakeRequest::new("example.com", 80).resolve_via_proxy(true);

        let mut reply = vec![0x05, 0x00, 0x00, 0x03, 15];
        reply.extend_from_slice(b"proxy.internal1");
        reply.extend_from_slice(&[0x1f, 0x90]);

        let (ret, sent, seen) = run_against(&request, vec![
            (3, vec![0x05, 0x00]),
            (7 + 11, reply),
        ]).await;

        ret.unwrap();
        let connect = &sent[3..];
        assert_eq!(connect.len(), 7 + 11);
        assert_eq!(&connect[..5], &[0x05, 0x01, 0x00, 0x03, 11]);
        assert_eq!(&connect[5..16], b"example.com");
        assert_eq!(&connect[16..], &[0x00, 0x50]);
        assert_eq!(seen, vec![Address::DomainNameAddress("proxy.internal1".to_owned(), 8080)]);
    }

    #[tokio::test]
    async fn test_short_domain_reply() {
        // 4 + 1 + 3 + 2 == 10: the header read already holds the whole reply
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let reply = vec![0x05, 0x00, 0x00, 0x03, 3, b'a', b'b', b'c', 0x00, 0x50];

        let (ret, _, seen) = run_against(&request, vec![(3, vec![0x05, 0x00]), (10, reply)]).await;

        ret.unwrap();
        assert_eq!(seen, vec![Address::DomainNameAddress("abc".to_owned(), 80)]);
    }

    #[tokio::test]
    async fn test_unresolvable_host_sends_no_connect() {
        let request = HandshakeRequest::new("example.com", 80);
        let (ret, sent, _) = run_against(&request, vec![(3, vec![0x05, 0x00])]).await;

        assert!(matches!(ret, Err(Error::AddressResolution(_))));
        assert_eq!(sent, vec![0x05, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn test_reply_codes_still_report_endpoint() {
        let expected = [
            (0x01u8, "general failure"),
            (0x02, "ruleset"),
            (0x03, "network unreachable"),
            (0x04, "host unreachable"),
            (0x05, "connection refused"),
            (0x06, "TTL expired"),
            (0x07, "command not supported"),
            (0x08, "address type not supported"),
            (0x09, "unassigned"),
            (0xee, "unassigned"),
        ];
        for &(rep, text) in &expected {
            let request = HandshakeRequest::new("10.0.0.2", 80);
            let mut reply = OK_IPV4_REPLY.to_vec();
            reply[1] = rep;

            let (ret, _, seen) = run_against(&request, vec![(3, vec![0x05, 0x00]), (10, reply)]).await;

            let e = ret.unwrap_err();
            assert!(e.to_string().contains(text), "{:#04x} => {}", rep, e);
            assert_eq!(seen.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_server_failure_is_general_failure() {
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let reply = vec![0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x00, 0x50];

        let (ret, _, seen) = run_against(&request, vec![(3, vec![0x05, 0x00]), (10, reply)]).await;

        assert!(matches!(ret, Err(Error::GeneralFailure)));
        assert_eq!(seen.len(), 1);
        assert!(matches!(reply_error(0x01), Some(Error::GeneralFailure)));
    }

    #[tokio::test]
    async fn test_write_failure_short_circuits() {
        let (mut client, server) = tokio::io::duplex(1024);
        drop(server);

        let mut seen = Vec::new();
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let ret = Socks5Handshake::new(&mut client, &request)
            .observe(|addr: &Address| seen.push(addr.clone()))
            .run()
            .await;

        let e = ret.unwrap_err();
        assert!(e.is_transport());
        assert!(matches!(e, Error::Io(_)), "{:?}", e);
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_atyp_is_general_failure() {
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let mut reply = OK_IPV4_REPLY.to_vec();
        reply[3] = 0x02;

        let (ret, _, seen) = run_against(&request, vec![(3, vec![0x05, 0x00]), (10, reply)]).await;

        assert!(matches!(ret, Err(Error::GeneralFailure)));
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_eof_inside_extension_read() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let proxy = tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            server.read_exact(&mut greeting).await.unwrap();
            server.write_all(&[0x05, 0x00]).await.unwrap();

            let mut connect = [0u8; 10];
            server.read_exact(&mut connect).await.unwrap();
            // IPv6 header, the 12 remaining address bytes never arrive
            let mut reply = vec![0x05, 0x00, 0x00, 0x04];
            reply.extend_from_slice(&[0u8; 6]);
            server.write_all(&reply).await.unwrap();
        });

        let mut seen = Vec::new();
        let request = HandshakeRequest::new("10.0.0.2", 80);
        let ret = Socks5Handshake::new(&mut client, &request)
            .observe(|addr: &Address| seen.push(addr.clone()))
            .run()
            .await;

        assert!(matches!(ret, Err(Error::Eof)));
        assert!(seen.is_empty());
        proxy.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                let mut greeting = [0u8; 3];
                server.read_exact(&mut greeting).await.unwrap();
                // never answer, tear the handshake down instead
                token.cancel();
                server
            })
        };

        let request = HandshakeRequest::new("10.0.0.2", 80);
        let ret = Socks5Handshake::new(&mut client, &request).cancel_on(token).run().await;

        assert!(matches!(ret, Err(Error::Aborted)));
        let _server = canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_handshakes_are_isolated() {
        let (mut c1, s1) = tokio::io::duplex(1024);
        let (mut c2, s2) = tokio::io::duplex(1024);

        let mut v6_reply = vec![0x05, 0x00, 0x00, 0x04];
        v6_reply.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        v6_reply.extend_from_slice(&[0x00, 0x02]);

        let p1 = tokio::spawn(scripted_proxy(s1, vec![
            (4, vec![0x05, 0x02]),
            (3 + 1 + 1, vec![0x01, 0x00]),
            (10, OK_IPV4_REPLY.to_vec()),
        ]));
        let p2 = tokio::spawn(scripted_proxy(s2, vec![
            (3, vec![0x05, 0x00]),
            (22, v6_reply),
        ]));

        let r1 = HandshakeRequest::new("10.0.0.1", 1).credentials("u", "p");
        let r2 = HandshakeRequest::new("::2", 2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let (seen1, seen2) = (seen.clone(), seen.clone());
        let h1 = Socks5Handshake::new(&mut c1, &r1)
            .observe(move |a: &Address| seen1.lock().unwrap().push((1, a.clone())))
            .run();
        let h2 = Socks5Handshake::new(&mut c2, &r2)
            .observe(move |a: &Address| seen2.lock().unwrap().push((2, a.clone())))
            .run();

        let (ret1, ret2) = tokio::join!(h1, h2);
        ret1.unwrap();
        ret2.unwrap();
        drop(c1);
        drop(c2);

        let sent1 = p1.await.unwrap();
        let sent2 = p2.await.unwrap();
        assert_eq!(sent1.len(), 4 + 5 + 10);
        assert_eq!(&sent1[9 + 4..9 + 8], &[10, 0, 0, 1]);
        assert_eq!(sent2.len(), 3 + 22);
        assert_eq!(sent2[3 + 3], SOCKS5_ATYP_IPV6);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by_key(|(id, _)| *id);
        assert_eq!(seen[0].1.to_string(), "127.0.0.1:1080");
        assert_eq!(seen[1].1.to_string(), "[::1]:2");
    }

    #[test]
    fn test_reply_len() {
        let header = [0x05, 0x00, 0x00, 0x03, 20, 0, 0, 0, 0, 0];
        assert_eq!(reply_len(SOCKS5_ATYP_IPV4, &header), Some(10));
        assert_eq!(reply_len(SOCKS5_ATYP_IPV6, &header), Some(22));
        assert_eq!(reply_len(SOCKS5_ATYP_DOMAIN_NAME, &header), Some(27));
        assert_eq!(reply_len(0x07, &header), None);
    }
}
