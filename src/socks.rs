// SOCKS: A protocol for TCP proxy across firewalls
// https://www.openssh.com/txt/socks4.protocol
//
// SOCKS Protocol Version 5
// https://tools.ietf.org/html/rfc1928
//
// Username/Password Authentication for SOCKS V5
// https://tools.ietf.org/html/rfc1929


// Client side only: SOCKS4 CONNECT, SOCKS5 CONNECT.

pub const SOCKS_V4: u8 = 0x04;
pub const SOCKS_V5: u8 = 0x05;

pub const SOCKS_CMD_CONNECT: u8 = 0x01;

// SOCKS-4 reply:
//
// +----+----+----+----+----+----+----+----+
// | VN | CD | DSTPORT |      DSTIP        |
// +----+----+----+----+----+----+----+----+
//    1    1      2              4
//
// VN is the version of the reply code and should be 0, CD is one of:
//
//     90: request granted
//     91: request rejected or failed
//     92: request rejected because SOCKS server cannot connect to the target
//     93: request rejected because the client program and identd report different user-ids
pub const SOCKS4_REPLY_LEN: usize = 8;

pub const SOCKS4_REP_REQUEST_GRANTED: u8  = 90;
pub const SOCKS4_REP_REQUEST_REJECTED: u8 = 91;
pub const SOCKS4_REP_CANNOT_CONNECT: u8   = 92;
pub const SOCKS4_REP_DIFFERENT_USER_ID: u8 = 93;

// SOCKS-5 reply code:
//
// o  X'00' succeeded
// o  X'01' general SOCKS server failure
// o  X'02' connection not allowed by ruleset
// o  X'03' Network unreachable
// o  X'04' Host unreachable
// o  X'05' Connection refused
// o  X'06' TTL expired
// o  X'07' Command not supported
// o  X'08' Address type not supported
// o  X'09' to X'FF' unassigned
pub const SOCKS5_REP_SUCCEEDED: u8                         = 0x00;
pub const SOCKS5_REP_GENERAL_SERVER_FAILURE: u8            = 0x01;
pub const SOCKS5_REP_CONNECTION_NOT_ALLOWED_BY_RULESET: u8 = 0x02;
pub const SOCKS5_REP_NETWORK_UNREACHABLE: u8               = 0x03;
pub const SOCKS5_REP_HOST_UNREACHABLE: u8                  = 0x04;
pub const SOCKS5_REP_CONNECTION_REFUSED: u8                = 0x05;
pub const SOCKS5_REP_TTL_EXPIRED: u8                       = 0x06;
pub const SOCKS5_REP_COMMAND_NOT_SUPPORTED: u8             = 0x07;
pub const SOCKS5_REP_ADDRESS_TYPE_NOT_SUPPORTED: u8        = 0x08;

// ATYP   address type of following address
//
//     o  IP V4 address: X'01'
//     o  DOMAINNAME: X'03'
//     o  IP V6 address: X'04'
pub const SOCKS5_ATYP_IPV4: u8        = 0x01;
pub const SOCKS5_ATYP_DOMAIN_NAME: u8 = 0x03;
pub const SOCKS5_ATYP_IPV6: u8        = 0x04;

// METHOD values offered by this client:
//
//       o  X'00' NO AUTHENTICATION REQUIRED
//       o  X'02' USERNAME/PASSWORD
//       o  X'FF' NO ACCEPTABLE METHODS (server answer only)
pub const SOCKS5_METHOD_NO_AUTH: u8       = 0x00;
pub const SOCKS5_METHOD_PASSWD_AUTH: u8   = 0x02;
pub const SOCKS5_METHOD_NO_ACCEPTABLE: u8 = 0xFF;

// RFC 1929 sub-negotiation version and the only success status.
pub const SOCKS5_AUTH_VERSION: u8        = 0x01;
pub const SOCKS5_AUTH_STATUS_SUCCESS: u8 = 0x00;

// VER + REP + RSV + ATYP
pub const SOCKS5_REPLY_HEADER_LEN: usize = 4;
// The smallest complete reply: header + IPv4 address + port.
pub const SOCKS5_REPLY_MIN_LEN: usize = SOCKS5_REPLY_HEADER_LEN + 4 + 2;
