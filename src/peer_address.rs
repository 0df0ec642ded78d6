//! `PeerAddress`: an IP endpoint plus peer id plus feature flags, with a
//! compact wire encoding that elides whichever parts the caller already
//! knows from context.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::peer_id::PeerId;

const FLAG_IPV4: u8 = 0x01;
const FLAG_IPV6: u8 = 0x02;
const FLAG_PEER_ID_PRESENT: u8 = 0x04;

/// Upper bound on the encoded size of a `PeerAddress` with its peer id
/// suppressed (the larger of the IPv4/IPv6 forms). Used to size the
/// plaintext scratch buffer in `codec::encode`.
pub const MAX_SIZE_NO_PEER_ID: usize = 1 + 4 + 16 + 2 + 3;

/// An IP endpoint reachable at a given peer.
///
/// `peer_id` is `None` when this value was decoded with the peer id
/// suppressed (`skip_peer_id`); the caller is expected to attach the id it
/// already knows via [`PeerAddress::with_peer_id`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PeerAddress {
    pub peer_id: Option<PeerId>,
    pub socket: SocketAddr,
    /// Reserved capability bitmask; no bit meanings are defined, so this
    /// crate leaves the field opaque and round-trips it untouched.
    pub features: u32,
}

impl PeerAddress {
    pub fn new(peer_id: Option<PeerId>, socket: SocketAddr, features: u32) -> Self {
        Self { peer_id, socket, features }
    }

    #[inline(always)]
    pub fn with_peer_id(mut self, id: PeerId) -> Self {
        self.peer_id = Some(id);
        self
    }

    #[inline(always)]
    pub fn with_ip_socket(mut self, socket: SocketAddr) -> Self {
        self.socket = socket;
        self
    }

    /// Encode into `out`, suppressing the peer id when `skip_peer_id` is
    /// set and clearing whichever IP family flag does not match
    /// `encode_for_ipv4`. Exactly one of the IPv4/IPv6 flags is set on the
    /// wire, matching the outer transport's address family.
    pub fn encode(&self, out: &mut impl io::Write, skip_peer_id: bool, encode_for_ipv4: bool) -> io::Result<()> {
        let mut flags = if encode_for_ipv4 { FLAG_IPV4 } else { FLAG_IPV6 };
        if !skip_peer_id {
            flags |= FLAG_PEER_ID_PRESENT;
        }
        out.write_all(&[flags])?;

        if !skip_peer_id {
            let id = self.peer_id.as_ref().expect("PeerAddress::encode: peer id required but not set");
            out.write_all(id.as_bytes())?;
        }

        out.write_all(&self.features.to_be_bytes())?;

        if encode_for_ipv4 {
            let v4 = match self.socket.ip() {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(v6) => v6.to_ipv4().unwrap_or(Ipv4Addr::UNSPECIFIED),
            };
            out.write_all(&v4.octets())?;
        } else {
            let v6 = match self.socket.ip() {
                IpAddr::V6(v6) => v6,
                IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            };
            out.write_all(&v6.octets())?;
        }
        out.write_all(&self.socket.port().to_be_bytes())?;
        out.write_all(&[0_u8; 3])?;

        Ok(())
    }

    /// Decode from a byte slice starting at `cursor`, advancing it past the
    /// consumed bytes.
    pub fn decode(buf: &[u8], cursor: &mut usize) -> io::Result<Self> {
        let eof = || io::Error::new(io::ErrorKind::UnexpectedEof, "truncated peer address");

        let flags = *buf.get(*cursor).ok_or_else(eof)?;
        *cursor += 1;
        let has_id = flags & FLAG_PEER_ID_PRESENT != 0;
        let is_ipv4 = flags & FLAG_IPV4 != 0;
        let is_ipv6 = flags & FLAG_IPV6 != 0;
        if is_ipv4 == is_ipv6 {
            // Exactly one of the two family flags must be set.
            return Err(io::Error::new(io::ErrorKind::InvalidData, "peer address must set exactly one IP family flag"));
        }

        let peer_id = if has_id {
            let end = *cursor + 32;
            let bytes: [u8; 32] = buf.get(*cursor..end).ok_or_else(eof)?.try_into().unwrap();
            *cursor = end;
            Some(PeerId::from_bytes(bytes))
        } else {
            None
        };

        let features = {
            let end = *cursor + 4;
            let b: [u8; 4] = buf.get(*cursor..end).ok_or_else(eof)?.try_into().unwrap();
            *cursor = end;
            u32::from_be_bytes(b)
        };

        let ip = if is_ipv4 {
            let end = *cursor + 4;
            let b: [u8; 4] = buf.get(*cursor..end).ok_or_else(eof)?.try_into().unwrap();
            *cursor = end;
            IpAddr::V4(Ipv4Addr::from(b))
        } else {
            let end = *cursor + 16;
            let b: [u8; 16] = buf.get(*cursor..end).ok_or_else(eof)?.try_into().unwrap();
            *cursor = end;
            IpAddr::V6(Ipv6Addr::from(b))
        };

        let port = {
            let end = *cursor + 2;
            let b: [u8; 2] = buf.get(*cursor..end).ok_or_else(eof)?.try_into().unwrap();
            *cursor = end;
            u16::from_be_bytes(b)
        };

        *cursor += 3; // reserved

        Ok(Self { peer_id, socket: SocketAddr::new(ip, port), features })
    }

    /// Size in bytes this address will occupy on the wire for the given
    /// options, without actually encoding it.
    pub fn encoded_size(&self, skip_peer_id: bool, encode_for_ipv4: bool) -> usize {
        1 + if skip_peer_id { 0 } else { 32 } + 4 + if encode_for_ipv4 { 4 } else { 16 } + 2 + 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(fill: u8) -> PeerId {
        PeerId::from_bytes([fill; 32])
    }

    #[test]
    fn ipv4_round_trip_with_peer_id() {
        let addr = PeerAddress::new(Some(id(0x42)), "127.0.0.1:9999".parse().unwrap(), 0);
        let mut buf = Vec::new();
        addr.encode(&mut buf, false, true).unwrap();
        assert_eq!(buf.len(), addr.encoded_size(false, true));

        let mut cursor = 0;
        let decoded = PeerAddress::decode(&buf, &mut cursor).unwrap();
        assert_eq!(cursor, buf.len());
        assert_eq!(decoded.peer_id, Some(id(0x42)));
        assert_eq!(decoded.socket, addr.socket);
    }

    #[test]
    fn skip_peer_id_elides_the_32_bytes() {
        let addr = PeerAddress::new(Some(id(0x42)), "127.0.0.1:9999".parse().unwrap(), 0);
        let mut buf = Vec::new();
        addr.encode(&mut buf, true, true).unwrap();
        assert_eq!(buf.len(), addr.encoded_size(true, true));

        let mut cursor = 0;
        let decoded = PeerAddress::decode(&buf, &mut cursor).unwrap();
        assert_eq!(decoded.peer_id, None);
        let decoded = decoded.with_peer_id(id(0x42));
        assert_eq!(decoded.peer_id, Some(id(0x42)));
    }

    #[test]
    fn ipv6_sender_clears_ipv4_flag_and_costs_12_more_bytes() {
        let v4 = PeerAddress::new(None, "127.0.0.1:9999".parse().unwrap(), 0);
        let v6 = PeerAddress::new(None, "[::1]:9999".parse().unwrap(), 0);
        assert_eq!(v6.encoded_size(true, false) - v4.encoded_size(true, true), 12);

        let mut buf = Vec::new();
        v6.encode(&mut buf, true, false).unwrap();
        assert_eq!(buf[0] & FLAG_IPV4, 0);
        assert_eq!(buf[0] & FLAG_IPV6, FLAG_IPV6);

        let mut cursor = 0;
        let decoded = PeerAddress::decode(&buf, &mut cursor).unwrap();
        assert_eq!(decoded.socket.ip(), "::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn max_size_no_peer_id_bounds_both_families() {
        let v4 = PeerAddress::new(None, "127.0.0.1:1".parse().unwrap(), 0);
        let v6 = PeerAddress::new(None, "[::1]:1".parse().unwrap(), 0);
        assert!(v4.encoded_size(true, true) <= MAX_SIZE_NO_PEER_ID);
        assert!(v6.encoded_size(true, false) <= MAX_SIZE_NO_PEER_ID);
    }
}
