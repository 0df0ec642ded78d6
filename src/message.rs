//! The in-memory `Message` model: what callers build before `codec::encode`
//! and what `codec::decode_payload` hands back.
//!
//! Small typed wrappers matching the wire bit widths, kept next to the
//! struct that carries them rather than off in a separate constants file:
//! a closed `#[repr(u8)]` enum for the 2-bit protocol type (the wire only
//! defines 4 meanings for it), and opaque nibble wrappers — matching
//! `MessageOptions` and `Message::command` — for fields spec.md leaves
//! open-ended.

use std::net::SocketAddr;

use crate::crypto::EphemeralKeyPair;
use crate::peer_address::PeerAddress;

/// The 2-bit transport discriminant carried in the top bits of the
/// version-and-type word at offset 0.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ProtocolType {
    Udp = 0,
    Kcp = 1,
    Kcp2 = 2,
    Kcp3 = 3,
}

impl ProtocolType {
    #[inline(always)]
    pub fn from_bits(b: u8) -> Self {
        match b & 0b11 {
            0 => Self::Udp,
            1 => Self::Kcp,
            2 => Self::Kcp2,
            _ => Self::Kcp3,
        }
    }

    #[inline(always)]
    pub fn to_bits(self) -> u8 {
        self as u8
    }
}

/// The 4-bit message type carried inside the encrypted region.
///
/// Spec's own data model calls this out as open-ended ("4-bit type
/// (request/ack/ok/…)"), so — exactly like [`MessageOptions`] and
/// `Message::command` — it is carried as an opaque nibble rather than a
/// closed enum. A handful of well-known values are named as associated
/// constants for readability at call sites; any of the 16 wire values
/// decodes successfully, including ones this crate has no name for.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct MessageType(pub u8);

impl MessageType {
    pub const REQUEST: Self = Self(0);
    pub const REPLY: Self = Self(1);
    pub const NOTIFICATION: Self = Self(2);

    #[inline(always)]
    pub fn from_bits(b: u8) -> Self {
        Self(b & 0b1111)
    }

    #[inline(always)]
    pub fn to_bits(self) -> u8 {
        self.0 & 0b1111
    }
}

/// The 4-bit options nibble carried alongside the message type. No bit
/// meanings are assigned beyond "options", so this crate carries it
/// opaquely, the same way [`PeerAddress::features`] is carried.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct MessageOptions(pub u8);

impl MessageOptions {
    pub const NONE: Self = Self(0);

    #[inline(always)]
    pub fn from_bits(b: u8) -> Self {
        Self(b & 0b1111)
    }

    #[inline(always)]
    pub fn to_bits(self) -> u8 {
        self.0 & 0b1111
    }
}

/// A fully-populated message, ready for [`crate::codec::encode`] or just
/// produced by [`crate::codec::decode_payload`].
pub struct Message {
    pub protocol_type: ProtocolType,
    /// 30-bit wire version, packed alongside `protocol_type` in the same word.
    pub version: u32,
    pub message_id: u32,
    pub sender: PeerAddress,
    pub recipient: PeerAddress,
    pub message_type: MessageType,
    pub options: MessageOptions,
    pub command: u8,
    pub payload: Vec<u8>,

    /// The ephemeral keypair used for this message's Diffie-Hellman step.
    ///
    /// On encode of a request this is generated fresh and returned to the
    /// caller, who must retain it to decode the eventual reply (the 0-RTT
    /// rule). On encode of a reply it is also generated fresh, DH'd
    /// against `reply_to_ephemeral_public`, and discarded.
    pub ephemeral: Option<EphemeralKeyPair>,

    /// The requester's ephemeral public key from the original request,
    /// required to encode a reply and to decode one's own reply.
    pub reply_to_ephemeral_public: Option<[u8; 32]>,

    /// Set by `decode_payload` to reflect whether the trailing Ed25519
    /// signature verified. A bad signature is not an error: it is data the
    /// caller inspects and discards the message for.
    pub done: bool,
}

impl Message {
    /// Build a minimal outbound request with no payload, local defaults for
    /// version/options, and an empty ephemeral slot (filled in by `encode`).
    pub fn new_request(sender: PeerAddress, recipient: PeerAddress, command: u8) -> Self {
        Self {
            protocol_type: ProtocolType::Udp,
            version: 0,
            message_id: 0,
            sender,
            recipient,
            message_type: MessageType::REQUEST,
            options: MessageOptions::NONE,
            command,
            payload: Vec::new(),
            ephemeral: None,
            reply_to_ephemeral_public: None,
            done: false,
        }
    }

    /// Build a reply addressed back at `request`'s sender, carrying forward
    /// the ephemeral public key the 0-RTT rule needs.
    pub fn new_reply(request: &Message, sender: PeerAddress, command: u8) -> Self {
        Self {
            protocol_type: request.protocol_type,
            version: request.version,
            message_id: request.message_id,
            sender,
            recipient: request.sender.clone(),
            message_type: MessageType::REPLY,
            options: MessageOptions::NONE,
            command,
            payload: Vec::new(),
            ephemeral: None,
            reply_to_ephemeral_public: request
                .reply_to_ephemeral_public
                .or_else(|| request.ephemeral.as_ref().map(EphemeralKeyPair::public_bytes)),
            done: false,
        }
    }

    #[inline(always)]
    pub fn sender_socket(&self) -> SocketAddr {
        self.sender.socket
    }

    #[inline(always)]
    pub fn recipient_socket(&self) -> SocketAddr {
        self.recipient.socket
    }
}
