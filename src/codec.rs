//! Encoding and decoding of the datagram wire format.
//!
//! Layout, all integers big-endian:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0  | 4  | protocol type (2 bits) + version (30 bits) |
//! | 4  | 4  | message id |
//! | 8  | 36 | sender⊕recipient XOR-overlap pack |
//! | 44 | 32 | ephemeral X25519 public key |
//! | 76 | *  | ChaCha20 ciphertext: inner sender `PeerAddress`, type/options, command, payload |
//! | end-64 | 64 | Ed25519 signature over `[0, end-64)` |
//!
//! Decoding is split into [`decode_header`] (cheap, no crypto, just enough
//! to demux and recover the sender's id) and [`decode_payload`] (does the
//! Diffie-Hellman, decrypts, and checks the signature), so a caller can
//! triage which local key material applies — its own static key for a
//! fresh request, or a retained ephemeral key for an expected reply —
//! before paying for decryption.

use std::net::SocketAddr;

use crate::buffer::Buffer;
use crate::crypto::{CryptoSuite, EphemeralKeyPair, PeerSecretKey};
use crate::error::CodecError;
use crate::manager::PeerAddressManager;
use crate::message::{Message, MessageOptions, MessageType, ProtocolType};
use crate::peer_address::PeerAddress;
use crate::peer_id::{PeerId, XOR_OVERLAP_PACK_SIZE};

/// Hard floor below which a buffer cannot possibly hold a valid datagram:
/// the 76-byte cleartext header, zero-length ciphertext region, and the
/// 64-byte trailing signature.
pub const HEADER_SIZE_MIN: usize = 156;

/// Upper bound on an encoded datagram this crate will produce or accept.
/// Chosen to comfortably clear a single Ethernet-MTU UDP payload; larger
/// requests are rejected as [`CodecError::BufferTooSmall`] rather than
/// fragmented.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

const CIPHERTEXT_START: usize = 76;
const SIGNATURE_SIZE: usize = 64;
const VERSION_MASK: u32 = 0x3FFF_FFFF;

/// Read the 2-bit protocol type out of the 4-byte version-and-type word
/// without decoding anything else. `word` is the big-endian `u32` at
/// offset 0.
#[inline(always)]
pub fn peek_protocol_type(word: u32) -> ProtocolType {
    ProtocolType::from_bits((word >> 30) as u8)
}

/// Single-byte variant of [`peek_protocol_type`] for callers that only have
/// the first byte of the datagram on hand (e.g. a demuxer inspecting a
/// `recvmsg` scatter list before committing to read the rest). `u8 >> 6`
/// is a logical shift in Rust regardless of signedness, so there is no
/// sign-extension hazard here the way there would be shifting a signed
/// byte type.
#[inline(always)]
pub fn peek_protocol_type_byte(first_byte: u8) -> ProtocolType {
    ProtocolType::from_bits(first_byte >> 6)
}

fn version_and_type(protocol_type: ProtocolType, version: u32) -> u32 {
    ((protocol_type.to_bits() as u32) << 30) | (version & VERSION_MASK)
}

/// The cheap, crypto-free triage result of inspecting an inbound datagram:
/// enough to decide which local key material applies before paying for a
/// Diffie-Hellman and a ChaCha20 pass.
pub struct MessageHeader {
    pub protocol_type: ProtocolType,
    pub version: u32,
    pub message_id: u32,
    pub sender_id: PeerId,
    pub recipient_id: PeerId,
    pub recipient_address: PeerAddress,
    pub recipient_secret: PeerSecretKey,
    pub ephemeral_public: [u8; 32],
    total_len: usize,
}

/// Encode `msg` into a fresh datagram.
///
/// The sender's own private key is resolved via
/// `manager.get_peer_address_from_id`: a sender this host has no key
/// material for is [`CodecError::UnknownSender`], not a panic. A
/// fresh ephemeral keypair is generated for the Diffie-Hellman step and
/// stored back into `msg.ephemeral`; the caller must retain it to decode an
/// eventual reply (the 0-RTT rule: requests encrypt to the recipient's
/// static key, replies encrypt to the requester's ephemeral key).
///
/// Preconditions: `msg.sender.peer_id` and `msg.recipient.peer_id` must be
/// set, and for a reply, `msg.reply_to_ephemeral_public` must be set.
///
/// The 0-RTT rule (spec.md §4.2 step 6) is driven by
/// `msg.reply_to_ephemeral_public`, not by `msg.message_type`: the wire's
/// type nibble is an opaque, caller-defined value (see
/// [`crate::message::MessageType`]) and must not gate which key material
/// this step uses. A present `reply_to_ephemeral_public` means "encrypt to
/// the requester's ephemeral key"; its absence means "encrypt to the
/// recipient's static key" — exactly spec.md's `ephRemote ?? recipient.peerId`.
pub fn encode(msg: &mut Message, manager: &impl PeerAddressManager, crypto: &impl CryptoSuite) -> Result<Buffer<MAX_DATAGRAM_SIZE>, CodecError> {
    let sender_id = msg.sender.peer_id.ok_or(CodecError::MalformedPeerAddress)?;
    let recipient_id = msg.recipient.peer_id.ok_or(CodecError::MalformedPeerAddress)?;
    let (_, local_secret) = manager.get_peer_address_from_id(&sender_id)?;

    let ephemeral = EphemeralKeyPair::generate();
    let remote_public = match msg.reply_to_ephemeral_public {
        Some(ephemeral_remote) => ephemeral_remote,
        None => recipient_id.to_x25519_public().ok_or(CodecError::CryptoFailure)?,
    };
    let shared = crypto.diffie_hellman_ephemeral(&ephemeral, &remote_public)?;

    let encode_for_ipv4 = msg.sender.socket.is_ipv4();
    let inner_sender = PeerAddress::new(None, msg.sender.socket, msg.sender.features);
    let inner_addr_size = inner_sender.encoded_size(true, encode_for_ipv4);
    let ciphertext_len = inner_addr_size + 1 + 1 + msg.payload.len();
    let total_len = CIPHERTEXT_START + ciphertext_len + SIGNATURE_SIZE;
    if total_len > Buffer::<MAX_DATAGRAM_SIZE>::CAPACITY {
        return Err(CodecError::BufferTooSmall);
    }

    let mut out: Buffer<MAX_DATAGRAM_SIZE> = Buffer::new();
    out.append_u32(version_and_type(msg.protocol_type, msg.version)).map_err(|_| CodecError::BufferTooSmall)?;
    out.append_u32(msg.message_id).map_err(|_| CodecError::BufferTooSmall)?;
    out.append_bytes_fixed(&PeerId::xor_overlapped_by4(&sender_id, &recipient_id)).map_err(|_| CodecError::BufferTooSmall)?;
    out.append_bytes_fixed(&ephemeral.public_bytes()).map_err(|_| CodecError::BufferTooSmall)?;

    let ciphertext_start = out.len();
    inner_sender.encode(&mut out, true, encode_for_ipv4).map_err(|_| CodecError::BufferTooSmall)?;
    out.append_u8((msg.message_type.to_bits() << 4) | msg.options.to_bits()).map_err(|_| CodecError::BufferTooSmall)?;
    out.append_u8(msg.command).map_err(|_| CodecError::BufferTooSmall)?;
    out.append_bytes(&msg.payload).map_err(|_| CodecError::BufferTooSmall)?;
    debug_assert_eq!(out.len() - ciphertext_start, ciphertext_len);

    crypto.apply_keystream(&shared, msg.message_id, &mut out.as_bytes_mut()[ciphertext_start..]);

    let signature = crypto.sign(&local_secret, out.as_bytes());
    out.append_bytes_fixed(&signature).map_err(|_| CodecError::BufferTooSmall)?;

    msg.ephemeral = Some(ephemeral);
    Ok(out)
}

/// Parse the cleartext header of an inbound datagram and recover the
/// sender's full id via the XOR-overlap pack. Does no cryptography.
pub fn decode_header(buf: &[u8], manager: &impl PeerAddressManager) -> Result<MessageHeader, CodecError> {
    if buf.len() < HEADER_SIZE_MIN {
        return Err(CodecError::BufferTooSmall);
    }

    let version_and_type_word = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    let message_id = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    let xor_pack: [u8; XOR_OVERLAP_PACK_SIZE] = buf[8..44].try_into().unwrap();
    let ephemeral_public: [u8; 32] = buf[44..76].try_into().unwrap();

    let recipient_short = PeerId::recipient_short_from_pack(&xor_pack);
    let (recipient_address, recipient_secret) = manager.get_peer_address_from_short_id(recipient_short)?;
    let recipient_id = recipient_address.peer_id.ok_or(CodecError::MalformedPeerAddress)?;
    let sender_id = PeerId::de_xor_overlapped_by4(&recipient_id, &xor_pack, PeerId::sender_short_from_pack(&xor_pack));

    Ok(MessageHeader {
        protocol_type: peek_protocol_type(version_and_type_word),
        version: version_and_type_word & VERSION_MASK,
        message_id,
        sender_id,
        recipient_id,
        recipient_address,
        recipient_secret,
        ephemeral_public,
        total_len: buf.len(),
    })
}

/// Finish decoding a datagram whose header has already been triaged.
///
/// `reply_ephemeral` is the caller's retained ephemeral key from an earlier
/// outbound request with this message id, if this datagram is expected to
/// be the reply to it; `None` means "treat as a fresh request and use my
/// own static key". The caller, not this crate, owns the table of pending
/// outbound request ids needed to make that call.
///
/// `local` and `remote` are the transport-observed socket addresses this
/// datagram actually arrived on/from (spec.md §4.4 inputs). Per step 1 the
/// resolved recipient is bound to `local`, and per step 6b the decoded inner
/// sender is bound to `remote` rather than whatever IP/port it claims inside
/// the encrypted region — the encrypted region is attacker-controlled
/// plaintext once decrypted, so trusting its self-reported address would
/// throw away the anti-spoofing guarantee this field exists for.
///
/// Always returns `Ok` once the signature has been checked, even if it
/// failed: a bad signature is reported via [`Message::done`], not as an
/// error.
pub fn decode_payload(buf: &[u8], header: MessageHeader, reply_ephemeral: Option<&EphemeralKeyPair>, local: SocketAddr, remote: SocketAddr, crypto: &impl CryptoSuite) -> Result<Message, CodecError> {
    let signed_region_end = header.total_len - SIGNATURE_SIZE;
    let signed_region = &buf[0..signed_region_end];
    let signature: [u8; SIGNATURE_SIZE] = buf[signed_region_end..header.total_len].try_into().unwrap();
    let signature_valid = crypto.verify(&header.sender_id, signed_region, &signature);

    let shared = match reply_ephemeral {
        Some(eph) => crypto.diffie_hellman_ephemeral(eph, &header.ephemeral_public)?,
        None => crypto.diffie_hellman_static(&header.recipient_secret, &header.ephemeral_public)?,
    };

    let mut plaintext = buf[CIPHERTEXT_START..signed_region_end].to_vec();
    crypto.apply_keystream(&shared, header.message_id, &mut plaintext);

    let mut cursor = 0;
    let inner_sender = PeerAddress::decode(&plaintext, &mut cursor)
        .map_err(|_| CodecError::MalformedPeerAddress)?
        .with_peer_id(header.sender_id)
        .with_ip_socket(remote);

    let type_and_options = *plaintext.get(cursor).ok_or(CodecError::MalformedPeerAddress)?;
    cursor += 1;
    let message_type = MessageType::from_bits(type_and_options >> 4);
    let options = MessageOptions::from_bits(type_and_options);

    let command = *plaintext.get(cursor).ok_or(CodecError::MalformedPeerAddress)?;
    cursor += 1;

    let payload = plaintext[cursor..].to_vec();

    let recipient = header.recipient_address.with_ip_socket(local);

    Ok(Message {
        protocol_type: header.protocol_type,
        version: header.version,
        message_id: header.message_id,
        sender: inner_sender,
        recipient,
        message_type,
        options,
        command,
        payload,
        ephemeral: None,
        reply_to_ephemeral_public: Some(header.ephemeral_public),
        done: signature_valid,
    })
}
