//! Errors surfaced by the codec.
//!
//! Signature failure is deliberately absent here: it is not an exceptional
//! return, it is data — see [`crate::message::Message::done`].

/// Errors that can occur while encoding or decoding a datagram.
///
/// None of these are retried inside the codec; callers decide their own
/// recovery policy for each variant.
pub enum CodecError {
    /// The supplied buffer is smaller than `HEADER_SIZE_MIN` (156 bytes) on
    /// encode, or the inbound datagram is shorter than that on decode.
    BufferTooSmall,

    /// `decode_header` could not resolve the recipient short id via
    /// [`crate::manager::PeerAddressManager::get_peer_address_from_short_id`].
    /// The datagram is either misdirected or our key material has expired.
    UnknownRecipient,

    /// `encode` could not resolve the sender's own private key via
    /// [`crate::manager::PeerAddressManager::get_peer_address_from_id`].
    UnknownSender,

    /// An X25519, ChaCha20, or Ed25519 primitive failed in a way that is not
    /// itself meaningful data (as opposed to a failed signature check, which
    /// is surfaced via `Message::done`).
    CryptoFailure,

    /// The inner `PeerAddress` embedded in the encrypted region could not be
    /// parsed.
    MalformedPeerAddress,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small for a valid datagram"),
            Self::UnknownRecipient => f.write_str("unknown recipient short id"),
            Self::UnknownSender => f.write_str("unknown sender: no private key on file"),
            Self::CryptoFailure => f.write_str("cryptographic primitive failed"),
            Self::MalformedPeerAddress => f.write_str("malformed peer address in encrypted region"),
        }
    }
}

impl core::fmt::Debug for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for CodecError {}
