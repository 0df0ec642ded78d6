//! `PeerId` (`Number256`): the 32-byte identifier that is simultaneously a
//! peer's Ed25519 verification key and, via a birational curve conversion,
//! its X25519 agreement key.

use curve25519_dalek::edwards::CompressedEdwardsY;

/// Size in bytes of a `PeerId`.
pub const PEER_ID_SIZE: usize = 32;

/// Size in bytes of the XOR-overlapped sender⊕recipient pack.
pub const XOR_OVERLAP_PACK_SIZE: usize = 36;

/// A 32-byte peer identifier ("Number256" in this system's data model).
///
/// In this system a `PeerId` *is* the peer's Ed25519 public key. Its use as
/// a Curve25519 agreement key is realized through
/// [`PeerId::to_x25519_public`], a lossless conversion of the same curve
/// point from twisted Edwards to Montgomery form — see DESIGN.md for why
/// this, rather than storing two unrelated keys, was chosen.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; PEER_ID_SIZE]);

impl PeerId {
    #[inline(always)]
    pub const fn from_bytes(b: [u8; PEER_ID_SIZE]) -> Self {
        Self(b)
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; PEER_ID_SIZE] {
        &self.0
    }

    /// The 32-bit demultiplexing hint: the big-endian integer formed by this
    /// id's first 4 bytes. Used as the "short id" in the XOR-overlap pack.
    #[inline(always)]
    pub fn short(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Convert this id's Ed25519 (twisted Edwards) point into its Curve25519
    /// (Montgomery) u-coordinate, for use as an X25519 agreement public key.
    ///
    /// Returns `None` if the bytes are not a valid compressed Edwards point
    /// (i.e. this is not a genuine peer identity, just arbitrary bytes).
    pub fn to_x25519_public(&self) -> Option<[u8; 32]> {
        CompressedEdwardsY(self.0).decompress().map(|p| p.to_montgomery().to_bytes())
    }

    /// Pack `sender` and `recipient` into the 36-byte XOR-overlapped form.
    ///
    /// Layout: bytes `0..4` are `sender[0..4]` untouched; bytes `4..32` are
    /// `sender[4..32] XOR recipient[0..28]`; bytes `32..36` are
    /// `recipient[28..32]` untouched.
    pub fn xor_overlapped_by4(sender: &PeerId, recipient: &PeerId) -> [u8; XOR_OVERLAP_PACK_SIZE] {
        let mut out = [0_u8; XOR_OVERLAP_PACK_SIZE];
        out[0..32].copy_from_slice(&sender.0);
        for i in 0..28 {
            out[4 + i] ^= recipient.0[i];
        }
        out[32..36].copy_from_slice(&recipient.0[28..32]);
        out
    }

    /// Recover the sender id from a 36-byte XOR-overlapped pack, given the
    /// *local* (recipient's own) id. This is the inverse of
    /// [`PeerId::xor_overlapped_by4`]: XORing the known recipient bytes back
    /// in cancels the overlap.
    ///
    /// `sender_short` is redundant with the recovered id's own `short()` —
    /// it is exposed separately purely so a receiver can key its inbound
    /// demux table off the raw packed bytes without waiting for the full
    /// reconstruction. Both must agree; mismatched short ids are a
    /// `PeerId` constructed incorrectly by the caller, so this function does
    /// not validate that invariant itself.
    pub fn de_xor_overlapped_by4(local_recipient: &PeerId, packed: &[u8; XOR_OVERLAP_PACK_SIZE], _sender_short: u32) -> PeerId {
        let mut sender = [0_u8; PEER_ID_SIZE];
        for i in 0..PEER_ID_SIZE {
            let overlap = if i >= 4 { local_recipient.0[i - 4] } else { 0 };
            sender[i] = packed[i] ^ overlap;
        }
        PeerId(sender)
    }

    /// The recipient short id embedded at the end of a packed id: the
    /// big-endian integer at offset 32..36.
    #[inline(always)]
    pub fn recipient_short_from_pack(packed: &[u8; XOR_OVERLAP_PACK_SIZE]) -> u32 {
        u32::from_be_bytes([packed[32], packed[33], packed[34], packed[35]])
    }

    /// The sender short id embedded at the start of a packed id: the
    /// big-endian integer at offset 0..4.
    #[inline(always)]
    pub fn sender_short_from_pack(packed: &[u8; XOR_OVERLAP_PACK_SIZE]) -> u32 {
        u32::from_be_bytes([packed[0], packed[1], packed[2], packed[3]])
    }
}

impl core::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in &self.0[0..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(fill: u8) -> PeerId {
        PeerId([fill; PEER_ID_SIZE])
    }

    #[test]
    fn xor_overlap_pack_layout_for_repeated_fill_bytes() {
        // sender = 0x01 repeated, recipient = 0x02 repeated.
        let sender = id(0x01);
        let recipient = id(0x02);
        let packed = PeerId::xor_overlapped_by4(&sender, &recipient);
        assert_eq!(&packed[0..4], &[0x01, 0x01, 0x01, 0x01]);
        assert_eq!(&packed[4..32], &[0x03_u8; 28][..]);
        assert_eq!(&packed[32..36], &[0x02, 0x02, 0x02, 0x02]);
    }

    #[test]
    fn xor_overlap_round_trips_for_arbitrary_pairs() {
        let cases: [(u8, u8); 5] = [(0x01, 0x02), (0x00, 0xff), (0xaa, 0x55), (0x7f, 0x80), (0x11, 0xee)];
        for (a_fill, b_fill) in cases {
            let a = id(a_fill);
            let b = id(b_fill);
            let packed = PeerId::xor_overlapped_by4(&b, &a);
            let recovered = PeerId::de_xor_overlapped_by4(&a, &packed, b.short());
            assert_eq!(recovered, b, "failed for fills {a_fill:#x}/{b_fill:#x}");
        }
    }

    #[test]
    fn xor_overlap_round_trips_for_non_uniform_bytes() {
        let mut sender_bytes = [0_u8; PEER_ID_SIZE];
        let mut recipient_bytes = [0_u8; PEER_ID_SIZE];
        for i in 0..PEER_ID_SIZE {
            sender_bytes[i] = (i as u8).wrapping_mul(7).wrapping_add(3);
            recipient_bytes[i] = (i as u8).wrapping_mul(13).wrapping_add(41);
        }
        let sender = PeerId(sender_bytes);
        let recipient = PeerId(recipient_bytes);
        let packed = PeerId::xor_overlapped_by4(&sender, &recipient);
        let recovered = PeerId::de_xor_overlapped_by4(&recipient, &packed, sender.short());
        assert_eq!(recovered, sender);
        assert_eq!(PeerId::recipient_short_from_pack(&packed), recipient.short());
        assert_eq!(PeerId::sender_short_from_pack(&packed), sender.short());
    }

    #[test]
    fn short_id_is_leading_four_bytes_big_endian() {
        let p = PeerId([0x0a, 0x0b, 0x0c, 0x0d, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(p.short(), 0x0a0b0c0d);
    }
}
