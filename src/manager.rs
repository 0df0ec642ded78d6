//! The one contract the codec needs from the rest of the system: resolving
//! a short id or a full `PeerId` to an address and the key material needed
//! to encrypt or verify for it.
//!
//! A `parking_lot`-guarded, read-mostly map queried far more often than it
//! is written.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::crypto::PeerSecretKey;
use crate::error::CodecError;
use crate::peer_address::PeerAddress;
use crate::peer_id::PeerId;

/// Resolves peers by short id (for inbound demux) or by full id (for
/// outbound key lookup). Implementations are expected to be cheap to call
/// from the hot decode/encode path; the production implementation is a
/// `parking_lot::RwLock`-guarded table, not a blocking network call.
pub trait PeerAddressManager {
    /// Resolve the 32-bit short id embedded in an inbound XOR-overlap pack
    /// to the full peer address and its signing key. Returns
    /// [`CodecError::UnknownRecipient`] when this host does not recognize
    /// the short id as one of its own.
    fn get_peer_address_from_short_id(&self, short_id: u32) -> Result<(PeerAddress, PeerSecretKey), CodecError>;

    /// Resolve a full `PeerId` to its address and signing key. Returns
    /// [`CodecError::UnknownSender`] when encoding a message to/from a peer
    /// this host has no key material for.
    fn get_peer_address_from_id(&self, id: &PeerId) -> Result<(PeerAddress, PeerSecretKey), CodecError>;
}

/// An in-memory `PeerAddressManager` double, used by this crate's own tests
/// and available to callers that want a working manager without standing up
/// real peer storage.
#[derive(Default)]
pub struct InMemoryPeerAddressManager {
    by_id: RwLock<HashMap<PeerId, (PeerAddress, [u8; 32])>>,
}

impl InMemoryPeerAddressManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: PeerAddress, secret: &PeerSecretKey) {
        let id = secret.peer_id();
        self.by_id.write().insert(id, (address, secret_bytes(secret)));
    }
}

/// `ed25519_dalek::SigningKey` does not expose its bytes through a public
/// safe accessor outside of `to_bytes`, so this helper keeps the one
/// `to_bytes()` call site in one place.
fn secret_bytes(secret: &PeerSecretKey) -> [u8; 32] {
    secret.to_bytes()
}

impl PeerAddressManager for InMemoryPeerAddressManager {
    fn get_peer_address_from_short_id(&self, short_id: u32) -> Result<(PeerAddress, PeerSecretKey), CodecError> {
        let table = self.by_id.read();
        table
            .iter()
            .find(|(id, _)| id.short() == short_id)
            .map(|(_, (addr, secret))| (addr.clone(), PeerSecretKey::from_bytes(secret)))
            .ok_or(CodecError::UnknownRecipient)
    }

    fn get_peer_address_from_id(&self, id: &PeerId) -> Result<(PeerAddress, PeerSecretKey), CodecError> {
        let table = self.by_id.read();
        table
            .get(id)
            .map(|(addr, secret)| (addr.clone(), PeerSecretKey::from_bytes(secret)))
            .ok_or(CodecError::UnknownSender)
    }
}
