//! Cryptographic primitives behind the codec, gathered behind a small
//! injectable facade so tests can swap in deterministic doubles without
//! touching the wire-format code in `codec`.
//!
//! A thin set of capabilities the protocol code calls through, with one
//! production implementation backed by real primitives.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use ed25519_dalek::{hazmat::ExpandedSecretKey, Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::{OsRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CodecError;
use crate::peer_id::PeerId;

/// A peer's long-lived keypair: an Ed25519 signing key whose public point
/// doubles, via birational conversion, as an X25519 agreement key.
pub struct PeerSecretKey(SigningKey);

impl PeerSecretKey {
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    pub fn from_bytes(b: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(b))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn peer_id(&self) -> PeerId {
        PeerId::from_bytes(self.0.verifying_key().to_bytes())
    }

    /// The clamped X25519 scalar backing this key's Ed25519 signatures,
    /// reused verbatim as the static Diffie-Hellman secret. Ed25519 and
    /// X25519 clamping are bit-identical, so no re-derivation is needed.
    fn x25519_static_secret(&self) -> StaticSecret {
        let expanded = ExpandedSecretKey::from(&self.0);
        StaticSecret::from(expanded.scalar.to_bytes())
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }
}

/// A single-use X25519 keypair generated fresh for one outbound message and
/// retained by the caller across a request/reply pair for the 0-RTT rule.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    secret: [u8; 32],
    #[zeroize(skip)]
    public: [u8; 32],
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret: secret.to_bytes(), public: public.to_bytes() }
    }

    #[inline(always)]
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public
    }
}

/// A raw X25519 shared secret, used directly as the ChaCha20 key with no
/// KDF step: every message uses a freshly generated ephemeral key, so the
/// secret is never reused across more than the one encrypt/decrypt it was
/// computed for.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

/// The capabilities the codec needs from the cryptographic layer, factored
/// out so test code can substitute a deterministic double for scenarios
/// that need reproducible ciphertext.
pub trait CryptoSuite {
    /// Diffie-Hellman using a peer's long-lived static scalar against an
    /// arbitrary raw Montgomery public key (used when decoding a request:
    /// the recipient's own static key against the sender's embedded
    /// ephemeral public key).
    fn diffie_hellman_static(&self, local: &PeerSecretKey, remote_public: &[u8; 32]) -> Result<SharedSecret, CodecError>;
    /// Diffie-Hellman using a freshly generated ephemeral scalar (used on
    /// every encode, and when decoding a reply against one's own retained
    /// ephemeral key).
    fn diffie_hellman_ephemeral(&self, local: &EphemeralKeyPair, remote_public: &[u8; 32]) -> Result<SharedSecret, CodecError>;
    fn apply_keystream(&self, secret: &SharedSecret, message_id: u32, data: &mut [u8]);
    fn sign(&self, local: &PeerSecretKey, signed_region: &[u8]) -> [u8; 64];
    fn verify(&self, signer: &PeerId, signed_region: &[u8], signature: &[u8; 64]) -> bool;
}

/// Production implementation backed by `x25519-dalek`, `ed25519-dalek`, and
/// `chacha20`.
#[derive(Default)]
pub struct DefaultCryptoSuite;

impl DefaultCryptoSuite {
    fn nonce_for(message_id: u32) -> [u8; 12] {
        let mut nonce = [0_u8; 12];
        nonce[0..4].copy_from_slice(&message_id.to_be_bytes());
        nonce
    }
}

impl CryptoSuite for DefaultCryptoSuite {
    fn diffie_hellman_static(&self, local: &PeerSecretKey, remote_public: &[u8; 32]) -> Result<SharedSecret, CodecError> {
        let shared = local.x25519_static_secret().diffie_hellman(&PublicKey::from(*remote_public));
        Ok(SharedSecret(shared.to_bytes()))
    }

    fn diffie_hellman_ephemeral(&self, local: &EphemeralKeyPair, remote_public: &[u8; 32]) -> Result<SharedSecret, CodecError> {
        let secret = StaticSecret::from(local.secret);
        let shared = secret.diffie_hellman(&PublicKey::from(*remote_public));
        Ok(SharedSecret(shared.to_bytes()))
    }

    fn apply_keystream(&self, secret: &SharedSecret, message_id: u32, data: &mut [u8]) {
        let mut cipher = ChaCha20::new(&secret.0.into(), &Self::nonce_for(message_id).into());
        cipher.apply_keystream(data);
    }

    fn sign(&self, local: &PeerSecretKey, signed_region: &[u8]) -> [u8; 64] {
        local.sign(signed_region)
    }

    fn verify(&self, signer: &PeerId, signed_region: &[u8], signature: &[u8; 64]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let signature = Signature::from_bytes(signature);
        verifying_key.verify(signed_region, &signature).is_ok()
    }
}

/// Fills `out` with cryptographically random bytes, used by callers that
/// need to mint fresh message ids.
pub fn random_bytes(out: &mut [u8]) {
    OsRng.fill_bytes(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_and_ephemeral_agreement_cross_the_edwards_montgomery_conversion() {
        let alice = PeerSecretKey::generate();
        let bob_ephemeral = EphemeralKeyPair::generate();
        let suite = DefaultCryptoSuite;

        let alice_x25519_public = alice.peer_id().to_x25519_public().unwrap();
        let from_bob = suite.diffie_hellman_ephemeral(&bob_ephemeral, &alice_x25519_public).unwrap();
        let from_alice = suite.diffie_hellman_static(&alice, &bob_ephemeral.public_bytes()).unwrap();
        assert_eq!(from_bob.0, from_alice.0);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let key = PeerSecretKey::generate();
        let suite = DefaultCryptoSuite;
        let region = b"signed region bytes";
        let sig = suite.sign(&key, region);
        assert!(suite.verify(&key.peer_id(), region, &sig));
    }

    #[test]
    fn tampered_signed_region_fails_verification() {
        let key = PeerSecretKey::generate();
        let suite = DefaultCryptoSuite;
        let sig = suite.sign(&key, b"original");
        assert!(!suite.verify(&key.peer_id(), b"tampered!", &sig));
    }

    #[test]
    fn keystream_round_trips_through_encrypt_decrypt() {
        let suite = DefaultCryptoSuite;
        let secret = SharedSecret([7_u8; 32]);
        let mut data = b"hello world plaintext".to_vec();
        let original = data.clone();
        suite.apply_keystream(&secret, 42, &mut data);
        assert_ne!(data, original);
        suite.apply_keystream(&secret, 42, &mut data);
        assert_eq!(data, original);
    }
}
