//! Wire-level message codec for a peer-to-peer DHT transport.
//!
//! This crate owns exactly one thing: turning a populated [`message::Message`]
//! into a single authenticated, encrypted datagram and back. It does not open
//! sockets, does not route packets, and does not know anything about DHT
//! semantics above the frame boundary — see [`manager::PeerAddressManager`]
//! for the one contract it needs from the rest of the system.
//!
//! Wire format, invariants, and error semantics are documented on
//! [`codec::encode`], [`codec::decode_header`], and [`codec::decode_payload`].

pub mod buffer;
pub mod builder;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod manager;
pub mod message;
pub mod peer_address;
pub mod peer_id;

pub use buffer::Buffer;
pub use codec::{decode_header, decode_payload, encode, peek_protocol_type, peek_protocol_type_byte, MessageHeader};
pub use error::CodecError;
pub use manager::PeerAddressManager;
pub use message::{Message, MessageOptions, MessageType, ProtocolType};
pub use peer_address::PeerAddress;
pub use peer_id::PeerId;
