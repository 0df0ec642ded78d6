//! The out-of-scope send/shutdown contract this codec is built to serve,
//! reproduced here only as plain types — not as a working sender, since the
//! transport socket and request/response matching live above this crate's
//! boundary.
//!
//! The send surface is a configuration record handed to one `send` call,
//! not a fluent fn-chaining builder, and shutdown is a lifecycle state a
//! caller checks rather than a shared future every in-flight task has to
//! poll.

use crate::message::Message;
use crate::peer_address::PeerAddress;

/// Everything needed to place one outbound request. A plain record rather
/// than a chained `SendBuilder`: nothing here needs to be set in sequence
/// or validated incrementally.
pub struct SendConfig {
    pub recipient: PeerAddress,
    pub command: u8,
    pub payload: Vec<u8>,
    /// Drop the in-flight request as soon as one reply arrives, instead of
    /// waiting out its full timeout window. Defaults to `false`.
    pub cancel_on_first_reply: bool,
    /// Treat this exchange as a stream of replies rather than a single
    /// request/reply pair. Defaults to `false`.
    pub streaming: bool,
    /// Opaque routing key threaded through to whatever out-of-scope
    /// transport ultimately dispatches the encoded datagram.
    pub location_key: Option<Vec<u8>>,
}

impl SendConfig {
    pub fn new(recipient: PeerAddress, command: u8, payload: Vec<u8>) -> Self {
        Self { recipient, command, payload, cancel_on_first_reply: false, streaming: false, location_key: None }
    }
}

/// Binds a [`SendConfig`] to a sender identity, ready for
/// [`crate::codec::encode`]. Kept as a free function rather than a method on
/// `SendConfig` so the codec's encode step stays the single place that
/// constructs a [`Message`].
pub fn message_for_send(config: SendConfig, sender: PeerAddress) -> Message {
    let mut msg = Message::new_request(sender, config.recipient, config.command);
    msg.payload = config.payload;
    msg
}

/// Lifecycle state of a peer's send path, checked by callers instead of
/// awaited. A shared shutdown future would be a cyclic-ownership risk
/// (every pending send holding a clone of the same future that holds a
/// reference back to the peer); a plain state enum a caller polls before
/// each send has no such cycle.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PeerShutdown {
    Active,
    ShuttingDown,
    Closed,
}

impl PeerShutdown {
    #[inline(always)]
    pub fn accepts_new_sends(self) -> bool {
        matches!(self, Self::Active)
    }
}
