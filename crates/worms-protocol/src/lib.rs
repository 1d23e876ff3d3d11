//! Wire format shared between the Screen Worms server and client: big-endian
//! integer codec, CRC-32 framing, and the event log data model.

pub mod codec;
pub mod event;

pub use codec::DecodeError;
pub use event::{decode_one, BuildError, Decoded, Event, EventLog};

/// Maximum UDP payload a datagram built for broadcast is allowed to occupy,
/// chosen to stay under the common internet path MTU (576) minus IP/UDP
/// headers.
pub const MAX_DATAGRAM_SIZE: usize = 548;

/// Client → server heartbeat cadence in milliseconds.
pub const CLIENT_HEARTBEAT_MILLIS: u64 = 30;

/// Server-side inactivity expiry for a client that stops sending datagrams.
pub const CLIENT_EXPIRY_MILLIS: u64 = 2000;
