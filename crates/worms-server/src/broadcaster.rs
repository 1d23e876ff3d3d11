//! MTU-bounded batching of event records into outgoing datagrams, with
//! periodic full broadcast and per-client catch-up.
//!
//! Sending itself is left to the caller via a closure so this module stays
//! testable without a real socket — the socket is the external collaborator
//! the server binary wires up.

use worms_protocol::{EventLog, MAX_DATAGRAM_SIZE};

/// Packs as many records starting at `from` as fit under [`MAX_DATAGRAM_SIZE`]
/// (including the 4-byte game-id prefix) into one datagram.
///
/// Returns `None` if no record at all could be appended (either `from` is
/// already at the end of the log, or the very next record alone would not
/// fit — the latter cannot happen for records built within this crate, see
/// spec discussion, but is handled defensively rather than asserted).
pub fn build_datagram(log: &EventLog, game_id: u32, from: usize) -> Option<(Vec<u8>, usize)> {
    let mut buf = Vec::with_capacity(MAX_DATAGRAM_SIZE);
    buf.extend_from_slice(&game_id.to_be_bytes());

    let mut idx = from;
    while let Some(event) = log.get(idx) {
        if buf.len() + event.total_size() > MAX_DATAGRAM_SIZE {
            break;
        }
        buf.extend_from_slice(event.wire_bytes());
        idx += 1;
    }

    if buf.len() == 4 {
        None
    } else {
        Some((buf, idx))
    }
}

/// Builds every datagram covering events from `log.event_to_broadcast`
/// onward and hands each one to `send` exactly once — `send` is expected to
/// fan a single datagram out to every registered client itself, since only
/// the caller knows the current recipient list. Advances
/// `log.event_to_broadcast` to `log.len()` once all datagrams are built.
pub fn broadcast_new_events<F: FnMut(&[u8])>(log: &mut EventLog, game_id: u32, mut send: F) {
    let mut from = log.event_to_broadcast;
    while let Some((bytes, new_from)) = build_datagram(log, game_id, from) {
        send(&bytes);
        from = new_from;
    }
    log.event_to_broadcast = log.len();
}

/// Sends every event the requesting client hasn't seen yet, starting from its
/// reported `next_expected_event_no`. Used on every accepted client datagram
/// to recover from UDP loss without waiting for the next tick's broadcast.
pub fn catch_up<F: FnMut(&[u8])>(log: &EventLog, game_id: u32, next_expected_event_no: usize, mut send: F) {
    let mut from = next_expected_event_no;
    while let Some((bytes, new_from)) = build_datagram(log, game_id, from) {
        send(&bytes);
        from = new_from;
    }
}
