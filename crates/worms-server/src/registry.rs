//! Client endpoint identity, admission, and inactivity expiry.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use worms_protocol::CLIENT_EXPIRY_MILLIS;

const MAX_CLIENTS: usize = 25;
const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Observer,
    Joined,
    Ready,
    Playing,
    Lost,
}

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub state: ClientState,
    pub name: String,
    pub session_id: u64,
    pub last_datagram: Instant,
    pub last_turn_direction: u8,
    pub addr: SocketAddr,
}

impl ClientRecord {
    pub fn is_observer(&self) -> bool {
        self.name.is_empty()
    }
}

/// Canonical `address:port` key for a peer, built from the address family the
/// `SocketAddr` actually carries. IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`,
/// produced by a dual-stack listener receiving an IPv4 peer) are folded down
/// to their IPv4 form first, so the same physical peer always keys the same
/// regardless of which family the socket layer reports it in.
pub fn endpoint_key(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        ip @ IpAddr::V4(_) => ip,
    };
    format!("{}:{}", ip, addr.port())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected,
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    records: HashMap<String, ClientRecord>,
    reserved_names: HashSet<String>,
}

impl ClientRegistry {
    pub fn new() -> ClientRegistry {
        ClientRegistry::default()
    }

    pub fn get(&self, key: &str) -> Option<&ClientRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ClientRecord> {
        self.records.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClientRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_non_observers(&self) -> usize {
        self.records.values().filter(|c| !c.is_observer()).count()
    }

    pub fn num_ready(&self) -> usize {
        self.records.values().filter(|c| c.state == ClientState::Ready).count()
    }

    fn is_valid_name(name: &str) -> bool {
        name.len() <= MAX_NAME_LEN && name.bytes().all(|b| (33..=126).contains(&b))
    }

    fn admit(&mut self, key: String, addr: SocketAddr, session_id: u64, name: String, now: Instant) -> Admission {
        if self.records.len() >= MAX_CLIENTS {
            return Admission::Rejected;
        }
        if !name.is_empty() {
            if !Self::is_valid_name(&name) {
                return Admission::Rejected;
            }
            if self.reserved_names.contains(&name) {
                return Admission::Rejected;
            }
            self.reserved_names.insert(name.clone());
        }
        let state = if name.is_empty() {
            ClientState::Observer
        } else {
            ClientState::Joined
        };
        self.records.insert(
            key,
            ClientRecord {
                state,
                name,
                session_id,
                last_datagram: now,
                last_turn_direction: 0,
                addr,
            },
        );
        Admission::Accepted
    }

    fn drop_record(&mut self, key: &str) {
        if let Some(record) = self.records.remove(key) {
            if !record.name.is_empty() {
                self.reserved_names.remove(&record.name);
            }
        }
    }

    /// Applies one inbound client datagram. Returns whether it was accepted
    /// (admitted, re-admitted after supersession, or a liveness update) or
    /// rejected outright (discarded with no state change).
    pub fn handle(
        &mut self,
        addr: SocketAddr,
        session_id: u64,
        name: String,
        turn_direction: u8,
        now: Instant,
    ) -> Admission {
        let key = endpoint_key(addr);

        let existing = self.records.get(&key);
        match existing {
            None => self.admit(key, addr, session_id, name, now),
            Some(record) => {
                if session_id < record.session_id {
                    return Admission::Rejected;
                }
                if session_id == record.session_id {
                    if name != record.name {
                        return Admission::Rejected;
                    }
                    let record = self.records.get_mut(&key).expect("checked above");
                    record.last_datagram = now;
                    record.last_turn_direction = turn_direction;
                    return Admission::Accepted;
                }
                // session_id > stored: supersede.
                self.drop_record(&key);
                self.admit(key, addr, session_id, name, now)
            }
        }
    }

    /// Promotes the single client identified by `key` to READY if it just
    /// reported a nonzero turn direction and is in a state eligible to ready
    /// up. Only the client whose datagram is currently being handled is
    /// considered — matching the original's `waitingRoomRoutine(client_id)`,
    /// which readies up exactly the sender, not every client carrying a
    /// stale nonzero `last_turn_direction` from a previous round.
    pub fn promote_ready_client(&mut self, key: &str) {
        if let Some(record) = self.records.get_mut(key) {
            if record.last_turn_direction != 0
                && matches!(record.state, ClientState::Joined | ClientState::Lost | ClientState::Playing)
            {
                record.state = ClientState::Ready;
            }
        }
    }

    pub fn expire(&mut self, now: Instant) {
        let expiry = Duration::from_millis(CLIENT_EXPIRY_MILLIS);
        let stale: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| now.duration_since(record.last_datagram) >= expiry)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.drop_record(&key);
        }
    }

    /// Selects every non-observer client, sorted by name then endpoint key,
    /// and returns their keys in player-index order.
    pub fn select_players_in_order(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &ClientRecord)> =
            self.records.iter().filter(|(_, c)| !c.is_observer()).collect();
        entries.sort_by(|(key_a, a), (key_b, b)| a.name.cmp(&b.name).then_with(|| key_a.cmp(key_b)));
        entries.into_iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn set_state(&mut self, key: &str, state: ClientState) {
        if let Some(record) = self.records.get_mut(key) {
            record.state = state;
        }
    }

    /// Returns every non-observer client to JOINED so the next waiting room
    /// starts with a clean slate; called once a game ends.
    pub fn reset_for_new_round(&mut self) {
        for record in self.records.values_mut() {
            if matches!(record.state, ClientState::Ready | ClientState::Playing | ClientState::Lost) {
                record.state = ClientState::Joined;
            }
        }
    }
}
