//! Event records: the on-wire representation of everything a game appends to
//! its log, and the append-only log itself.

use std::sync::Arc;

use thiserror::Error;

use crate::codec::{crc32, read_u32, read_u8, write_u32, write_u8, DecodeError};

pub const EVENT_NEW_GAME: u8 = 0;
pub const EVENT_PIXEL: u8 = 1;
pub const EVENT_PLAYER_ELIMINATED: u8 = 2;
pub const EVENT_GAME_OVER: u8 = 3;

/// Lower/upper bounds on a player name, shared by the registry and the
/// NEW_GAME payload decoder.
pub const MIN_NAME_LEN: usize = 1;
pub const MAX_NAME_LEN: usize = 20;

fn is_valid_name(name: &str) -> bool {
    let len = name.len();
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) && name.bytes().all(|b| (33..=126).contains(&b))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("player name {0:?} is not 1..20 printable ASCII bytes")]
    InvalidName(String),
}

/// A single decoded event, owned, independent of the wire bytes it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    NewGame {
        max_x: u32,
        max_y: u32,
        player_names: Vec<String>,
    },
    Pixel {
        player_number: u8,
        x: u32,
        y: u32,
    },
    PlayerEliminated {
        player_number: u8,
    },
    GameOver,
}

impl Decoded {
    pub fn type_tag(&self) -> u8 {
        match self {
            Decoded::NewGame { .. } => EVENT_NEW_GAME,
            Decoded::Pixel { .. } => EVENT_PIXEL,
            Decoded::PlayerEliminated { .. } => EVENT_PLAYER_ELIMINATED,
            Decoded::GameOver => EVENT_GAME_OVER,
        }
    }
}

/// An immutable, already-encoded event record living in an [`EventLog`].
///
/// The wire bytes are precomputed once at construction and shared via
/// `Arc<[u8]>` so the broadcaster can batch-copy records into datagrams
/// without the log giving up ownership or re-encoding anything.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_no: u32,
    pub decoded: Decoded,
    bytes: Arc<[u8]>,
}

impl Event {
    /// Full on-wire byte sequence: len prefix, event_no, type, payload, crc32.
    pub fn wire_bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }

    fn finish(event_no: u32, event_type: u8, payload: &[u8]) -> Event {
        // len = event_no(4) + event_type(1) + payload
        let len = 5 + payload.len() as u32;
        let mut buf = Vec::with_capacity(4 + len as usize + 4);
        write_u32(&mut buf, len);
        write_u32(&mut buf, event_no);
        write_u8(&mut buf, event_type);
        buf.extend_from_slice(payload);
        let crc = crc32(&buf);
        write_u32(&mut buf, crc);

        let decoded = match event_type {
            EVENT_NEW_GAME => {
                let max_x = read_u32(payload, 0).unwrap();
                let max_y = read_u32(payload, 4).unwrap();
                let player_names = payload[8..]
                    .split(|&b| b == 0)
                    .filter(|s| !s.is_empty())
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                Decoded::NewGame {
                    max_x,
                    max_y,
                    player_names,
                }
            }
            EVENT_PIXEL => Decoded::Pixel {
                player_number: payload[0],
                x: read_u32(payload, 1).unwrap(),
                y: read_u32(payload, 5).unwrap(),
            },
            EVENT_PLAYER_ELIMINATED => Decoded::PlayerEliminated {
                player_number: payload[0],
            },
            EVENT_GAME_OVER => Decoded::GameOver,
            _ => unreachable!("finish() is only called with known tags"),
        };

        Event {
            event_no,
            decoded,
            bytes: buf.into(),
        }
    }

    pub fn new_game(event_no: u32, max_x: u32, max_y: u32, player_names: &[String]) -> Result<Event, BuildError> {
        for name in player_names {
            if !is_valid_name(name) {
                return Err(BuildError::InvalidName(name.clone()));
            }
        }
        let mut payload = Vec::new();
        write_u32(&mut payload, max_x);
        write_u32(&mut payload, max_y);
        for name in player_names {
            payload.extend_from_slice(name.as_bytes());
            payload.push(0);
        }
        Ok(Event::finish(event_no, EVENT_NEW_GAME, &payload))
    }

    pub fn pixel(event_no: u32, player_number: u8, x: u32, y: u32) -> Event {
        let mut payload = Vec::with_capacity(9);
        write_u8(&mut payload, player_number);
        write_u32(&mut payload, x);
        write_u32(&mut payload, y);
        Event::finish(event_no, EVENT_PIXEL, &payload)
    }

    pub fn player_eliminated(event_no: u32, player_number: u8) -> Event {
        Event::finish(event_no, EVENT_PLAYER_ELIMINATED, &[player_number])
    }

    pub fn game_over(event_no: u32) -> Event {
        Event::finish(event_no, EVENT_GAME_OVER, &[])
    }
}

/// Decode a single event record starting at the front of `buf`.
///
/// Returns the decoded event and the number of bytes it consumed. On a CRC
/// failure or malformed length, the *rest of the containing datagram* is not
/// interpretable (per spec) — callers should stop processing on `Err`.
pub fn decode_one(buf: &[u8]) -> Result<(Decoded, u32, usize), DecodeError> {
    let len = read_u32(buf, 0)?;
    if len < 5 {
        return Err(DecodeError::LenTooSmall { len });
    }
    let total = 4 + len as usize + 4;
    if buf.len() < total {
        return Err(DecodeError::ShortBuffer {
            offset: 0,
            need: total,
            have: buf.len(),
        });
    }

    let computed = crc32(&buf[..len as usize + 4]);
    let expected = read_u32(buf, len as usize + 4)?;
    if computed != expected {
        return Err(DecodeError::CrcMismatch { expected, computed });
    }

    let event_no = read_u32(buf, 4)?;
    let event_type = read_u8(buf, 8)?;
    let payload = &buf[9..4 + len as usize];

    let decoded = match event_type {
        EVENT_NEW_GAME => {
            if payload.len() < 8 {
                return Err(DecodeError::ShortBuffer {
                    offset: 9,
                    need: 8,
                    have: payload.len(),
                });
            }
            let max_x = read_u32(payload, 0)?;
            let max_y = read_u32(payload, 4)?;
            let player_names = payload[8..]
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect();
            Decoded::NewGame {
                max_x,
                max_y,
                player_names,
            }
        }
        EVENT_PIXEL => {
            if payload.len() != 9 {
                return Err(DecodeError::ShortBuffer {
                    offset: 9,
                    need: 9,
                    have: payload.len(),
                });
            }
            Decoded::Pixel {
                player_number: payload[0],
                x: read_u32(payload, 1)?,
                y: read_u32(payload, 5)?,
            }
        }
        EVENT_PLAYER_ELIMINATED => {
            if payload.len() != 1 {
                return Err(DecodeError::ShortBuffer {
                    offset: 9,
                    need: 1,
                    have: payload.len(),
                });
            }
            Decoded::PlayerEliminated {
                player_number: payload[0],
            }
        }
        EVENT_GAME_OVER => {
            if !payload.is_empty() {
                return Err(DecodeError::ShortBuffer {
                    offset: 9,
                    need: 0,
                    have: payload.len(),
                });
            }
            Decoded::GameOver
        }
        other => return Err(DecodeError::UnknownEventType(other)),
    };

    Ok((decoded, event_no, total))
}

/// An append-only sequence of event records scoped to one game instance.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
    /// Index of the earliest unbroadcast entry.
    pub event_to_broadcast: usize,
    /// Mirrors the live simulation's count of players still in the round.
    pub players_playing: u32,
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn has_game_over(&self) -> bool {
        matches!(self.events.last().map(|e| &e.decoded), Some(Decoded::GameOver))
    }

    /// Clears the log and resets broadcast/liveness counters for a new game.
    pub fn reset(&mut self, players_playing: u32) {
        self.events.clear();
        self.event_to_broadcast = 0;
        self.players_playing = players_playing;
    }

    fn push(&mut self, event: Event) {
        debug_assert_eq!(event.event_no as usize, self.events.len());
        self.events.push(event);
    }

    pub fn append_new_game(&mut self, max_x: u32, max_y: u32, player_names: &[String]) -> Result<(), BuildError> {
        let event = Event::new_game(self.events.len() as u32, max_x, max_y, player_names)?;
        self.push(event);
        Ok(())
    }

    pub fn append_pixel(&mut self, player_number: u8, x: u32, y: u32) {
        let event = Event::pixel(self.events.len() as u32, player_number, x, y);
        self.push(event);
    }

    pub fn append_player_eliminated(&mut self, player_number: u8) {
        let event = Event::player_eliminated(self.events.len() as u32, player_number);
        self.push(event);
    }

    pub fn append_game_over(&mut self) {
        let event = Event::game_over(self.events.len() as u32);
        self.push(event);
    }
}
