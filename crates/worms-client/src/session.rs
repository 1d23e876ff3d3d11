//! The peer side of the wire protocol: tracks game/event-sequence state,
//! validates and dispatches incoming events to GUI lines, and produces the
//! outgoing heartbeat datagram.

use thiserror::Error;

use worms_protocol::codec::{read_u32, write_u32, write_u64, write_u8};
use worms_protocol::event::{MAX_NAME_LEN, MIN_NAME_LEN};
use worms_protocol::{decode_one, Decoded};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("pixel ({x},{y}) is outside the known board ({width}x{height})")]
    PixelOutOfBounds { x: u32, y: u32, width: u32, height: u32 },
    #[error("player index {index} is not among the {known} known players")]
    UnknownPlayerIndex { index: u8, known: usize },
    #[error("player name {0:?} is not valid 1..20 printable ASCII")]
    InvalidPlayerName(String),
}

fn is_valid_name(name: &str) -> bool {
    let len = name.len();
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) && name.bytes().all(|b| (33..=126).contains(&b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiKey {
    None,
    Right,
    Left,
}

impl GuiKey {
    fn as_wire(self) -> u8 {
        match self {
            GuiKey::None => 0,
            GuiKey::Right => 1,
            GuiKey::Left => 2,
        }
    }
}

/// Peer-side game session. `Default` starts exactly as §4.9 prescribes:
/// game_id 0, next_expected_event_no 0, no buttons held.
#[derive(Debug)]
pub struct ClientSessionState {
    pub session_id: u64,
    pub player_name: String,
    game_id: u32,
    next_expected_event_no: u32,
    is_left_down: bool,
    is_right_down: bool,
    key: GuiKey,
    width: u32,
    height: u32,
    player_names: Vec<String>,
}

impl ClientSessionState {
    pub fn new(player_name: String, session_id: u64) -> ClientSessionState {
        ClientSessionState {
            session_id,
            player_name,
            game_id: 0,
            next_expected_event_no: 0,
            is_left_down: false,
            is_right_down: false,
            key: GuiKey::None,
            width: 0,
            height: 0,
            player_names: Vec::new(),
        }
    }

    fn current_key(&self) -> GuiKey {
        self.key
    }

    /// Applies one line read from the GUI connection. `key` is its own piece
    /// of state driven by the most recent button event, not a pure function
    /// of the two held-booleans: a key-down always claims the key outright,
    /// while a key-up falls back to whichever button (if any) is still held.
    /// Unrecognized lines are logged and ignored, matching §4.9.
    pub fn handle_gui_line(&mut self, line: &str) {
        match line {
            "LEFT_KEY_DOWN" => {
                self.is_left_down = true;
                self.key = GuiKey::Left;
            }
            "LEFT_KEY_UP" => {
                self.is_left_down = false;
                self.key = if self.is_right_down { GuiKey::Right } else { GuiKey::None };
            }
            "RIGHT_KEY_DOWN" => {
                self.is_right_down = true;
                self.key = GuiKey::Right;
            }
            "RIGHT_KEY_UP" => {
                self.is_right_down = false;
                self.key = if self.is_left_down { GuiKey::Left } else { GuiKey::None };
            }
            other => log::warn!("ignoring unrecognized GUI line {other:?}"),
        }
    }

    /// Builds the outbound heartbeat: `session_id | key | next_expected_event_no | name`.
    /// Total length is always `13 + name.len()`.
    pub fn heartbeat_datagram(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(13 + self.player_name.len());
        write_u64(&mut buf, self.session_id);
        write_u8(&mut buf, self.current_key().as_wire());
        write_u32(&mut buf, self.next_expected_event_no);
        buf.extend_from_slice(self.player_name.as_bytes());
        buf
    }

    /// Processes one inbound server datagram, returning the GUI lines it
    /// produced (each without the trailing `\n` — the transport layer adds
    /// that). A decode/CRC failure stops processing the rest of the datagram
    /// without error; a semantic violation is fatal per §7.
    pub fn process_datagram(&mut self, buf: &[u8]) -> Result<Vec<String>, ProtocolViolation> {
        let Ok(game_id) = read_u32(buf, 0) else {
            return Ok(Vec::new());
        };

        let mut offset = 4;
        if game_id != self.game_id {
            match decode_one(&buf[offset..]) {
                Ok((Decoded::NewGame { .. }, 0, _)) => {
                    self.game_id = game_id;
                    self.next_expected_event_no = 0;
                }
                _ => return Ok(Vec::new()),
            }
        }

        let mut lines = Vec::new();
        while offset < buf.len() {
            let (decoded, event_no, consumed) = match decode_one(&buf[offset..]) {
                Ok(parsed) => parsed,
                Err(_) => break,
            };

            if event_no != self.next_expected_event_no {
                offset += consumed;
                continue;
            }

            if let Some(line) = self.dispatch(decoded)? {
                lines.push(line);
            }
            self.next_expected_event_no += 1;
            offset += consumed;
        }

        Ok(lines)
    }

    fn dispatch(&mut self, decoded: Decoded) -> Result<Option<String>, ProtocolViolation> {
        match decoded {
            Decoded::NewGame {
                max_x,
                max_y,
                player_names,
            } => {
                for name in &player_names {
                    if !is_valid_name(name) {
                        return Err(ProtocolViolation::InvalidPlayerName(name.clone()));
                    }
                }
                self.width = max_x;
                self.height = max_y;
                self.player_names = player_names;
                let mut line = format!("NEW_GAME {} {}", self.width, self.height);
                for name in &self.player_names {
                    line.push(' ');
                    line.push_str(name);
                }
                Ok(Some(line))
            }
            Decoded::Pixel { player_number, x, y } => {
                if x >= self.width || y >= self.height {
                    return Err(ProtocolViolation::PixelOutOfBounds {
                        x,
                        y,
                        width: self.width,
                        height: self.height,
                    });
                }
                let name = self.player_name_for(player_number)?;
                Ok(Some(format!("PIXEL {x} {y} {name}")))
            }
            Decoded::PlayerEliminated { player_number } => {
                let name = self.player_name_for(player_number)?;
                Ok(Some(format!("PLAYER_ELIMINATED {name}")))
            }
            Decoded::GameOver => Ok(None),
        }
    }

    fn player_name_for(&self, player_number: u8) -> Result<String, ProtocolViolation> {
        let name = self
            .player_names
            .get(player_number as usize)
            .ok_or(ProtocolViolation::UnknownPlayerIndex {
                index: player_number,
                known: self.player_names.len(),
            })?;
        if !is_valid_name(name) {
            return Err(ProtocolViolation::InvalidPlayerName(name.clone()));
        }
        Ok(name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worms_protocol::EventLog;

    fn datagram_for(log: &EventLog, game_id: u32, from: usize) -> Vec<u8> {
        let mut buf = game_id.to_be_bytes().to_vec();
        for event in log.iter().skip(from) {
            buf.extend_from_slice(event.wire_bytes());
        }
        buf
    }

    #[test]
    fn default_state_starts_at_game_zero_and_event_zero() {
        let session = ClientSessionState::new("Alice".to_string(), 1);
        assert_eq!(session.game_id, 0);
        assert_eq!(session.next_expected_event_no, 0);
    }

    #[test]
    fn heartbeat_length_matches_thirteen_plus_name() {
        let session = ClientSessionState::new("Alice".to_string(), 42);
        let datagram = session.heartbeat_datagram();
        assert_eq!(datagram.len(), 13 + "Alice".len());
        assert_eq!(&datagram[0..8], &42u64.to_be_bytes());
    }

    #[test]
    fn key_state_machine_matches_the_four_gui_inputs() {
        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        assert_eq!(session.current_key(), GuiKey::None);
        session.handle_gui_line("LEFT_KEY_DOWN");
        assert_eq!(session.current_key(), GuiKey::Left);
        // A key-down always claims the key outright, even over another held button.
        session.handle_gui_line("RIGHT_KEY_DOWN");
        assert_eq!(session.current_key(), GuiKey::Right);
        // Releasing Right falls back to Left, which is still held.
        session.handle_gui_line("RIGHT_KEY_UP");
        assert_eq!(session.current_key(), GuiKey::Left);
        session.handle_gui_line("LEFT_KEY_UP");
        assert_eq!(session.current_key(), GuiKey::None);
    }

    #[test]
    fn unknown_gui_line_is_ignored() {
        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        session.handle_gui_line("NOT_A_REAL_LINE");
        assert_eq!(session.current_key(), GuiKey::None);
    }

    #[test]
    fn new_game_then_pixel_produce_expected_gui_lines() {
        let mut log = EventLog::new();
        log.append_new_game(800, 600, &["Alice".to_string(), "Bob".to_string()]).unwrap();
        log.append_pixel(0, 12, 34);
        let datagram = datagram_for(&log, 5, 0);

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        let lines = session.process_datagram(&datagram).unwrap();
        assert_eq!(lines[0], "NEW_GAME 800 600 Alice Bob");
        assert_eq!(lines[1], "PIXEL 12 34 Alice");
    }

    #[test]
    fn datagram_for_a_different_game_without_new_game_first_is_discarded() {
        let mut log = EventLog::new();
        log.append_new_game(800, 600, &["Alice".to_string()]).unwrap();
        log.append_pixel(0, 1, 1);
        // Build a datagram claiming a new game id but starting mid-stream.
        let datagram = datagram_for(&log, 9, 1);

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        let lines = session.process_datagram(&datagram).unwrap();
        assert!(lines.is_empty());
        assert_eq!(session.next_expected_event_no, 0);
    }

    #[test]
    fn out_of_order_event_number_is_skipped_not_fatal() {
        let mut log = EventLog::new();
        log.append_new_game(800, 600, &["Alice".to_string()]).unwrap();
        log.append_pixel(0, 1, 1);
        log.append_pixel(0, 2, 2);
        let full = datagram_for(&log, 5, 0);

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        session.process_datagram(&full).unwrap();
        assert_eq!(session.next_expected_event_no, 3);

        // Re-deliver the same datagram (simulating a duplicate/late packet):
        // every event number is now behind next_expected_event_no and should
        // just be skipped, producing no lines and no error.
        let lines = session.process_datagram(&full).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn corrupted_trailing_byte_stops_processing_without_advancing() {
        let mut log = EventLog::new();
        log.append_new_game(800, 600, &["Alice".to_string()]).unwrap();
        log.append_pixel(0, 1, 1);
        let mut datagram = datagram_for(&log, 5, 0);
        let last = datagram.len() - 1;
        datagram[last] ^= 0xFF;

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        let lines = session.process_datagram(&datagram).unwrap();
        // NEW_GAME (event 0) still decodes fine; the corrupted PIXEL (event 1)
        // fails CRC and processing stops there.
        assert_eq!(lines.len(), 1);
        assert_eq!(session.next_expected_event_no, 1);
    }

    #[test]
    fn pixel_outside_known_board_is_fatal() {
        let mut log = EventLog::new();
        log.append_new_game(10, 10, &["Alice".to_string()]).unwrap();
        log.append_pixel(0, 50, 50);
        let datagram = datagram_for(&log, 5, 0);

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        let result = session.process_datagram(&datagram);
        assert!(matches!(result, Err(ProtocolViolation::PixelOutOfBounds { .. })));
    }

    #[test]
    fn unknown_player_index_is_fatal() {
        let mut log = EventLog::new();
        log.append_new_game(800, 600, &["Alice".to_string()]).unwrap();
        log.append_player_eliminated(5);
        let datagram = datagram_for(&log, 5, 0);

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        let result = session.process_datagram(&datagram);
        assert!(matches!(result, Err(ProtocolViolation::UnknownPlayerIndex { .. })));
    }

    #[test]
    fn game_over_produces_no_line() {
        let mut log = EventLog::new();
        log.append_new_game(800, 600, &["Alice".to_string()]).unwrap();
        log.append_game_over();
        let datagram = datagram_for(&log, 5, 0);

        let mut session = ClientSessionState::new("Alice".to_string(), 1);
        let lines = session.process_datagram(&datagram).unwrap();
        assert_eq!(lines.len(), 1); // only NEW_GAME
    }
}
