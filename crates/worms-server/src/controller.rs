//! The waiting-room / game-in-progress state machine: admission, game
//! start, and the per-tick simulation step.

use std::net::SocketAddr;
use std::time::Instant;

use log::{debug, info};
use worms_protocol::EventLog;

use crate::board::Board;
use crate::broadcaster::{broadcast_new_events, catch_up};
use crate::player::{MoveOutcome, Player};
use crate::registry::{endpoint_key, Admission, ClientRegistry, ClientState};
use crate::rng::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    WaitingRoom,
    GameInProgress,
}

pub struct GameController {
    pub registry: ClientRegistry,
    pub board: Board,
    pub log: EventLog,
    pub state: GameState,
    pub game_id: u32,
    rng: Rng,
    players: Vec<Player>,
    turning_speed: i32,
    max_x: u32,
    max_y: u32,
}

impl GameController {
    pub fn new(seed: u32, turning_speed: i32, max_x: u32, max_y: u32) -> GameController {
        GameController {
            registry: ClientRegistry::new(),
            board: Board::new(max_x, max_y),
            log: EventLog::new(),
            state: GameState::WaitingRoom,
            game_id: 0,
            rng: Rng::new(seed),
            players: Vec::new(),
            turning_speed,
            max_x,
            max_y,
        }
    }

    /// Processes one inbound client datagram: admission/liveness update,
    /// waiting-room readiness, and an immediate catch-up send to just this
    /// client. Returns `true` if this call is what started a new game (the
    /// caller should restart its tick timer from zero).
    pub fn on_client_datagram<F: FnMut(&[u8])>(
        &mut self,
        addr: SocketAddr,
        session_id: u64,
        name: String,
        turn_direction: u8,
        next_expected_event_no: usize,
        now: Instant,
        mut send_to_client: F,
    ) -> bool {
        let admission = self.registry.handle(addr, session_id, name, turn_direction, now);
        if admission == Admission::Rejected {
            debug!("rejected datagram from {addr}");
            return false;
        }

        let mut started = false;
        if self.state == GameState::WaitingRoom {
            self.registry.promote_ready_client(&endpoint_key(addr));
            let non_observers = self.registry.num_non_observers();
            if non_observers >= 2 && self.registry.num_ready() == non_observers {
                self.start_game();
                started = true;
            }
        }

        catch_up(&self.log, self.game_id, next_expected_event_no, &mut send_to_client);
        started
    }

    fn start_game(&mut self) {
        self.game_id = self.rng.next();
        let order = self.registry.select_players_in_order();
        let names: Vec<String> = order
            .iter()
            .map(|key| self.registry.get(key).expect("key came from this registry").name.clone())
            .collect();

        for key in &order {
            self.registry.set_state(key, ClientState::Playing);
        }

        self.board = Board::new(self.max_x, self.max_y);
        self.log.reset(order.len() as u32);
        self.log
            .append_new_game(self.max_x, self.max_y, &names)
            .expect("names were already validated by the registry");

        self.players.clear();
        for (index, key) in order.into_iter().enumerate() {
            let (player, outcome) = Player::spawn(index as u8, key.clone(), &mut self.rng, &self.board);
            self.apply_outcome(index as u8, &key, outcome);
            self.players.push(player);
        }

        self.state = GameState::GameInProgress;
        info!("game {:#010x} started with {} players", self.game_id, self.players.len());
    }

    fn apply_outcome(&mut self, index: u8, client_key: &str, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Pixel { x, y } => {
                self.board.insert(x, y);
                self.log.append_pixel(index, x, y);
            }
            MoveOutcome::Eliminated => {
                self.log.append_player_eliminated(index);
                self.log.players_playing = self.log.players_playing.saturating_sub(1);
                self.registry.set_state(client_key, ClientState::Lost);
            }
        }
    }

    /// Runs expiry, one simulation tick if a game is in progress, and builds
    /// every datagram the tick's new events require. `send_datagram` is
    /// called once per datagram and must fan it out to every registered
    /// client itself — only the caller holds real socket addresses.
    pub fn on_tick<F: FnMut(&[u8])>(&mut self, now: Instant, send_datagram: F) {
        self.registry.expire(now);

        if self.state == GameState::GameInProgress {
            self.run_tick();
        }

        broadcast_new_events(&mut self.log, self.game_id, send_datagram);
    }

    fn run_tick(&mut self) {
        let indices: Vec<usize> = (0..self.players.len()).collect();
        for i in indices {
            let turn_direction = {
                let key = self.players[i].client_key.clone();
                self.registry.get(&key).map(|c| c.last_turn_direction).unwrap_or(0)
            };

            if self.players[i].is_eliminated() {
                continue;
            }

            let client_key = self.players[i].client_key.clone();
            let outcome = self.players[i].mv(turn_direction, self.turning_speed, &self.board);
            if let Some(outcome) = outcome {
                self.apply_outcome(i as u8, &client_key, outcome);
            }

            if self.log.players_playing <= 1 {
                self.log.append_game_over();
                self.state = GameState::WaitingRoom;
                self.registry.reset_for_new_round();
                info!("game {:#010x} over", self.game_id);
                break;
            }
        }
    }
}
