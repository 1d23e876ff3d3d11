//! Per-participant simulation state: sub-pixel position, heading, and the
//! floored-pixel movement rule that drives PIXEL/PLAYER_ELIMINATED events.

use crate::board::Board;
use crate::rng::Rng;

/// What happened to a player as a result of initialization or one tick of
/// movement. `None` (no variant) means the player stayed on the same pixel
/// and nothing is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Pixel { x: u32, y: u32 },
    Eliminated,
}

/// Owned by the [`crate::controller::GameController`] for the lifetime of one
/// game. Holds the endpoint key of the client it belongs to rather than a
/// pointer back into the registry, so the two can be stored independently.
#[derive(Debug, Clone)]
pub struct Player {
    pub index: u8,
    pub client_key: String,
    pos_x: f64,
    pos_y: f64,
    direction: i32,
    eliminated: bool,
}

impl Player {
    /// Draws initial position and heading from `rng`, checks the starting
    /// pixel against `board`, and reports whether the player survives its
    /// first placement. Does not mutate `board` itself — the caller applies
    /// the outcome (insert the pixel / append the event) so movement and
    /// board bookkeeping stay centralized in the controller.
    pub fn spawn(index: u8, client_key: String, rng: &mut Rng, board: &Board) -> (Player, MoveOutcome) {
        let pos_x = (rng.next() % board.max_x()) as f64 + 0.5;
        let pos_y = (rng.next() % board.max_y()) as f64 + 0.5;
        let direction = (rng.next() % 360) as i32;

        let x = pos_x.floor() as u32;
        let y = pos_y.floor() as u32;
        let outcome = if board.contains(x, y) {
            MoveOutcome::Eliminated
        } else {
            MoveOutcome::Pixel { x, y }
        };

        let eliminated = matches!(outcome, MoveOutcome::Eliminated);
        let player = Player {
            index,
            client_key,
            pos_x,
            pos_y,
            direction,
            eliminated,
        };
        (player, outcome)
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// `turn_direction` is the client's last reported value: 0 straight, 1
    /// turn left (increase heading), 2 turn right (decrease heading).
    /// Returns `None` if the new sub-pixel position floors to the same
    /// pixel as before (no event to emit). Marks the player eliminated and
    /// does not mutate `board` on its own — same contract as [`Player::spawn`].
    pub fn mv(&mut self, turn_direction: u8, turning_speed: i32, board: &Board) -> Option<MoveOutcome> {
        if self.eliminated {
            return None;
        }

        let delta = match turn_direction {
            1 => turning_speed,
            2 => -turning_speed,
            _ => 0,
        };
        self.direction = (self.direction + delta).rem_euclid(360);

        let prev_x = self.pos_x.floor() as i64;
        let prev_y = self.pos_y.floor() as i64;

        let radians = (self.direction as f64).to_radians();
        self.pos_x += radians.cos();
        self.pos_y += radians.sin();

        let new_x = self.pos_x.floor() as i64;
        let new_y = self.pos_y.floor() as i64;

        if new_x == prev_x && new_y == prev_y {
            return None;
        }

        let outcome = if new_x < 0 || new_y < 0 || board.contains(new_x as u32, new_y as u32) {
            self.eliminated = true;
            MoveOutcome::Eliminated
        } else {
            MoveOutcome::Pixel {
                x: new_x as u32,
                y: new_y as u32,
            }
        };
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_on_empty_board_yields_a_pixel() {
        let mut rng = Rng::new(1);
        let board = Board::new(100, 100);
        let (player, outcome) = Player::spawn(0, "k".to_string(), &mut rng, &board);
        assert!(!player.is_eliminated());
        assert!(matches!(outcome, MoveOutcome::Pixel { .. }));
    }

    #[test]
    fn spawn_onto_occupied_pixel_eliminates() {
        let mut board = Board::new(100, 100);
        // Pre-occupy whatever pixel this seed will place the spawn on.
        let mut probe = Rng::new(1);
        let px = probe.next() % board.max_x();
        let py = probe.next() % board.max_y();
        board.insert(px, py);

        let mut rng = Rng::new(1);
        let (player, outcome) = Player::spawn(0, "k".to_string(), &mut rng, &board);
        assert!(player.is_eliminated());
        assert_eq!(outcome, MoveOutcome::Eliminated);
    }

    #[test]
    fn moving_out_of_bounds_eliminates() {
        let board = Board::new(2, 2);
        let mut player = Player {
            index: 0,
            client_key: "k".to_string(),
            pos_x: 1.95,
            pos_y: 1.0,
            direction: 0,
            eliminated: false,
        };
        let outcome = player.mv(0, 6, &board);
        assert_eq!(outcome, Some(MoveOutcome::Eliminated));
        assert!(player.is_eliminated());
    }

    #[test]
    fn eliminated_player_does_not_move_again() {
        let board = Board::new(1000, 1000);
        let mut player = Player {
            index: 0,
            client_key: "k".to_string(),
            pos_x: 5.0,
            pos_y: 5.0,
            direction: 0,
            eliminated: true,
        };
        assert_eq!(player.mv(1, 6, &board), None);
    }

    #[test]
    fn staying_on_same_pixel_yields_no_event() {
        let board = Board::new(1000, 1000);
        // Heading 225 degrees steps by (-0.707, -0.707); starting near the
        // top of a pixel on both axes keeps the floored coordinate the same.
        let mut player = Player {
            index: 0,
            client_key: "k".to_string(),
            pos_x: 5.9,
            pos_y: 5.9,
            direction: 225,
            eliminated: false,
        };
        let outcome = player.mv(0, 6, &board);
        assert_eq!(outcome, None);
    }

    #[test]
    fn turning_left_and_right_change_heading_oppositely() {
        let board = Board::new(1000, 1000);
        let mut left = Player {
            index: 0,
            client_key: "k".to_string(),
            pos_x: 500.0,
            pos_y: 500.0,
            direction: 0,
            eliminated: false,
        };
        let mut right = left.clone();
        left.mv(1, 6, &board);
        right.mv(2, 6, &board);
        assert_eq!(left.direction, 6);
        assert_eq!(right.direction, 354);
    }
}
