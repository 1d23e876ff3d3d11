//! Server command-line flags and the range validation the original's
//! `syserr(...)` calls performed by hand.

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "worms-server", disable_help_flag = true)]
pub struct ServerArgs {
    #[arg(short = 'p', long = "port", default_value_t = 2021)]
    pub port: u16,

    /// Defaults to the current wall-clock time if omitted.
    #[arg(short = 's', long = "seed")]
    pub seed: Option<u32>,

    #[arg(short = 't', long = "turning-speed", default_value_t = 6)]
    pub turning_speed: i32,

    #[arg(short = 'v', long = "rounds-per-sec", default_value_t = 50)]
    pub rounds_per_sec: u32,

    #[arg(short = 'w', long = "width", default_value_t = 640)]
    pub width: u32,

    #[arg(short = 'h', long = "height", default_value_t = 480)]
    pub height: u32,

    #[arg(long = "help", action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("turning speed must be in -90..=90 and nonzero, got {0}")]
    TurningSpeed(i32),
    #[error("rounds per second must be in 1..500, got {0}")]
    RoundsPerSec(u32),
    #[error("width must be in 1..4000, got {0}")]
    Width(u32),
    #[error("height must be in 1..4000, got {0}")]
    Height(u32),
}

impl ServerArgs {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.turning_speed == 0 || !(-90..=90).contains(&self.turning_speed) {
            return Err(ValidationError::TurningSpeed(self.turning_speed));
        }
        if !(1..=500).contains(&self.rounds_per_sec) {
            return Err(ValidationError::RoundsPerSec(self.rounds_per_sec));
        }
        if !(1..=4000).contains(&self.width) {
            return Err(ValidationError::Width(self.width));
        }
        if !(1..=4000).contains(&self.height) {
            return Err(ValidationError::Height(self.height));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(turning_speed: i32, rounds_per_sec: u32, width: u32, height: u32) -> ServerArgs {
        ServerArgs {
            port: 2021,
            seed: Some(1),
            turning_speed,
            rounds_per_sec,
            width,
            height,
            help: None,
        }
    }

    #[test]
    fn defaults_from_the_spec_validate() {
        assert!(args(6, 50, 640, 480).validate().is_ok());
    }

    #[test]
    fn zero_turning_speed_is_rejected() {
        assert_eq!(args(0, 50, 640, 480).validate(), Err(ValidationError::TurningSpeed(0)));
    }

    #[test]
    fn turning_speed_out_of_range_is_rejected() {
        assert!(args(91, 50, 640, 480).validate().is_err());
        assert!(args(-91, 50, 640, 480).validate().is_err());
    }

    #[test]
    fn turning_speed_bounds_are_inclusive() {
        assert!(args(90, 50, 640, 480).validate().is_ok());
        assert!(args(-90, 50, 640, 480).validate().is_ok());
    }

    #[test]
    fn rounds_per_sec_out_of_range_is_rejected() {
        assert!(args(6, 0, 640, 480).validate().is_err());
        assert!(args(6, 501, 640, 480).validate().is_err());
    }

    #[test]
    fn width_and_height_out_of_range_are_rejected() {
        assert!(args(6, 50, 0, 480).validate().is_err());
        assert!(args(6, 50, 4001, 480).validate().is_err());
        assert!(args(6, 50, 640, 0).validate().is_err());
        assert!(args(6, 50, 640, 4001).validate().is_err());
    }
}
