//! Client command-line flags: the game server's address as a positional
//! argument, plus the GUI bridge and player-name flags from §6.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "worms-client")]
pub struct ClientArgs {
    /// Hostname or address of the game server.
    pub game_server: String,

    #[arg(short = 'n', long = "name", default_value = "")]
    pub player_name: String,

    #[arg(short = 'p', long = "port", default_value_t = 2021)]
    pub server_port: u16,

    #[arg(short = 'i', long = "gui-server", default_value = "localhost")]
    pub gui_server: String,

    #[arg(short = 'r', long = "gui-port", default_value_t = 20210)]
    pub gui_port: u16,
}
