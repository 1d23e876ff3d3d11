//! Screen Worms client: peer-side session state and the GUI line protocol.

pub mod cli;
pub mod session;

pub use session::{ClientSessionState, ProtocolViolation};
