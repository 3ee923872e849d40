pub mod discord;
pub mod reconnect;
pub mod state;

pub use reconnect::{Backoff, ConnectionFailure, ReconnectError};
pub use state::{AppState, StartupError};
