//! Shared types and constants for the virtual audio device workspace.

mod config;
mod constants;
mod error;
mod gain;

pub use config::EngineConfig;
pub use constants::*;
pub use error::EngineError;
pub use gain::{db_from_mdb, gain_bits_from_db, gain_from_bits, mdb_from_db};
