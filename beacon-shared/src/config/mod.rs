//! # Configuration
//!
//! Server settings (HTTP, database, logging, stream cadence) and the client section used by the
//! reconnecting consumer. Both are loaded from the same file so one deployment config drives both
//! sides of the push channel.

pub mod client;
pub mod server;
