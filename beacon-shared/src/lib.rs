#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Types shared by the Beacon server and its clients: notification rows, push-channel frames,
//! REST bodies, store errors, and configuration.

pub mod config;
pub mod models;
