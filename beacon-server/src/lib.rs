#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Beacon server: notification store accessor, per-connection SSE poll loops and the REST surface
//! for snapshots and read-state write-back.

pub mod app_state;
pub mod commands;
pub mod db;
pub mod handlers;
pub mod http;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod telemetry;
mod tracer;
