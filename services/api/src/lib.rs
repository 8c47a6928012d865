//! Englishly API Library Crate
//!
//! This library contains all the core logic for the Englishly coaching
//! service, including the application state, configuration, WebSocket
//! session logic, and routing. The `api` binary is a thin wrapper around
//! this library.

pub mod config;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
