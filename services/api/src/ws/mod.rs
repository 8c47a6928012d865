//! WebSocket Session Management
//!
//! This module contains the core logic for running coaching sessions over
//! WebSockets. It is structured into submodules for clarity:
//!
//! - `protocol`: Defines the JSON-based message format between the host runtime and the server.
//! - `session`: Manages the WebSocket connection lifecycle, from handshake to termination.
//! - `cycle`: Drives one reason/act turn of the coaching flow per learner utterance.

mod cycle;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
