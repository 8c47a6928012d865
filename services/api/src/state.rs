//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the LLM client and the report store.

use crate::config::Config;
use englishly_core::{llm_client::LLMClient, storage::ReportStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub llm_client: Arc<dyn LLMClient>,
    pub report_store: Arc<dyn ReportStore>,
    pub config: Arc<Config>,
}
