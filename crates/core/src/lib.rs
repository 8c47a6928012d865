pub mod agent;
pub mod llm_client;
pub mod profile;
pub mod report;
pub mod stage;
pub mod storage;

/// Represents commands that the core logic issues to an external runtime.
///
/// This enum is the primary API for decoupling the coaching flow's
/// decision-making from the runtime's execution of side effects (like
/// speaking text or closing a finished session).
#[derive(Debug, Clone)]
pub enum Command {
    /// Command the runtime to speak the given text to the learner.
    SpeakText(String),
    /// Command indicating the session is complete, with a final message.
    SessionComplete(String),
}
