//! Defines the WebSocket message protocol between the host conversational
//! runtime and the coaching service.

use englishly_core::stage::Stage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the host runtime to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Opens a session. This must be the first message.
    #[serde(rename = "init")]
    Init,
    /// A transcribed learner utterance.
    #[serde(rename = "user_message")]
    UserMessage { text: String },
}

/// Messages sent from the server to the host runtime.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the session is open and reports the starting stage.
    Initialized { session_id: Uuid, stage: Stage },
    /// The session advanced to a new stage.
    StageAdvanced { stage: Stage },
    /// Signals the beginning of a coach response to be spoken to the learner.
    ResponseStart,
    /// A chunk of the coach's response text.
    ResponseChunk { chunk: String },
    /// Signals the end of a coach response.
    ResponseEnd,
    /// The session concluded and its report was uploaded under this key.
    SessionEnded { report_key: String },
    /// Reports a fatal error to the host runtime.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_message_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Init));
    }

    #[test]
    fn user_message_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"user_message","text":"Hello!"}"#).unwrap();
        match msg {
            ClientMessage::UserMessage { text } => assert_eq!(text, "Hello!"),
            _ => panic!("Expected UserMessage"),
        }
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"set_voice_enabled","enabled":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_messages_carry_snake_case_tags() {
        let msg = ServerMessage::StageAdvanced {
            stage: Stage::SkillCheck,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"stage_advanced""#));
        assert!(json.contains(r#""stage":"skill_check""#));

        let msg = ServerMessage::SessionEnded {
            report_key: "english_feedback_report_x.json".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"session_ended""#));
    }
}
