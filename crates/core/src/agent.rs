//! Englishly Coaching Agent Service
//!
//! This module implements the session flow driver for the four-stage
//! coaching conversation. Stage advancement is owned by the language model:
//! each stage exposes exactly one tool over the Model Context Protocol
//! (MCP), and calling it records that stage's answers and moves the session
//! forward. The service enforces ordering, never content.

use crate::profile::LearnerProfile;
use crate::report::{SessionReport, report_key};
use crate::stage::Stage;
use crate::storage::ReportStore;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

// --- Session State ---

/// Core state of one coaching session.
///
/// The stage pointer only ever moves forward through the fixed four-stage
/// sequence. `completed` is set only after the feedback report has been
/// uploaded successfully.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
pub struct CoachSession {
    /// The stage the conversation is currently in.
    pub stage: Stage,
    /// Everything collected from the learner so far.
    pub profile: LearnerProfile,
    /// Whether the session has concluded with an uploaded report.
    pub completed: bool,
}

impl CoachSession {
    /// Creates a fresh session at the start of the stage sequence.
    pub fn new() -> Self {
        Self {
            stage: Stage::Greeting,
            profile: LearnerProfile::default(),
            completed: false,
        }
    }

    /// Moves the stage pointer to its successor, returning the new stage.
    /// Returns `None` at the terminal stage; the pointer never wraps.
    pub fn advance(&mut self) -> Option<Stage> {
        let next = self.stage.next()?;
        self.stage = next;
        Some(next)
    }
}

impl Default for CoachSession {
    fn default() -> Self {
        Self::new()
    }
}

// --- Data Structures for Tools ---

/// Arguments for recording the learner's profile during the greeting stage.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct SetProfileArgs {
    /// Why the learner wants to improve their English (e.g., job, travel, study).
    pub purpose: String,
    /// The learner's background, in their own words.
    pub background: String,
    /// The learner's occupation (e.g., student, doctor, engineer).
    pub occupation: String,
}

/// Arguments for recording the proficiency estimate after the skill check.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct SetSkillEstimateArgs {
    /// The estimated proficiency level, as a percentage out of 100.
    pub estimate: String,
}

/// Arguments for recording which scenario was practiced.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct SetScenarioArgs {
    /// The practice scenario that was announced and roleplayed.
    pub scenario: String,
}

/// Arguments for concluding the session with the final feedback.
#[derive(Deserialize, JsonSchema, Debug)]
pub struct EndSessionArgs {
    /// What the learner did well.
    pub strengths: String,
    /// What the learner should work on.
    pub areas_to_improve: String,
}

// --- Service and Handler Implementation ---

/// The MCP service through which the language model drives the session.
///
/// Each tool gates on the current stage, so a call made out of order is
/// rejected and the stage pointer cannot skip or move backward.
pub struct CoachService {
    /// Shared session state protected by an async mutex for concurrent access.
    pub session: Arc<tokio::sync::Mutex<CoachSession>>,
    /// Optional channel for broadcasting state changes to subscribers.
    pub state_tx: Option<mpsc::Sender<CoachSession>>,
    /// Where the feedback report goes when the session concludes.
    report_store: Arc<dyn ReportStore>,
    /// Identifier used to name the uploaded report object.
    session_id: String,
    /// MCP tool router for handling incoming tool calls.
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for CoachService {
    /// Returns server information and capabilities, advertising tool support.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tool_router]
impl CoachService {
    /// Creates a new coaching service instance.
    pub fn new(
        session: Arc<tokio::sync::Mutex<CoachSession>>,
        state_tx: Option<mpsc::Sender<CoachSession>>,
        report_store: Arc<dyn ReportStore>,
        session_id: String,
    ) -> Self {
        Self {
            session,
            state_tx,
            report_store,
            session_id,
            tool_router: Self::tool_router(),
        }
    }

    /// Sends the current session state to any subscriber.
    async fn broadcast(&self, session: &CoachSession) {
        if let Some(tx) = &self.state_tx {
            if tx.send(session.clone()).await.is_err() {
                tracing::warn!("Failed to broadcast state update: receiver dropped.");
            }
        }
    }

    #[tool(
        description = "Record the learner's purpose, background, and occupation, then move the session on to the skill check."
    )]
    pub async fn set_profile(&self, args: Parameters<SetProfileArgs>) -> Result<String, String> {
        let mut session = self.session.lock().await;
        if session.stage != Stage::Greeting {
            return Err(format!(
                "`set_profile` is only available during the greeting stage, not {}.",
                session.stage
            ));
        }

        session.profile.purpose = Some(args.0.purpose);
        session.profile.background = Some(args.0.background);
        session.profile.occupation = Some(args.0.occupation);
        session.advance();
        info!(
            purpose = session.profile.purpose.as_deref(),
            occupation = session.profile.occupation.as_deref(),
            "Learner profile captured"
        );

        self.broadcast(&session).await;
        Ok("OK. Profile recorded. Thank the learner and start assessing their English level.".to_string())
    }

    #[tool(
        description = "Record the learner's estimated proficiency level after the skill check, then move the session on to scenario practice."
    )]
    pub async fn set_skill_estimate(
        &self,
        args: Parameters<SetSkillEstimateArgs>,
    ) -> Result<String, String> {
        let mut session = self.session.lock().await;
        if session.stage != Stage::SkillCheck {
            return Err(format!(
                "`set_skill_estimate` is only available during the skill check stage, not {}.",
                session.stage
            ));
        }

        let estimate = args.0.estimate;
        session.profile.skill_estimate = Some(estimate.clone());
        session.advance();
        info!(%estimate, "Skill estimate recorded");

        self.broadcast(&session).await;
        Ok(format!(
            "OK. Level recorded as {estimate}. Tell the learner and move on to the practice scenario."
        ))
    }

    #[tool(
        description = "Record the practice scenario once the roleplay is finished, then move the session on to the feedback report."
    )]
    pub async fn set_scenario(&self, args: Parameters<SetScenarioArgs>) -> Result<String, String> {
        let mut session = self.session.lock().await;
        if session.stage != Stage::ScenarioPractice {
            return Err(format!(
                "`set_scenario` is only available during the scenario practice stage, not {}.",
                session.stage
            ));
        }

        let scenario = args.0.scenario;
        session.profile.scenario = Some(scenario.clone());
        session.advance();
        info!(%scenario, "Practice scenario recorded");

        self.broadcast(&session).await;
        Ok(format!(
            "OK. The {scenario} practice is complete. Give the learner your feedback now."
        ))
    }

    /// Concludes the session: builds the bilingual report from everything
    /// collected, uploads it, and only then marks the session completed.
    /// An upload failure is returned to the caller and leaves the session
    /// unconcluded, so no report is ever reported as saved when it was not.
    #[tool(
        description = "Conclude the session with the learner's strengths and areas to improve. Saves the feedback report."
    )]
    pub async fn end_session(&self, args: Parameters<EndSessionArgs>) -> Result<String, String> {
        let mut session = self.session.lock().await;
        if session.stage != Stage::FeedbackReport {
            return Err(format!(
                "`end_session` is only available during the feedback report stage, not {}.",
                session.stage
            ));
        }
        if session.completed {
            return Ok("OK. The session is already concluded.".to_string());
        }

        session.profile.strengths = Some(args.0.strengths);
        session.profile.areas_to_improve = Some(args.0.areas_to_improve);
        info!(
            strengths = session.profile.strengths.as_deref(),
            areas_to_improve = session.profile.areas_to_improve.as_deref(),
            "Final feedback captured"
        );

        let report = SessionReport::from_profile(&session.profile);
        let key = report_key(&self.session_id);
        self.report_store
            .put_report(&key, &report)
            .await
            .map_err(|e| format!("Failed to upload the feedback report: {e}"))?;

        session.completed = true;
        self.broadcast(&session).await;
        Ok("OK. The feedback report has been saved. Say goodbye and wish the learner good luck.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockReportStore;
    use anyhow::anyhow;

    fn service_with_store(store: MockReportStore) -> CoachService {
        CoachService::new(
            Arc::new(tokio::sync::Mutex::new(CoachSession::new())),
            None,
            Arc::new(store),
            "test-session".to_string(),
        )
    }

    fn profile_args() -> Parameters<SetProfileArgs> {
        Parameters(SetProfileArgs {
            purpose: "job interviews".into(),
            background: "five years in hospitals".into(),
            occupation: "doctor".into(),
        })
    }

    #[tokio::test]
    async fn full_session_visits_every_stage_in_order() {
        let mut store = MockReportStore::new();
        store
            .expect_put_report()
            .withf(|key, report| {
                key == "english_feedback_report_test-session.json"
                    && report.english.strengths == "Good grammar"
                    && report.english.areas_to_improve == "needs pronunciation work"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let service = service_with_store(store);

        let mut visited = vec![service.session.lock().await.stage];

        service.set_profile(profile_args()).await.unwrap();
        visited.push(service.session.lock().await.stage);

        service
            .set_skill_estimate(Parameters(SetSkillEstimateArgs {
                estimate: "70%".into(),
            }))
            .await
            .unwrap();
        visited.push(service.session.lock().await.stage);

        service
            .set_scenario(Parameters(SetScenarioArgs {
                scenario: "job interview".into(),
            }))
            .await
            .unwrap();
        visited.push(service.session.lock().await.stage);

        service
            .end_session(Parameters(EndSessionArgs {
                strengths: "Good grammar".into(),
                areas_to_improve: "needs pronunciation work".into(),
            }))
            .await
            .unwrap();

        assert_eq!(visited, Stage::SEQUENCE.to_vec());
        let session = service.session.lock().await;
        assert!(session.completed);
        assert_eq!(session.stage, Stage::FeedbackReport);
    }

    #[tokio::test]
    async fn out_of_stage_tool_calls_are_rejected() {
        let mut store = MockReportStore::new();
        store.expect_put_report().times(0);
        let service = service_with_store(store);

        let err = service
            .set_skill_estimate(Parameters(SetSkillEstimateArgs {
                estimate: "70%".into(),
            }))
            .await
            .unwrap_err();
        assert!(err.contains("skill check"));

        let err = service
            .set_scenario(Parameters(SetScenarioArgs {
                scenario: "travel".into(),
            }))
            .await
            .unwrap_err();
        assert!(err.contains("scenario practice"));

        // The pointer never moved.
        assert_eq!(service.session.lock().await.stage, Stage::Greeting);
    }

    #[tokio::test]
    async fn session_stuck_in_greeting_never_uploads() {
        let mut store = MockReportStore::new();
        store.expect_put_report().times(0);
        let service = service_with_store(store);

        let err = service
            .end_session(Parameters(EndSessionArgs {
                strengths: "x".into(),
                areas_to_improve: "y".into(),
            }))
            .await
            .unwrap_err();
        assert!(err.contains("feedback report"));

        let session = service.session.lock().await;
        assert!(!session.completed);
        assert_eq!(session.stage, Stage::Greeting);
    }

    #[tokio::test]
    async fn upload_failure_surfaces_and_leaves_session_unconcluded() {
        let mut store = MockReportStore::new();
        store
            .expect_put_report()
            .times(1)
            .returning(|_, _| Err(anyhow!("bucket unreachable")));
        let service = service_with_store(store);

        service.set_profile(profile_args()).await.unwrap();
        service
            .set_skill_estimate(Parameters(SetSkillEstimateArgs {
                estimate: "70%".into(),
            }))
            .await
            .unwrap();
        service
            .set_scenario(Parameters(SetScenarioArgs {
                scenario: "business meeting".into(),
            }))
            .await
            .unwrap();

        let err = service
            .end_session(Parameters(EndSessionArgs {
                strengths: "vocabulary".into(),
                areas_to_improve: "fluency".into(),
            }))
            .await
            .unwrap_err();
        assert!(err.contains("bucket unreachable"));
        assert!(!service.session.lock().await.completed);
    }

    #[tokio::test]
    async fn state_updates_are_broadcast_on_each_advance() {
        let mut store = MockReportStore::new();
        store.expect_put_report().returning(|_, _| Ok(()));
        let (tx, mut rx) = mpsc::channel(8);
        let service = CoachService::new(
            Arc::new(tokio::sync::Mutex::new(CoachSession::new())),
            Some(tx),
            Arc::new(store),
            "test-session".to_string(),
        );

        service.set_profile(profile_args()).await.unwrap();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.stage, Stage::SkillCheck);
        assert_eq!(update.profile.occupation.as_deref(), Some("doctor"));
    }

    #[test]
    fn advance_stops_at_the_terminal_stage() {
        let mut session = CoachSession::new();
        assert_eq!(session.advance(), Some(Stage::SkillCheck));
        assert_eq!(session.advance(), Some(Stage::ScenarioPractice));
        assert_eq!(session.advance(), Some(Stage::FeedbackReport));
        assert_eq!(session.advance(), None);
        assert_eq!(session.stage, Stage::FeedbackReport);
    }
}
