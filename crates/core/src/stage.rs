//! The four fixed phases of a coaching conversation.
//!
//! Each stage carries a static instruction template handed to the language
//! model verbatim, and names the single tool whose invocation advances the
//! session to the next stage. The sequence is strictly linear: there is no
//! backward transition and no skip.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One phase of the coaching conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Introduction: collect the learner's purpose, background, and occupation.
    Greeting,
    /// A short spoken proficiency assessment.
    SkillCheck,
    /// A roleplay scenario matched to the learner's purpose and level.
    ScenarioPractice,
    /// Feedback delivery and report upload. Terminal.
    FeedbackReport,
}

impl Stage {
    /// The full stage sequence, in order.
    pub const SEQUENCE: [Stage; 4] = [
        Stage::Greeting,
        Stage::SkillCheck,
        Stage::ScenarioPractice,
        Stage::FeedbackReport,
    ];

    /// The strict linear successor of this stage, or `None` for the terminal stage.
    pub const fn next(self) -> Option<Stage> {
        match self {
            Stage::Greeting => Some(Stage::SkillCheck),
            Stage::SkillCheck => Some(Stage::ScenarioPractice),
            Stage::ScenarioPractice => Some(Stage::FeedbackReport),
            Stage::FeedbackReport => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Stage::FeedbackReport)
    }

    /// The name of the one tool the language model may call during this stage.
    pub const fn tool_name(self) -> &'static str {
        match self {
            Stage::Greeting => "set_profile",
            Stage::SkillCheck => "set_skill_estimate",
            Stage::ScenarioPractice => "set_scenario",
            Stage::FeedbackReport => "end_session",
        }
    }

    /// The instruction template supplied to the language model for this stage.
    pub const fn instructions(self) -> &'static str {
        match self {
            Stage::Greeting => GREETING_INSTRUCTIONS,
            Stage::SkillCheck => SKILL_CHECK_INSTRUCTIONS,
            Stage::ScenarioPractice => SCENARIO_PRACTICE_INSTRUCTIONS,
            Stage::FeedbackReport => FEEDBACK_REPORT_INSTRUCTIONS,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Greeting => write!(f, "greeting"),
            Stage::SkillCheck => write!(f, "skill check"),
            Stage::ScenarioPractice => write!(f, "scenario practice"),
            Stage::FeedbackReport => write!(f, "feedback report"),
        }
    }
}

const GREETING_INSTRUCTIONS: &str = "\
Your name is Englishly. You are a friendly English-speaking AI coach.
Start with a warm introduction.
Ask the learner why they want to improve their English (e.g., job, travel, study).
Then ask about their background and occupation (e.g., student, doctor, engineer).
Only speak English. If the learner uses another language, gently remind them to use English.
Once you have collected the purpose, background, and occupation, call the `set_profile` tool to record them and move on.";

const SKILL_CHECK_INSTRUCTIONS: &str = "\
Ask the learner a few simple English questions to evaluate their speaking proficiency.
Based on their answers, estimate their proficiency level (out of 100%).
Do not explain the levels.
When you are confident in the estimate, call the `set_skill_estimate` tool to record it and move on.";

const SCENARIO_PRACTICE_INSTRUCTIONS: &str = "\
Based on the learner's purpose and estimated level, pick a suitable practice scenario:
- Job interview based on their occupation
- University admission
- Business meeting
- Travel conversation

Announce the scenario and run a short roleplay session.
Ask 2-3 scenario-based questions.
When the roleplay is done, call the `set_scenario` tool to record which scenario was practiced.";

const FEEDBACK_REPORT_INSTRUCTIONS: &str = "\
Provide feedback based on the learner's overall performance:
- Proficiency estimate
- Strengths
- Areas to improve

Present the feedback in English and Arabic.
Then call the `end_session` tool with the strengths and areas to improve so the feedback report is saved.
Once the report is saved, say goodbye and wish the learner good luck.";
