use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The learner's collected answers, filled in stage by stage.
///
/// Every field starts empty and is recorded exactly once by the stage that
/// owns it: the greeting records purpose, background, and occupation; the
/// skill check records the estimate; the scenario practice records the
/// scenario; the feedback stage records strengths and areas to improve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LearnerProfile {
    pub purpose: Option<String>,
    pub background: Option<String>,
    pub occupation: Option<String>,
    pub skill_estimate: Option<String>,
    pub scenario: Option<String>,
    pub strengths: Option<String>,
    pub areas_to_improve: Option<String>,
}
