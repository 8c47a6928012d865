//! The bilingual feedback report uploaded at session end.
//!
//! The shape is fixed: two top-level blocks, `english` and `arabic`, each
//! mapping the same six labels (in its language) to free-text values. Fields
//! the session never collected are rendered as `N/A`, so a report always
//! carries all twelve entries.

use crate::profile::LearnerProfile;
use serde::{Deserialize, Serialize};

/// The feedback report for one completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub english: EnglishSection,
    pub arabic: ArabicSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnglishSection {
    #[serde(rename = "Purpose")]
    pub purpose: String,
    #[serde(rename = "Occupation")]
    pub occupation: String,
    #[serde(rename = "Skill Estimate")]
    pub skill_estimate: String,
    #[serde(rename = "Scenario Practiced")]
    pub scenario_practiced: String,
    #[serde(rename = "Strengths")]
    pub strengths: String,
    #[serde(rename = "Areas to Improve")]
    pub areas_to_improve: String,
}

/// The same six entries under Arabic labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArabicSection {
    #[serde(rename = "الهدف")]
    pub purpose: String,
    #[serde(rename = "المهنة")]
    pub occupation: String,
    #[serde(rename = "المستوى المتوقع")]
    pub skill_estimate: String,
    #[serde(rename = "السيناريو")]
    pub scenario_practiced: String,
    #[serde(rename = "نقاط القوة")]
    pub strengths: String,
    #[serde(rename = "نقاط التحسين")]
    pub areas_to_improve: String,
}

impl SessionReport {
    /// Builds the report from the profile collected over the session.
    pub fn from_profile(profile: &LearnerProfile) -> Self {
        let purpose = field_or_na(&profile.purpose);
        let occupation = field_or_na(&profile.occupation);
        let skill_estimate = field_or_na(&profile.skill_estimate);
        let scenario_practiced = field_or_na(&profile.scenario);
        let strengths = field_or_na(&profile.strengths);
        let areas_to_improve = field_or_na(&profile.areas_to_improve);

        Self {
            english: EnglishSection {
                purpose: purpose.clone(),
                occupation: occupation.clone(),
                skill_estimate: skill_estimate.clone(),
                scenario_practiced: scenario_practiced.clone(),
                strengths: strengths.clone(),
                areas_to_improve: areas_to_improve.clone(),
            },
            arabic: ArabicSection {
                purpose,
                occupation,
                skill_estimate,
                scenario_practiced,
                strengths,
                areas_to_improve,
            },
        }
    }
}

fn field_or_na(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "N/A".to_string())
}

/// The object-storage key for a session's report.
pub fn report_key(session_id: &str) -> String {
    format!("english_feedback_report_{session_id}.json")
}
