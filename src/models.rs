use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logged question/answer exchange between a student and the AI
/// assistant. Numeric fields are already coerced at ingestion; missing or
/// non-numeric source values arrive here as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionRecord {
    pub email: String,
    pub first: String,
    pub last: String,
    pub input: String,
    pub outputs: String,
    pub course_id: String,
    pub course_name: String,
    pub instance_ai_name: String,
    pub credits: i64,
    pub query_duration_ms: i64,
    pub ttft_ms: i64,
    pub success: bool,
    pub created: Option<DateTime<Utc>>,
}

/// Why points were awarded. The achievement classifier matches on this tag,
/// never on the display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreReason {
    GoalAligned,
    TopicKeyword { keywords: Vec<String> },
    DetailedResponse,
    FollowUp { count: u32 },
    PathwayPro,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub reason: ScoreReason,
    pub label: String,
}

/// Outcome of scoring a single interaction in isolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityScore {
    pub points: u32,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAggregate {
    pub email: String,
    pub name: String,
    pub total_points: u32,
    pub total_interactions: usize,
    pub total_credits: i64,
    pub follow_ups: u32,
    pub unique_courses: usize,
    pub unique_assistants: usize,
    pub avg_duration_ms: f64,
    pub avg_ttft_ms: f64,
    /// Percentage in 0..=100, full precision; rounding happens at display.
    pub success_rate: f64,
    pub pathway_pro: bool,
    /// Per-record criteria in record order, then the follow-up and
    /// Pathway Pro bonus entries.
    pub criteria_met: Vec<Criterion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "🧠 Deep Diver")]
    DeepDiver,
    #[serde(rename = "📚 Study Strategist")]
    StudyStrategist,
    #[serde(rename = "🔍 Bug Hunter")]
    BugHunter,
    #[serde(rename = "🎓 Pathway Pro")]
    PathwayPro,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::DeepDiver => "🧠 Deep Diver",
            Badge::StudyStrategist => "📚 Study Strategist",
            Badge::BugHunter => "🔍 Bug Hunter",
            Badge::PathwayPro => "🎓 Pathway Pro",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    /// Dense 1-based rank; ties keep distinct consecutive ranks.
    pub rank: usize,
    #[serde(flatten)]
    pub user: UserAggregate,
    /// Earned badges in badge-definition order.
    pub achievements: Vec<Badge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_users: usize,
    pub total_interactions: usize,
    pub total_credits: i64,
    pub avg_points_per_user: f64,
    pub high_performers: usize,
    pub medium_performers: usize,
    pub light_users: usize,
}

/// Full pipeline output for one run over the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub ranked_users: Vec<RankedUser>,
    pub summary_stats: SummaryStats,
}
