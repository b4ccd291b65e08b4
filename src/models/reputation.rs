use crate::models::metrics::ActivityMetrics;
use serde::{Deserialize, Serialize};

pub const MAX_WALLET_BALANCE: u32 = 20;
pub const MAX_STAKING_GOVERNANCE: u32 = 30;
pub const MAX_TRANSACTION_ACTIVITY: u32 = 20;
pub const MAX_DAPP_PARTICIPATION: u32 = 20;
pub const MAX_EXTERNAL_ATTESTATIONS: u32 = 10;
pub const MAX_TOTAL_SCORE: u32 = MAX_WALLET_BALANCE
    + MAX_STAKING_GOVERNANCE
    + MAX_TRANSACTION_ACTIVITY
    + MAX_DAPP_PARTICIPATION
    + MAX_EXTERNAL_ATTESTATIONS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub wallet_balance: u32,
    pub staking_governance: u32,
    pub transaction_activity: u32,
    pub dapp_participation: u32,
    pub external_attestations: u32,
    pub total_score: u32,
}

impl ReputationScore {
    pub fn tier(&self) -> ScoreTier {
        ScoreTier::from_total(self.total_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl ScoreTier {
    pub fn from_total(total: u32) -> Self {
        if total >= 80 {
            ScoreTier::Excellent
        } else if total >= 60 {
            ScoreTier::Good
        } else if total >= 40 {
            ScoreTier::Fair
        } else {
            ScoreTier::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreTier::Excellent => "Excellent",
            ScoreTier::Good => "Good",
            ScoreTier::Fair => "Fair",
            ScoreTier::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreTier::Excellent => "excellent",
            ScoreTier::Good => "good",
            ScoreTier::Fair => "fair",
            ScoreTier::NeedsImprovement => "needs_improvement",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "excellent" => Some(ScoreTier::Excellent),
            "good" => Some(ScoreTier::Good),
            "fair" => Some(ScoreTier::Fair),
            "needs_improvement" => Some(ScoreTier::NeedsImprovement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDetail {
    pub name: String,
    pub weight_pct: u32,
    pub score: u32,
    pub max_score: u32,
    pub rating: String, // "strong" | "moderate" | "weak"
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub address: String,
    pub total_score: u32,
    pub tier: ScoreTier,
    pub categories: Vec<CategoryDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationReport {
    pub id: String,
    pub address: String,
    pub metrics: ActivityMetrics,
    pub score: ReputationScore,
    pub tier: ScoreTier,
    pub breakdown: ScoreBreakdown,
    pub generated_at: i64,
    pub duration_ms: u64,
}

/// Persisted row of the reputation timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub id: i64,
    pub report_id: String,
    pub address: String,
    pub total_score: u32,
    pub score: ReputationScore,
    pub metrics_json: String,
    pub generated_at: i64,
}

/// In-memory cache of the most recent report
#[derive(Debug, Default)]
pub struct ReputationCache {
    pub report: Option<ReputationReport>,
}

impl ReputationCache {
    pub fn report_for(&self, address: &str) -> Option<&ReputationReport> {
        self.report.as_ref().filter(|r| r.address == address)
    }
}
