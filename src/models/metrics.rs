use serde::{Deserialize, Serialize};

/// Normalized on-chain activity for one wallet, the input to scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub algo_balance: f64,
    pub asset_count: u32,
    pub app_count: u32,
    /// Transactions inside the history window (90 days by default).
    pub transaction_count: u32,
    pub governance_periods: u32,
    pub governance_votes: u32,
    pub committed_algo: f64,
    pub dapp_interactions: u32,
    pub external_claims: u32,
    pub staking_participation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSummary {
    pub periods: u32,
    pub votes: u32,
    pub committed_algo: f64,
}
