use crate::models::metrics::ActivityMetrics;
use crate::models::reputation::*;

/// (minimum value, points), highest threshold first.
const BALANCE_TIERS: &[(f64, u32)] = &[
    (100_000.0, 20),
    (50_000.0, 18),
    (10_000.0, 16),
    (5_000.0, 14),
    (1_000.0, 12),
    (500.0, 10),
    (100.0, 8),
    (50.0, 6),
    (10.0, 4),
    (1.0, 2),
];

const GOVERNANCE_PERIOD_TIERS: &[(u32, u32)] = &[(5, 20), (3, 16), (2, 12), (1, 8)];

const GOVERNANCE_VOTE_TIERS: &[(u32, u32)] = &[(20, 10), (15, 8), (10, 6), (5, 4), (1, 2)];

const TRANSACTION_TIERS: &[(u32, u32)] = &[
    (500, 20),
    (200, 18),
    (100, 16),
    (50, 14),
    (25, 12),
    (15, 10),
    (10, 8),
    (5, 6),
    (3, 4),
    (1, 2),
];

const DAPP_TIERS: &[(u32, u32)] = &[
    (50, 20),
    (30, 18),
    (20, 16),
    (15, 14),
    (10, 12),
    (7, 10),
    (5, 8),
    (3, 6),
    (2, 4),
    (1, 2),
];

const POINTS_PER_CLAIM: u32 = 2;

/// Score a wallet's activity across the five weighted categories.
///
/// Every category is a step function over its input, so the result is
/// deterministic and each sub-score only moves when a threshold is crossed.
/// Negative or NaN inputs are outside the contract and score zero.
pub fn score(metrics: &ActivityMetrics) -> ReputationScore {
    let wallet_balance = wallet_balance_points(metrics.algo_balance);
    let staking_governance =
        staking_governance_points(metrics.governance_periods, metrics.governance_votes);
    let transaction_activity = lookup(TRANSACTION_TIERS, metrics.transaction_count)
        .min(MAX_TRANSACTION_ACTIVITY);
    let dapp_participation =
        lookup(DAPP_TIERS, metrics.dapp_interactions).min(MAX_DAPP_PARTICIPATION);
    let external_attestations = metrics
        .external_claims
        .saturating_mul(POINTS_PER_CLAIM)
        .min(MAX_EXTERNAL_ATTESTATIONS);

    ReputationScore {
        wallet_balance,
        staking_governance,
        transaction_activity,
        dapp_participation,
        external_attestations,
        total_score: wallet_balance
            + staking_governance
            + transaction_activity
            + dapp_participation
            + external_attestations,
    }
}

fn wallet_balance_points(balance: f64) -> u32 {
    let points = BALANCE_TIERS
        .iter()
        .find(|(min, _)| balance >= *min)
        .map(|(_, points)| *points);

    match points {
        Some(points) => points.min(MAX_WALLET_BALANCE),
        // Dust balances still count for something.
        None if balance > 0.0 => 1,
        None => 0,
    }
}

fn staking_governance_points(periods: u32, votes: u32) -> u32 {
    (lookup(GOVERNANCE_PERIOD_TIERS, periods) + lookup(GOVERNANCE_VOTE_TIERS, votes))
        .min(MAX_STAKING_GOVERNANCE)
}

fn lookup(tiers: &[(u32, u32)], value: u32) -> u32 {
    tiers
        .iter()
        .find(|(min, _)| value >= *min)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

/// Per-category rows for the dashboard table.
pub fn build_breakdown(address: &str, metrics: &ActivityMetrics, score: &ReputationScore) -> ScoreBreakdown {
    let categories = vec![
        category(
            "Wallet Balance",
            20,
            score.wallet_balance,
            MAX_WALLET_BALANCE,
            vec![format!(
                "{:.2} ALGO, {} assets",
                metrics.algo_balance, metrics.asset_count
            )],
        ),
        category(
            "Staking/Governance",
            30,
            score.staking_governance,
            MAX_STAKING_GOVERNANCE,
            vec![format!(
                "{} periods, {} votes, {:.2} committed ALGO",
                metrics.governance_periods, metrics.governance_votes, metrics.committed_algo
            )],
        ),
        category(
            "Transaction Activity",
            20,
            score.transaction_activity,
            MAX_TRANSACTION_ACTIVITY,
            vec![format!("{} transactions (3 months)", metrics.transaction_count)],
        ),
        category(
            "dApp Participation",
            20,
            score.dapp_participation,
            MAX_DAPP_PARTICIPATION,
            vec![format!("{} dApp interactions", metrics.dapp_interactions)],
        ),
        category(
            "External Attestations",
            10,
            score.external_attestations,
            MAX_EXTERNAL_ATTESTATIONS,
            vec![format!("{} verified claims", metrics.external_claims)],
        ),
    ];

    ScoreBreakdown {
        address: address.to_string(),
        total_score: score.total_score,
        tier: score.tier(),
        categories,
    }
}

fn category(name: &str, weight_pct: u32, score: u32, max_score: u32, details: Vec<String>) -> CategoryDetail {
    CategoryDetail {
        name: name.to_string(),
        weight_pct,
        score,
        max_score,
        rating: rating(score, max_score).to_string(),
        details,
    }
}

fn rating(score: u32, max_score: u32) -> &'static str {
    // Integer form of score >= 0.8 * max and score >= 0.5 * max.
    if score * 10 >= max_score * 8 {
        "strong"
    } else if score * 2 >= max_score {
        "moderate"
    } else {
        "weak"
    }
}
