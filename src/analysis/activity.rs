use crate::chain::algorand::{AccountLookup, GovernorParticipation, TransactionSummary};
use crate::models::metrics::{ActivityMetrics, GovernanceSummary};

pub const MICROALGOS_PER_ALGO: f64 = 1_000_000.0;
/// Approximate block time, used to turn rounds into account age.
pub const SECONDS_PER_ROUND: f64 = 4.5;
pub const MAX_EXTERNAL_CLAIMS: u32 = 5;

/// Fold a wallet's raw indexer and governance data into scoring input.
pub fn build_metrics(
    lookup: &AccountLookup,
    transactions: &[TransactionSummary],
    governance: &GovernanceSummary,
) -> ActivityMetrics {
    let account = &lookup.account;
    let asset_count = account.assets.len() as u32;
    let age_days = account_age_days(account.created_at_round, lookup.current_round);

    ActivityMetrics {
        algo_balance: account.amount as f64 / MICROALGOS_PER_ALGO,
        asset_count,
        app_count: account.total_apps_opted_in,
        transaction_count: transactions.len() as u32,
        governance_periods: governance.periods,
        governance_votes: governance.votes,
        committed_algo: governance.committed_algo,
        dapp_interactions: count_dapp_interactions(transactions),
        external_claims: external_claims(age_days, asset_count),
        staking_participation: account.reward_base > 0 || governance.periods > 0,
    }
}

pub fn count_dapp_interactions(transactions: &[TransactionSummary]) -> u32 {
    transactions
        .iter()
        .filter(|tx| tx.tx_type == "appl" || tx.application_transaction.is_some())
        .count() as u32
}

pub fn account_age_days(created_at_round: Option<u64>, current_round: u64) -> u64 {
    let Some(created) = created_at_round else {
        return 0;
    };
    let rounds = current_round.saturating_sub(created) as f64;
    (rounds * SECONDS_PER_ROUND / 86_400.0) as u64
}

/// One claim per 30 days of account age plus one per five assets held.
pub fn external_claims(age_days: u64, asset_count: u32) -> u32 {
    let from_age = (age_days / 30).min(u64::from(MAX_EXTERNAL_CLAIMS)) as u32;
    (from_age + asset_count / 5).min(MAX_EXTERNAL_CLAIMS)
}

/// Summarize the periods in which an address was registered as a governor.
pub fn summarize_governance(participations: &[GovernorParticipation]) -> GovernanceSummary {
    let votes = participations
        .iter()
        .flat_map(|p| p.activities.iter())
        .filter(|a| is_vote(&a.activity_type))
        .count() as u32;

    let max_committed = participations
        .iter()
        .map(|p| p.committed_algo)
        .max()
        .unwrap_or(0);

    GovernanceSummary {
        periods: participations.len() as u32,
        votes,
        committed_algo: max_committed as f64 / MICROALGOS_PER_ALGO,
    }
}

fn is_vote(activity_type: &str) -> bool {
    activity_type == "vote" || activity_type == "voting"
}
