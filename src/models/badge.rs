use crate::models::reputation::ScoreTier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeMetadata {
    pub name: String,
    pub description: String,
    pub address: String,
    pub report_id: String,
    pub score: u32,
    pub tier: ScoreTier,
    pub issued_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRecord {
    pub tx_id: String,
    pub asset_id: i64,
    pub address: String,
    pub report_id: String,
    pub score: u32,
    pub tier: ScoreTier,
    pub badge_name: String,
    pub metadata_json: String,
    pub minted_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeVerification {
    pub query: String,
    pub found: bool,
    pub badge_name: Option<String>,
    pub badge: Option<BadgeRecord>,
}
