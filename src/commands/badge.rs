use crate::commands::db::{
    find_badge_by_asset, find_badge_by_report, find_badge_by_tx, get_db_connection, insert_badge,
    load_badges, next_counter_value, BADGE_ASSET_COUNTER, BADGE_ASSET_ID_BASE,
};
use crate::commands::reputation::{resolve_address, SharedReputationCache};
use crate::commands::wallet::SharedWallet;
use crate::commands::AppContext;
use crate::models::badge::{BadgeMetadata, BadgeRecord, BadgeVerification};
use crate::models::log_entry::LogEntry;
use crate::models::reputation::{ReputationReport, MAX_TOTAL_SCORE};
use crate::models::wallet::short_address;
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use std::path::Path;
use tauri::Emitter;

pub const BADGE_LOG_EVENT: &str = "badge_log";

#[tauri::command]
pub async fn mint_badge(
    address: Option<String>,
    ctx: tauri::State<'_, AppContext>,
    cache: tauri::State<'_, SharedReputationCache>,
    wallet: tauri::State<'_, SharedWallet>,
    app: tauri::AppHandle,
) -> Result<BadgeRecord, String> {
    let address = resolve_address(address, wallet.inner())?;
    mint_badge_internal(&ctx.data_dir, cache.inner(), &address, |entry| {
        let _ = app.emit(BADGE_LOG_EVENT, entry);
    })
}

#[tauri::command]
pub async fn verify_credential(
    query: String,
    ctx: tauri::State<'_, AppContext>,
) -> Result<BadgeVerification, String> {
    verify_credential_internal(&ctx.data_dir, &query)
}

#[tauri::command]
pub async fn list_badges(
    address: Option<String>,
    ctx: tauri::State<'_, AppContext>,
) -> Result<Vec<BadgeRecord>, String> {
    list_badges_internal(&ctx.data_dir, address.as_deref())
}

/// Record a badge for the cached report of `address` in the local ledger.
pub fn mint_badge_internal<F>(
    data_dir: &Path,
    cache: &SharedReputationCache,
    address: &str,
    mut emit: F,
) -> Result<BadgeRecord, String>
where
    F: FnMut(LogEntry),
{
    let report = {
        let cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
        cache_lock.report_for(address).cloned()
    }
    .ok_or_else(|| format!("NO_REPORT: No reputation report for {}. Generate a score first.", short_address(address)))?;

    let mut conn = get_db_connection(data_dir).map_err(|e| format!("DB error: {e}"))?;
    // Immediate: concurrent mints queue on the write lock before the check.
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| format!("DB error: {e}"))?;
    if let Some(existing) = find_badge_by_report(&tx, &report.id).map_err(|e| format!("DB error: {e}"))? {
        return Err(already_minted(existing.asset_id));
    }

    emit(LogEntry::info("Preparing to mint reputation badge..."));
    emit(LogEntry::info("Creating badge metadata..."));
    let metadata = badge_metadata(&report);
    let metadata_json = serde_json::to_string(&metadata)
        .map_err(|e| format!("Failed to serialize badge metadata: {e}"))?;

    emit(LogEntry::info("Submitting badge to the ledger..."));
    let counter = next_counter_value(&tx, BADGE_ASSET_COUNTER).map_err(|e| format!("DB error: {e}"))?;
    let badge = BadgeRecord {
        tx_id: uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
        asset_id: BADGE_ASSET_ID_BASE + counter,
        address: report.address.clone(),
        report_id: report.id.clone(),
        score: report.score.total_score,
        tier: report.tier,
        badge_name: metadata.name,
        metadata_json,
        minted_at: metadata.issued_at,
    };
    insert_badge(&tx, &badge).map_err(|e| map_insert_error(e, &badge.report_id, &tx))?;
    tx.commit().map_err(|e| format!("DB error: {e}"))?;

    emit(LogEntry::success("Badge minted successfully!"));
    emit(LogEntry::success(format!("Asset ID: {}", badge.asset_id)));
    emit(LogEntry::success(format!("Transaction ID: {}", badge.tx_id)));
    emit(LogEntry::success(format!(
        "Badge represents score: {}/{}",
        badge.score, MAX_TOTAL_SCORE
    )));
    log::info!(
        "Minted badge {} for {}",
        badge.asset_id,
        short_address(&badge.address)
    );

    Ok(badge)
}

fn already_minted(asset_id: i64) -> String {
    format!("ALREADY_MINTED: This report was already minted as asset {asset_id}")
}

/// A unique clash on `report_id` means another mint of the same report won.
fn map_insert_error(err: rusqlite::Error, report_id: &str, conn: &Connection) -> String {
    let is_constraint = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    );
    if is_constraint {
        if let Ok(Some(existing)) = find_badge_by_report(conn, report_id) {
            return already_minted(existing.asset_id);
        }
    }
    format!("DB error: {err}")
}

fn badge_metadata(report: &ReputationReport) -> BadgeMetadata {
    BadgeMetadata {
        name: format!("{} Reputation Badge", report.tier.label()),
        description: format!(
            "On-chain reputation score of {}/{} for {}",
            report.score.total_score,
            MAX_TOTAL_SCORE,
            short_address(&report.address)
        ),
        address: report.address.clone(),
        report_id: report.id.clone(),
        score: report.score.total_score,
        tier: report.tier,
        issued_at: chrono::Utc::now().timestamp(),
    }
}

/// Look a badge up by transaction id, or by asset id when `query` is numeric.
pub fn verify_credential_internal(data_dir: &Path, query: &str) -> Result<BadgeVerification, String> {
    let query = query.trim();
    if query.is_empty() {
        return Err("INVALID_QUERY: Enter a transaction id or asset id".to_string());
    }

    let conn = get_db_connection(data_dir).map_err(|e| format!("DB error: {e}"))?;
    let by_tx = find_badge_by_tx(&conn, query).map_err(|e| format!("DB error: {e}"))?;
    let badge = match (by_tx, query.parse::<i64>()) {
        (Some(badge), _) => Some(badge),
        (None, Ok(asset_id)) => find_badge_by_asset(&conn, asset_id).map_err(|e| format!("DB error: {e}"))?,
        (None, Err(_)) => None,
    };

    Ok(BadgeVerification {
        query: query.to_string(),
        found: badge.is_some(),
        badge_name: badge.as_ref().map(|b| b.badge_name.clone()),
        badge,
    })
}

pub fn list_badges_internal(data_dir: &Path, address: Option<&str>) -> Result<Vec<BadgeRecord>, String> {
    let conn = get_db_connection(data_dir).map_err(|e| format!("DB error: {e}"))?;
    let address = address.map(str::trim).filter(|a| !a.is_empty());
    load_badges(&conn, address).map_err(|e| format!("Query error: {e}"))
}
