use crate::commands::AppContext;
use crate::models::badge::BadgeRecord;
use crate::models::reputation::{ReputationReport, ReputationScore, ScoreSnapshot, ScoreTier};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 2;
const DB_FILE_NAME: &str = "zeyo.db";
pub const BADGE_ASSET_COUNTER: &str = "badge_asset_id";
/// Asset ids are offset so they never collide with low test-network ids.
pub const BADGE_ASSET_ID_BASE: i64 = 100_000;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("Database schema {version} is newer than this build ({DB_SCHEMA_VERSION})");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS score_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            report_id TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL,
            total_score INTEGER NOT NULL,
            score_json TEXT NOT NULL DEFAULT '{}',
            metrics_json TEXT NOT NULL DEFAULT '{}',
            generated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS badges (
            tx_id TEXT PRIMARY KEY,
            asset_id INTEGER NOT NULL UNIQUE,
            address TEXT NOT NULL,
            report_id TEXT NOT NULL UNIQUE,
            score INTEGER NOT NULL,
            tier TEXT NOT NULL CHECK(tier IN ('excellent', 'good', 'fair', 'needs_improvement')),
            badge_name TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            minted_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ledger_counters (
            name TEXT PRIMARY KEY,
            next_val INTEGER NOT NULL DEFAULT 0
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_score_history_address ON score_history(address, generated_at);
        CREATE INDEX IF NOT EXISTS idx_badges_address ON badges(address);
        ",
    )
}

pub fn get_db_connection(data_dir: &Path) -> Result<Connection> {
    let conn = Connection::open(data_dir.join(DB_FILE_NAME))?;
    initialize_schema(&conn)?;
    Ok(conn)
}

pub fn insert_score_snapshot(conn: &Connection, report: &ReputationReport) -> Result<ScoreSnapshot> {
    let score_json = serde_json::to_string(&report.score).unwrap_or_else(|_| "{}".to_string());
    let metrics_json = serde_json::to_string(&report.metrics).unwrap_or_else(|_| "{}".to_string());

    conn.execute(
        "INSERT INTO score_history (report_id, address, total_score, score_json, metrics_json, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            report.id,
            report.address,
            report.score.total_score,
            score_json,
            metrics_json,
            report.generated_at
        ],
    )?;

    Ok(ScoreSnapshot {
        id: conn.last_insert_rowid(),
        report_id: report.id.clone(),
        address: report.address.clone(),
        total_score: report.score.total_score,
        score: report.score,
        metrics_json,
        generated_at: report.generated_at,
    })
}

/// Oldest first, so the dashboard can plot it directly.
pub fn load_score_history(conn: &Connection, address: Option<&str>, limit: u32) -> Result<Vec<ScoreSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, address, total_score, score_json, metrics_json, generated_at
         FROM (
            SELECT * FROM score_history
            WHERE ?1 IS NULL OR address = ?1
            ORDER BY generated_at DESC, id DESC
            LIMIT ?2
         )
         ORDER BY generated_at ASC, id ASC",
    )?;

    let rows = stmt.query_map(params![address, limit], |row| {
        let score_json: String = row.get(4)?;
        Ok(ScoreSnapshot {
            id: row.get(0)?,
            report_id: row.get(1)?,
            address: row.get(2)?,
            total_score: row.get(3)?,
            score: serde_json::from_str::<ReputationScore>(&score_json).unwrap_or_default(),
            metrics_json: row.get(5)?,
            generated_at: row.get(6)?,
        })
    })?;

    rows.collect()
}

/// Take the next value of a named counter, starting at 0.
///
/// A single statement, so it composes with a caller's transaction.
pub fn next_counter_value(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "INSERT INTO ledger_counters (name, next_val) VALUES (?1, 1)
         ON CONFLICT(name) DO UPDATE SET next_val = next_val + 1
         RETURNING next_val - 1",
        params![name],
        |row| row.get(0),
    )
}

pub fn insert_badge(conn: &Connection, badge: &BadgeRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO badges (tx_id, asset_id, address, report_id, score, tier, badge_name, metadata_json, minted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            badge.tx_id,
            badge.asset_id,
            badge.address,
            badge.report_id,
            badge.score,
            badge.tier.as_str(),
            badge.badge_name,
            badge.metadata_json,
            badge.minted_at
        ],
    )?;
    Ok(())
}

const BADGE_COLUMNS: &str =
    "tx_id, asset_id, address, report_id, score, tier, badge_name, metadata_json, minted_at";

fn badge_from_row(row: &Row<'_>) -> Result<BadgeRecord> {
    let tier: String = row.get(5)?;
    Ok(BadgeRecord {
        tx_id: row.get(0)?,
        asset_id: row.get(1)?,
        address: row.get(2)?,
        report_id: row.get(3)?,
        score: row.get(4)?,
        tier: ScoreTier::parse(&tier).unwrap_or(ScoreTier::NeedsImprovement),
        badge_name: row.get(6)?,
        metadata_json: row.get(7)?,
        minted_at: row.get(8)?,
    })
}

pub fn find_badge_by_report(conn: &Connection, report_id: &str) -> Result<Option<BadgeRecord>> {
    conn.query_row(
        &format!("SELECT {BADGE_COLUMNS} FROM badges WHERE report_id = ?1"),
        params![report_id],
        badge_from_row,
    )
    .optional()
}

pub fn find_badge_by_tx(conn: &Connection, tx_id: &str) -> Result<Option<BadgeRecord>> {
    conn.query_row(
        &format!("SELECT {BADGE_COLUMNS} FROM badges WHERE tx_id = ?1"),
        params![tx_id],
        badge_from_row,
    )
    .optional()
}

pub fn find_badge_by_asset(conn: &Connection, asset_id: i64) -> Result<Option<BadgeRecord>> {
    conn.query_row(
        &format!("SELECT {BADGE_COLUMNS} FROM badges WHERE asset_id = ?1"),
        params![asset_id],
        badge_from_row,
    )
    .optional()
}

pub fn load_badges(conn: &Connection, address: Option<&str>) -> Result<Vec<BadgeRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges WHERE ?1 IS NULL OR address = ?1 ORDER BY minted_at DESC, asset_id DESC"
    ))?;
    let rows = stmt.query_map(params![address], badge_from_row)?;
    rows.collect()
}

pub fn get_score_history_internal(
    data_dir: &Path,
    address: Option<String>,
    limit: Option<u32>,
) -> Result<Vec<ScoreSnapshot>, String> {
    let conn = get_db_connection(data_dir).map_err(|e| format!("DB error: {e}"))?;
    let address = address.filter(|a| !a.trim().is_empty());
    load_score_history(&conn, address.as_deref(), limit.unwrap_or(100).clamp(1, 1000))
        .map_err(|e| format!("Query error: {e}"))
}

#[tauri::command]
pub async fn get_score_history(
    ctx: tauri::State<'_, AppContext>,
    address: Option<String>,
    limit: Option<u32>,
) -> Result<Vec<ScoreSnapshot>, String> {
    get_score_history_internal(&ctx.data_dir, address, limit)
}
