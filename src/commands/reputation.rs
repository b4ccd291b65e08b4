use crate::analysis::{activity, intent_parser, scorer};
use crate::chain::algorand::AlgorandClient;
use crate::commands::settings::load_effective_settings;
use crate::commands::wallet::{active_address, SharedWallet};
use crate::commands::AppContext;
use crate::models::intent::Chain;
use crate::models::log_entry::LogEntry;
use crate::models::reputation::*;
use crate::models::wallet::short_address;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tauri::Emitter;

pub const REPUTATION_LOG_EVENT: &str = "reputation_log";

pub type SharedReputationCache = Arc<Mutex<ReputationCache>>;

/// Single-run guard and cancellation flag for the reputation pipeline.
#[derive(Debug, Default)]
pub struct PipelineControl {
    running: AtomicBool,
    cancelled: AtomicBool,
}

impl PipelineControl {
    pub fn try_start(&self) -> Result<RunGuard<'_>, String> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err("BUSY: A reputation analysis is already running".to_string());
        }
        self.cancelled.store(false, Ordering::Release);
        Ok(RunGuard { control: self })
    }

    /// Request cancellation. Returns whether a run was active.
    pub fn cancel(&self) -> bool {
        let running = self.running.load(Ordering::Acquire);
        if running {
            self.cancelled.store(true, Ordering::Release);
        }
        running
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn check_cancelled(&self) -> Result<(), String> {
        if self.cancelled.load(Ordering::Acquire) {
            Err("CANCELLED: Reputation analysis was cancelled".to_string())
        } else {
            Ok(())
        }
    }
}

pub struct RunGuard<'a> {
    control: &'a PipelineControl,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.control.cancelled.store(false, Ordering::Release);
        self.control.running.store(false, Ordering::Release);
    }
}

#[tauri::command]
pub async fn generate_reputation_score(
    address: Option<String>,
    ctx: tauri::State<'_, AppContext>,
    cache: tauri::State<'_, SharedReputationCache>,
    wallet: tauri::State<'_, SharedWallet>,
    control: tauri::State<'_, PipelineControl>,
    app: tauri::AppHandle,
) -> Result<ReputationReport, String> {
    let address = resolve_address(address, wallet.inner())?;
    let settings = load_effective_settings(&ctx.data_dir)?;
    let client = AlgorandClient::new(settings.endpoints, &settings.http)
        .map_err(|e| format!("CHAIN_ERROR: {e}"))?;

    generate_reputation_internal(
        &client,
        &ctx.data_dir,
        &address,
        settings.history_days,
        control.inner(),
        cache.inner(),
        |entry| {
            let _ = app.emit(REPUTATION_LOG_EVENT, entry);
        },
    )
    .await
}

#[tauri::command]
pub async fn cancel_reputation_analysis(control: tauri::State<'_, PipelineControl>) -> Result<bool, String> {
    Ok(control.cancel())
}

#[tauri::command]
pub async fn get_reputation_breakdown(
    address: Option<String>,
    cache: tauri::State<'_, SharedReputationCache>,
) -> Result<ScoreBreakdown, String> {
    latest_report_internal(cache.inner(), address.as_deref()).map(|report| report.breakdown)
}

#[tauri::command]
pub async fn get_reputation_report(
    address: Option<String>,
    cache: tauri::State<'_, SharedReputationCache>,
) -> Result<ReputationReport, String> {
    latest_report_internal(cache.inner(), address.as_deref())
}

/// Explicit address wins; otherwise the connected wallet's.
pub fn resolve_address(address: Option<String>, wallet: &SharedWallet) -> Result<String, String> {
    if let Some(address) = address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()) {
        return Ok(address);
    }
    active_address(wallet)?.ok_or_else(|| {
        "NO_WALLET: Connect a wallet or enter an address to generate a score".to_string()
    })
}

pub fn latest_report_internal(
    cache: &SharedReputationCache,
    address: Option<&str>,
) -> Result<ReputationReport, String> {
    let cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    let report = match address.map(str::trim).filter(|a| !a.is_empty()) {
        Some(address) => cache_lock.report_for(address),
        None => cache_lock.report.as_ref(),
    };
    report
        .cloned()
        .ok_or_else(|| "NO_REPORT: No reputation report available. Generate a score first.".to_string())
}

/// Fetch, score and persist one wallet's reputation.
///
/// Progress is reported through `emit` as each step completes. A pending
/// cancellation is honoured between network steps. Only one run may be
/// active per `PipelineControl`.
pub async fn generate_reputation_internal<F>(
    client: &AlgorandClient,
    data_dir: &Path,
    address: &str,
    history_days: u32,
    control: &PipelineControl,
    cache: &SharedReputationCache,
    mut emit: F,
) -> Result<ReputationReport, String>
where
    F: FnMut(LogEntry) + Send,
{
    let _guard = control.try_start()?;
    let start = std::time::Instant::now();

    let result = run_pipeline(client, address, history_days, control, &mut emit).await;
    let (metrics, score) = match result {
        Ok(scored) => scored,
        Err(e) => {
            log::warn!("Reputation analysis for {} stopped: {e}", short_address(address));
            emit(LogEntry::error(e.clone()));
            return Err(e);
        }
    };

    let report = ReputationReport {
        id: uuid::Uuid::new_v4().to_string(),
        address: address.to_string(),
        breakdown: scorer::build_breakdown(address, &metrics, &score),
        metrics,
        tier: score.tier(),
        score,
        generated_at: chrono::Utc::now().timestamp(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    persist_report(data_dir, &report)?;
    update_cache(cache, report.clone())?;

    emit(LogEntry::success(format!(
        "Reputation score: {}/{} ({})",
        report.score.total_score,
        MAX_TOTAL_SCORE,
        report.tier.label()
    )));
    log::info!(
        "Scored {} at {} in {}ms",
        short_address(address),
        report.score.total_score,
        report.duration_ms
    );

    Ok(report)
}

async fn run_pipeline<F>(
    client: &AlgorandClient,
    address: &str,
    history_days: u32,
    control: &PipelineControl,
    emit: &mut F,
) -> Result<(crate::models::metrics::ActivityMetrics, ReputationScore), String>
where
    F: FnMut(LogEntry) + Send,
{
    if !intent_parser::is_valid_address(Chain::Algorand, address) {
        return Err(format!("INVALID_ADDRESS: {address} is not an Algorand address"));
    }

    emit(LogEntry::info(format!(
        "Starting reputation analysis for {}",
        short_address(address)
    )));

    control.check_cancelled()?;
    emit(LogEntry::info("Fetching account information..."));
    let lookup = client
        .account(address)
        .await
        .map_err(|e| format!("CHAIN_ERROR: Account lookup failed: {e}"))?;
    emit(LogEntry::success(format!(
        "Account loaded: {:.2} ALGO, {} assets, {} apps",
        lookup.account.amount as f64 / activity::MICROALGOS_PER_ALGO,
        lookup.account.assets.len(),
        lookup.account.total_apps_opted_in
    )));

    control.check_cancelled()?;
    emit(LogEntry::info(format!(
        "Fetching transactions from the last {history_days} days..."
    )));
    let after = chrono::Utc::now() - chrono::Duration::days(i64::from(history_days));
    let transactions = client
        .transactions_since(address, after)
        .await
        .map_err(|e| format!("CHAIN_ERROR: Transaction lookup failed: {e}"))?;
    emit(LogEntry::success(format!(
        "Found {} transactions, {} dApp interactions",
        transactions.len(),
        activity::count_dapp_interactions(&transactions)
    )));

    control.check_cancelled()?;
    emit(LogEntry::info("Checking governance participation..."));
    let governance = match client.governor_participation(address).await {
        Ok(participations) => activity::summarize_governance(&participations),
        Err(e) => {
            log::warn!("Governance lookup failed, scoring without it: {e}");
            emit(LogEntry::info("Governance data unavailable, continuing without it"));
            Default::default()
        }
    };
    emit(LogEntry::success(format!(
        "Governance: {} periods, {} votes",
        governance.periods, governance.votes
    )));

    control.check_cancelled()?;
    emit(LogEntry::info("Computing reputation score..."));
    let metrics = activity::build_metrics(&lookup, &transactions, &governance);
    let score = scorer::score(&metrics);

    Ok((metrics, score))
}

fn persist_report(data_dir: &Path, report: &ReputationReport) -> Result<(), String> {
    let conn = crate::commands::db::get_db_connection(data_dir)
        .map_err(|e| format!("DB error: {e}"))?;
    crate::commands::db::insert_score_snapshot(&conn, report)
        .map_err(|e| format!("DB error: {e}"))?;
    Ok(())
}

fn update_cache(cache: &SharedReputationCache, report: ReputationReport) -> Result<(), String> {
    let mut cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    cache_lock.report = Some(report);
    Ok(())
}
