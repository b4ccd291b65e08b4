pub mod analysis;
pub mod chain;
pub mod commands;
pub mod models;

use commands::{
    badge::{list_badges, mint_badge, verify_credential},
    db::get_score_history,
    intent::{parse_activity_intent, query_activity},
    reputation::{
        cancel_reputation_analysis, generate_reputation_score, get_reputation_breakdown,
        get_reputation_report, PipelineControl,
    },
    settings::{get_settings, save_settings},
    wallet::{connect_wallet, disconnect_wallet, get_wallet_session, SharedWallet},
    AppContext,
};
use models::reputation::ReputationCache;
use models::wallet::WalletManager;
use std::sync::{Arc, Mutex};
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let wallet: SharedWallet = Arc::new(Mutex::new(WalletManager::default()));

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .manage(Arc::new(Mutex::new(ReputationCache::default())))
        .manage(wallet.clone())
        .manage(PipelineControl::default())
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&data_dir)?;
            commands::db::get_db_connection(&data_dir)?;
            log::info!("Using data directory {}", data_dir.display());
            app.manage(AppContext { data_dir });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            generate_reputation_score,
            cancel_reputation_analysis,
            get_reputation_breakdown,
            get_reputation_report,
            get_score_history,
            parse_activity_intent,
            query_activity,
            mint_badge,
            verify_credential,
            list_badges,
            connect_wallet,
            disconnect_wallet,
            get_wallet_session,
            get_settings,
            save_settings,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |_handle, event| {
        if let tauri::RunEvent::Exit = event {
            match wallet.lock() {
                Ok(mut manager) => manager.teardown(),
                Err(_) => log::warn!("Wallet lock poisoned during shutdown"),
            }
        }
    });
}
