use crate::models::wallet::{WalletManager, WalletSession};
use std::sync::{Arc, Mutex};

pub type SharedWallet = Arc<Mutex<WalletManager>>;

#[tauri::command]
pub async fn connect_wallet(
    provider: String,
    address: String,
    network: String,
    wallet: tauri::State<'_, SharedWallet>,
) -> Result<WalletSession, String> {
    connect_wallet_internal(wallet.inner(), &provider, &address, &network)
}

#[tauri::command]
pub async fn disconnect_wallet(wallet: tauri::State<'_, SharedWallet>) -> Result<WalletSession, String> {
    disconnect_wallet_internal(wallet.inner())
}

#[tauri::command]
pub async fn get_wallet_session(wallet: tauri::State<'_, SharedWallet>) -> Result<WalletSession, String> {
    let manager = wallet.lock().map_err(|_| "Wallet lock error".to_string())?;
    Ok(manager.session())
}

pub fn connect_wallet_internal(
    wallet: &SharedWallet,
    provider: &str,
    address: &str,
    network: &str,
) -> Result<WalletSession, String> {
    let mut manager = wallet.lock().map_err(|_| "Wallet lock error".to_string())?;
    manager.connect(provider, address, network)
}

pub fn disconnect_wallet_internal(wallet: &SharedWallet) -> Result<WalletSession, String> {
    let mut manager = wallet.lock().map_err(|_| "Wallet lock error".to_string())?;
    Ok(manager.disconnect())
}

/// Address of the connected wallet, if any.
pub fn active_address(wallet: &SharedWallet) -> Result<Option<String>, String> {
    let manager = wallet.lock().map_err(|_| "Wallet lock error".to_string())?;
    Ok(manager.active_address())
}
