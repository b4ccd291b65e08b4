use crate::analysis::intent_parser::is_valid_address;
use crate::models::intent::Chain;
use serde::{Deserialize, Serialize};

pub const SUPPORTED_PROVIDERS: &[&str] = &["pera", "defly", "walletconnect"];
pub const SUPPORTED_NETWORKS: &[&str] = &["testnet", "mainnet", "localnet", "core-testnet"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub provider: Option<String>,
    pub address: Option<String>,
    pub network: Option<String>,
    pub connected_at: Option<i64>,
}

impl WalletSession {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

pub fn chain_for_network(network: &str) -> Chain {
    if network.starts_with("core") {
        Chain::Core
    } else {
        Chain::Algorand
    }
}

/// Owns the connected wallet session. Constructed once at startup and
/// handed to commands through Tauri state.
#[derive(Debug, Default)]
pub struct WalletManager {
    session: WalletSession,
}

impl WalletManager {
    pub fn connect(&mut self, provider: &str, address: &str, network: &str) -> Result<WalletSession, String> {
        let provider = provider.trim().to_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(format!("UNSUPPORTED_PROVIDER: {provider}"));
        }

        let network = network.trim().to_lowercase();
        if !SUPPORTED_NETWORKS.contains(&network.as_str()) {
            return Err(format!("UNSUPPORTED_NETWORK: {network}"));
        }

        let address = address.trim();
        if !is_valid_address(chain_for_network(&network), address) {
            return Err(format!("INVALID_ADDRESS: {address} is not a valid {network} address"));
        }

        if let Some(previous) = self.session.address.as_deref() {
            if previous != address {
                log::info!("Replacing wallet session for {}", short_address(previous));
            }
        }

        self.session = WalletSession {
            provider: Some(provider),
            address: Some(address.to_string()),
            network: Some(network),
            connected_at: Some(chrono::Utc::now().timestamp()),
        };
        log::info!("Wallet connected: {}", short_address(address));

        Ok(self.session.clone())
    }

    pub fn disconnect(&mut self) -> WalletSession {
        if let Some(address) = self.session.address.as_deref() {
            log::info!("Wallet disconnected: {}", short_address(address));
        }
        self.session = WalletSession::default();
        self.session.clone()
    }

    pub fn session(&self) -> WalletSession {
        self.session.clone()
    }

    pub fn active_address(&self) -> Option<String> {
        self.session.address.clone()
    }

    /// Called on application exit.
    pub fn teardown(&mut self) {
        if self.session.is_connected() {
            self.disconnect();
        }
    }
}

/// `ABCDEF...WXYZ` form used in logs.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
