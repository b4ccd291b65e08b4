pub mod badge;
pub mod db;
pub mod intent;
pub mod reputation;
pub mod settings;
pub mod wallet;

use std::path::PathBuf;

/// Per-install paths resolved during app setup.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub data_dir: PathBuf,
}
