pub mod badge;
pub mod intent;
pub mod log_entry;
pub mod metrics;
pub mod reputation;
pub mod wallet;
