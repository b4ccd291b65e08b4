pub mod algorand;
pub mod client;
