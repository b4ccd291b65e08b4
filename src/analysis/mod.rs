pub mod activity;
pub mod intent_parser;
pub mod scorer;
