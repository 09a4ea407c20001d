pub mod attempts;
pub mod bootstrap;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod model;
pub mod providers;
pub mod redaction;
pub mod similarity;
pub mod storage;
pub mod timeouts;
