pub mod ai;
pub mod attachments;
pub mod capture;
pub mod config;
pub mod envelope;
pub mod history;
pub mod instructions;
pub mod orchestrator;
pub mod server;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
