pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod types;

// Ports and their infrastructure adapters
pub mod app;
pub mod infra;
