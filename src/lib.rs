pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod fixture;
pub mod logging;
pub mod profile;
pub mod report;
pub mod runner;
pub mod timer;
pub mod types;
pub mod variants;
