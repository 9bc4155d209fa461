pub mod config;
pub mod orchestrator;
pub mod outcome;
pub mod retry;
