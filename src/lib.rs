pub mod agents;
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::workflow::{WorkflowCoordinator, WorkflowSummary, launch};
