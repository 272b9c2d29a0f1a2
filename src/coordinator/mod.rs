pub mod context;
pub mod registry;
pub mod retry;
pub mod workflow;
