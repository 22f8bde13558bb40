pub mod audit;
pub mod auth;
pub mod billing;
pub mod extract;
pub mod orchestrator;
pub mod queue;
pub mod tokens;
