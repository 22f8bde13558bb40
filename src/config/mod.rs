use serde::Deserialize;
use std::time::Duration;

use crate::services::orchestrator::OrchestratorConfig;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string (audit log storage)
    pub database_url: String,

    /// Redis connection string for the job queue and credit ledger
    pub redis_url: String,

    /// HMAC secret for API bearer tokens
    pub jwt_secret: String,

    /// Wait bound applied when a request carries no timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Ceiling on caller-supplied timeouts (milliseconds)
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,

    /// Billable units per delivered document
    #[serde(default = "default_credits_per_document")]
    pub credits_per_document: i64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_timeout_ms() -> u64 {
    90_000
}

fn default_credits_per_document() -> i64 {
    1
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            default_timeout: Duration::from_millis(self.default_timeout_ms),
            max_timeout: Duration::from_millis(self.max_timeout_ms),
            credits_per_document: self.credits_per_document,
        }
    }
}
