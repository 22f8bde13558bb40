use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::scrape::PageOptions;

/// How the worker should interpret the job's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScrapeMode {
    SingleUrls,
}

/// Unit of work handed to the queue. Immutable once submitted; the job id
/// is generated by the orchestrator and is the correlation key for
/// logging, reply delivery and removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub url: String,
    pub mode: ScrapeMode,
    pub team_id: String,
    pub page_options: PageOptions,
    pub origin: String,
}

/// Payload as serialized into Redis, with the correlation id attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: Uuid,
    #[serde(flatten)]
    pub payload: JobPayload,
}
