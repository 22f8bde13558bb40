use sqlx::PgPool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::db::queries;

/// One-shot observability record for a completed scrape request. Has no
/// effect on the response returned to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditRecord {
    pub job_id: Uuid,
    pub success: bool,
    pub message: String,
    pub num_docs: i32,
    pub docs: serde_json::Value,
    pub time_taken: f64,
    pub team_id: String,
    pub mode: String,
    pub url: String,
    pub page_options: serde_json::Value,
    pub origin: String,
    pub extractor_mode: String,
    pub num_tokens: i64,
}

/// Non-blocking audit dispatch. Records are sent over an unbounded channel
/// to a background writer so a slow or failing sink can never delay or
/// fail the request path.
#[derive(Clone)]
pub struct AuditSink {
    tx: UnboundedSender<AuditRecord>,
}

impl AuditSink {
    /// Sink backed by a background task writing to the `scrape_logs` table.
    /// Write failures are logged and swallowed.
    pub fn postgres(pool: PgPool) -> Self {
        let (sink, mut rx) = Self::channel();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = queries::insert_scrape_log(&pool, &record).await {
                    tracing::warn!(
                        job_id = %record.job_id,
                        error = %e,
                        "failed to persist audit record"
                    );
                }
            }
        });
        sink
    }

    /// Raw channel pair, used by tests to observe dispatched records.
    pub fn channel() -> (Self, UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget dispatch. A closed sink drops the record silently.
    pub fn record(&self, record: AuditRecord) {
        if self.tx.send(record).is_err() {
            tracing::debug!("audit sink closed, dropping record");
        }
    }
}
