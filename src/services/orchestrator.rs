use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::job::{JobPayload, ScrapeMode};
use crate::models::scrape::{ScrapeData, ScrapeRequest};
use crate::services::audit::{AuditRecord, AuditSink};
use crate::services::billing::CreditLedger;
use crate::services::queue::{JobQueue, WaitOutcome};
use crate::services::tokens;

/// Tunables for the request flow, injected rather than read from ambient
/// globals.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Wait bound applied when the caller does not supply one.
    pub default_timeout: Duration,
    /// Ceiling on caller-supplied wait bounds.
    pub max_timeout: Duration,
    /// Billable units per delivered document. Fixed at one for single-URL
    /// scrapes; kept configurable for multi-document flows.
    pub credits_per_document: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(60_000),
            max_timeout: Duration::from_millis(90_000),
            credits_per_document: 1,
        }
    }
}

/// Terminal state of one scrape request, mapped to an HTTP response by
/// the route layer. Disjoint by construction: a request ends in exactly
/// one of these.
#[derive(Debug)]
pub enum ScrapeOutcome {
    /// Worker produced a document and the team was charged.
    Completed(ScrapeData),
    /// Worker finished but delivered nothing; degraded success, no charge.
    NoContent,
    /// Wait exceeded the caller's bound.
    TimedOut,
    /// Wait failed for a non-timeout reason.
    WorkerFailed,
    /// Document was produced but the debit was refused; the result is
    /// discarded and the work is not compensated.
    BillingRejected { reason: Option<String> },
}

/// Bridges the synchronous scrape contract onto the async job queue:
/// submit, wait with a bound, always remove, bill once, audit, respond.
pub struct ScrapeOrchestrator {
    queue: Arc<dyn JobQueue>,
    ledger: Arc<dyn CreditLedger>,
    audit: AuditSink,
    config: OrchestratorConfig,
}

impl ScrapeOrchestrator {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        ledger: Arc<dyn CreditLedger>,
        audit: AuditSink,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            queue,
            ledger,
            audit,
            config,
        }
    }

    fn wait_bound(&self, requested_ms: Option<u64>) -> Duration {
        match requested_ms {
            Some(ms) => Duration::from_millis(ms).min(self.config.max_timeout),
            None => self.config.default_timeout,
        }
    }

    pub async fn handle(&self, request: ScrapeRequest, team_id: &str) -> ScrapeOutcome {
        metrics::counter!("scrape_requests_total").increment(1);

        let job_id = Uuid::new_v4();
        let started = Instant::now();

        let payload = JobPayload {
            url: request.url.clone(),
            mode: ScrapeMode::SingleUrls,
            team_id: team_id.to_string(),
            page_options: request.page_options.clone(),
            origin: request.origin.clone(),
        };

        let handle = match self.queue.submit(payload, job_id).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "failed to submit scrape job");
                return ScrapeOutcome::WorkerFailed;
            }
        };

        let timeout = self.wait_bound(request.timeout);
        let outcome = handle.wait_until_finished(timeout).await;

        // Queue cleanup happens on every exit path, before billing and
        // regardless of how the wait terminated. Its own failure is logged
        // but never masks the primary result.
        if let Err(e) = handle.remove().await {
            tracing::warn!(job_id = %job_id, error = %e, "failed to remove job from queue");
        }

        let documents = match outcome {
            WaitOutcome::Completed(documents) => documents,
            WaitOutcome::TimedOut => {
                metrics::counter!("scrape_timeouts_total").increment(1);
                tracing::warn!(job_id = %job_id, timeout_ms = timeout.as_millis() as u64, "scrape timed out");
                return ScrapeOutcome::TimedOut;
            }
            WaitOutcome::Failed(error) => {
                tracing::error!(job_id = %job_id, error = %error, "scrape job failed");
                return ScrapeOutcome::WorkerFailed;
            }
        };

        let Some(document) = documents.into_iter().next() else {
            tracing::warn!(job_id = %job_id, url = %request.url, "worker delivered no document");
            return ScrapeOutcome::NoContent;
        };

        // Internal-only fields stop here.
        let data = ScrapeData::from_document(document);

        let time_taken = started.elapsed().as_secs_f64();
        let credits = self.config.credits_per_document;

        let billing = self.ledger.debit(team_id, credits).await;
        if !billing.success {
            metrics::counter!("scrape_billing_failures_total").increment(1);
            tracing::error!(
                job_id = %job_id,
                team_id,
                reason = billing.reason.as_deref().unwrap_or("unknown"),
                "failed to bill team for completed scrape"
            );
            return ScrapeOutcome::BillingRejected {
                reason: billing.reason,
            };
        }

        metrics::histogram!("scrape_duration_seconds").record(time_taken);

        let num_tokens = data
            .markdown
            .as_deref()
            .map(tokens::estimate_tokens)
            .unwrap_or(0);

        self.audit.record(AuditRecord {
            job_id,
            success: true,
            message: "Scrape completed".to_string(),
            num_docs: 1,
            docs: serde_json::to_value(&data).unwrap_or(serde_json::Value::Null),
            time_taken,
            team_id: team_id.to_string(),
            mode: "scrape".to_string(),
            url: request.url,
            page_options: serde_json::to_value(&request.page_options)
                .unwrap_or(serde_json::Value::Null),
            origin: request.origin,
            extractor_mode: "markdown".to_string(),
            num_tokens,
        });

        tracing::info!(
            job_id = %job_id,
            team_id,
            time_taken,
            num_tokens,
            "scrape completed"
        );

        ScrapeOutcome::Completed(data)
    }
}
