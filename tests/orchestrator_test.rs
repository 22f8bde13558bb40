//! Scenario tests for the scrape orchestration flow, driven through
//! in-memory queue and ledger fakes that record every call.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use scrape_gateway::models::document::{Document, DocumentMetadata};
use scrape_gateway::models::job::JobPayload;
use scrape_gateway::models::scrape::{PageOptions, ScrapeRequest};
use scrape_gateway::services::audit::AuditSink;
use scrape_gateway::services::billing::{BillingOutcome, CreditLedger};
use scrape_gateway::services::orchestrator::{
    OrchestratorConfig, ScrapeOrchestrator, ScrapeOutcome,
};
use scrape_gateway::services::queue::{JobHandle, JobQueue, QueueError, WaitOutcome};

/// Shared, ordered log of the calls the orchestrator makes on its
/// collaborators.
#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }
}

struct FakeQueue {
    replies: Mutex<VecDeque<WaitOutcome>>,
    log: CallLog,
    submitted_ids: Arc<Mutex<Vec<Uuid>>>,
    wait_bounds: Arc<Mutex<Vec<Duration>>>,
    fail_remove: bool,
}

impl FakeQueue {
    fn new(replies: Vec<WaitOutcome>, log: CallLog) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            log,
            submitted_ids: Arc::new(Mutex::new(Vec::new())),
            wait_bounds: Arc::new(Mutex::new(Vec::new())),
            fail_remove: false,
        }
    }

    fn failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }
}

#[async_trait]
impl JobQueue for FakeQueue {
    async fn submit(
        &self,
        _payload: JobPayload,
        job_id: Uuid,
    ) -> Result<Box<dyn JobHandle>, QueueError> {
        self.log.push("submit");
        self.submitted_ids.lock().unwrap().push(job_id);
        let outcome = self.replies.lock().unwrap().pop_front();
        Ok(Box::new(FakeHandle {
            job_id,
            outcome: Mutex::new(outcome),
            log: self.log.clone(),
            wait_bounds: self.wait_bounds.clone(),
            fail_remove: self.fail_remove,
        }))
    }
}

struct FakeHandle {
    job_id: Uuid,
    outcome: Mutex<Option<WaitOutcome>>,
    log: CallLog,
    wait_bounds: Arc<Mutex<Vec<Duration>>>,
    fail_remove: bool,
}

#[async_trait]
impl JobHandle for FakeHandle {
    fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn wait_until_finished(&self, timeout: Duration) -> WaitOutcome {
        self.log.push("wait");
        self.wait_bounds.lock().unwrap().push(timeout);
        self.outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or(WaitOutcome::TimedOut)
    }

    async fn remove(&self) -> Result<(), QueueError> {
        self.log.push("remove");
        if self.fail_remove {
            let parse_err = serde_json::from_str::<i32>("not json").unwrap_err();
            return Err(QueueError::Serialize(parse_err));
        }
        Ok(())
    }
}

struct FakeLedger {
    refuse_with: Option<String>,
    log: CallLog,
}

#[async_trait]
impl CreditLedger for FakeLedger {
    async fn debit(&self, _team_id: &str, credits: i64) -> BillingOutcome {
        self.log.push(format!("debit:{credits}"));
        match &self.refuse_with {
            Some(reason) => BillingOutcome::refused(reason.clone()),
            None => BillingOutcome::charged(),
        }
    }
}

fn sample_document() -> Document {
    Document {
        markdown: Some("# Example\n\nBody text.".to_string()),
        html: None,
        raw_html: None,
        links_on_page: vec!["https://example.com/next".to_string()],
        screenshot: None,
        full_page_screenshot: None,
        metadata: DocumentMetadata {
            title: Some("Example".to_string()),
            description: None,
            language: Some("en".to_string()),
            source_url: Some("https://example.com".to_string()),
            page_status_code: Some(200),
            page_error: None,
        },
        index: Some(7),
        provider: Some("http-worker".to_string()),
    }
}

fn request(timeout_ms: Option<u64>) -> ScrapeRequest {
    ScrapeRequest {
        url: "https://example.com".to_string(),
        timeout: timeout_ms,
        origin: "api".to_string(),
        page_options: PageOptions::default(),
    }
}

struct Harness {
    orchestrator: ScrapeOrchestrator,
    log: CallLog,
    submitted_ids: Arc<Mutex<Vec<Uuid>>>,
    wait_bounds: Arc<Mutex<Vec<Duration>>>,
    audit_rx: tokio::sync::mpsc::UnboundedReceiver<scrape_gateway::services::audit::AuditRecord>,
}

fn harness(replies: Vec<WaitOutcome>, refuse_billing: Option<&str>) -> Harness {
    let log = CallLog::default();
    let queue = Arc::new(FakeQueue::new(replies, log.clone()));
    let submitted_ids = queue.submitted_ids.clone();
    let wait_bounds = queue.wait_bounds.clone();
    let ledger = Arc::new(FakeLedger {
        refuse_with: refuse_billing.map(str::to_string),
        log: log.clone(),
    });
    let (audit, audit_rx) = AuditSink::channel();
    let orchestrator =
        ScrapeOrchestrator::new(queue, ledger, audit, OrchestratorConfig::default());
    Harness {
        orchestrator,
        log,
        submitted_ids,
        wait_bounds,
        audit_rx,
    }
}

#[tokio::test]
async fn timeout_removes_job_and_reports_timeout() {
    let mut h = harness(vec![WaitOutcome::TimedOut], None);

    let outcome = h.orchestrator.handle(request(Some(5_000)), "team-1").await;

    assert!(matches!(outcome, ScrapeOutcome::TimedOut));
    assert_eq!(h.log.count("remove"), 1);
    assert_eq!(h.log.count("debit:1"), 0);
    assert!(h.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn wait_failure_removes_job_and_reports_internal_error() {
    let mut h = harness(
        vec![WaitOutcome::Failed("connection reset".to_string())],
        None,
    );

    let outcome = h.orchestrator.handle(request(None), "team-1").await;

    assert!(matches!(outcome, ScrapeOutcome::WorkerFailed));
    assert_eq!(h.log.count("remove"), 1);
    assert_eq!(h.log.count("debit:1"), 0);
    assert!(h.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn empty_result_is_degraded_success_without_billing() {
    let mut h = harness(vec![WaitOutcome::Completed(Vec::new())], None);

    let outcome = h.orchestrator.handle(request(None), "team-1").await;

    assert!(matches!(outcome, ScrapeOutcome::NoContent));
    assert_eq!(h.log.count("remove"), 1);
    assert_eq!(h.log.count("debit:1"), 0);
    assert!(h.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn successful_scrape_bills_once_and_audits_once() {
    let mut h = harness(vec![WaitOutcome::Completed(vec![sample_document()])], None);

    let outcome = h.orchestrator.handle(request(None), "team-1").await;

    let ScrapeOutcome::Completed(data) = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(data.markdown.as_deref(), Some("# Example\n\nBody text."));
    assert_eq!(data.metadata.status_code, Some(200));
    assert_eq!(data.metadata.error, None);

    assert_eq!(h.log.count("debit:1"), 1);
    assert_eq!(h.log.count("remove"), 1);

    let record = h.audit_rx.try_recv().expect("expected one audit record");
    assert!(record.success);
    assert_eq!(record.num_docs, 1);
    assert_eq!(record.team_id, "team-1");
    assert_eq!(record.mode, "scrape");
    assert!(record.num_tokens > 0);
    assert!(h.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn billing_failure_discards_result_after_removal() {
    let mut h = harness(
        vec![WaitOutcome::Completed(vec![sample_document()])],
        Some("insufficient credits"),
    );

    let outcome = h.orchestrator.handle(request(None), "team-1").await;

    let ScrapeOutcome::BillingRejected { reason } = outcome else {
        panic!("expected billing rejection");
    };
    assert_eq!(reason.as_deref(), Some("insufficient credits"));

    // Removal happened exactly once, and before the debit attempt.
    let events = h.log.events();
    let remove_at = events.iter().position(|e| e == "remove").unwrap();
    let debit_at = events.iter().position(|e| e == "debit:1").unwrap();
    assert!(remove_at < debit_at);
    assert_eq!(h.log.count("remove"), 1);

    assert!(h.audit_rx.try_recv().is_err());
}

#[tokio::test]
async fn remove_failure_never_masks_the_result() {
    let log = CallLog::default();
    let queue = Arc::new(
        FakeQueue::new(
            vec![WaitOutcome::Completed(vec![sample_document()])],
            log.clone(),
        )
        .failing_remove(),
    );
    let ledger = Arc::new(FakeLedger {
        refuse_with: None,
        log: log.clone(),
    });
    let (audit, mut audit_rx) = AuditSink::channel();
    let orchestrator =
        ScrapeOrchestrator::new(queue, ledger, audit, OrchestratorConfig::default());

    let outcome = orchestrator.handle(request(None), "team-1").await;

    // A removal error is logged, not propagated: the flow still bills
    // once and delivers the document.
    let ScrapeOutcome::Completed(data) = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(data.metadata.status_code, Some(200));
    assert_eq!(log.count("remove"), 1);
    assert_eq!(log.count("debit:1"), 1);
    assert!(audit_rx.try_recv().is_ok());
}

#[tokio::test]
async fn internal_metadata_names_never_reach_the_wire() {
    let mut h = harness(
        vec![WaitOutcome::Completed(vec![{
            let mut doc = sample_document();
            doc.metadata.page_error = Some("Gone".to_string());
            doc.metadata.page_status_code = Some(410);
            doc
        }])],
        None,
    );

    let outcome = h.orchestrator.handle(request(None), "team-1").await;
    let ScrapeOutcome::Completed(data) = outcome else {
        panic!("expected completed outcome");
    };

    let json = serde_json::to_string(&data).unwrap();
    assert!(!json.contains("pageError"));
    assert!(!json.contains("pageStatusCode"));
    assert!(!json.contains("provider"));
    assert!(json.contains("\"error\":\"Gone\""));
    assert!(json.contains("\"statusCode\":410"));

    let _ = h.audit_rx.try_recv();
}

#[tokio::test]
async fn concurrent_requests_get_distinct_job_ids() {
    let h = harness(
        vec![
            WaitOutcome::Completed(vec![sample_document()]),
            WaitOutcome::Completed(vec![sample_document()]),
        ],
        None,
    );

    let (a, b) = futures::join!(
        h.orchestrator.handle(request(None), "team-1"),
        h.orchestrator.handle(request(None), "team-2"),
    );
    assert!(matches!(a, ScrapeOutcome::Completed(_)));
    assert!(matches!(b, ScrapeOutcome::Completed(_)));

    let ids = h.submitted_ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn caller_timeout_is_clamped_to_the_ceiling() {
    let h = harness(vec![WaitOutcome::TimedOut], None);

    let _ = h
        .orchestrator
        .handle(request(Some(300_000)), "team-1")
        .await;

    let bounds = h.wait_bounds.lock().unwrap().clone();
    assert_eq!(bounds, vec![Duration::from_millis(90_000)]);
}

#[tokio::test]
async fn missing_timeout_uses_the_default() {
    let h = harness(vec![WaitOutcome::TimedOut], None);

    let _ = h.orchestrator.handle(request(None), "team-1").await;

    let bounds = h.wait_bounds.lock().unwrap().clone();
    assert_eq!(bounds, vec![Duration::from_millis(60_000)]);
}
