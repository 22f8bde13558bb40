use scrape_gateway::{
    config::AppConfig,
    models::document::{Document, DocumentMetadata},
    models::job::QueuedJob,
    services::extract,
    services::queue::{JobReply, RedisJobQueue},
};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second
const FETCH_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting scrape worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    let queue = RedisJobQueue::new(&config.redis_url).expect("Failed to initialize job queue");

    let http = reqwest::Client::builder()
        .user_agent(concat!("scrape-gateway/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client");

    tracing::info!("Worker ready, starting job processing loop");

    // Main processing loop
    loop {
        match process_next_job(&queue, &http).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing job");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Process the next job from the queue.
/// Returns Ok(true) if a job was processed, Ok(false) if no job available.
async fn process_next_job(
    queue: &RedisJobQueue,
    http: &reqwest::Client,
) -> Result<bool, Box<dyn std::error::Error>> {
    let job = match queue.dequeue().await? {
        Some(j) => j,
        None => return Ok(false),
    };

    tracing::info!(
        job_id = %job.job_id,
        url = %job.payload.url,
        mode = %job.payload.mode,
        "Processing scrape job"
    );

    let started = std::time::Instant::now();
    let reply = scrape_page(http, &job).await;

    match &reply {
        JobReply::Completed { documents } => {
            tracing::info!(
                job_id = %job.job_id,
                num_docs = documents.len(),
                fetch_ms = started.elapsed().as_millis() as u64,
                "Scrape completed"
            );
        }
        JobReply::Failed { error } => {
            // The gateway surfaces this as a worker failure; jobs are
            // never retried, the caller resubmits with a fresh id.
            tracing::warn!(job_id = %job.job_id, error = %error, "Scrape failed");
        }
    }

    queue.deliver(job.job_id, &reply).await?;
    queue.finish(&job).await?;

    Ok(true)
}

/// Fetch and extract one page. Transport-level failures become a failed
/// reply; HTTP error statuses still produce a document, with the status
/// carried in the internal page metadata.
async fn scrape_page(http: &reqwest::Client, job: &QueuedJob) -> JobReply {
    let options = &job.payload.page_options;

    let mut request = http.get(&job.payload.url);
    if let Some(headers) = &options.headers {
        for (name, value) in headers {
            request = request.header(name, value);
        }
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            return JobReply::Failed {
                error: format!("fetch failed: {e}"),
            }
        }
    };

    let status = response.status();
    let final_url = response.url().clone();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return JobReply::Failed {
                error: format!("failed to read response body: {e}"),
            }
        }
    };

    let page = extract::extract_page(&body, &final_url);

    let page_error = if status.is_client_error() || status.is_server_error() {
        Some(
            status
                .canonical_reason()
                .unwrap_or("HTTP error")
                .to_string(),
        )
    } else {
        None
    };

    let document = Document {
        markdown: Some(page.markdown),
        html: options.include_html.then(|| body.clone()),
        raw_html: options.include_raw_html.then(|| body.clone()),
        links_on_page: if options.include_links {
            page.links
        } else {
            Vec::new()
        },
        // Screenshots need a rendering backend this worker does not have.
        screenshot: None,
        full_page_screenshot: None,
        metadata: DocumentMetadata {
            title: page.title,
            description: page.description,
            language: page.language,
            source_url: Some(final_url.to_string()),
            page_status_code: Some(status.as_u16()),
            page_error,
        },
        index: None,
        provider: Some("http-worker".to_string()),
    };

    JobReply::Completed {
        documents: vec![document],
    }
}
