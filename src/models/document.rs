use serde::{Deserialize, Serialize};

/// Artifact produced by the scrape worker for one page.
///
/// This is the internal wire shape exchanged between the worker and the
/// orchestrator. `index` and `provider` are bookkeeping fields for the
/// worker fleet and must never be forwarded to an API caller; the public
/// response shape is produced by `ScrapeData::from_document`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub raw_html: Option<String>,
    #[serde(default)]
    pub links_on_page: Vec<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub full_page_screenshot: Option<String>,
    pub metadata: DocumentMetadata,
    /// Internal worker-fleet field, stripped before responding.
    #[serde(default)]
    pub index: Option<i64>,
    /// Internal worker-fleet field, stripped before responding.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Page metadata as reported by the worker.
///
/// `page_error` and `page_status_code` are internal names; they surface to
/// callers as `error` and `statusCode` on the public metadata object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub page_status_code: Option<u16>,
    #[serde(default)]
    pub page_error: Option<String>,
}
